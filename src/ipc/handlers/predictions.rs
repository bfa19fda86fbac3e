use crate::ipc::error::{err, ok};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use crate::predict;
use chrono::Utc;
use serde_json::json;

fn handle_train(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match helpers::db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let table = match helpers::load_clean_table(conn) {
        Ok(v) => v,
        Err(e) => return helpers::store_err(req, e),
    };

    let report = predict::train_models(&table, Utc::now());
    let models: Vec<&predict::SubjectModel> = report.registry.models().collect();
    tracing::info!(
        trained = models.len(),
        skipped = report.skipped.len(),
        "prediction models trained"
    );
    let resp = ok(
        &req.id,
        json!({
            "trainedAt": report.registry.trained_at(),
            "models": models,
            "skippedSubjects": report.skipped,
        }),
    );
    state.models = report.registry;
    resp
}

fn handle_predictions_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    if !state.models.is_trained() {
        return err(
            &req.id,
            "model_not_trained",
            "no prediction models trained; call predictions.train first",
            None,
        );
    }
    let conn = match helpers::db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let table = match helpers::load_clean_table(conn) {
        Ok(v) => v,
        Err(e) => return helpers::store_err(req, e),
    };
    let rows = predict::generate(&table, &state.models);
    ok(
        &req.id,
        json!({ "trainedAt": state.models.trained_at(), "rows": rows }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "predictions.train" => Some(handle_train(state, req)),
        "predictions.get" => Some(handle_predictions_get(state, req)),
        _ => None,
    }
}
