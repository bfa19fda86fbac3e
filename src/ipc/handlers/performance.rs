use crate::analytics;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_performance_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match helpers::db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let table = match helpers::load_clean_table(conn) {
        Ok(v) => v,
        Err(e) => return helpers::store_err(req, e),
    };
    let rows = analytics::compute_performance(&table);
    ok(&req.id, json!({ "rows": rows }))
}

fn handle_subject_insights(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match helpers::db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let table = match helpers::load_clean_table(conn) {
        Ok(v) => v,
        Err(e) => return helpers::store_err(req, e),
    };
    ok(&req.id, json!({ "insights": analytics::subject_insights(&table) }))
}

fn parse_threshold(req: &Request) -> Result<f64, serde_json::Value> {
    let Some(raw) = req.params.get("threshold") else {
        return Ok(analytics::DEFAULT_AT_RISK_THRESHOLD);
    };
    if raw.is_null() {
        return Ok(analytics::DEFAULT_AT_RISK_THRESHOLD);
    }
    let Some(value) = raw.as_f64() else {
        return Err(err(
            &req.id,
            "bad_params",
            "threshold must be a number",
            Some(json!({ "threshold": raw })),
        ));
    };
    if !value.is_finite() {
        return Err(err(
            &req.id,
            "bad_params",
            "threshold must be finite",
            Some(json!({ "threshold": raw })),
        ));
    }
    Ok(value)
}

fn handle_at_risk(state: &mut AppState, req: &Request) -> serde_json::Value {
    let threshold = match parse_threshold(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let conn = match helpers::db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let table = match helpers::load_clean_table(conn) {
        Ok(v) => v,
        Err(e) => return helpers::store_err(req, e),
    };
    let rows = analytics::at_risk(&analytics::compute_performance(&table), threshold);
    ok(&req.id, json!({ "threshold": threshold, "rows": rows }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "performance.get" => Some(handle_performance_get(state, req)),
        "subjects.insights" => Some(handle_subject_insights(state, req)),
        "students.atRisk" => Some(handle_at_risk(state, req)),
        _ => None,
    }
}
