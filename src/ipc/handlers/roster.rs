use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_roster_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let roster: db::RosterDocument = match serde_json::from_value(req.params.clone()) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "bad_params",
                format!("invalid roster document: {e}"),
                None,
            )
        }
    };

    match db::import_roster(conn, &roster) {
        Ok(counts) => {
            tracing::info!(
                students = counts.students,
                exam_results = counts.exam_results,
                "roster imported"
            );
            ok(&req.id, json!({ "imported": counts }))
        }
        Err(e) => err(&req.id, "db_query_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "roster.import" => Some(handle_roster_import(state, req)),
        _ => None,
    }
}
