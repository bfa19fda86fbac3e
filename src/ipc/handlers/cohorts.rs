use crate::analytics;
use crate::ipc::error::ok;
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use crate::records;
use serde_json::json;

fn handle_class_performance(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match helpers::db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let records = match records::fetch_flat_records(conn) {
        Ok(v) => v,
        Err(e) => return helpers::store_err(req, e),
    };
    ok(&req.id, json!({ "rows": analytics::class_averages(&records) }))
}

fn handle_teacher_performance(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match helpers::db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let records = match records::fetch_flat_records(conn) {
        Ok(v) => v,
        Err(e) => return helpers::store_err(req, e),
    };
    let assignments = match records::fetch_teacher_assignments(conn) {
        Ok(v) => v,
        Err(e) => return helpers::store_err(req, e),
    };
    ok(
        &req.id,
        json!({ "rows": analytics::teacher_averages(&records, &assignments) }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.performance" => Some(handle_class_performance(state, req)),
        "teachers.performance" => Some(handle_teacher_performance(state, req)),
        _ => None,
    }
}
