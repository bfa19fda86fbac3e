use rusqlite::Connection;

use super::error::err;
use super::types::{AppState, Request};
use crate::records::{self, StoreError};
use crate::table::{self, CleanTable};

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn store_err(req: &Request, e: StoreError) -> serde_json::Value {
    err(&req.id, &e.code, e.message, None)
}

/// Run the fetch half of the pipeline: expand and resolve the raw exam
/// records, pivot them wide, and clean the marks. Every analytics request
/// starts from a fresh table.
pub fn load_clean_table(conn: &Connection) -> Result<CleanTable, StoreError> {
    let records = records::fetch_flat_records(conn)?;
    Ok(table::clean(&table::pivot(&records)))
}
