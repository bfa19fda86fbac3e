use std::collections::HashMap;
use std::fmt;

use rusqlite::Connection;
use serde::Serialize;

/// The four checkpoint assessments a subject is examined with over a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExamType {
    T1,
    T2,
    T3,
    T4,
}

impl ExamType {
    pub const ALL: [ExamType; 4] = [ExamType::T1, ExamType::T2, ExamType::T3, ExamType::T4];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "T1" => Some(ExamType::T1),
            "T2" => Some(ExamType::T2),
            "T3" => Some(ExamType::T3),
            "T4" => Some(ExamType::T4),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExamType::T1 => "T1",
            ExamType::T2 => "T2",
            ExamType::T3 => "T3",
            ExamType::T4 => "T4",
        }
    }
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subjects the reporting surface works with. Insight and prediction passes
/// iterate this roster instead of discovering subjects from column labels.
pub const SUBJECT_ROSTER: [&str; 5] = ["DM", "PYTHON", "TOC", "COA", "FSD"];

/// A raw mark as it sits in the store, before cleaning.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Null,
}

/// One exam result expanded to a flat record with its references resolved.
/// Ids are kept alongside the display names so grouped joins can match on
/// identity rather than on labels.
#[derive(Debug, Clone)]
pub struct FlatExamRecord {
    pub roll_number: i64,
    pub student_name: String,
    pub class_id: String,
    pub class_name: String,
    pub subject_id: String,
    pub subject_name: String,
    pub exam_type: ExamType,
    pub marks: CellValue,
}

#[derive(Debug, Clone)]
pub struct TeacherAssignment {
    pub teacher_name: String,
    pub subject_id: String,
    pub class_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreError {
    pub code: String,
    pub message: String,
}

impl StoreError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Expand every student's exam results into flat records and resolve subject
/// and class references in process. Records whose references do not resolve,
/// or whose exam type is not one of T1..T4, are dropped — the same outcome a
/// failed lookup has in the upstream store pipeline.
pub fn fetch_flat_records(conn: &Connection) -> Result<Vec<FlatExamRecord>, StoreError> {
    let subject_names = load_name_map(conn, "SELECT id, name FROM subjects")?;
    let class_names = load_name_map(conn, "SELECT id, name FROM classes")?;

    let mut stmt = conn
        .prepare(
            "SELECT s.roll_number, s.name, s.class_id, r.subject_id, r.exam_type, r.marks
             FROM exam_results r
             JOIN students s ON s.id = r.student_id
             ORDER BY s.roll_number, s.name",
        )
        .map_err(|e| StoreError::new("db_query_failed", e.to_string()))?;
    let raw_rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, Option<String>>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
                cell_from_sql(r.get::<_, rusqlite::types::Value>(5)?),
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| StoreError::new("db_query_failed", e.to_string()))?;

    let mut out = Vec::with_capacity(raw_rows.len());
    for (roll_number, student_name, class_id, subject_id, exam_type_raw, marks) in raw_rows {
        let Some(class_id) = class_id else {
            continue;
        };
        let Some(class_name) = class_names.get(&class_id) else {
            continue;
        };
        let Some(subject_name) = subject_names.get(&subject_id) else {
            continue;
        };
        let Some(exam_type) = ExamType::parse(&exam_type_raw) else {
            tracing::debug!(exam_type = %exam_type_raw, "dropping exam record with unknown exam type");
            continue;
        };
        out.push(FlatExamRecord {
            roll_number,
            student_name,
            class_id: class_id.clone(),
            class_name: class_name.clone(),
            subject_id,
            subject_name: subject_name.clone(),
            exam_type,
            marks,
        });
    }
    Ok(out)
}

/// Flattened (teacher, subject, class) assignments with the teacher name
/// resolved.
pub fn fetch_teacher_assignments(conn: &Connection) -> Result<Vec<TeacherAssignment>, StoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT t.name, a.subject_id, a.class_id
             FROM teacher_assignments a
             JOIN teachers t ON t.id = a.teacher_id
             ORDER BY t.name",
        )
        .map_err(|e| StoreError::new("db_query_failed", e.to_string()))?;
    stmt.query_map([], |r| {
        Ok(TeacherAssignment {
            teacher_name: r.get(0)?,
            subject_id: r.get(1)?,
            class_id: r.get(2)?,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(|e| StoreError::new("db_query_failed", e.to_string()))
}

fn load_name_map(conn: &Connection, sql: &str) -> Result<HashMap<String, String>, StoreError> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| StoreError::new("db_query_failed", e.to_string()))?;
    let rows = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| StoreError::new("db_query_failed", e.to_string()))?;
    Ok(rows.into_iter().collect())
}

fn cell_from_sql(v: rusqlite::types::Value) -> CellValue {
    use rusqlite::types::Value;
    match v {
        Value::Real(n) => CellValue::Number(n),
        Value::Integer(n) => CellValue::Number(n as f64),
        Value::Text(s) => CellValue::Text(s),
        Value::Null | Value::Blob(_) => CellValue::Null,
    }
}
