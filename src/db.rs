use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("examlens.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS teachers(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            roll_number INTEGER NOT NULL,
            name TEXT NOT NULL,
            class_id TEXT,
            FOREIGN KEY(class_id) REFERENCES classes(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_class ON students(class_id)",
        [],
    )?;

    // The marks column is deliberately untyped: the source feed delivers
    // numeric, textual, and missing marks, and the cleaning stage owns the
    // coercion. Uniqueness of (student, subject, exam_type) is assumed
    // upstream and not enforced here.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS exam_results(
            student_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            exam_type TEXT NOT NULL,
            marks,
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(subject_id) REFERENCES subjects(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_exam_results_student ON exam_results(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_exam_results_subject ON exam_results(subject_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS teacher_assignments(
            teacher_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            class_id TEXT NOT NULL,
            FOREIGN KEY(teacher_id) REFERENCES teachers(id),
            FOREIGN KEY(subject_id) REFERENCES subjects(id),
            FOREIGN KEY(class_id) REFERENCES classes(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_teacher_assignments_teacher ON teacher_assignments(teacher_id)",
        [],
    )?;

    Ok(conn)
}

/// Document collections pushed over `roster.import`. Shapes mirror the
/// upstream feed: students embed their exam results, teachers embed their
/// (subject, class) assignments, and references are by id.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterDocument {
    #[serde(default)]
    pub classes: Vec<ClassDoc>,
    #[serde(default)]
    pub subjects: Vec<SubjectDoc>,
    #[serde(default)]
    pub teachers: Vec<TeacherDoc>,
    #[serde(default)]
    pub students: Vec<StudentDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDoc {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDoc {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherDoc {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub teaches: Vec<TeachesDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeachesDoc {
    pub subject: String,
    pub class: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDoc {
    #[serde(default)]
    pub id: Option<String>,
    pub roll_number: i64,
    pub name: String,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub exam_result: Vec<ExamResultDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResultDoc {
    pub subject: String,
    pub exam_type: String,
    #[serde(default)]
    pub marks: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterCounts {
    pub classes: usize,
    pub subjects: usize,
    pub teachers: usize,
    pub students: usize,
    pub exam_results: usize,
    pub assignments: usize,
}

/// Insert a roster batch in one transaction. Entity rows upsert by id;
/// embedded exam results and assignments append.
pub fn import_roster(conn: &mut Connection, roster: &RosterDocument) -> anyhow::Result<RosterCounts> {
    let tx = conn.transaction()?;
    let mut counts = RosterCounts::default();

    for c in &roster.classes {
        let id = entity_id(&c.id);
        tx.execute(
            "INSERT INTO classes(id, name) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            params![id, c.name],
        )?;
        counts.classes += 1;
    }

    for s in &roster.subjects {
        let id = entity_id(&s.id);
        tx.execute(
            "INSERT INTO subjects(id, name) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            params![id, s.name],
        )?;
        counts.subjects += 1;
    }

    for t in &roster.teachers {
        let id = entity_id(&t.id);
        tx.execute(
            "INSERT INTO teachers(id, name) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            params![id, t.name],
        )?;
        for a in &t.teaches {
            tx.execute(
                "INSERT INTO teacher_assignments(teacher_id, subject_id, class_id)
                 VALUES (?1, ?2, ?3)",
                params![id, a.subject, a.class],
            )?;
            counts.assignments += 1;
        }
        counts.teachers += 1;
    }

    for s in &roster.students {
        let id = entity_id(&s.id);
        tx.execute(
            "INSERT INTO students(id, roll_number, name, class_id) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                roll_number = excluded.roll_number,
                name = excluded.name,
                class_id = excluded.class_id",
            params![id, s.roll_number, s.name, s.class],
        )?;
        for r in &s.exam_result {
            tx.execute(
                "INSERT INTO exam_results(student_id, subject_id, exam_type, marks)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, r.subject, r.exam_type, mark_to_sql(&r.marks)],
            )?;
            counts.exam_results += 1;
        }
        counts.students += 1;
    }

    tx.commit()?;
    Ok(counts)
}

fn entity_id(id: &Option<String>) -> String {
    id.clone().unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn mark_to_sql(v: &serde_json::Value) -> rusqlite::types::Value {
    match v {
        serde_json::Value::Number(n) => n
            .as_f64()
            .map(rusqlite::types::Value::Real)
            .unwrap_or(rusqlite::types::Value::Null),
        serde_json::Value::String(s) => rusqlite::types::Value::Text(s.clone()),
        _ => rusqlite::types::Value::Null,
    }
}
