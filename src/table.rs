use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::records::{CellValue, ExamType, FlatExamRecord};

/// Every checkpoint exam is scored out of 25.
pub const MAX_MARK: f64 = 25.0;

/// Column identity in the pivoted table: one column per (subject, exam type)
/// pair. Membership checks are key lookups, never label scans.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkKey {
    pub subject: String,
    pub exam_type: ExamType,
}

impl MarkKey {
    pub fn new(subject: impl Into<String>, exam_type: ExamType) -> Self {
        Self {
            subject: subject.into(),
            exam_type,
        }
    }
}

impl fmt::Display for MarkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.subject, self.exam_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct StudentKey {
    roll_number: i64,
    name: String,
    class_name: String,
}

/// One pivoted row. A cell is absent when no exam record exists for that
/// (subject, exam type) combination.
#[derive(Debug, Clone)]
pub struct WideRow {
    pub roll_number: i64,
    pub name: String,
    pub class_name: String,
    pub cells: BTreeMap<MarkKey, CellValue>,
}

#[derive(Debug, Clone, Default)]
pub struct WideTable {
    pub columns: BTreeSet<MarkKey>,
    pub rows: Vec<WideRow>,
}

/// Pivot flat exam records into one row per (rollNumber, name, className).
/// The grouping key is an exact match; near-duplicates that differ by case
/// or whitespace stay separate rows. Rows come out ascending by key and
/// columns ascending by (subject, exam type).
pub fn pivot(records: &[FlatExamRecord]) -> WideTable {
    let mut columns = BTreeSet::new();
    let mut grouped: BTreeMap<StudentKey, BTreeMap<MarkKey, CellValue>> = BTreeMap::new();

    for rec in records {
        let key = StudentKey {
            roll_number: rec.roll_number,
            name: rec.student_name.clone(),
            class_name: rec.class_name.clone(),
        };
        let col = MarkKey::new(rec.subject_name.clone(), rec.exam_type);
        columns.insert(col.clone());
        // Uniqueness of (student, subject, examType) is assumed upstream; on
        // a violation the later record wins the cell.
        grouped.entry(key).or_default().insert(col, rec.marks.clone());
    }

    let rows = grouped
        .into_iter()
        .map(|(key, cells)| WideRow {
            roll_number: key.roll_number,
            name: key.name,
            class_name: key.class_name,
            cells,
        })
        .collect();

    WideTable { columns, rows }
}

/// A fully-coerced table: every mark column holds an f64 in [0, MAX_MARK]
/// on every row.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRow {
    pub roll_number: i64,
    pub name: String,
    pub class_name: String,
    pub marks: BTreeMap<MarkKey, f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanTable {
    /// Sorted ascending by (subject, exam type).
    pub columns: Vec<MarkKey>,
    pub rows: Vec<CleanRow>,
}

impl CleanTable {
    pub fn has_column(&self, key: &MarkKey) -> bool {
        self.columns.binary_search(key).is_ok()
    }
}

/// Coerce every mark cell to a numeric value. Text parses as f64 or becomes
/// 0; absent and null cells become 0; everything lands in [0, MAX_MARK].
/// Produces a new table; cleaning already-clean data changes nothing.
pub fn clean(table: &WideTable) -> CleanTable {
    let columns: Vec<MarkKey> = table.columns.iter().cloned().collect();
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let marks = columns
                .iter()
                .map(|col| {
                    let value = row.cells.get(col).map(coerce_mark).unwrap_or(0.0);
                    (col.clone(), value)
                })
                .collect();
            CleanRow {
                roll_number: row.roll_number,
                name: row.name.clone(),
                class_name: row.class_name.clone(),
                marks,
            }
        })
        .collect();
    CleanTable { columns, rows }
}

/// Force a raw model or parse output into the valid mark band.
pub fn clamp_mark(raw: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(0.0, MAX_MARK)
    } else {
        0.0
    }
}

fn coerce_mark(cell: &CellValue) -> f64 {
    let raw = match cell {
        CellValue::Number(v) => *v,
        CellValue::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        CellValue::Null => 0.0,
    };
    clamp_mark(raw)
}
