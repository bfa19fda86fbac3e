use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::records::{CellValue, FlatExamRecord, TeacherAssignment, SUBJECT_ROSTER};
use crate::table::{CleanTable, MarkKey, MAX_MARK};

pub const DEFAULT_AT_RISK_THRESHOLD: f64 = 60.0;

/// A student's cleaned marks plus the derived totals and standings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRow {
    pub roll_number: i64,
    pub name: String,
    pub class_name: String,
    /// Keyed by the "<Subject> <ExamType>" column label.
    pub marks: BTreeMap<String, f64>,
    pub total_marks: f64,
    pub percentage: f64,
    pub overall_rank: usize,
    pub class_rank: usize,
}

/// Totals, percentages, and minimum-tie standings for every student. The
/// overall rank covers the whole cohort; the class rank is computed
/// independently inside each class partition.
pub fn compute_performance(table: &CleanTable) -> Vec<PerformanceRow> {
    if table.rows.is_empty() {
        return Vec::new();
    }

    let possible = table.columns.len() as f64 * MAX_MARK;
    let mut rows: Vec<PerformanceRow> = table
        .rows
        .iter()
        .map(|row| {
            let total: f64 = row.marks.values().sum();
            let percentage = if possible > 0.0 {
                total * 100.0 / possible
            } else {
                0.0
            };
            PerformanceRow {
                roll_number: row.roll_number,
                name: row.name.clone(),
                class_name: row.class_name.clone(),
                marks: row.marks.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                total_marks: total,
                percentage,
                overall_rank: 0,
                class_rank: 0,
            }
        })
        .collect();

    let percentages: Vec<f64> = rows.iter().map(|r| r.percentage).collect();
    for (i, rank) in min_tie_ranks(&percentages).into_iter().enumerate() {
        rows[i].overall_rank = rank;
    }

    let mut class_members: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        class_members.entry(row.class_name.clone()).or_default().push(i);
    }
    for members in class_members.values() {
        let class_pcts: Vec<f64> = members.iter().map(|&i| percentages[i]).collect();
        for (&i, rank) in members.iter().zip(min_tie_ranks(&class_pcts)) {
            rows[i].class_rank = rank;
        }
    }

    rows
}

/// Descending minimum-tie ranks: tied values share the lowest rank in their
/// group, and the next distinct value's rank is 1 + the count of strictly
/// better rows.
fn min_tie_ranks(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0usize; values.len()];
    let mut pos = 0;
    while pos < order.len() {
        let mut end = pos + 1;
        while end < order.len() && values[order[end]] == values[order[pos]] {
            end += 1;
        }
        for &idx in &order[pos..end] {
            ranks[idx] = pos + 1;
        }
        pos = end;
    }
    ranks
}

/// Average percentage per roster subject across all students and all exam
/// types of that subject. Subjects with no columns in the table are omitted.
pub fn subject_insights(table: &CleanTable) -> BTreeMap<String, f64> {
    let mut insights = BTreeMap::new();
    if table.rows.is_empty() {
        return insights;
    }

    for subject in SUBJECT_ROSTER {
        let subject_cols: Vec<&MarkKey> = table
            .columns
            .iter()
            .filter(|c| c.subject == subject)
            .collect();
        if subject_cols.is_empty() {
            continue;
        }
        let total: f64 = table
            .rows
            .iter()
            .map(|row| {
                subject_cols
                    .iter()
                    .map(|c| row.marks.get(*c).copied().unwrap_or(0.0))
                    .sum::<f64>()
            })
            .sum();
        let possible = subject_cols.len() as f64 * table.rows.len() as f64 * MAX_MARK;
        let average = if possible > 0.0 {
            total * 100.0 / possible
        } else {
            0.0
        };
        insights.insert(subject.to_string(), average);
    }

    insights
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AtRiskEntry {
    pub name: String,
    pub roll_number: i64,
    pub class_name: String,
    pub percentage: f64,
}

/// Students strictly below the threshold, weakest first.
pub fn at_risk(rows: &[PerformanceRow], threshold: f64) -> Vec<AtRiskEntry> {
    let mut entries: Vec<AtRiskEntry> = rows
        .iter()
        .filter(|r| r.percentage < threshold)
        .map(|r| AtRiskEntry {
            name: r.name.clone(),
            roll_number: r.roll_number,
            class_name: r.class_name.clone(),
            percentage: r.percentage,
        })
        .collect();
    entries.sort_by(|a, b| {
        a.percentage
            .partial_cmp(&b.percentage)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.roll_number.cmp(&b.roll_number))
    });
    entries
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAverage {
    pub class_name: String,
    pub average_marks: f64,
}

/// Mean of numeric marks per class, strongest class first. Groups with no
/// numeric marks at all are omitted.
pub fn class_averages(records: &[FlatExamRecord]) -> Vec<ClassAverage> {
    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    for rec in records {
        let Some(mark) = numeric_mark(&rec.marks) else {
            continue;
        };
        let entry = sums.entry(rec.class_name.as_str()).or_insert((0.0, 0));
        entry.0 += mark;
        entry.1 += 1;
    }

    let mut out: Vec<ClassAverage> = sums
        .into_iter()
        .map(|(name, (sum, count))| ClassAverage {
            class_name: name.to_string(),
            average_marks: sum / count as f64,
        })
        .collect();
    out.sort_by(|a, b| {
        b.average_marks
            .partial_cmp(&a.average_marks)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.class_name.cmp(&b.class_name))
    });
    out
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherAverage {
    pub teacher_name: String,
    pub average_marks: f64,
}

/// For every teacher assignment, join the exam records of that class whose
/// examined subject matches the taught subject (identity match on ids),
/// then average per teacher, strongest first. A teacher whose assignments
/// match no exam rows is omitted rather than reported with an empty average.
pub fn teacher_averages(
    records: &[FlatExamRecord],
    assignments: &[TeacherAssignment],
) -> Vec<TeacherAverage> {
    let mut by_class_subject: HashMap<(&str, &str), (f64, usize)> = HashMap::new();
    for rec in records {
        let Some(mark) = numeric_mark(&rec.marks) else {
            continue;
        };
        let entry = by_class_subject
            .entry((rec.class_id.as_str(), rec.subject_id.as_str()))
            .or_insert((0.0, 0));
        entry.0 += mark;
        entry.1 += 1;
    }

    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    for a in assignments {
        let Some(&(sum, count)) =
            by_class_subject.get(&(a.class_id.as_str(), a.subject_id.as_str()))
        else {
            continue;
        };
        let entry = sums.entry(a.teacher_name.as_str()).or_insert((0.0, 0));
        entry.0 += sum;
        entry.1 += count;
    }

    let mut out: Vec<TeacherAverage> = sums
        .into_iter()
        .filter(|(_, (_, count))| *count > 0)
        .map(|(name, (sum, count))| TeacherAverage {
            teacher_name: name.to_string(),
            average_marks: sum / count as f64,
        })
        .collect();
    out.sort_by(|a, b| {
        b.average_marks
            .partial_cmp(&a.average_marks)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.teacher_name.cmp(&b.teacher_name))
    });
    out
}

fn numeric_mark(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(v) if v.is_finite() => Some(*v),
        _ => None,
    }
}
