use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use crate::records::{ExamType, SUBJECT_ROSTER};
use crate::table::{clamp_mark, CleanTable, MarkKey, MAX_MARK};

/// Fixed seed so the train/held-out partition is reproducible across runs.
const TRAIN_SEED: u64 = 42;
const MIN_TRAINING_ROWS: usize = 10;
const HELD_OUT_RATIO: f64 = 0.2;

/// An ordinary-least-squares fit mapping a subject's early-term marks
/// (T1, T2) to the expected late-term average, mean(T3, T4).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectModel {
    pub subject: String,
    pub intercept: f64,
    pub coefficients: [f64; 2],
    pub training_rows: usize,
    pub held_out_mae: f64,
}

impl SubjectModel {
    /// Raw model output for a pair of early-term marks; callers clamp.
    pub fn evaluate(&self, t1: f64, t2: f64) -> f64 {
        self.intercept + self.coefficients[0] * t1 + self.coefficients[1] * t2
    }
}

/// The trained per-subject models plus when they were fit. Owned by the
/// daemon state and replaced wholesale by every training run; readers never
/// observe a partially-updated set.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, SubjectModel>,
    trained_at: Option<DateTime<Utc>>,
}

impl ModelRegistry {
    pub fn is_trained(&self) -> bool {
        !self.models.is_empty()
    }

    pub fn trained_at(&self) -> Option<DateTime<Utc>> {
        self.trained_at
    }

    pub fn models(&self) -> impl Iterator<Item = &SubjectModel> {
        self.models.values()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedSubject {
    pub subject: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct TrainReport {
    pub registry: ModelRegistry,
    pub skipped: Vec<SkippedSubject>,
}

/// Fit one model per roster subject. A subject is skipped when any of its
/// four exam columns is missing from the table, when there are fewer than
/// MIN_TRAINING_ROWS rows, or when the solver rejects the system; skips are
/// reported, never raised. An empty table produces an empty registry.
pub fn train_models(table: &CleanTable, trained_at: DateTime<Utc>) -> TrainReport {
    let mut models = BTreeMap::new();
    let mut skipped = Vec::new();

    for subject in SUBJECT_ROSTER {
        let keys: Vec<MarkKey> = ExamType::ALL
            .iter()
            .map(|&t| MarkKey::new(subject, t))
            .collect();
        if !keys.iter().all(|k| table.has_column(k)) {
            skipped.push(SkippedSubject {
                subject: subject.to_string(),
                reason: "missing exam columns".to_string(),
            });
            continue;
        }
        if table.rows.len() < MIN_TRAINING_ROWS {
            skipped.push(SkippedSubject {
                subject: subject.to_string(),
                reason: "insufficient rows".to_string(),
            });
            continue;
        }
        match fit_subject(table, subject, &keys) {
            Ok(model) => {
                models.insert(subject.to_string(), model);
            }
            Err(reason) => {
                tracing::warn!(subject, %reason, "subject model skipped");
                skipped.push(SkippedSubject {
                    subject: subject.to_string(),
                    reason,
                });
            }
        }
    }

    let trained_at = if models.is_empty() {
        None
    } else {
        Some(trained_at)
    };
    TrainReport {
        registry: ModelRegistry { models, trained_at },
        skipped,
    }
}

fn fit_subject(table: &CleanTable, subject: &str, keys: &[MarkKey]) -> Result<SubjectModel, String> {
    let n = table.rows.len();
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(TRAIN_SEED);
    order.shuffle(&mut rng);

    let held_out_len = ((n as f64) * HELD_OUT_RATIO).ceil() as usize;
    let train_len = n - held_out_len;
    let (train_idx, held_out_idx) = order.split_at(train_len);

    let features = |row_idx: usize| {
        let row = &table.rows[row_idx];
        let t1 = row.marks.get(&keys[0]).copied().unwrap_or(0.0);
        let t2 = row.marks.get(&keys[1]).copied().unwrap_or(0.0);
        let t3 = row.marks.get(&keys[2]).copied().unwrap_or(0.0);
        let t4 = row.marks.get(&keys[3]).copied().unwrap_or(0.0);
        (t1, t2, (t3 + t4) / 2.0)
    };

    let mut x = Array2::<f64>::zeros((train_len, 2));
    let mut y = Array1::<f64>::zeros(train_len);
    for (i, &row_idx) in train_idx.iter().enumerate() {
        let (t1, t2, target) = features(row_idx);
        x[(i, 0)] = t1;
        x[(i, 1)] = t2;
        y[i] = target;
    }

    let dataset = Dataset::new(x, y);
    let fitted = LinearRegression::new()
        .fit(&dataset)
        .map_err(|e| format!("fit failed: {e}"))?;
    let params = fitted.params();
    let model = SubjectModel {
        subject: subject.to_string(),
        intercept: fitted.intercept(),
        coefficients: [params[0], params[1]],
        training_rows: train_len,
        held_out_mae: 0.0,
    };

    let mut abs_err_sum = 0.0;
    for &row_idx in held_out_idx {
        let (t1, t2, target) = features(row_idx);
        abs_err_sum += (model.evaluate(t1, t2) - target).abs();
    }
    let held_out_mae = if held_out_idx.is_empty() {
        0.0
    } else {
        abs_err_sum / held_out_idx.len() as f64
    };

    Ok(SubjectModel {
        held_out_mae,
        ..model
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub name: String,
    pub roll_number: i64,
    pub class_name: String,
    /// Subject -> predicted late-term average, clamped to [0, MAX_MARK].
    pub predicted_scores: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_overall_percentage: Option<f64>,
}

/// Apply every trained model to every student. The projected overall
/// percentage counts the actual early-term marks plus twice the predicted
/// late average over the four-exam maximum, across modeled subjects only;
/// a student with no modeled subject gets no percentage at all.
pub fn generate(table: &CleanTable, registry: &ModelRegistry) -> Vec<Prediction> {
    if !registry.is_trained() {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let mut predicted_scores = BTreeMap::new();
        let mut projected_total = 0.0;
        let mut modeled_subjects = 0usize;

        for model in registry.models() {
            let t1_key = MarkKey::new(model.subject.clone(), ExamType::T1);
            let t2_key = MarkKey::new(model.subject.clone(), ExamType::T2);
            if !table.has_column(&t1_key) || !table.has_column(&t2_key) {
                continue;
            }
            let t1 = row.marks.get(&t1_key).copied().unwrap_or(0.0);
            let t2 = row.marks.get(&t2_key).copied().unwrap_or(0.0);
            let predicted = clamp_mark(model.evaluate(t1, t2));
            predicted_scores.insert(model.subject.clone(), predicted);
            projected_total += t1 + t2 + 2.0 * predicted;
            modeled_subjects += 1;
        }

        let predicted_overall_percentage = if modeled_subjects > 0 {
            let possible = modeled_subjects as f64 * 4.0 * MAX_MARK;
            Some(projected_total * 100.0 / possible)
        } else {
            None
        };

        out.push(Prediction {
            name: row.name.clone(),
            roll_number: row.roll_number,
            class_name: row.class_name.clone(),
            predicted_scores,
            predicted_overall_percentage,
        });
    }
    out
}
