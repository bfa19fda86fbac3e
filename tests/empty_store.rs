
use serde_json::json;
use test_support::{request_ok, rows_of, select_workspace, spawn_sidecar};

#[test]
fn every_surface_degrades_to_empty_on_an_empty_store() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, "examlens-empty");

    let performance = request_ok(&mut stdin, &mut reader, "1", "performance.get", json!({}));
    assert!(rows_of(&performance).is_empty());

    let insights = request_ok(&mut stdin, &mut reader, "2", "subjects.insights", json!({}));
    assert_eq!(
        insights.get("insights").and_then(|v| v.as_object()).map(|m| m.len()),
        Some(0)
    );

    let at_risk = request_ok(&mut stdin, &mut reader, "3", "students.atRisk", json!({}));
    assert!(rows_of(&at_risk).is_empty());

    let classes = request_ok(&mut stdin, &mut reader, "4", "classes.performance", json!({}));
    assert!(rows_of(&classes).is_empty());

    let teachers = request_ok(&mut stdin, &mut reader, "5", "teachers.performance", json!({}));
    assert!(rows_of(&teachers).is_empty());

    // Training on nothing is an empty outcome, not a failure.
    let trained = request_ok(&mut stdin, &mut reader, "6", "predictions.train", json!({}));
    assert!(trained.get("trainedAt").map(|v| v.is_null()).unwrap_or(false));
    assert!(trained.get("models").and_then(|v| v.as_array()).unwrap().is_empty());
}
