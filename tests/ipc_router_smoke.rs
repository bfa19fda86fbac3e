
use serde_json::json;
use test_support::{request_err, request_ok, select_workspace, spawn_sidecar};

#[test]
fn health_reports_version_and_workspace() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health.get("version").and_then(|v| v.as_str()).is_some());
    assert!(health.get("workspacePath").map(|v| v.is_null()).unwrap_or(false));
    assert_eq!(
        health.get("modelsTrained").and_then(|v| v.as_bool()),
        Some(false)
    );

    let workspace = select_workspace(&mut stdin, &mut reader, "examlens-smoke");
    let health = request_ok(&mut stdin, &mut reader, "2", "health", json!({}));
    assert_eq!(
        health.get("workspacePath").and_then(|v| v.as_str()),
        Some(workspace.to_string_lossy().as_ref())
    );
}

#[test]
fn unknown_method_is_not_implemented() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let error = request_err(&mut stdin, &mut reader, "1", "grades.export", json!({}));
    assert_eq!(error.get("code").and_then(|v| v.as_str()), Some("not_implemented"));
}

#[test]
fn analytics_methods_require_a_workspace() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    for (i, method) in [
        "performance.get",
        "subjects.insights",
        "students.atRisk",
        "classes.performance",
        "teachers.performance",
        "predictions.train",
        "roster.import",
    ]
    .iter()
    .enumerate()
    {
        let error = request_err(&mut stdin, &mut reader, &i.to_string(), method, json!({}));
        assert_eq!(
            error.get("code").and_then(|v| v.as_str()),
            Some("no_workspace"),
            "method {method}"
        );
    }
}

#[test]
fn workspace_select_requires_path() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let error = request_err(&mut stdin, &mut reader, "1", "workspace.select", json!({}));
    assert_eq!(error.get("code").and_then(|v| v.as_str()), Some("bad_params"));
}
