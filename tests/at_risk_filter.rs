
use serde_json::json;
use test_support::{
    base_roster, f64_field, full_subject, import_roster, request_err, request_ok, rows_of,
    select_workspace, spawn_sidecar, str_field, student,
};

fn seed(stdin: &mut std::process::ChildStdin, reader: &mut std::io::BufReader<std::process::ChildStdout>) {
    import_roster(
        stdin,
        reader,
        base_roster(vec![
            student("stu-1", 1, "Alice", "class-a", full_subject("sub-dm", [20.0, 18.0, 22.0, 24.0])),
            student("stu-2", 2, "Bob", "class-a", full_subject("sub-dm", [10.0, 10.0, 10.0, 10.0])),
            student("stu-3", 3, "Cara", "class-b", full_subject("sub-dm", [12.0, 12.0, 12.0, 12.0])),
        ]),
    );
}

#[test]
fn default_threshold_flags_weak_students_ascending() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, "examlens-at-risk");
    seed(&mut stdin, &mut reader);

    let result = request_ok(&mut stdin, &mut reader, "1", "students.atRisk", json!({}));
    assert_eq!(result.get("threshold").and_then(|v| v.as_f64()), Some(60.0));

    let rows = rows_of(&result);
    let names: Vec<String> = rows.iter().map(|r| str_field(r, "name")).collect();
    assert_eq!(names, ["Bob", "Cara"]);
    for row in &rows {
        assert!(f64_field(row, "percentage") < 60.0);
    }
}

#[test]
fn custom_threshold_is_strict() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, "examlens-at-risk-custom");
    seed(&mut stdin, &mut reader);

    // Bob sits exactly on 40%; a strict filter leaves him out.
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.atRisk",
        json!({ "threshold": 40.0 }),
    );
    assert!(rows_of(&result).is_empty());

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.atRisk",
        json!({ "threshold": 100.0 }),
    );
    assert_eq!(rows_of(&result).len(), 3);

    // Null falls back to the default.
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.atRisk",
        json!({ "threshold": null }),
    );
    assert_eq!(result.get("threshold").and_then(|v| v.as_f64()), Some(60.0));
}

#[test]
fn non_numeric_threshold_is_rejected() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, "examlens-at-risk-bad");

    let error = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "students.atRisk",
        json!({ "threshold": "sixty" }),
    );
    assert_eq!(error.get("code").and_then(|v| v.as_str()), Some("bad_params"));
    assert_eq!(
        error.pointer("/details/threshold").and_then(|v| v.as_str()),
        Some("sixty")
    );
}
