
use serde_json::json;
use test_support::{
    exam, f64_field, import_roster, request_ok, rows_of, select_workspace, spawn_sidecar,
    str_field, student,
};

fn roster_with_teachers(students: Vec<serde_json::Value>) -> serde_json::Value {
    json!({
        "classes": [
            { "id": "class-a", "name": "A" },
            { "id": "class-b", "name": "B" }
        ],
        "subjects": [
            { "id": "sub-dm", "name": "DM" },
            { "id": "sub-fsd", "name": "FSD" }
        ],
        "teachers": [
            {
                "id": "t-hart",
                "name": "Mr. Hart",
                "teaches": [ { "subject": "sub-dm", "class": "class-a" } ]
            },
            {
                "id": "t-vale",
                "name": "Ms. Vale",
                "teaches": [ { "subject": "sub-fsd", "class": "class-a" } ]
            },
            {
                "id": "t-quinn",
                "name": "Ms. Quinn",
                "teaches": [ { "subject": "sub-dm", "class": "class-b" } ]
            }
        ],
        "students": students
    })
}

#[test]
fn class_averages_group_by_class_descending() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, "examlens-class-avg");
    import_roster(
        &mut stdin,
        &mut reader,
        roster_with_teachers(vec![
            student(
                "stu-1",
                1,
                "Alice",
                "class-a",
                vec![exam("sub-dm", "T1", json!(20.0)), exam("sub-dm", "T2", json!(10.0))],
            ),
            student("stu-2", 2, "Bob", "class-b", vec![exam("sub-dm", "T1", json!(25.0))]),
        ]),
    );

    let result = request_ok(&mut stdin, &mut reader, "1", "classes.performance", json!({}));
    let rows = rows_of(&result);
    assert_eq!(rows.len(), 2);
    assert_eq!(str_field(&rows[0], "className"), "B");
    assert_eq!(f64_field(&rows[0], "averageMarks"), 25.0);
    assert_eq!(str_field(&rows[1], "className"), "A");
    assert_eq!(f64_field(&rows[1], "averageMarks"), 15.0);
}

#[test]
fn teacher_averages_join_subject_and_class() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, "examlens-teacher-avg");
    import_roster(
        &mut stdin,
        &mut reader,
        roster_with_teachers(vec![
            student(
                "stu-1",
                1,
                "Alice",
                "class-a",
                vec![
                    exam("sub-dm", "T1", json!(20.0)),
                    exam("sub-dm", "T2", json!(10.0)),
                    // FSD exam taken by a class-a student, but Ms. Vale's
                    // average only sees FSD rows, not DM ones.
                    exam("sub-fsd", "T1", json!(6.0)),
                ],
            ),
            student("stu-2", 2, "Bob", "class-b", vec![exam("sub-dm", "T1", json!(24.0))]),
        ]),
    );

    let result = request_ok(&mut stdin, &mut reader, "1", "teachers.performance", json!({}));
    let rows = rows_of(&result);
    let avg = |name: &str| {
        rows.iter()
            .find(|r| str_field(r, "teacherName") == name)
            .map(|r| f64_field(r, "averageMarks"))
    };

    assert_eq!(avg("Mr. Hart"), Some(15.0));
    assert_eq!(avg("Ms. Quinn"), Some(24.0));
    assert_eq!(avg("Ms. Vale"), Some(6.0));
    // Descending by average.
    let averages: Vec<f64> = rows.iter().map(|r| f64_field(r, "averageMarks")).collect();
    let mut sorted = averages.clone();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
    assert_eq!(averages, sorted);
}

#[test]
fn teacher_without_matching_exams_is_omitted() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, "examlens-teacher-omit");
    import_roster(
        &mut stdin,
        &mut reader,
        roster_with_teachers(vec![student(
            "stu-1",
            1,
            "Alice",
            "class-a",
            vec![exam("sub-dm", "T1", json!(20.0))],
        )]),
    );

    let result = request_ok(&mut stdin, &mut reader, "1", "teachers.performance", json!({}));
    let rows = rows_of(&result);
    let names: Vec<String> = rows.iter().map(|r| str_field(r, "teacherName")).collect();
    // Ms. Vale teaches FSD in class A but no FSD exam exists there, and
    // Ms. Quinn's class B has no exam records at all.
    assert_eq!(names, ["Mr. Hart"]);
}
