mod test_support;

use serde_json::json;
use test_support::{temp_dir, Sidecar};

fn student(first: &str, last: &str, grade: &str, section: &str) -> serde_json::Value {
    json!({
        "firstName": first,
        "lastName": last,
        "email": format!("{}@student.school.edu", first.to_lowercase()),
        "phone": "+15550100",
        "dateOfBirth": "2009-03-14",
        "grade": grade,
        "section": section,
        "parentName": "Pat Parent",
        "parentPhone": "+15550200"
    })
}

fn field_errors(error: &serde_json::Value) -> Vec<String> {
    let mut keys: Vec<String> = error["details"]["fieldErrors"]
        .as_object()
        .expect("fieldErrors")
        .keys()
        .cloned()
        .collect();
    keys.sort();
    keys
}

#[test]
fn students_get_sequential_numbers_and_filter() {
    let ws = temp_dir("eduadmin-students");
    let mut sc = Sidecar::with_workspace(ws.path(), "denied");

    let a = sc.request_ok("1", "students.create", student("Alice", "Johnson", "10th", "A"));
    assert_eq!(a["studentNo"], "ST001");
    assert_eq!(a["className"], "10th A");
    assert_eq!(a["status"], "Active");
    let b = sc.request_ok("2", "students.create", student("Bob", "Smith", "11th", "B"));
    assert_eq!(b["studentNo"], "ST002");

    let all = sc.request_ok("3", "students.list", json!({}));
    assert_eq!(all["students"].as_array().unwrap().len(), 2);

    let by_search = sc.request_ok("4", "students.list", json!({ "search": "st002" }));
    let names: Vec<&str> = by_search["students"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Bob Smith"]);

    let by_grade = sc.request_ok("5", "students.list", json!({ "grade": "10th", "section": "all" }));
    assert_eq!(by_grade["students"].as_array().unwrap().len(), 1);
    sc.shutdown();
}

#[test]
fn student_form_reports_every_field() {
    let ws = temp_dir("eduadmin-students-invalid");
    let mut sc = Sidecar::with_workspace(ws.path(), "denied");

    let error = sc.request_err(
        "1",
        "students.create",
        json!({ "firstName": "Zed", "email": "nope", "grade": "13th" }),
    );
    assert_eq!(error["code"], "validation_failed");
    assert_eq!(
        field_errors(&error),
        vec![
            "dateOfBirth",
            "email",
            "grade",
            "lastName",
            "parentName",
            "parentPhone",
            "phone",
            "section"
        ]
    );
    assert_eq!(
        error["details"]["fieldErrors"]["email"],
        "Please enter a valid email"
    );
    sc.shutdown();
}

#[test]
fn teachers_validate_department_and_salary() {
    let ws = temp_dir("eduadmin-teachers");
    let mut sc = Sidecar::with_workspace(ws.path(), "denied");

    let mut form = json!({
        "firstName": "Sarah",
        "lastName": "Wilson",
        "email": "sarah@school.edu",
        "phone": "+1234567890",
        "dateOfBirth": "1985-05-01",
        "department": "Mathematics",
        "subject": "Advanced Mathematics",
        "qualification": "PhD",
        "experience": "8 years",
        "salary": "65000"
    });
    let created = sc.request_ok("1", "teachers.create", form.clone());
    assert_eq!(created["contractType"], "Full-time");

    form["department"] = json!("Astrology");
    form["salary"] = json!(0);
    let error = sc.request_err("2", "teachers.create", form);
    assert_eq!(field_errors(&error), vec!["department", "salary"]);

    let listed = sc.request_ok("3", "teachers.list", json!({ "search": "advanced" }));
    assert_eq!(listed["teachers"].as_array().unwrap().len(), 1);
    let listed = sc.request_ok("4", "teachers.list", json!({ "department": "Science" }));
    assert_eq!(listed["teachers"], json!([]));
    sc.shutdown();
}

#[test]
fn classes_check_schedule_and_code() {
    let ws = temp_dir("eduadmin-classes");
    let mut sc = Sidecar::with_workspace(ws.path(), "denied");

    let form = json!({
        "name": "Advanced Mathematics",
        "code": "MATH-401",
        "teacher": "Dr. Sarah Wilson",
        "grade": "10th",
        "subject": "Mathematics",
        "maxStudents": 30,
        "room": "Room 201",
        "schedule": {
            "monday": { "enabled": true, "startTime": "09:00", "endTime": "10:00" },
            "wednesday": { "enabled": true, "startTime": "09:00", "endTime": "10:00" }
        }
    });
    let created = sc.request_ok("1", "classes.create", form.clone());
    assert_eq!(created["schedule"], "Mon, Wed - 09:00");
    assert_eq!(created["students"], 0);

    let dup = sc.request_err("2", "classes.create", form);
    assert_eq!(dup["details"]["fieldErrors"]["code"], "Class code already exists");

    let bad = sc.request_err(
        "3",
        "classes.create",
        json!({
            "name": "Physics",
            "code": "PHYS-301",
            "teacher": "Prof. Michael Chen",
            "grade": "11th",
            "subject": "Physics",
            "maxStudents": 24,
            "room": "Lab 105",
            "schedule": {
                "tuesday": { "enabled": true, "startTime": "14:00", "endTime": "13:00" },
                "thursday": { "enabled": true, "startTime": "", "endTime": "15:00" }
            }
        }),
    );
    assert_eq!(field_errors(&bad), vec!["thursdayStart", "tuesdayTime"]);

    let overview = sc.request_ok("4", "classes.schedule", json!({}));
    let days = overview["days"].as_array().unwrap();
    assert_eq!(days.len(), 5);
    assert_eq!(days[0]["day"], "Monday");
    assert_eq!(days[0]["classes"][0]["code"], "MATH-401");
    assert_eq!(days[1]["classes"], json!([]));
    sc.shutdown();
}

#[test]
fn fees_track_paid_pending_and_overdue() {
    let ws = temp_dir("eduadmin-fees");
    let mut sc = Sidecar::with_workspace(ws.path(), "denied");
    sc.request_ok("0", "students.create", student("Alice", "Johnson", "10th", "A"));

    let paid = sc.request_ok(
        "1",
        "fees.create",
        json!({
            "studentId": "ST001",
            "feeType": "Tuition Fee",
            "amount": 15000,
            "dueDate": "2099-01-15",
            "isPaid": true,
            "paymentMethod": "Online",
            "paidDate": "2099-01-10"
        }),
    );
    assert_eq!(paid["status"], "Paid");
    assert!(paid["receiptNo"].as_str().unwrap().starts_with("RCP"));

    sc.request_ok(
        "2",
        "fees.create",
        json!({ "studentId": "ST001", "feeType": "Library Fee", "amount": "2000", "dueDate": "2000-01-05" }),
    );
    sc.request_ok(
        "3",
        "fees.create",
        json!({ "studentId": "ST001", "feeType": "Sports Fee", "amount": 500, "dueDate": "2099-03-01" }),
    );

    let missing = sc.request_err(
        "4",
        "fees.create",
        json!({ "studentId": "ST999", "feeType": "Tuition Fee", "amount": 10, "dueDate": "2099-01-01", "isPaid": true }),
    );
    assert_eq!(
        field_errors(&missing),
        vec!["paidDate", "paymentMethod", "studentId"]
    );

    let stats = sc.request_ok("5", "fees.stats", json!({}));
    assert_eq!(stats["count"], 3);
    assert_eq!(stats["total"], 17500.0);
    assert_eq!(stats["paid"], 15000.0);
    assert_eq!(stats["pending"], 500.0);
    assert_eq!(stats["overdue"], 2000.0);

    let overdue = sc.request_ok("6", "fees.list", json!({ "status": "Overdue" }));
    assert_eq!(overdue["records"][0]["feeType"], "Library Fee");
    let january = sc.request_ok("7", "fees.list", json!({ "month": "January" }));
    assert_eq!(january["records"].as_array().unwrap().len(), 2);
    let search = sc.request_ok("8", "fees.list", json!({ "search": "alice" }));
    assert_eq!(search["records"].as_array().unwrap().len(), 3);
    sc.shutdown();
}

#[test]
fn holidays_stats_and_upcoming() {
    let ws = temp_dir("eduadmin-holidays");
    let mut sc = Sidecar::with_workspace(ws.path(), "denied");

    for (i, (name, date, status, recurring)) in [
        ("Holi", "2024-03-25", "Confirmed", true),
        ("Christmas", "2024-12-25", "Confirmed", true),
        ("Diwali", "2024-11-01", "Confirmed", true),
        ("Training Day", "2024-04-10", "Pending", false),
    ]
    .iter()
    .enumerate()
    {
        let created = sc.request_ok(
            &format!("h{i}"),
            "holidays.create",
            json!({
                "name": name,
                "date": date,
                "type": "Other",
                "status": status,
                "isRecurring": recurring
            }),
        );
        assert_eq!(created["date"], *date);
    }

    let error = sc.request_err("x", "holidays.create", json!({ "name": "", "type": "Party" }));
    assert_eq!(field_errors(&error), vec!["date", "name", "type"]);

    let stats = sc.request_ok("s", "holidays.stats", json!({}));
    assert_eq!(stats["total"], 4);
    assert_eq!(stats["confirmed"], 3);
    assert_eq!(stats["pending"], 1);
    assert_eq!(stats["recurring"], 3);

    let upcoming = sc.request_ok("u", "holidays.upcoming", json!({ "today": "2024-04-10" }));
    let names: Vec<&str> = upcoming["holidays"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Diwali", "Christmas"]);
    assert_eq!(upcoming["holidays"][1]["displayDate"], "Dec 25, 2024");
    assert_eq!(upcoming["holidays"][1]["duration"], "1 day");

    let march = sc.request_ok("m", "holidays.list", json!({ "month": "March" }));
    assert_eq!(march["holidays"][0]["name"], "Holi");
    sc.shutdown();
}

#[test]
fn students_list_in_numeric_order_past_st999() {
    let ws = temp_dir("eduadmin-students-order");
    let mut sc = Sidecar::with_workspace(ws.path(), "denied");
    sc.request_ok("1", "students.create", student("Alice", "Johnson", "10th", "A"));
    sc.request_ok("2", "students.create", student("Bob", "Smith", "11th", "B"));
    sc.shutdown();

    let conn = rusqlite::Connection::open(ws.path().join("eduadmin.sqlite3")).expect("open db");
    conn.execute("UPDATE students SET student_no = 'ST1000' WHERE student_no = 'ST001'", [])
        .expect("renumber alice");
    conn.execute("UPDATE students SET student_no = 'ST999' WHERE student_no = 'ST002'", [])
        .expect("renumber bob");
    drop(conn);

    let mut sc = Sidecar::with_workspace(ws.path(), "denied");
    let listed = sc.request_ok("1", "students.list", json!({}));
    let numbers: Vec<&str> = listed["students"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["studentNo"].as_str().unwrap())
        .collect();
    assert_eq!(numbers, vec!["ST999", "ST1000"]);

    let next = sc.request_ok("2", "students.create", student("Cara", "Lane", "9th", "C"));
    assert_eq!(next["studentNo"], "ST1001");
    sc.shutdown();
}

#[test]
fn classes_reject_weekend_only_schedules_and_fractional_capacity() {
    let ws = temp_dir("eduadmin-classes-weekend");
    let mut sc = Sidecar::with_workspace(ws.path(), "denied");

    let mut form = json!({
        "name": "Weekend Chess",
        "code": "CHESS-101",
        "teacher": "Mr. David Kim",
        "grade": "9th",
        "subject": "Chess",
        "maxStudents": 0.5,
        "room": "Room 12",
        "schedule": {
            "sunday": { "enabled": true, "startTime": "09:00", "endTime": "10:00" }
        }
    });
    let error = sc.request_err("1", "classes.create", form.clone());
    assert_eq!(field_errors(&error), vec!["maxStudents", "schedule"]);
    assert_eq!(error["details"]["fieldErrors"]["schedule"], "Unknown day: sunday");

    form["maxStudents"] = json!("18");
    form["schedule"] = json!({
        "saturday": { "enabled": true, "startTime": "09:00", "endTime": "10:00" }
    });
    let created = sc.request_ok("2", "classes.create", form);
    assert_eq!(created["schedule"], "Sat - 09:00");
    assert_eq!(created["maxStudents"], 18);

    let listed = sc.request_ok("3", "classes.list", json!({}));
    assert_eq!(listed["classes"].as_array().unwrap().len(), 1);
    sc.shutdown();
}
