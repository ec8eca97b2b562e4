use crate::ipc::error::{err, no_workspace, ok, validation_err};
use crate::ipc::helpers::{contains_ci, filter_param, today};
use crate::ipc::types::{AppState, Request};
use crate::validation::{Form, DATE_FORMAT};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

pub const GRADES: &[&str] = &["9th", "10th", "11th", "12th"];
pub const SECTIONS: &[&str] = &["A", "B", "C", "D"];

/// Next free `ST###` number; numbering never reuses a gap.
pub fn next_student_no(conn: &Connection) -> anyhow::Result<String> {
    let mut stmt = conn.prepare("SELECT student_no FROM students")?;
    let max = stmt
        .query_map([], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?
        .iter()
        .filter_map(|s| s.strip_prefix("ST").and_then(|n| n.parse::<u32>().ok()))
        .max()
        .unwrap_or(0);
    Ok(format!("ST{:03}", max + 1))
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "students": [] }));
    };

    let search = filter_param(&req.params, "search");
    let grade = filter_param(&req.params, "grade");
    let section = filter_param(&req.params, "section");
    let status = filter_param(&req.params, "status");

    let mut stmt = match conn.prepare(
        "SELECT id, student_no, first_name, last_name, email, phone, grade, section,
                parent_name, parent_phone, enrollment_date, status
         FROM students
         ORDER BY CAST(substr(student_no, 3) AS INTEGER), student_no",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let student_no: String = row.get(1)?;
            let first_name: String = row.get(2)?;
            let last_name: String = row.get(3)?;
            let email: String = row.get(4)?;
            let phone: String = row.get(5)?;
            let grade: String = row.get(6)?;
            let section: String = row.get(7)?;
            let parent_name: String = row.get(8)?;
            let parent_phone: String = row.get(9)?;
            let enrollment_date: String = row.get(10)?;
            let status: String = row.get(11)?;
            Ok((
                student_no.clone(),
                format!("{} {}", first_name, last_name),
                email.clone(),
                grade.clone(),
                section.clone(),
                status.clone(),
                json!({
                    "id": id,
                    "studentNo": student_no,
                    "firstName": first_name,
                    "lastName": last_name,
                    "name": format!("{} {}", first_name, last_name),
                    "email": email,
                    "phone": phone,
                    "grade": grade,
                    "section": section,
                    "className": format!("{} {}", grade, section),
                    "parentName": parent_name,
                    "parentPhone": parent_phone,
                    "enrollmentDate": enrollment_date,
                    "status": status
                }),
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    let rows = match rows {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let total = rows.len();
    let students: Vec<serde_json::Value> = rows
        .into_iter()
        .filter(|(no, name, email, g, s, st, _)| {
            let matches_search = search.as_deref().map_or(true, |q| {
                contains_ci(name, q) || contains_ci(email, q) || contains_ci(no, q)
            });
            matches_search
                && grade.as_deref().map_or(true, |v| g == v)
                && section.as_deref().map_or(true, |v| s == v)
                && status.as_deref().map_or(true, |v| st == v)
        })
        .map(|(_, _, _, _, _, _, v)| v)
        .collect();

    ok(&req.id, json!({ "students": students, "total": total }))
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };

    let mut form = Form::new(&req.params);
    let first_name = form.required("firstName", "First name is required");
    let last_name = form.required("lastName", "Last name is required");
    let email = form.email("email", "Email is required");
    let phone = form.required("phone", "Phone number is required");
    let date_of_birth = form.date("dateOfBirth", "Date of birth is required");
    let grade = form.one_of("grade", GRADES, "Grade is required");
    let section = form.one_of("section", SECTIONS, "Class is required");
    let parent_name = form.required("parentName", "Parent name is required");
    let parent_phone = form.required("parentPhone", "Parent phone is required");
    let parent_email = form.optional_email("parentEmail");
    let enrollment_date = form.optional_date("enrollmentDate");
    let address = form.optional("address");
    let emergency_contact = form.optional("emergencyContact");
    let emergency_phone = form.optional("emergencyPhone");
    let medical_info = form.optional("medicalInfo");
    if let Err(e) = form.finish() {
        return validation_err(&req.id, e);
    }
    let Some(date_of_birth) = date_of_birth else {
        return err(&req.id, "bad_params", "dateOfBirth is required", None);
    };
    let enrollment_date = enrollment_date.unwrap_or_else(today);

    let student_no = match next_student_no(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let student_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO students(
           id, student_no, first_name, last_name, email, phone, date_of_birth,
           grade, section, address, parent_name, parent_phone, parent_email,
           emergency_contact, emergency_phone, medical_info, enrollment_date,
           status, created_at
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'Active',
                  strftime('%Y-%m-%dT%H:%M:%SZ','now'))",
        rusqlite::params![
            &student_id,
            &student_no,
            &first_name,
            &last_name,
            &email,
            &phone,
            date_of_birth.format(DATE_FORMAT).to_string(),
            &grade,
            &section,
            address.as_deref(),
            &parent_name,
            &parent_phone,
            parent_email.as_deref(),
            emergency_contact.as_deref(),
            emergency_phone.as_deref(),
            medical_info.as_deref(),
            enrollment_date.format(DATE_FORMAT).to_string(),
        ],
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "students" })),
        );
    }

    tracing::info!(student_no = %student_no, "student enrolled");
    ok(
        &req.id,
        json!({
            "studentId": student_id,
            "studentNo": student_no,
            "name": format!("{} {}", first_name, last_name),
            "className": format!("{} {}", grade, section),
            "status": "Active"
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        _ => None,
    }
}
