use crate::ipc::error::{err, no_workspace, ok, validation_err};
use crate::ipc::helpers::{contains_ci, filter_param, today};
use crate::ipc::types::{AppState, Request};
use crate::validation::{Form, DATE_FORMAT};
use serde_json::json;
use uuid::Uuid;

pub const DEPARTMENTS: &[&str] = &[
    "Mathematics",
    "Science",
    "English",
    "History",
    "Arts",
    "Physical Education",
    "Computer Science",
    "Languages",
    "Social Studies",
    "Music",
    "Drama",
    "Economics",
];

pub const CONTRACT_TYPES: &[&str] = &["Full-time", "Part-time", "Contract", "Visiting"];

fn handle_teachers_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "teachers": [] }));
    };

    let search = filter_param(&req.params, "search");
    let department = filter_param(&req.params, "department");

    let mut stmt = match conn.prepare(
        "SELECT id, first_name, last_name, email, phone, department, subject,
                qualification, experience, joining_date, salary, contract_type, status
         FROM teachers
         ORDER BY last_name, first_name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([], |row| {
            let first_name: String = row.get(1)?;
            let last_name: String = row.get(2)?;
            Ok(json!({
                "id": row.get::<_, String>(0)?,
                "firstName": first_name,
                "lastName": last_name,
                "name": format!("{} {}", first_name, last_name),
                "email": row.get::<_, String>(3)?,
                "phone": row.get::<_, String>(4)?,
                "department": row.get::<_, String>(5)?,
                "subject": row.get::<_, String>(6)?,
                "qualification": row.get::<_, Option<String>>(7)?,
                "experience": row.get::<_, String>(8)?,
                "joiningDate": row.get::<_, Option<String>>(9)?,
                "salary": row.get::<_, Option<f64>>(10)?,
                "contractType": row.get::<_, String>(11)?,
                "status": row.get::<_, String>(12)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    let rows = match rows {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let field = |t: &serde_json::Value, k: &str| t[k].as_str().unwrap_or("").to_string();
    let total = rows.len();
    let teachers: Vec<serde_json::Value> = rows
        .into_iter()
        .filter(|t| {
            let matches_search = search.as_deref().map_or(true, |q| {
                contains_ci(&field(t, "name"), q)
                    || contains_ci(&field(t, "email"), q)
                    || contains_ci(&field(t, "subject"), q)
            });
            matches_search
                && department
                    .as_deref()
                    .map_or(true, |d| field(t, "department") == d)
        })
        .collect();

    ok(&req.id, json!({ "teachers": teachers, "total": total }))
}

fn handle_teachers_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };

    let mut form = Form::new(&req.params);
    let first_name = form.required("firstName", "First name is required");
    let last_name = form.required("lastName", "Last name is required");
    let email = form.email("email", "Email is required");
    let phone = form.required("phone", "Phone number is required");
    let date_of_birth = form.date("dateOfBirth", "Date of birth is required");
    let department = form.one_of("department", DEPARTMENTS, "Department is required");
    let subject = form.required("subject", "Subject is required");
    let qualification = form.required("qualification", "Qualification is required");
    let experience = form.required("experience", "Experience is required");
    let salary = form.positive_number("salary", "Salary is required");
    let contract_type = form.one_of_or("contractType", CONTRACT_TYPES, "Full-time");
    let joining_date = form.optional_date("joiningDate");
    let address = form.optional("address");
    let emergency_contact = form.optional("emergencyContact");
    let emergency_phone = form.optional("emergencyPhone");
    let specializations = form.optional("specializations");
    let bio = form.optional("bio");
    if let Err(e) = form.finish() {
        return validation_err(&req.id, e);
    }
    let (Some(date_of_birth), Some(salary)) = (date_of_birth, salary) else {
        return err(&req.id, "bad_params", "dateOfBirth and salary are required", None);
    };
    let joining_date = joining_date.unwrap_or_else(today);

    let teacher_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO teachers(
           id, first_name, last_name, email, phone, date_of_birth, department,
           subject, qualification, experience, joining_date, address,
           emergency_contact, emergency_phone, salary, contract_type,
           specializations, bio, status, created_at
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'Active',
                  strftime('%Y-%m-%dT%H:%M:%SZ','now'))",
        rusqlite::params![
            &teacher_id,
            &first_name,
            &last_name,
            &email,
            &phone,
            date_of_birth.format(DATE_FORMAT).to_string(),
            &department,
            &subject,
            &qualification,
            &experience,
            joining_date.format(DATE_FORMAT).to_string(),
            address.as_deref(),
            emergency_contact.as_deref(),
            emergency_phone.as_deref(),
            salary,
            &contract_type,
            specializations.as_deref(),
            bio.as_deref(),
        ],
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "teachers" })),
        );
    }

    tracing::info!(department = %department, "teacher added");
    ok(
        &req.id,
        json!({
            "teacherId": teacher_id,
            "name": format!("{} {}", first_name, last_name),
            "department": department,
            "contractType": contract_type,
            "status": "Active"
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "teachers.list" => Some(handle_teachers_list(state, req)),
        "teachers.create" => Some(handle_teachers_create(state, req)),
        _ => None,
    }
}
