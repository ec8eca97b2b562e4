use crate::ipc::error::{err, no_workspace, ok, validation_err};
use crate::ipc::helpers::{contains_ci, filter_param};
use crate::ipc::types::{AppState, Request};
use crate::validation::Form;
use chrono::{Datelike, Local, NaiveTime};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use uuid::Uuid;

pub const WEEKDAYS: &[&str] = &[
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
];
pub const CLASS_STATUSES: &[&str] = &["Active", "Inactive", "Suspended"];
pub const SEMESTERS: &[&str] = &["1", "2"];
const GRADES: &[&str] = super::students::GRADES;

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub day: &'static str,
    pub day_index: usize,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

fn short_day(day: &str) -> String {
    let mut chars = day.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars.take(2)).collect(),
        None => String::new(),
    }
}

fn title_case(day: &str) -> String {
    let mut chars = day.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn entry_text<'v>(entry: &'v serde_json::Value, key: &str) -> &'v str {
    entry.get(key).and_then(|v| v.as_str()).unwrap_or("").trim()
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()
}

/// Reads the weekday map of a class form. Every enabled day needs a start
/// and an end, and the end must come after the start.
pub fn parse_schedule(form: &mut Form<'_>, schedule: Option<&serde_json::Value>) -> Vec<Session> {
    let mut sessions = Vec::new();
    let Some(days) = schedule.and_then(|v| v.as_object()) else {
        form.reject("schedule", "At least one day must be scheduled");
        return sessions;
    };

    for (day_index, day) in WEEKDAYS.iter().enumerate() {
        let Some(entry) = days.get(*day) else {
            continue;
        };
        let enabled = entry.get("enabled").and_then(|v| v.as_bool()).unwrap_or(false);
        if !enabled {
            continue;
        }
        let (start_raw, end_raw) = (entry_text(entry, "startTime"), entry_text(entry, "endTime"));

        let start = if start_raw.is_empty() {
            form.reject(&format!("{day}Start"), "Start time is required");
            None
        } else {
            let t = parse_time(start_raw);
            if t.is_none() {
                form.reject(&format!("{day}Start"), "Use the HH:MM time format");
            }
            t
        };
        let end = if end_raw.is_empty() {
            form.reject(&format!("{day}End"), "End time is required");
            None
        } else {
            let t = parse_time(end_raw);
            if t.is_none() {
                form.reject(&format!("{day}End"), "Use the HH:MM time format");
            }
            t
        };

        match (start, end) {
            (Some(start), Some(end)) if start >= end => {
                form.reject(&format!("{day}Time"), "End time must be after start time");
            }
            (Some(start), Some(end)) => sessions.push(Session {
                day: *day,
                day_index,
                start,
                end,
            }),
            _ => {}
        }
    }

    if let Some(unknown) = days.keys().find(|k| !WEEKDAYS.contains(&k.as_str())) {
        form.reject("schedule", format!("Unknown day: {unknown}"));
    }
    let any_enabled = WEEKDAYS.iter().filter_map(|day| days.get(*day)).any(|d| {
        d.get("enabled").and_then(|v| v.as_bool()).unwrap_or(false)
    });
    if !any_enabled {
        form.reject("schedule", "At least one day must be scheduled");
    }
    sessions
}

/// `Mon, Wed - 09:00`; days that start at different times get their own group.
pub fn schedule_label(sessions: &[(String, String)]) -> String {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for (day, start) in sessions {
        match groups.iter_mut().find(|(s, _)| s == start) {
            Some((_, days)) => days.push(short_day(day)),
            None => groups.push((start.clone(), vec![short_day(day)])),
        }
    }
    groups
        .into_iter()
        .map(|(start, days)| format!("{} - {}", days.join(", "), start))
        .collect::<Vec<_>>()
        .join("; ")
}

fn sessions_by_class(conn: &Connection) -> rusqlite::Result<BTreeMap<String, Vec<(String, String, String)>>> {
    let mut stmt = conn.prepare(
        "SELECT class_id, day, start_time, end_time
         FROM class_sessions
         ORDER BY day_index",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    let mut out: BTreeMap<String, Vec<(String, String, String)>> = BTreeMap::new();
    for (class_id, day, start, end) in rows {
        out.entry(class_id).or_default().push((day, start, end));
    }
    Ok(out)
}

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "classes": [] }));
    };

    let search = filter_param(&req.params, "search");
    let status = filter_param(&req.params, "status");

    let sessions = match sessions_by_class(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mut stmt = match conn.prepare(
        "SELECT id, name, code, teacher, grade, subject, max_students, enrolled,
                room, description, academic_year, semester, status
         FROM classes
         ORDER BY code",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let days = sessions.get(&id).cloned().unwrap_or_default();
            let label = schedule_label(
                &days
                    .iter()
                    .map(|(d, s, _)| (d.clone(), s.clone()))
                    .collect::<Vec<_>>(),
            );
            let details: serde_json::Map<String, serde_json::Value> = days
                .iter()
                .map(|(d, s, e)| (d.clone(), json!({ "startTime": s, "endTime": e })))
                .collect();
            Ok(json!({
                "id": id,
                "name": row.get::<_, String>(1)?,
                "code": row.get::<_, String>(2)?,
                "teacher": row.get::<_, String>(3)?,
                "grade": row.get::<_, String>(4)?,
                "subject": row.get::<_, String>(5)?,
                "maxStudents": row.get::<_, i64>(6)?,
                "students": row.get::<_, i64>(7)?,
                "room": row.get::<_, String>(8)?,
                "description": row.get::<_, Option<String>>(9)?,
                "academicYear": row.get::<_, String>(10)?,
                "semester": row.get::<_, String>(11)?,
                "status": row.get::<_, String>(12)?,
                "schedule": label,
                "scheduleDetails": details
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    let rows = match rows {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let text = |c: &serde_json::Value, k: &str| c[k].as_str().unwrap_or("").to_string();
    let classes: Vec<serde_json::Value> = rows
        .into_iter()
        .filter(|c| {
            let matches_search = search.as_deref().map_or(true, |q| {
                contains_ci(&text(c, "name"), q)
                    || contains_ci(&text(c, "code"), q)
                    || contains_ci(&text(c, "teacher"), q)
            });
            matches_search && status.as_deref().map_or(true, |s| text(c, "status") == s)
        })
        .collect();

    ok(&req.id, json!({ "classes": classes }))
}

fn handle_classes_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };

    let mut form = Form::new(&req.params);
    let name = form.required("name", "Class name is required");
    let code = form.required("code", "Class code is required");
    let teacher = form.required("teacher", "Teacher is required");
    let grade = form.one_of("grade", GRADES, "Grade is required");
    let subject = form.required("subject", "Subject is required");
    let max_students = form.positive_integer("maxStudents", "Valid maximum students is required");
    let room = form.required("room", "Room is required");
    let description = form.optional("description");
    let default_year = Local::now().year().to_string();
    let academic_year = form.optional("academicYear").unwrap_or(default_year);
    let semester = form.one_of_or("semester", SEMESTERS, "1");
    let status = form.one_of_or("status", CLASS_STATUSES, "Active");
    let sessions = parse_schedule(&mut form, req.params.get("schedule"));

    if !code.is_empty() {
        let taken: Result<Option<i64>, _> = conn
            .query_row("SELECT 1 FROM classes WHERE code = ?", [&code], |r| r.get(0))
            .optional();
        match taken {
            Ok(Some(_)) => form.reject("code", "Class code already exists"),
            Ok(None) => {}
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        }
    }
    if let Err(e) = form.finish() {
        return validation_err(&req.id, e);
    }
    let Some(max_students) = max_students else {
        return err(&req.id, "bad_params", "maxStudents is required", None);
    };

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };

    let class_id = Uuid::new_v4().to_string();
    if let Err(e) = tx.execute(
        "INSERT INTO classes(
           id, name, code, teacher, grade, subject, max_students, enrolled,
           room, description, academic_year, semester, status, created_at
         ) VALUES(?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?,
                  strftime('%Y-%m-%dT%H:%M:%SZ','now'))",
        rusqlite::params![
            &class_id,
            &name,
            &code,
            &teacher,
            &grade,
            &subject,
            max_students,
            &room,
            description.as_deref(),
            &academic_year,
            &semester,
            &status,
        ],
    ) {
        let _ = tx.rollback();
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "classes" })),
        );
    }

    for s in &sessions {
        if let Err(e) = tx.execute(
            "INSERT INTO class_sessions(class_id, day, day_index, start_time, end_time)
             VALUES(?, ?, ?, ?, ?)",
            rusqlite::params![
                &class_id,
                s.day,
                s.day_index as i64,
                s.start.format("%H:%M").to_string(),
                s.end.format("%H:%M").to_string(),
            ],
        ) {
            let _ = tx.rollback();
            return err(
                &req.id,
                "db_insert_failed",
                e.to_string(),
                Some(json!({ "table": "class_sessions" })),
            );
        }
    }

    if let Err(e) = tx.commit() {
        return err(&req.id, "db_commit_failed", e.to_string(), None);
    }

    let label = schedule_label(
        &sessions
            .iter()
            .map(|s| (s.day.to_string(), s.start.format("%H:%M").to_string()))
            .collect::<Vec<_>>(),
    );
    tracing::info!(code = %code, days = sessions.len(), "class created");
    ok(
        &req.id,
        json!({
            "classId": class_id,
            "code": code,
            "schedule": label,
            "maxStudents": max_students,
            "students": 0,
            "status": status
        }),
    )
}

fn handle_classes_schedule(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "days": [] }));
    };

    let mut stmt = match conn.prepare(
        "SELECT s.day_index, c.name, c.code, c.room, s.start_time, s.end_time
         FROM class_sessions s
         JOIN classes c ON c.id = s.class_id
         WHERE s.day_index < 5
         ORDER BY s.day_index, s.start_time, c.code",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, i64>(0)?,
                json!({
                    "name": r.get::<_, String>(1)?,
                    "code": r.get::<_, String>(2)?,
                    "room": r.get::<_, String>(3)?,
                    "startTime": r.get::<_, String>(4)?,
                    "endTime": r.get::<_, String>(5)?
                }),
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    let rows = match rows {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let days: Vec<serde_json::Value> = WEEKDAYS[..5]
        .iter()
        .enumerate()
        .map(|(idx, day)| {
            let classes: Vec<&serde_json::Value> = rows
                .iter()
                .filter(|(d, _)| *d == idx as i64)
                .map(|(_, c)| c)
                .collect();
            json!({ "day": title_case(day), "classes": classes })
        })
        .collect();

    ok(&req.id, json!({ "days": days }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        "classes.create" => Some(handle_classes_create(state, req)),
        "classes.schedule" => Some(handle_classes_schedule(state, req)),
        _ => None,
    }
}
