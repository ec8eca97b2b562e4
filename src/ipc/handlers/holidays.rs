use crate::ipc::error::{err, no_workspace, ok, validation_err};
use crate::ipc::helpers::{contains_ci, display_date, filter_param, today};
use crate::ipc::types::{AppState, Request};
use crate::validation::{Form, DATE_FORMAT};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

pub const HOLIDAY_TYPES: &[&str] = &[
    "National Holiday",
    "Religious Holiday",
    "School Event",
    "Academic Break",
    "Professional Development",
    "Local Holiday",
    "Other",
];

pub const HOLIDAY_STATUSES: &[&str] = &["Confirmed", "Pending", "Cancelled"];

const UPCOMING_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Holiday {
    pub id: String,
    pub name: String,
    pub date: String,
    pub display_date: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub is_recurring: bool,
    pub status: String,
    pub location: String,
    pub duration: String,
}

pub fn load_holidays(conn: &Connection) -> anyhow::Result<Vec<Holiday>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, date, type, description, is_recurring, status, location, duration
         FROM holidays
         ORDER BY date, name",
    )?;
    let rows = stmt
        .query_map([], |r| {
            let date: String = r.get(2)?;
            Ok(Holiday {
                id: r.get(0)?,
                name: r.get(1)?,
                display_date: display_date(&date),
                date,
                kind: r.get(3)?,
                description: r.get(4)?,
                is_recurring: r.get::<_, i64>(5)? != 0,
                status: r.get(6)?,
                location: r.get(7)?,
                duration: r.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Holidays strictly after `today`, soonest first.
pub fn upcoming(holidays: &[Holiday], today: NaiveDate, limit: usize) -> Vec<Holiday> {
    let mut out: Vec<(NaiveDate, &Holiday)> = holidays
        .iter()
        .filter_map(|h| {
            NaiveDate::parse_from_str(&h.date, DATE_FORMAT)
                .ok()
                .filter(|d| *d > today)
                .map(|d| (d, h))
        })
        .collect();
    out.sort_by_key(|(d, _)| *d);
    out.into_iter().take(limit).map(|(_, h)| h.clone()).collect()
}

fn handle_holidays_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "holidays": [] }));
    };
    let search = filter_param(&req.params, "search");
    let month = filter_param(&req.params, "month");
    let kind = filter_param(&req.params, "type");

    let holidays = match load_holidays(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let holidays: Vec<Holiday> = holidays
        .into_iter()
        .filter(|h| {
            let matches_search = search.as_deref().map_or(true, |q| {
                contains_ci(&h.name, q)
                    || contains_ci(&h.description, q)
                    || contains_ci(&h.location, q)
            });
            let matches_month = month.as_deref().map_or(true, |m| {
                NaiveDate::parse_from_str(&h.date, DATE_FORMAT)
                    .map(|d| d.format("%B").to_string() == m)
                    .unwrap_or(false)
            });
            matches_search && matches_month && kind.as_deref().map_or(true, |k| h.kind == k)
        })
        .collect();

    ok(&req.id, json!({ "holidays": holidays }))
}

fn handle_holidays_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };

    let mut form = Form::new(&req.params);
    let name = form.required("name", "Holiday name is required");
    let date = form.date("date", "Date is required");
    let kind = form.one_of("type", HOLIDAY_TYPES, "Holiday type is required");
    let description = form.optional("description").unwrap_or_default();
    let is_recurring = form.flag("isRecurring");
    let status = form.one_of_or("status", HOLIDAY_STATUSES, "Pending");
    let location = form.optional("location").unwrap_or_default();
    let duration = form.optional("duration").unwrap_or_else(|| "1 day".to_string());
    if let Err(e) = form.finish() {
        return validation_err(&req.id, e);
    }
    let Some(date) = date else {
        return err(&req.id, "bad_params", "date is required", None);
    };

    let holiday_id = Uuid::new_v4().to_string();
    let date = date.format(DATE_FORMAT).to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO holidays(
           id, name, date, type, description, is_recurring, status, location,
           duration, created_at
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, strftime('%Y-%m-%dT%H:%M:%SZ','now'))",
        rusqlite::params![
            &holiday_id,
            &name,
            &date,
            &kind,
            &description,
            is_recurring as i64,
            &status,
            &location,
            &duration,
        ],
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "holidays" })),
        );
    }

    tracing::info!(date = %date, "holiday added");
    ok(
        &req.id,
        json!({ "holidayId": holiday_id, "date": date, "status": status }),
    )
}

fn handle_holidays_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(
            &req.id,
            json!({ "total": 0, "confirmed": 0, "pending": 0, "recurring": 0 }),
        );
    };
    let holidays = match load_holidays(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let count = |status: &str| holidays.iter().filter(|h| h.status == status).count();
    ok(
        &req.id,
        json!({
            "total": holidays.len(),
            "confirmed": count("Confirmed"),
            "pending": count("Pending"),
            "recurring": holidays.iter().filter(|h| h.is_recurring).count()
        }),
    )
}

fn handle_holidays_upcoming(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "holidays": [] }));
    };
    let reference = match req.params.get("today").and_then(|v| v.as_str()) {
        Some(raw) => match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
            Ok(d) => d,
            Err(_) => return err(&req.id, "bad_params", "today must be YYYY-MM-DD", None),
        },
        None => today(),
    };
    let limit = req
        .params
        .get("limit")
        .and_then(|v| v.as_u64())
        .map(|n| n as usize)
        .unwrap_or(UPCOMING_LIMIT);

    match load_holidays(conn) {
        Ok(all) => ok(
            &req.id,
            json!({ "holidays": upcoming(&all, reference, limit) }),
        ),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "holidays.list" => Some(handle_holidays_list(state, req)),
        "holidays.create" => Some(handle_holidays_create(state, req)),
        "holidays.stats" => Some(handle_holidays_stats(state, req)),
        "holidays.upcoming" => Some(handle_holidays_upcoming(state, req)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holiday(name: &str, date: &str) -> Holiday {
        Holiday {
            id: name.to_string(),
            name: name.to_string(),
            date: date.to_string(),
            display_date: display_date(date),
            kind: "Other".to_string(),
            description: String::new(),
            is_recurring: false,
            status: "Confirmed".to_string(),
            location: String::new(),
            duration: "1 day".to_string(),
        }
    }

    #[test]
    fn upcoming_skips_today_and_sorts() {
        let all = vec![
            holiday("Christmas", "2024-12-25"),
            holiday("Diwali", "2024-11-01"),
            holiday("Holi", "2024-03-25"),
            holiday("Independence Day", "2024-08-15"),
        ];
        let today = NaiveDate::parse_from_str("2024-08-15", DATE_FORMAT).unwrap();
        let names: Vec<String> = upcoming(&all, today, 5).into_iter().map(|h| h.name).collect();
        assert_eq!(names, vec!["Diwali", "Christmas"]);
        assert_eq!(upcoming(&all, today, 1).len(), 1);
    }
}
