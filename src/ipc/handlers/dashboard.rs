use crate::ipc::error::{err, ok};
use crate::ipc::handlers::fees::{fee_stats, FeeStats};
use crate::ipc::handlers::holidays::{load_holidays, upcoming};
use crate::ipc::helpers::today;
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

const DASHBOARD_HOLIDAYS: usize = 3;

fn count(conn: &Connection, sql: &str) -> rusqlite::Result<i64> {
    conn.query_row(sql, [], |r| r.get(0))
}

fn handle_dashboard_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let unread = state
        .center()
        .map(|c| c.borrow().unread_count())
        .unwrap_or(0);

    let Some(conn) = state.db.as_ref() else {
        return ok(
            &req.id,
            json!({
                "students": 0,
                "teachers": 0,
                "activeClasses": 0,
                "fees": FeeStats::default(),
                "upcomingHolidays": [],
                "unreadNotifications": unread
            }),
        );
    };

    let counts = (|| -> rusqlite::Result<(i64, i64, i64)> {
        Ok((
            count(conn, "SELECT COUNT(*) FROM students WHERE status = 'Active'")?,
            count(conn, "SELECT COUNT(*) FROM teachers WHERE status = 'Active'")?,
            count(conn, "SELECT COUNT(*) FROM classes WHERE status = 'Active'")?,
        ))
    })();
    let (students, teachers, classes) = match counts {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let now = today();
    let fees = match fee_stats(conn, now) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let holidays = match load_holidays(conn) {
        Ok(all) => upcoming(&all, now, DASHBOARD_HOLIDAYS),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    ok(
        &req.id,
        json!({
            "students": students,
            "teachers": teachers,
            "activeClasses": classes,
            "fees": fees,
            "revenue": fees.paid,
            "upcomingHolidays": holidays,
            "unreadNotifications": unread
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.summary" => Some(handle_dashboard_summary(state, req)),
        _ => None,
    }
}
