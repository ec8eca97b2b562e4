use crate::ipc::error::{err, no_workspace, ok, validation_err};
use crate::ipc::helpers::{contains_ci, filter_param, today};
use crate::ipc::types::{AppState, Request};
use crate::validation::{Form, DATE_FORMAT};
use chrono::{NaiveDate, Utc};
use rand::Rng;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

pub const FEE_TYPES: &[&str] = &[
    "Tuition Fee",
    "Transport Fee",
    "Library Fee",
    "Laboratory Fee",
    "Sports Fee",
    "Examination Fee",
    "Computer Fee",
    "Art & Craft Fee",
    "Music Fee",
    "Other",
];

pub const PAYMENT_METHODS: &[&str] = &[
    "Cash",
    "Online",
    "Cheque",
    "Bank Transfer",
    "UPI",
    "Credit Card",
    "Debit Card",
];

/// Pending fees past their due date read as Overdue.
pub fn effective_status(stored: &str, due_date: &str, today: NaiveDate) -> &'static str {
    match stored {
        "Paid" => "Paid",
        "Overdue" => "Overdue",
        _ => match NaiveDate::parse_from_str(due_date, DATE_FORMAT) {
            Ok(due) if due < today => "Overdue",
            _ => "Pending",
        },
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct FeeStats {
    pub total: f64,
    pub paid: f64,
    pub pending: f64,
    pub overdue: f64,
    pub count: usize,
}

pub fn fee_stats(conn: &Connection, today: NaiveDate) -> anyhow::Result<FeeStats> {
    let mut stmt = conn.prepare("SELECT amount, due_date, status FROM fee_records")?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, f64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stats = FeeStats::default();
    for (amount, due, status) in rows {
        stats.total += amount;
        stats.count += 1;
        match effective_status(&status, &due, today) {
            "Paid" => stats.paid += amount,
            "Overdue" => stats.overdue += amount,
            _ => stats.pending += amount,
        }
    }
    Ok(stats)
}

fn receipt_no() -> String {
    let millis = Utc::now().timestamp_millis().to_string();
    let tail = &millis[millis.len().saturating_sub(6)..];
    format!("RCP{}{:03}", tail, rand::thread_rng().gen_range(0..1000))
}

/// Accepts either the student's row id or their `ST###` number.
fn find_student(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT id FROM students WHERE id = ? OR student_no = ?",
        [key, key],
        |r| r.get(0),
    )
    .optional()
}

fn month_name(due_date: &str) -> Option<String> {
    NaiveDate::parse_from_str(due_date, DATE_FORMAT)
        .ok()
        .map(|d| d.format("%B").to_string())
}

fn handle_fees_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "records": [] }));
    };

    let search = filter_param(&req.params, "search");
    let status = filter_param(&req.params, "status");
    let month = filter_param(&req.params, "month");
    let now = today();

    let mut stmt = match conn.prepare(
        "SELECT f.id, s.student_no, s.first_name, s.last_name, s.grade, s.section,
                f.fee_type, f.amount, f.due_date, f.paid_date, f.status,
                f.payment_method, f.receipt_no, f.remarks
         FROM fee_records f
         JOIN students s ON s.id = f.student_id
         ORDER BY f.due_date DESC, s.student_no",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([], |row| {
            let student_no: String = row.get(1)?;
            let name = format!(
                "{} {}",
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?
            );
            let class_name = format!(
                "{} {}",
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?
            );
            let fee_type: String = row.get(6)?;
            let due_date: String = row.get(8)?;
            let stored: String = row.get(10)?;
            let status = effective_status(&stored, &due_date, now);
            Ok((
                format!("{} {} {}", name, student_no, fee_type),
                status,
                month_name(&due_date),
                json!({
                    "id": row.get::<_, String>(0)?,
                    "studentId": student_no,
                    "studentName": name,
                    "className": class_name,
                    "feeType": fee_type,
                    "amount": row.get::<_, f64>(7)?,
                    "dueDate": due_date,
                    "paidDate": row.get::<_, Option<String>>(9)?,
                    "status": status,
                    "paymentMethod": row.get::<_, Option<String>>(11)?,
                    "receiptNo": row.get::<_, Option<String>>(12)?,
                    "remarks": row.get::<_, Option<String>>(13)?
                }),
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    let rows = match rows {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let records: Vec<serde_json::Value> = rows
        .into_iter()
        .filter(|(haystack, st, m, _)| {
            search.as_deref().map_or(true, |q| contains_ci(haystack, q))
                && status.as_deref().map_or(true, |s| *st == s)
                && month.as_deref().map_or(true, |mo| m.as_deref() == Some(mo))
        })
        .map(|(_, _, _, v)| v)
        .collect();

    ok(&req.id, json!({ "records": records }))
}

fn handle_fees_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };

    let mut form = Form::new(&req.params);
    let student_key = form.required("studentId", "Please select a student");
    let fee_type = form.one_of("feeType", FEE_TYPES, "Fee type is required");
    let amount = form.positive_number("amount", "Valid amount is required");
    let due_date = form.date("dueDate", "Due date is required");
    let remarks = form.optional("remarks");
    let is_paid = form.flag("isPaid");
    let (payment_method, paid_date, receipt) = if is_paid {
        (
            Some(form.one_of(
                "paymentMethod",
                PAYMENT_METHODS,
                "Payment method is required for paid fees",
            )),
            form.date("paidDate", "Payment date is required for paid fees"),
            Some(form.optional("receiptNo").unwrap_or_else(receipt_no)),
        )
    } else {
        (None, None, None)
    };

    let student_id = if student_key.is_empty() {
        None
    } else {
        match find_student(conn, &student_key) {
            Ok(Some(id)) => Some(id),
            Ok(None) => {
                form.reject("studentId", "Student not found");
                None
            }
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        }
    };
    if let Err(e) = form.finish() {
        return validation_err(&req.id, e);
    }
    let (Some(student_id), Some(amount), Some(due_date)) = (student_id, amount, due_date) else {
        return err(&req.id, "bad_params", "student, amount and dueDate are required", None);
    };

    let status = if is_paid { "Paid" } else { "Pending" };
    let fee_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO fee_records(
           id, student_id, fee_type, amount, due_date, paid_date, status,
           payment_method, receipt_no, remarks, created_at
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, strftime('%Y-%m-%dT%H:%M:%SZ','now'))",
        rusqlite::params![
            &fee_id,
            &student_id,
            &fee_type,
            amount,
            due_date.format(DATE_FORMAT).to_string(),
            paid_date.map(|d| d.format(DATE_FORMAT).to_string()),
            status,
            payment_method.as_deref(),
            receipt.as_deref(),
            remarks.as_deref(),
        ],
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "fee_records" })),
        );
    }

    tracing::info!(fee_type = %fee_type, amount, status, "fee recorded");
    ok(
        &req.id,
        json!({
            "feeId": fee_id,
            "status": status,
            "receiptNo": receipt
        }),
    )
}

fn handle_fees_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!(FeeStats::default()));
    };
    match fee_stats(conn, today()) {
        Ok(stats) => ok(&req.id, json!(stats)),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "fees.list" => Some(handle_fees_list(state, req)),
        "fees.create" => Some(handle_fees_create(state, req)),
        "fees.stats" => Some(handle_fees_stats(state, req)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn pending_turns_overdue_after_due_date() {
        let today = day("2024-01-12");
        assert_eq!(effective_status("Pending", "2024-01-15", today), "Pending");
        assert_eq!(effective_status("Pending", "2024-01-12", today), "Pending");
        assert_eq!(effective_status("Pending", "2024-01-05", today), "Overdue");
        assert_eq!(effective_status("Paid", "2024-01-05", today), "Paid");
    }

    #[test]
    fn receipt_numbers_have_fixed_shape() {
        let r = receipt_no();
        assert!(r.starts_with("RCP"));
        assert_eq!(r.len(), 12);
    }
}
