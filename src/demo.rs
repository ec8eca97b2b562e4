//! Sample school data for a fresh workspace.

use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedCounts {
    pub students: usize,
    pub teachers: usize,
    pub classes: usize,
    pub fee_records: usize,
    pub holidays: usize,
}

// (studentNo, first, last, grade, section, dateOfBirth, parentName)
const STUDENTS: &[(&str, &str, &str, &str, &str, &str, &str)] = &[
    ("ST001", "Alice", "Johnson", "10th", "A", "2009-03-14", "Mark Johnson"),
    ("ST002", "Bob", "Smith", "11th", "B", "2008-07-22", "Karen Smith"),
    ("ST003", "Charlie", "Brown", "9th", "A", "2010-01-05", "Linda Brown"),
    ("ST004", "Diana", "Prince", "12th", "C", "2007-11-30", "Hippolyta Prince"),
    ("ST005", "Edward", "Norton", "10th", "B", "2009-06-18", "Robert Norton"),
    ("ST006", "Fiona", "Green", "11th", "A", "2008-02-09", "Sarah Green"),
    ("ST007", "George", "Wilson", "9th", "B", "2010-09-27", "Anne Wilson"),
    ("ST008", "Helen", "Davis", "12th", "A", "2007-04-12", "Paul Davis"),
];

// (first, last, email, phone, department, subject, qualification, experience, salary, dateOfBirth, status)
#[allow(clippy::type_complexity)]
const TEACHERS: &[(&str, &str, &str, &str, &str, &str, &str, &str, f64, &str, &str)] = &[
    ("Sarah", "Wilson", "sarah@school.edu", "+1234567890", "Mathematics", "Advanced Mathematics", "PhD in Mathematics", "8 years", 65000.0, "1985-04-12", "Active"),
    ("Michael", "Chen", "michael@school.edu", "+1234567891", "Science", "Physics & Chemistry", "PhD in Physics", "12 years", 72000.0, "1980-09-03", "Active"),
    ("Emily", "Rodriguez", "emily@school.edu", "+1234567892", "English", "Literature & Writing", "MA in English Literature", "6 years", 54000.0, "1990-02-21", "Active"),
    ("James", "Thompson", "james@school.edu", "+1234567893", "History", "World History", "MA in History", "10 years", 58000.0, "1983-11-07", "On Leave"),
    ("Lisa", "Anderson", "lisa@school.edu", "+1234567894", "Science", "Biology", "PhD in Biology", "15 years", 76000.0, "1978-06-30", "Active"),
];

// (name, code, teacher, grade, subject, enrolled, room, status, days, start, end)
#[allow(clippy::type_complexity)]
const CLASSES: &[(&str, &str, &str, &str, &str, i64, &str, &str, &[usize], &str, &str)] = &[
    ("Advanced Mathematics", "MATH-401", "Dr. Sarah Wilson", "10th", "Mathematics", 28, "Room 201", "Active", &[0, 2, 4], "09:00", "10:00"),
    ("Physics Laboratory", "PHYS-301", "Prof. Michael Chen", "11th", "Physics", 24, "Lab 105", "Active", &[1, 3], "14:00", "15:30"),
    ("English Literature", "ENG-201", "Ms. Emily Rodriguez", "9th", "Literature", 32, "Room 103", "Active", &[0, 2, 4], "11:00", "12:00"),
    ("World History", "HIST-301", "Mr. James Thompson", "11th", "History", 26, "Room 205", "Suspended", &[1, 3], "10:00", "11:00"),
    ("Biology Lab", "BIO-401", "Dr. Lisa Anderson", "12th", "Biology", 20, "Lab 202", "Active", &[2, 4], "13:00", "14:30"),
    ("Computer Science", "CS-301", "Mr. David Kim", "10th", "Computer Science", 30, "Computer Lab", "Active", &[0, 2, 4], "15:00", "16:00"),
];

// (studentNo, feeType, amount, dueDate, paidDate, status, paymentMethod, receiptNo, remarks)
#[allow(clippy::type_complexity)]
const FEES: &[(&str, &str, f64, &str, Option<&str>, &str, Option<&str>, Option<&str>, &str)] = &[
    ("ST001", "Tuition Fee", 15000.0, "2024-01-15", Some("2024-01-10"), "Paid", Some("Online"), Some("RCP001"), "Paid on time"),
    ("ST002", "Tuition Fee", 18000.0, "2024-01-15", None, "Pending", None, None, "Payment pending"),
    ("ST003", "Transport Fee", 5000.0, "2024-01-10", Some("2024-01-08"), "Paid", Some("Cash"), Some("RCP002"), "Transport fee paid"),
    ("ST004", "Tuition Fee", 20000.0, "2024-01-15", Some("2024-01-12"), "Paid", Some("Cheque"), Some("RCP003"), "Cheque cleared"),
    ("ST005", "Library Fee", 2000.0, "2024-01-05", None, "Overdue", None, None, "Payment overdue"),
];

// (name, date, type, description, recurring, status, location, duration)
const HOLIDAYS: &[(&str, &str, &str, &str, bool, &str, &str, &str)] = &[
    ("Republic Day", "2024-01-26", "National Holiday", "Celebration of the adoption of the Constitution of India", true, "Confirmed", "All India", "1 day"),
    ("Holi", "2024-03-25", "Religious Holiday", "Festival of colors celebrating spring and love", true, "Confirmed", "All India", "1 day"),
    ("Independence Day", "2024-08-15", "National Holiday", "Celebration of India's independence from British rule", true, "Confirmed", "All India", "1 day"),
    ("Diwali", "2024-11-01", "Religious Holiday", "Festival of lights celebrating the victory of light over darkness", true, "Confirmed", "All India", "1 day"),
    ("Christmas", "2024-12-25", "Religious Holiday", "Celebration of the birth of Jesus Christ", true, "Confirmed", "All India", "1 day"),
    ("School Annual Day", "2024-02-15", "School Event", "Annual celebration of school achievements and performances", false, "Confirmed", "School Campus", "1 day"),
    ("Summer Vacation", "2024-05-15", "Academic Break", "Summer vacation for students and teachers", true, "Confirmed", "All India", "45 days"),
    ("Teacher Training Day", "2024-04-10", "Professional Development", "Staff training and professional development day", false, "Pending", "School Campus", "1 day"),
];

const WEEKDAYS: [&str; 6] = ["monday", "tuesday", "wednesday", "thursday", "friday", "saturday"];

fn is_empty(conn: &Connection, table: &str) -> anyhow::Result<bool> {
    let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
    Ok(n == 0)
}

/// Fills every empty table with the sample rows; tables that already hold
/// data are left alone.
pub fn seed_demo(conn: &Connection) -> anyhow::Result<SeedCounts> {
    let tx = conn.unchecked_transaction()?;
    let mut counts = SeedCounts::default();

    if is_empty(&tx, "students")? {
        for (no, first, last, grade, section, dob, parent) in STUDENTS {
            tx.execute(
                "INSERT INTO students(
                   id, student_no, first_name, last_name, email, phone, date_of_birth,
                   grade, section, parent_name, parent_phone, enrollment_date, status,
                   created_at
                 ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, '2023-06-01', 'Active',
                          strftime('%Y-%m-%dT%H:%M:%SZ','now'))",
                params![
                    Uuid::new_v4().to_string(),
                    no,
                    first,
                    last,
                    format!("{}.{}@student.school.edu", first.to_lowercase(), last.to_lowercase()),
                    format!("+1555010{}", &no[3..]),
                    dob,
                    grade,
                    section,
                    parent,
                    format!("+1555020{}", &no[3..]),
                ],
            )
            .with_context(|| format!("seeding student {no}"))?;
            counts.students += 1;
        }
    }

    if is_empty(&tx, "teachers")? {
        for (first, last, email, phone, dept, subject, qual, exp, salary, dob, status) in TEACHERS {
            tx.execute(
                "INSERT INTO teachers(
                   id, first_name, last_name, email, phone, date_of_birth, department,
                   subject, qualification, experience, joining_date, salary,
                   contract_type, status, created_at
                 ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, '2020-08-01', ?, 'Full-time', ?,
                          strftime('%Y-%m-%dT%H:%M:%SZ','now'))",
                params![
                    Uuid::new_v4().to_string(),
                    first,
                    last,
                    email,
                    phone,
                    dob,
                    dept,
                    subject,
                    qual,
                    exp,
                    salary,
                    status
                ],
            )
            .with_context(|| format!("seeding teacher {first} {last}"))?;
            counts.teachers += 1;
        }
    }

    if is_empty(&tx, "classes")? {
        for (name, code, teacher, grade, subject, enrolled, room, status, days, start, end) in CLASSES {
            let class_id = Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO classes(
                   id, name, code, teacher, grade, subject, max_students, enrolled,
                   room, academic_year, semester, status, created_at
                 ) VALUES(?, ?, ?, ?, ?, ?, 35, ?, ?, '2024', '1', ?,
                          strftime('%Y-%m-%dT%H:%M:%SZ','now'))",
                params![&class_id, name, code, teacher, grade, subject, enrolled, room, status],
            )
            .with_context(|| format!("seeding class {code}"))?;
            for &day_index in days.iter() {
                tx.execute(
                    "INSERT INTO class_sessions(class_id, day, day_index, start_time, end_time)
                     VALUES(?, ?, ?, ?, ?)",
                    params![&class_id, WEEKDAYS[day_index], day_index as i64, start, end],
                )?;
            }
            counts.classes += 1;
        }
    }

    if is_empty(&tx, "fee_records")? {
        for (no, fee_type, amount, due, paid, status, method, receipt, remarks) in FEES {
            let student_id: Option<String> = tx
                .query_row("SELECT id FROM students WHERE student_no = ?", [no], |r| r.get(0))
                .optional()?;
            let Some(student_id) = student_id else {
                continue;
            };
            tx.execute(
                "INSERT INTO fee_records(
                   id, student_id, fee_type, amount, due_date, paid_date, status,
                   payment_method, receipt_no, remarks, created_at
                 ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, strftime('%Y-%m-%dT%H:%M:%SZ','now'))",
                params![
                    Uuid::new_v4().to_string(),
                    student_id,
                    fee_type,
                    amount,
                    due,
                    paid,
                    status,
                    method,
                    receipt,
                    remarks
                ],
            )
            .with_context(|| format!("seeding fee for {no}"))?;
            counts.fee_records += 1;
        }
    }

    if is_empty(&tx, "holidays")? {
        for (name, date, kind, description, recurring, status, location, duration) in HOLIDAYS {
            tx.execute(
                "INSERT INTO holidays(
                   id, name, date, type, description, is_recurring, status, location,
                   duration, created_at
                 ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, strftime('%Y-%m-%dT%H:%M:%SZ','now'))",
                params![
                    Uuid::new_v4().to_string(),
                    name,
                    date,
                    kind,
                    description,
                    *recurring as i64,
                    status,
                    location,
                    duration
                ],
            )
            .with_context(|| format!("seeding holiday {name}"))?;
            counts.holidays += 1;
        }
    }

    tx.commit()?;
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn seeds_once_then_leaves_tables_alone() {
        let dir = tempfile::tempdir().unwrap();
        let conn = db::open_db(dir.path()).unwrap();

        let first = seed_demo(&conn).unwrap();
        assert_eq!(
            first,
            SeedCounts {
                students: 8,
                teachers: 5,
                classes: 6,
                fee_records: 5,
                holidays: 8
            }
        );
        let sessions: i64 = conn
            .query_row("SELECT COUNT(*) FROM class_sessions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(sessions, 15);
        let incomplete: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM teachers
                 WHERE qualification IS NULL OR salary IS NULL OR date_of_birth IS NULL",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(incomplete, 0);

        assert_eq!(seed_demo(&conn).unwrap(), SeedCounts::default());
    }
}
