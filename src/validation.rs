use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email regex"));

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn is_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

/// Required-field violations on a create form, keyed by form field name.
#[derive(Debug, Error, PartialEq)]
#[error("{} field(s) need attention", .0.len())]
pub struct ValidationError(pub BTreeMap<String, String>);

/// Reads a create form out of request params while collecting every field
/// error, so the caller can report them all at once.
pub struct Form<'a> {
    params: &'a Value,
    errors: BTreeMap<String, String>,
}

impl<'a> Form<'a> {
    pub fn new(params: &'a Value) -> Self {
        Self {
            params,
            errors: BTreeMap::new(),
        }
    }

    pub fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    #[cfg(test)]
    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError(self.errors))
        }
    }

    pub fn text(&self, field: &str) -> String {
        self.params
            .get(field)
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    pub fn optional(&self, field: &str) -> Option<String> {
        let s = self.text(field);
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }

    pub fn required(&mut self, field: &str, message: &str) -> String {
        let s = self.text(field);
        if s.is_empty() {
            self.reject(field, message);
        }
        s
    }

    pub fn email(&mut self, field: &str, message: &str) -> String {
        let s = self.required(field, message);
        if !s.is_empty() && !is_email(&s) {
            self.reject(field, "Please enter a valid email");
        }
        s
    }

    /// Optional email: blank is fine, anything else must look like an address.
    pub fn optional_email(&mut self, field: &str) -> Option<String> {
        let s = self.optional(field)?;
        if !is_email(&s) {
            self.reject(field, "Please enter a valid email");
        }
        Some(s)
    }

    pub fn one_of(&mut self, field: &str, options: &[&str], message: &str) -> String {
        let s = self.required(field, message);
        if !s.is_empty() && !options.contains(&s.as_str()) {
            self.reject(field, format!("{} must be one of: {}", field, options.join(", ")));
        }
        s
    }

    /// Like `one_of`, but a blank value falls back to `default`.
    pub fn one_of_or(&mut self, field: &str, options: &[&str], default: &str) -> String {
        let s = self.text(field);
        if s.is_empty() {
            return default.to_string();
        }
        if !options.contains(&s.as_str()) {
            self.reject(field, format!("{} must be one of: {}", field, options.join(", ")));
        }
        s
    }

    pub fn date(&mut self, field: &str, message: &str) -> Option<NaiveDate> {
        let s = self.required(field, message);
        if s.is_empty() {
            return None;
        }
        match NaiveDate::parse_from_str(&s, DATE_FORMAT) {
            Ok(d) => Some(d),
            Err(_) => {
                self.reject(field, "Use the YYYY-MM-DD date format");
                None
            }
        }
    }

    pub fn optional_date(&mut self, field: &str) -> Option<NaiveDate> {
        let s = self.optional(field)?;
        match NaiveDate::parse_from_str(&s, DATE_FORMAT) {
            Ok(d) => Some(d),
            Err(_) => {
                self.reject(field, "Use the YYYY-MM-DD date format");
                None
            }
        }
    }

    /// Form inputs arrive as numbers or numeric strings.
    pub fn positive_number(&mut self, field: &str, message: &str) -> Option<f64> {
        let n = match self.params.get(field) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match n {
            Some(v) if v.is_finite() && v > 0.0 => Some(v),
            _ => {
                self.reject(field, message);
                None
            }
        }
    }

    /// Whole counts: `30` or `"30"`, never `0.5` or `0`.
    pub fn positive_integer(&mut self, field: &str, message: &str) -> Option<i64> {
        let n = match self.params.get(field) {
            Some(Value::Number(n)) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|v| v.fract() == 0.0 && *v <= i64::MAX as f64)
                    .map(|v| v as i64)
            }),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        match n {
            Some(v) if v >= 1 => Some(v),
            _ => {
                self.reject(field, message);
                None
            }
        }
    }

    pub fn flag(&self, field: &str) -> bool {
        match self.params.get(field) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collects_every_missing_field() {
        let params = json!({ "firstName": "  ", "email": "not-an-email" });
        let mut form = Form::new(&params);
        form.required("firstName", "First name is required");
        form.email("email", "Email is required");
        form.required("phone", "Phone number is required");
        let err = form.finish().unwrap_err();
        assert_eq!(err.0.len(), 3);
        assert_eq!(err.0["email"], "Please enter a valid email");
        assert_eq!(err.0["firstName"], "First name is required");
    }

    #[test]
    fn first_error_per_field_wins() {
        let params = json!({ "grade": "13th" });
        let mut form = Form::new(&params);
        form.one_of("grade", &["9th", "10th"], "Grade is required");
        form.reject("grade", "second message");
        let err = form.finish().unwrap_err();
        assert!(err.0["grade"].starts_with("grade must be one of"));
    }

    #[test]
    fn numbers_accept_numeric_strings() {
        let params = json!({ "amount": "1500.50", "max": 0, "salary": "abc" });
        let mut form = Form::new(&params);
        assert_eq!(form.positive_number("amount", "Valid amount is required"), Some(1500.5));
        assert_eq!(form.positive_number("max", "Valid maximum is required"), None);
        assert_eq!(form.positive_number("salary", "Salary is required"), None);
        assert!(form.has_error("max"));
        assert!(form.has_error("salary"));
    }

    #[test]
    fn counts_must_be_whole_and_positive() {
        let params = json!({ "a": 30, "b": "24", "c": 0.5, "d": 0, "e": 12.0, "f": "1.5" });
        let mut form = Form::new(&params);
        assert_eq!(form.positive_integer("a", "bad"), Some(30));
        assert_eq!(form.positive_integer("b", "bad"), Some(24));
        assert_eq!(form.positive_integer("c", "bad"), None);
        assert_eq!(form.positive_integer("d", "bad"), None);
        assert_eq!(form.positive_integer("e", "bad"), Some(12));
        assert_eq!(form.positive_integer("f", "bad"), None);
        let err = form.finish().unwrap_err();
        assert_eq!(err.0.keys().collect::<Vec<_>>(), vec!["c", "d", "f"]);
    }

    #[test]
    fn dates_are_iso_calendar_days() {
        let params = json!({ "dueDate": "2024-01-15", "paidDate": "15/01/2024" });
        let mut form = Form::new(&params);
        assert!(form.date("dueDate", "Due date is required").is_some());
        assert!(form.date("paidDate", "Payment date is required").is_none());
        assert!(form.has_error("paidDate"));
    }
}
