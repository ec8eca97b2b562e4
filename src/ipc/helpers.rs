use chrono::{Local, NaiveDate};

/// Trimmed string filter from list params; blank and `"all"` mean no filter.
pub fn filter_param(params: &serde_json::Value, key: &str) -> Option<String> {
    let raw = params.get(key)?.as_str()?.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(raw.to_string())
    }
}

pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn display_date(raw: &str) -> String {
    match NaiveDate::parse_from_str(raw, crate::validation::DATE_FORMAT) {
        Ok(d) => d.format("%b %-d, %Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn all_and_blank_filters_are_ignored() {
        let params = json!({ "grade": "all", "section": "  ", "status": " Active " });
        assert_eq!(filter_param(&params, "grade"), None);
        assert_eq!(filter_param(&params, "section"), None);
        assert_eq!(filter_param(&params, "status").as_deref(), Some("Active"));
        assert_eq!(filter_param(&params, "missing"), None);
    }

    #[test]
    fn search_ignores_case() {
        assert!(contains_ci("Emma Johnson", "emma"));
        assert!(!contains_ci("Emma Johnson", "liam"));
    }

    #[test]
    fn dates_render_short_month() {
        assert_eq!(display_date("2024-12-25"), "Dec 25, 2024");
        assert_eq!(display_date("soon"), "soon");
    }
}
