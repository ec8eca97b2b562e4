use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: i64,
    pub title: String,
    pub body: String,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

impl NotificationRecord {
    pub fn new(id: i64, title: &str, body: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.to_string(),
            body: body.to_string(),
            timestamp,
            read: false,
        }
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix, the shape the
/// dashboard has always written (`2024-01-10T08:30:00.000Z`).
pub mod iso_millis {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("bad timestamp: {raw}")))
    }
}
