use super::record::NotificationRecord;
use std::collections::HashSet;

pub const NOTIFICATIONS_KEY: &str = "notifications";

/// Local string key-value storage. The sidecar backs it with the workspace
/// database; tests use [`MemoryKv`].
pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: std::cell::RefCell<std::collections::HashMap<String, String>>,
}

#[cfg(test)]
impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
impl<T: KeyValueStore + ?Sized> KeyValueStore for std::rc::Rc<T> {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        (**self).set(key, value)
    }
}

/// Round-trips the notification list under [`NOTIFICATIONS_KEY`].
///
/// Neither direction ever fails to the caller: read problems degrade to an
/// empty (or partial) list, write problems are logged and dropped.
pub struct NotificationStorage {
    kv: Box<dyn KeyValueStore>,
}

impl NotificationStorage {
    pub fn new(kv: Box<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn load(&self) -> Vec<NotificationRecord> {
        let raw = match self.kv.get(NOTIFICATIONS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read notifications from storage");
                return Vec::new();
            }
        };

        let items: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = %e, "stored notifications are malformed; starting empty");
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(items.len());
        for (idx, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<NotificationRecord>(item) {
                Ok(rec) => {
                    if !seen.insert(rec.id) {
                        tracing::warn!(id = rec.id, "dropping stored notification with duplicate id");
                        continue;
                    }
                    out.push(rec);
                }
                Err(e) => {
                    tracing::warn!(index = idx, error = %e, "dropping unreadable stored notification");
                }
            }
        }
        out
    }

    pub fn save(&self, records: &[NotificationRecord]) {
        let raw = match serde_json::to_string(records) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize notifications");
                return;
            }
        };
        if let Err(e) = self.kv.set(NOTIFICATIONS_KEY, &raw) {
            tracing::error!(error = %e, "failed to persist notifications");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::rc::Rc;

    struct BrokenKv;

    impl KeyValueStore for BrokenKv {
        fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Err(anyhow::anyhow!("disk unavailable"))
        }

        fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("disk full"))
        }
    }

    fn sample(id: i64, read: bool) -> NotificationRecord {
        let ts = Utc.timestamp_millis_opt(id).unwrap();
        let mut rec = NotificationRecord::new(id, &format!("title {id}"), "body", ts);
        rec.read = read;
        rec
    }

    #[test]
    fn missing_key_loads_empty() {
        let storage = NotificationStorage::new(Box::new(MemoryKv::new()));
        assert!(storage.load().is_empty());
    }

    #[test]
    fn save_then_load_preserves_records() {
        let kv = Rc::new(MemoryKv::new());
        let storage = NotificationStorage::new(Box::new(Rc::clone(&kv)));
        let records = vec![sample(1_704_875_400_123, false), sample(1_704_875_000_000, true)];
        storage.save(&records);

        let reloaded = NotificationStorage::new(Box::new(kv)).load();
        assert_eq!(reloaded, records);
    }

    #[test]
    fn non_json_payload_loads_empty() {
        let kv = MemoryKv::new();
        kv.set(NOTIFICATIONS_KEY, "{not json").unwrap();
        let storage = NotificationStorage::new(Box::new(kv));
        assert!(storage.load().is_empty());
    }

    #[test]
    fn unreadable_records_are_dropped_individually() {
        let kv = MemoryKv::new();
        kv.set(
            NOTIFICATIONS_KEY,
            r#"[
                {"id": 2, "title": "ok", "body": "", "timestamp": "2024-01-10T08:30:00.000Z", "read": false},
                {"id": 1, "title": "bad", "body": "", "timestamp": "Invalid Date", "read": true},
                {"id": 2, "title": "dup", "body": "", "timestamp": "2024-01-10T08:30:00.000Z", "read": false}
            ]"#,
        )
        .unwrap();
        let loaded = NotificationStorage::new(Box::new(kv)).load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].title, "ok");
    }

    #[test]
    fn storage_failures_do_not_propagate() {
        let storage = NotificationStorage::new(Box::new(BrokenKv));
        storage.save(&[sample(1, false)]);
        assert!(storage.load().is_empty());
    }
}
