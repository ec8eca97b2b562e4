use super::permission::{PermissionGate, PermissionState};
use super::platform::{PlatformAlert, PlatformNotifier, AUTO_DISMISS};
use super::record::NotificationRecord;
use super::storage::{KeyValueStore, NotificationStorage};
use chrono::{DateTime, SubsecRound, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification title must not be empty")]
    EmptyTitle,
    #[error("Notifications are blocked. Please enable them in your system settings.")]
    PermissionDenied,
    #[error("notification permission prompt was not answered")]
    PermissionPending,
}

impl NotifyError {
    pub fn code(&self) -> &'static str {
        match self {
            NotifyError::EmptyTitle => "bad_params",
            NotifyError::PermissionDenied => "permission_denied",
            NotifyError::PermissionPending => "permission_pending",
        }
    }
}

/// What a send puts on screen and in the list.
#[derive(Debug, Clone)]
pub struct Outgoing {
    pub title: String,
    pub body: String,
    pub icon: Option<String>,
}

impl Outgoing {
    pub fn new(title: &str, body: &str, icon: Option<&str>) -> Result<Self, NotifyError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(NotifyError::EmptyTitle);
        }
        Ok(Self {
            title: title.to_string(),
            body: body.to_string(),
            icon: icon.map(str::to_string),
        })
    }
}

/// Waits for the gate to settle and maps anything but `granted` to an error.
pub async fn authorize(gate: &dyn PermissionGate) -> Result<(), NotifyError> {
    let state = match gate.current_permission() {
        PermissionState::Undecided => gate.ensure_permission().await,
        decided => decided,
    };
    match state {
        PermissionState::Granted => Ok(()),
        PermissionState::Denied => Err(NotifyError::PermissionDenied),
        PermissionState::Undecided => Err(NotifyError::PermissionPending),
    }
}

/// In-memory notification list for one workspace, newest first.
pub struct NotificationCenter {
    storage: NotificationStorage,
    records: Vec<NotificationRecord>,
    modal_open: bool,
    last_id: i64,
    default_icon: String,
}

impl NotificationCenter {
    pub fn initialize(kv: Box<dyn KeyValueStore>, default_icon: &str) -> Self {
        let storage = NotificationStorage::new(kv);
        let records = storage.load();
        let last_id = records.iter().map(|r| r.id).max().unwrap_or(0);
        tracing::debug!(count = records.len(), "notifications loaded");
        Self {
            storage,
            records,
            modal_open: false,
            last_id,
            default_icon: default_icon.to_string(),
        }
    }

    pub fn records(&self) -> &[NotificationRecord] {
        &self.records
    }

    pub fn unread_count(&self) -> usize {
        self.records.iter().filter(|r| !r.read).count()
    }

    pub fn is_modal_open(&self) -> bool {
        self.modal_open
    }

    pub fn open_modal(&mut self) {
        self.modal_open = true;
    }

    pub fn close_modal(&mut self) {
        self.modal_open = false;
    }

    // The IPC handler runs `authorize` and `deliver` as separate steps so no
    // borrow of the center is held while the gate waits.
    #[cfg(test)]
    pub async fn send(
        &mut self,
        gate: &dyn PermissionGate,
        notifier: &dyn PlatformNotifier,
        outgoing: Outgoing,
    ) -> Result<NotificationRecord, NotifyError> {
        authorize(gate).await?;
        Ok(self.deliver(notifier, outgoing, Utc::now()))
    }

    /// Second half of a send, once the gate has granted permission.
    pub fn deliver(
        &mut self,
        notifier: &dyn PlatformNotifier,
        outgoing: Outgoing,
        now: DateTime<Utc>,
    ) -> NotificationRecord {
        // Persisted timestamps carry milliseconds only.
        let now = now.trunc_subsecs(3);
        let id = self.next_id(now);
        let alert = PlatformAlert {
            id,
            title: outgoing.title.clone(),
            body: outgoing.body.clone(),
            icon: outgoing
                .icon
                .clone()
                .unwrap_or_else(|| self.default_icon.clone()),
            badge: self.default_icon.clone(),
            auto_dismiss_ms: AUTO_DISMISS.as_millis() as u64,
        };
        if let Err(e) = notifier.emit(&alert) {
            tracing::warn!(id, error = %e, "platform notification was not shown");
        }

        let record = NotificationRecord::new(id, &outgoing.title, &outgoing.body, now);
        self.records.insert(0, record.clone());
        self.storage.save(&self.records);
        tracing::info!(id, title = %record.title, "notification sent");
        record
    }

    /// Returns whether anything changed.
    pub fn mark_read(&mut self, id: i64) -> bool {
        let Some(rec) = self.records.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        if rec.read {
            return false;
        }
        rec.read = true;
        self.storage.save(&self.records);
        true
    }

    /// Marks every unread record and persists once; returns how many flipped.
    pub fn mark_all_read(&mut self) -> usize {
        let mut flipped = 0;
        for rec in self.records.iter_mut().filter(|r| !r.read) {
            rec.read = true;
            flipped += 1;
        }
        if flipped > 0 {
            self.storage.save(&self.records);
        }
        flipped
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.storage.save(&self.records);
    }

    // Ids follow the creation clock but must stay unique when two sends land
    // in the same millisecond or the clock steps backwards.
    fn next_id(&mut self, now: DateTime<Utc>) -> i64 {
        let id = now.timestamp_millis().max(self.last_id + 1);
        self.last_id = id;
        id
    }
}
