//! Notification store: the newest-first list shown in the bell menu and the
//! notifications page, its persistence, and the permission gate in front of
//! platform alerts.

mod center;
mod permission;
mod platform;
mod record;
mod storage;

pub use center::{authorize, NotificationCenter, NotifyError, Outgoing};
pub use permission::{PermissionGate, PermissionState, PromptGate};
pub use platform::{PlatformAlert, PlatformNotifier};
pub use storage::KeyValueStore;
