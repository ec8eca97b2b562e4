use serde::Serialize;
use std::time::Duration;

/// How long the platform keeps an alert on screen before dismissing it.
pub const AUTO_DISMISS: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformAlert {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub auto_dismiss_ms: u64,
}

/// Fire-and-forget emission of a native notification.
pub trait PlatformNotifier {
    fn emit(&self, alert: &PlatformAlert) -> anyhow::Result<()>;
}
