use crate::notifications::{PlatformAlert, PlatformNotifier};
use serde_json::json;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Lines waiting to be written to stdout: deferred responses and events
/// for the host shell.
#[derive(Clone, Default)]
pub struct Outbox(Rc<RefCell<VecDeque<serde_json::Value>>>);

impl Outbox {
    pub fn push(&self, value: serde_json::Value) {
        self.0.borrow_mut().push_back(value);
    }

    pub fn push_event(&self, event: &str, payload: serde_json::Value) {
        self.push(json!({ "event": event, "payload": payload }));
    }

    pub fn drain(&self) -> Vec<serde_json::Value> {
        self.0.borrow_mut().drain(..).collect()
    }
}

/// Platform notifications are shown by the host; the sidecar only asks.
pub struct HostNotifier {
    outbox: Outbox,
}

impl HostNotifier {
    pub fn new(outbox: Outbox) -> Self {
        Self { outbox }
    }
}

impl PlatformNotifier for HostNotifier {
    fn emit(&self, alert: &PlatformAlert) -> anyhow::Result<()> {
        self.outbox
            .push_event("notification.show", serde_json::to_value(alert)?);
        Ok(())
    }
}
