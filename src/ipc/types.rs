use crate::config::Config;
use crate::db;
use crate::ipc::events::Outbox;
use crate::notifications::{NotificationCenter, PromptGate};
use futures::executor::LocalSpawner;
use rusqlite::Connection;
use serde::Deserialize;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// A handler either answers right away or leaves a task on the executor
/// that pushes the answer to the outbox later.
pub enum Reply {
    Now(serde_json::Value),
    Deferred,
}

/// The open workspace's notification center. Parked sends hold the slot,
/// not the center, so they deliver to whichever center is current when the
/// permission gate settles.
pub type CenterSlot = Rc<RefCell<Option<Rc<RefCell<NotificationCenter>>>>>;

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub notifications: CenterSlot,
    pub permission: Rc<PromptGate>,
    pub outbox: Outbox,
    pub spawner: LocalSpawner,
    pub notification_icon: String,
}

impl AppState {
    pub fn new(config: &Config, spawner: LocalSpawner) -> Self {
        let outbox = Outbox::default();
        let prompt_outbox = outbox.clone();
        let permission = Rc::new(PromptGate::new(config.notification_permission, move || {
            prompt_outbox.push_event("notification.permissionPrompt", serde_json::json!({}));
        }));
        Self {
            workspace: None,
            db: None,
            notifications: CenterSlot::default(),
            permission,
            outbox,
            spawner,
            notification_icon: config.notification_icon.clone(),
        }
    }

    /// Opens (or creates) the workspace database and rehydrates the
    /// notification list from it before anything else can observe it.
    pub fn open_workspace(&mut self, path: &Path) -> anyhow::Result<()> {
        let conn = db::open_db(path)?;
        let kv = db::SqliteKv::open(path)?;
        let center = NotificationCenter::initialize(Box::new(kv), &self.notification_icon);

        self.workspace = Some(path.to_path_buf());
        self.db = Some(conn);
        *self.notifications.borrow_mut() = Some(Rc::new(RefCell::new(center)));
        tracing::info!(workspace = %path.display(), "workspace opened");
        Ok(())
    }

    pub fn close_workspace(&mut self) {
        self.workspace = None;
        self.db = None;
        *self.notifications.borrow_mut() = None;
    }

    pub fn center(&self) -> Option<Rc<RefCell<NotificationCenter>>> {
        self.notifications.borrow().clone()
    }
}
