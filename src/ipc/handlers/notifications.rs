use crate::ipc::error::{err, no_workspace, notify_err, ok};
use crate::ipc::events::HostNotifier;
use crate::ipc::types::{AppState, Reply, Request};
use crate::notifications::{self, NotificationCenter, Outgoing, PermissionGate, PermissionState};
use chrono::Utc;
use futures::task::LocalSpawnExt;
use rand::seq::SliceRandom;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

const DEMO_TITLES: &[&str] = &[
    "Welcome to EduAdmin!",
    "New Assignment Posted",
    "Parent-Teacher Meeting Reminder",
    "Grade Report Available",
    "School Event Update",
];

const DEMO_BODIES: &[&str] = &[
    "Your school management dashboard is ready to use.",
    "A new assignment has been posted for Mathematics class.",
    "Don't forget about the parent-teacher meeting tomorrow at 2 PM.",
    "Your quarterly grade report is now available for download.",
    "The science fair has been rescheduled to next Friday.",
];

fn center_of(state: &AppState) -> Option<Rc<RefCell<NotificationCenter>>> {
    state.center()
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(center) = center_of(state) else {
        return no_workspace(&req.id);
    };
    let center = center.borrow();
    ok(
        &req.id,
        json!({
            "notifications": center.records(),
            "unreadCount": center.unread_count(),
            "modalOpen": center.is_modal_open(),
            "permission": state.permission.current_permission(),
        }),
    )
}

/// Parks the send on the executor until the permission gate settles; the
/// response is pushed to the outbox from there. The center is looked up
/// again on resume.
fn spawn_send(state: &AppState, req: &Request, outgoing: Outgoing) -> Reply {
    if center_of(state).is_none() {
        return Reply::Now(no_workspace(&req.id));
    }
    let slot = Rc::clone(&state.notifications);
    let gate = Rc::clone(&state.permission);
    let outbox = state.outbox.clone();
    let notifier = HostNotifier::new(state.outbox.clone());
    let id = req.id.clone();

    let task = async move {
        let resp = match notifications::authorize(&*gate).await {
            Ok(()) => {
                // The workspace may have been reopened or closed while the
                // prompt was pending.
                let current = slot.borrow().clone();
                match current {
                    Some(center) => {
                        let record = center.borrow_mut().deliver(&notifier, outgoing, Utc::now());
                        let unread = center.borrow().unread_count();
                        ok(&id, json!({ "notification": record, "unreadCount": unread }))
                    }
                    None => no_workspace(&id),
                }
            }
            Err(e) => {
                tracing::info!(error = %e, "notification not sent");
                notify_err(&id, e)
            }
        };
        outbox.push(resp);
    };

    match state.spawner.spawn_local(task) {
        Ok(()) => Reply::Deferred,
        Err(e) => Reply::Now(err(&req.id, "internal", e.to_string(), None)),
    }
}

fn handle_send(state: &mut AppState, req: &Request) -> Reply {
    let title = req
        .params
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let body = req
        .params
        .get("body")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let icon = req.params.get("icon").and_then(|v| v.as_str());
    match Outgoing::new(title, body, icon) {
        Ok(outgoing) => spawn_send(state, req, outgoing),
        Err(e) => Reply::Now(notify_err(&req.id, e)),
    }
}

fn handle_send_demo(state: &mut AppState, req: &Request) -> Reply {
    let mut rng = rand::thread_rng();
    let title = DEMO_TITLES.choose(&mut rng).copied().unwrap_or(DEMO_TITLES[0]);
    let body = DEMO_BODIES.choose(&mut rng).copied().unwrap_or(DEMO_BODIES[0]);
    match Outgoing::new(title, body, None) {
        Ok(outgoing) => spawn_send(state, req, outgoing),
        Err(e) => Reply::Now(notify_err(&req.id, e)),
    }
}

fn handle_templates(req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "templates": [
                {
                    "id": 1,
                    "title": "Assignment Reminder",
                    "body": "Remind students about upcoming assignment deadlines",
                    "kind": "calendar"
                },
                {
                    "id": 2,
                    "title": "Grade Publication",
                    "body": "Notify parents when new grades are available",
                    "kind": "success"
                },
                {
                    "id": 3,
                    "title": "School Event",
                    "body": "Inform about upcoming school events and activities",
                    "kind": "users"
                },
                {
                    "id": 4,
                    "title": "Emergency Alert",
                    "body": "Send urgent notifications to all users",
                    "kind": "alert"
                }
            ]
        }),
    )
}

fn handle_mark_read(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(center) = center_of(state) else {
        return no_workspace(&req.id);
    };
    let Some(id) = req.params.get("id").and_then(|v| v.as_i64()) else {
        return err(&req.id, "bad_params", "missing id", None);
    };
    let mut center = center.borrow_mut();
    let changed = center.mark_read(id);
    ok(
        &req.id,
        json!({ "changed": changed, "unreadCount": center.unread_count() }),
    )
}

fn handle_mark_all_read(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(center) = center_of(state) else {
        return no_workspace(&req.id);
    };
    let mut center = center.borrow_mut();
    let marked = center.mark_all_read();
    ok(
        &req.id,
        json!({ "marked": marked, "unreadCount": center.unread_count() }),
    )
}

fn handle_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(center) = center_of(state) else {
        return no_workspace(&req.id);
    };
    center.borrow_mut().clear();
    ok(&req.id, json!({ "ok": true, "unreadCount": 0 }))
}

fn handle_unread_count(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(center) = center_of(state) else {
        return no_workspace(&req.id);
    };
    let unread = center.borrow().unread_count();
    ok(&req.id, json!({ "unreadCount": unread }))
}

fn handle_modal(state: &mut AppState, req: &Request, open: bool) -> serde_json::Value {
    let Some(center) = center_of(state) else {
        return no_workspace(&req.id);
    };
    let mut center = center.borrow_mut();
    if open {
        center.open_modal();
    } else {
        center.close_modal();
    }
    ok(&req.id, json!({ "modalOpen": center.is_modal_open() }))
}

fn handle_permission_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "permission": state.permission.current_permission(),
            "promptPending": state.permission.prompt_pending(),
        }),
    )
}

fn handle_permission_report(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw) = req.params.get("permission").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing permission", None);
    };
    let answer = match raw.parse::<PermissionState>() {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let effective = state.permission.resolve(answer);
    ok(&req.id, json!({ "permission": effective }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Reply> {
    let reply = match req.method.as_str() {
        "notifications.list" => Reply::Now(handle_list(state, req)),
        "notifications.send" => handle_send(state, req),
        "notifications.sendDemo" => handle_send_demo(state, req),
        "notifications.templates" => Reply::Now(handle_templates(req)),
        "notifications.markRead" => Reply::Now(handle_mark_read(state, req)),
        "notifications.markAllRead" => Reply::Now(handle_mark_all_read(state, req)),
        "notifications.clear" => Reply::Now(handle_clear(state, req)),
        "notifications.unreadCount" => Reply::Now(handle_unread_count(state, req)),
        "notifications.modal.open" => Reply::Now(handle_modal(state, req, true)),
        "notifications.modal.close" => Reply::Now(handle_modal(state, req, false)),
        "notifications.permission.get" => Reply::Now(handle_permission_get(state, req)),
        "notifications.permission.report" => Reply::Now(handle_permission_report(state, req)),
        _ => return None,
    };
    Some(reply)
}
