use super::handlers;
use super::types::{AppState, Reply, Request};
use crate::ipc::error::err;

type Family = fn(&mut AppState, &Request) -> Option<serde_json::Value>;

const FAMILIES: &[Family] = &[
    handlers::core::try_handle,
    handlers::students::try_handle,
    handlers::teachers::try_handle,
    handlers::classes::try_handle,
    handlers::fees::try_handle,
    handlers::holidays::try_handle,
    handlers::settings::try_handle,
    handlers::dashboard::try_handle,
    handlers::backup::try_handle,
];

pub fn handle_request(state: &mut AppState, req: Request) -> Reply {
    tracing::debug!(id = %req.id, method = %req.method, "dispatch");

    if let Some(reply) = handlers::notifications::try_handle(state, &req) {
        return reply;
    }
    for family in FAMILIES {
        if let Some(resp) = family(state, &req) {
            return Reply::Now(resp);
        }
    }

    Reply::Now(err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    ))
}
