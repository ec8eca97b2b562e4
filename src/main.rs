mod backup;
mod config;
mod db;
mod demo;
mod ipc;
mod notifications;
mod validation;

use clap::Parser;
use futures::executor::LocalPool;
use serde_json::json;
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn write_line(stdout: &mut impl Write, value: &serde_json::Value) -> io::Result<()> {
    let line = serde_json::to_string(value).unwrap_or_else(|_| "{\"ok\":false}".to_string());
    writeln!(stdout, "{}", line)?;
    stdout.flush()
}

fn main() {
    let config = config::Config::parse();

    // stdout carries the IPC channel, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .init();

    let mut pool = LocalPool::new();
    let mut state = ipc::AppState::new(&config, pool.spawner());

    if let Some(path) = config.workspace.as_deref() {
        if let Err(e) = state.open_workspace(path) {
            tracing::error!(workspace = %path.display(), error = %e, "failed to open workspace");
        }
    }
    tracing::info!(
        permission = %config.notification_permission,
        "eduadmind ready"
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => {
                if let ipc::Reply::Now(resp) = ipc::handle_request(&mut state, req) {
                    state.outbox.push(resp);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "unparseable request line");
                // No id to answer to.
                state.outbox.push(json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                }));
            }
        }

        // Let parked sends make progress (a permission report may release them).
        pool.run_until_stalled();

        for value in state.outbox.drain() {
            if write_line(&mut stdout, &value).is_err() {
                return;
            }
        }
    }
    tracing::info!("stdin closed, shutting down");
}
