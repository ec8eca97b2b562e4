#![allow(dead_code)]

use serde_json::json;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

pub fn temp_dir(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("create temp dir")
}

/// A running `eduadmind` driven over its stdin/stdout pipes. Event lines seen
/// while waiting for a response are queued for [`Sidecar::next_event`].
pub struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    events: VecDeque<serde_json::Value>,
}

impl Sidecar {
    pub fn spawn(args: &[&str]) -> Self {
        let exe = env!("CARGO_BIN_EXE_eduadmind");
        let mut child = Command::new(exe)
            .args(args)
            .env_remove("EDUADMIN_WORKSPACE")
            .env_remove("EDUADMIN_NOTIFICATION_PERMISSION")
            .env("EDUADMIN_LOG", "warn")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn eduadmind");
        let stdin = child.stdin.take().expect("child stdin");
        let stdout = child.stdout.take().expect("child stdout");
        Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
            events: VecDeque::new(),
        }
    }

    pub fn with_workspace(workspace: &Path, permission: &str) -> Self {
        let ws = workspace.to_string_lossy().to_string();
        Self::spawn(&["--workspace", &ws, "--notification-permission", permission])
    }

    fn read_value(&mut self) -> serde_json::Value {
        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read line");
        assert!(!line.trim().is_empty(), "sidecar closed stdout");
        serde_json::from_str(line.trim()).expect("parse output json")
    }

    /// Writes a request without waiting for its response.
    pub fn send(&mut self, id: &str, method: &str, params: serde_json::Value) {
        let payload = json!({ "id": id, "method": method, "params": params });
        writeln!(self.stdin, "{}", payload).expect("write request");
        self.stdin.flush().expect("flush request");
    }

    pub fn send_raw(&mut self, line: &str) {
        writeln!(self.stdin, "{}", line).expect("write raw line");
        self.stdin.flush().expect("flush raw line");
    }

    /// Next non-event line, whatever its id.
    pub fn next_response(&mut self) -> serde_json::Value {
        loop {
            let value = self.read_value();
            if value.get("event").is_some() {
                self.events.push_back(value);
                continue;
            }
            return value;
        }
    }

    pub fn response_for(&mut self, id: &str) -> serde_json::Value {
        let value = self.next_response();
        assert_eq!(
            value.get("id").and_then(|v| v.as_str()),
            Some(id),
            "unexpected response: {}",
            value
        );
        value
    }

    pub fn request(&mut self, id: &str, method: &str, params: serde_json::Value) -> serde_json::Value {
        self.send(id, method, params);
        self.response_for(id)
    }

    pub fn request_ok(&mut self, id: &str, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(id, method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            value
        );
        value["result"].clone()
    }

    pub fn request_err(&mut self, id: &str, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(id, method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            value
        );
        value["error"].clone()
    }

    /// Next event line, from the queue or the pipe.
    pub fn next_event(&mut self) -> serde_json::Value {
        if let Some(ev) = self.events.pop_front() {
            return ev;
        }
        let value = self.read_value();
        assert!(value.get("event").is_some(), "expected an event, got {}", value);
        value
    }

    pub fn take_events(&mut self) -> Vec<serde_json::Value> {
        self.events.drain(..).collect()
    }

    pub fn shutdown(mut self) {
        drop(self.stdin);
        let _ = self.child.wait();
    }
}
