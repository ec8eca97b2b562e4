use crate::notifications::NotifyError;
use crate::validation::ValidationError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn validation_err(id: &str, e: ValidationError) -> serde_json::Value {
    err(
        id,
        "validation_failed",
        e.to_string(),
        Some(json!({ "fieldErrors": e.0 })),
    )
}

pub fn notify_err(id: &str, e: NotifyError) -> serde_json::Value {
    err(id, e.code(), e.to_string(), None)
}

pub fn no_workspace(id: &str) -> serde_json::Value {
    err(id, "no_workspace", "select a workspace first", None)
}
