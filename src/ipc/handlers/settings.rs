use crate::db;
use crate::ipc::error::{err, no_workspace, ok};
use crate::ipc::types::{AppState, Request};
use crate::validation::is_email;
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SettingsSection {
    Profile,
    Notifications,
    Security,
    Appearance,
    System,
}

const ALL_SECTIONS: [SettingsSection; 5] = [
    SettingsSection::Profile,
    SettingsSection::Notifications,
    SettingsSection::Security,
    SettingsSection::Appearance,
    SettingsSection::System,
];

const LANGUAGES: &[&str] = &["English (US)", "Spanish", "French", "German"];
const TIME_ZONES: &[&str] = &[
    "UTC-5 (Eastern Time)",
    "UTC-6 (Central Time)",
    "UTC-7 (Mountain Time)",
    "UTC-8 (Pacific Time)",
];

impl SettingsSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "profile" => Some(Self::Profile),
            "notifications" => Some(Self::Notifications),
            "security" => Some(Self::Security),
            "appearance" => Some(Self::Appearance),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Notifications => "notifications",
            Self::Security => "security",
            Self::Appearance => "appearance",
            Self::System => "system",
        }
    }

    fn key(self) -> String {
        format!("settings.{}", self.name())
    }
}

fn default_section(section: SettingsSection) -> Value {
    match section {
        SettingsSection::Profile => json!({
            "firstName": "Admin",
            "lastName": "User",
            "email": "admin@school.edu",
            "phone": "+1 (555) 123-4567",
            "bio": "School administrator with 10+ years of experience in educational management."
        }),
        SettingsSection::Notifications => json!({
            "emailNotifications": true,
            "pushNotifications": true,
            "smsNotifications": false,
            "weeklyReports": true,
            "systemAlerts": true
        }),
        SettingsSection::Security => json!({
            "twoFactorEnabled": false,
            "confirmDeletes": true,
            "autoLockMinutes": 0
        }),
        SettingsSection::Appearance => json!({
            "theme": "light",
            "language": "English (US)",
            "timeZone": "UTC-5 (Eastern Time)"
        }),
        SettingsSection::System => json!({
            "autoBackup": false,
            "backupRetentionDays": 30
        }),
    }
}

fn parse_bool(v: &Value, key: &str) -> Result<bool, String> {
    v.as_bool().ok_or_else(|| format!("{} must be boolean", key))
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_string_max(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.len() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    Ok(s.to_string())
}

fn parse_choice(v: &Value, key: &str, options: &[&str]) -> Result<String, String> {
    let s = parse_string_max(v, key, 64)?;
    if !options.contains(&s.as_str()) {
        return Err(format!("{} must be one of: {}", key, options.join(", ")));
    }
    Ok(s)
}

fn merge_section_patch(
    section: SettingsSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = current
        .as_object_mut()
        .ok_or_else(|| "internal settings object must be a JSON object".to_string())?;
    for (k, v) in patch {
        let value = match section {
            SettingsSection::Profile => match k.as_str() {
                "firstName" | "lastName" => {
                    let s = parse_string_max(v, k, 80)?;
                    if s.is_empty() {
                        return Err(format!("{} must not be empty", k));
                    }
                    Value::String(s)
                }
                "email" => {
                    let s = parse_string_max(v, k, 200)?;
                    if !is_email(&s) {
                        return Err("email must be a valid address".into());
                    }
                    Value::String(s)
                }
                "phone" => Value::String(parse_string_max(v, k, 40)?),
                "bio" => Value::String(parse_string_max(v, k, 1000)?),
                _ => return Err(format!("unknown profile field: {}", k)),
            },
            SettingsSection::Notifications => match k.as_str() {
                "emailNotifications" | "pushNotifications" | "smsNotifications"
                | "weeklyReports" | "systemAlerts" => Value::Bool(parse_bool(v, k)?),
                _ => return Err(format!("unknown notifications field: {}", k)),
            },
            SettingsSection::Security => match k.as_str() {
                "twoFactorEnabled" | "confirmDeletes" => Value::Bool(parse_bool(v, k)?),
                "autoLockMinutes" => Value::from(parse_i64_range(v, k, 0, 240)?),
                _ => return Err(format!("unknown security field: {}", k)),
            },
            SettingsSection::Appearance => match k.as_str() {
                "theme" => {
                    let t = parse_string_max(v, k, 16)?.to_ascii_lowercase();
                    if t != "light" && t != "dark" {
                        return Err("theme must be one of: light, dark".into());
                    }
                    Value::String(t)
                }
                "language" => Value::String(parse_choice(v, k, LANGUAGES)?),
                "timeZone" => Value::String(parse_choice(v, k, TIME_ZONES)?),
                _ => return Err(format!("unknown appearance field: {}", k)),
            },
            SettingsSection::System => match k.as_str() {
                "autoBackup" => Value::Bool(parse_bool(v, k)?),
                "backupRetentionDays" => Value::from(parse_i64_range(v, k, 1, 365)?),
                _ => return Err(format!("unknown system field: {}", k)),
            },
        };
        obj.insert(k.clone(), value);
    }
    Ok(())
}

fn load_section(conn: &rusqlite::Connection, section: SettingsSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, &section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Saved values that no longer validate fall back to defaults.
            for (k, v) in saved_obj {
                let mut single = Map::new();
                single.insert(k.clone(), v.clone());
                let _ = merge_section_patch(section, &mut current, &single);
            }
        }
    }
    Ok(current)
}

fn handle_settings_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let mut out = Map::new();
    for section in ALL_SECTIONS {
        match load_section(conn, section) {
            Ok(v) => {
                out.insert(section.name().to_string(), v);
            }
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        }
    }
    out.insert(
        "systemInfo".to_string(),
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "databaseStatus": "Connected",
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    );
    ok(&req.id, Value::Object(out))
}

fn handle_settings_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return no_workspace(&req.id);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SettingsSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(conn, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, &section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    tracing::info!(section = section.name(), "settings updated");
    ok(
        &req.id,
        json!({ "ok": true, "section": section.name(), "values": current }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "settings.get" => Some(handle_settings_get(state, req)),
        "settings.update" => Some(handle_settings_update(state, req)),
        _ => None,
    }
}
