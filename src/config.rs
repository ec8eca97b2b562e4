use crate::notifications::PermissionState;
use clap::Parser;
use std::path::PathBuf;

/// EduAdmin dashboard sidecar: newline-delimited JSON requests on stdin,
/// responses and events on stdout, logs on stderr.
#[derive(Debug, Clone, Parser)]
#[command(name = "eduadmind", version, about)]
pub struct Config {
    /// Workspace directory to open at startup.
    #[arg(long, env = "EDUADMIN_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Platform notification permission as the host reports it at launch.
    #[arg(
        long,
        env = "EDUADMIN_NOTIFICATION_PERMISSION",
        value_enum,
        default_value = "undecided"
    )]
    pub notification_permission: PermissionState,

    /// Icon (and badge) used for platform notifications sent without one.
    #[arg(long, env = "EDUADMIN_NOTIFICATION_ICON", default_value = "/vite.svg")]
    pub notification_icon: String,

    /// Log filter directive, e.g. `info` or `eduadmind=debug`.
    #[arg(long = "log", env = "EDUADMIN_LOG", default_value = "info")]
    pub log_filter: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_headless_friendly() {
        let cfg = Config::try_parse_from(["eduadmind"]).expect("parse");
        assert_eq!(cfg.notification_permission, PermissionState::Undecided);
        assert_eq!(cfg.notification_icon, "/vite.svg");
        assert!(cfg.workspace.is_none());
    }

    #[test]
    fn accepts_browser_permission_names() {
        let cfg = Config::try_parse_from(["eduadmind", "--notification-permission", "default"])
            .expect("parse");
        assert_eq!(cfg.notification_permission, PermissionState::Undecided);
        let cfg = Config::try_parse_from(["eduadmind", "--notification-permission", "granted"])
            .expect("parse");
        assert_eq!(cfg.notification_permission, PermissionState::Granted);
    }
}
