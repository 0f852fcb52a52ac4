use super::{AuthorizationContext, Executor, INCOMPLETE_CMD_MSG, ParsedCommand, UNSUPPORTED_CMD_MSG};
use crate::config::Config;
use std::path::Path;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NotifierAction {
    Start,
    Stop,
    Status,
    ShowConfig,
}

impl NotifierAction {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "start" => Some(NotifierAction::Start),
            "stop" => Some(NotifierAction::Stop),
            "status" => Some(NotifierAction::Status),
            "showconfig" => Some(NotifierAction::ShowConfig),
            _ => None,
        }
    }
}

/// The configuration on disk with all credentials blanked, as YAML.
pub fn show_config(path: &Path) -> anyhow::Result<String> {
    Config::load(path)?.redacted().to_yaml()
}

pub(super) fn run(exec: &Executor, command: &ParsedCommand, ctx: &AuthorizationContext) -> String {
    if !ctx.is_auth_channel {
        return String::new();
    }
    let Some(action) = command.args().first() else {
        return INCOMPLETE_CMD_MSG.to_string();
    };
    let cluster = &ctx.cluster_name;

    match NotifierAction::from_token(action) {
        Some(NotifierAction::Start) => {
            exec.notify.set(true);
            info!("[{}] Notifier enabled", cluster);
            format!("Brace yourselves, notifications are coming from cluster '{}'.", cluster)
        }
        Some(NotifierAction::Stop) => {
            exec.notify.set(false);
            info!("[{}] Notifier disabled", cluster);
            format!(
                "Sure! I won't send you notifications from cluster '{}' anymore.",
                cluster
            )
        }
        Some(NotifierAction::Status) => {
            let state = if exec.notify.is_enabled() { "on" } else { "off" };
            format!("Notifications are {} for cluster '{}'", state, cluster)
        }
        Some(NotifierAction::ShowConfig) => match show_config(&exec.config_path) {
            Ok(yaml) => format!("Showing config for cluster '{}'\n\n{}", cluster, yaml),
            Err(e) => {
                error!("[{}] Error in executing showconfig command: {:#}", cluster, e);
                "Error in getting configuration!".to_string()
            }
        },
        None => UNSUPPORTED_CMD_MSG.to_string(),
    }
}
