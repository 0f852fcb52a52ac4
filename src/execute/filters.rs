use super::{AuthorizationContext, Executor, INCOMPLETE_CMD_MSG, ParsedCommand, UNSUPPORTED_CMD_MSG};
use crate::filters::FilterStatus;
use crate::utils::render_table;
use tracing::debug;

/// FILTER / ENABLED / DESCRIPTION table, one row per filter.
pub fn render_filter_list(statuses: &[FilterStatus]) -> String {
    let rows: Vec<Vec<String>> = statuses
        .iter()
        .map(|s| vec![s.name.clone(), s.enabled.to_string(), s.description.clone()])
        .collect();
    render_table(&["FILTER", "ENABLED", "DESCRIPTION"], &rows)
}

pub(super) async fn run(
    exec: &Executor,
    command: &ParsedCommand,
    ctx: &AuthorizationContext,
) -> String {
    if !ctx.is_auth_channel {
        return String::new();
    }
    let args = command.args();
    let Some(action) = args.first() else {
        return INCOMPLETE_CMD_MSG.to_string();
    };

    let enable = match action.as_str() {
        "list" => {
            debug!("List filters");
            return render_filter_list(&exec.filters.list().await);
        }
        "enable" => true,
        "disable" => false,
        _ => return UNSUPPORTED_CMD_MSG.to_string(),
    };

    let Some(name) = args.get(1) else {
        return format!(
            "You forgot to pass filter name. Please pass one of the following valid filters:\n\n{}",
            render_filter_list(&exec.filters.list().await)
        );
    };
    debug!("Setting filter {} enabled={}", name, enable);
    if let Err(e) = exec.filters.set_enabled(name, enable).await {
        return e.to_string();
    }
    if enable {
        format!("I have enabled '{}' filter on '{}' cluster.", name, ctx.cluster_name)
    } else {
        format!("Done. I won't run '{}' filter on '{}' cluster.", name, ctx.cluster_name)
    }
}
