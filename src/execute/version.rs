use super::{AuthorizationContext, ClusterScope, Executor, ParsedCommand, cluster_scope};
use regex::Regex;
use std::sync::LazyLock;
use tokio_util::sync::CancellationToken;
use tracing::warn;

static SERVER_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^Server Version:\s*(\S+)").expect("server version pattern is valid")
});

const UNKNOWN_SERVER_VERSION: &str = "Server Version: Unknown";

fn bot_version() -> String {
    std::env::var("KUBE_HERALD_VERSION")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
}

/// Pull `Server Version: <v>` out of `kubectl version` output.
pub fn server_version(output: &str) -> Option<String> {
    SERVER_VERSION
        .captures(output)
        .map(|caps| format!("Server Version: {}", &caps[1]))
}

/// Cluster and bot versions, or nothing when the command targets another
/// cluster.
pub(super) async fn run(
    exec: &Executor,
    command: &ParsedCommand,
    ctx: &AuthorizationContext,
    cancel: &CancellationToken,
) -> String {
    if cluster_scope(command.args(), &ctx.cluster_name) == ClusterScope::Mismatch {
        return String::new();
    }

    let invocation = exec
        .runner
        .run(&exec.kubectl, &["version".to_string()], cancel)
        .await;
    let server = match (&invocation.failure, server_version(&invocation.output)) {
        (None, Some(server)) => server,
        (failure, _) => {
            warn!(
                "[{}] Failed to get Kubernetes version: {}",
                ctx.cluster_name,
                failure
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no server version in output".to_string())
            );
            UNKNOWN_SERVER_VERSION.to_string()
        }
    };
    format!("K8s {}\nkube-herald version: {}", server, bot_version())
}
