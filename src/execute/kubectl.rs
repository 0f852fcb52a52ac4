//! kubectl passthrough: authorization and argument sanitizing.
//!
//! Only streaming flags are stripped and only `--cluster-name` is checked;
//! every other kubectl flag reaches the binary as typed. The verb allowlist
//! is what keeps this read-only.

use super::{AuthorizationContext, CLUSTER_FLAG, Executor, ParsedCommand};
use crate::utils::trim_quotes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

const FOLLOW_FLAG: &str = "--follow";
const ABBR_FOLLOW_FLAG: &str = "-f";
const WATCH_FLAG: &str = "--watch";
const ABBR_WATCH_FLAG: &str = "-w";

#[derive(Debug, PartialEq)]
pub(super) enum ClusterFlag<'a> {
    /// `--cluster-name value`; the value is the next token.
    Separate,
    /// `--cluster-name=value`
    Inline(&'a str),
}

pub(super) fn cluster_flag(token: &str) -> Option<ClusterFlag<'_>> {
    let rest = token.strip_prefix(CLUSTER_FLAG)?;
    if rest.is_empty() {
        return Some(ClusterFlag::Separate);
    }
    rest.strip_prefix('=').map(ClusterFlag::Inline)
}

fn is_short_flag(token: &str, flag: &str) -> bool {
    token == flag
        || token
            .strip_prefix(flag)
            .is_some_and(|rest| rest.starts_with('='))
}

/// `-f`, `-f=..`, and anything starting with `--follow`.
fn is_follow_flag(token: &str) -> bool {
    is_short_flag(token, ABBR_FOLLOW_FLAG) || token.starts_with(FOLLOW_FLAG)
}

/// `-w`, `-w=..`, and anything starting with `--watch` (`--watch-only` too).
fn is_watch_flag(token: &str) -> bool {
    is_short_flag(token, ABBR_WATCH_FLAG) || token.starts_with(WATCH_FLAG)
}

#[derive(Debug, PartialEq)]
pub enum Decision {
    /// Passthrough is switched off for this deployment.
    Disabled,
    /// Not authorized or aimed at another cluster; reply with nothing.
    Reject,
    /// Run kubectl with these arguments.
    Forward(Vec<String>),
}

/// Decide whether `tokens` (verb included) may run, and with which
/// arguments.
///
/// `-n <default_namespace>` is always prepended, even if the caller passed
/// a namespace of their own.
pub fn authorize(
    tokens: &[String],
    ctx: &AuthorizationContext,
    default_namespace: &str,
) -> Decision {
    if !ctx.allow_kubectl {
        return Decision::Disabled;
    }

    let mut args = ["-n", default_namespace]
        .into_iter()
        .chain(tokens.iter().map(String::as_str))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let mut authorized = ctx.is_auth_channel;
    let mut forwarded = Vec::with_capacity(tokens.len() + 2);
    while let Some(arg) = args.next() {
        if is_follow_flag(arg) || is_watch_flag(arg) {
            continue;
        }
        let value = match cluster_flag(arg) {
            Some(ClusterFlag::Separate) => match args.next() {
                Some(value) => value,
                None => return Decision::Reject,
            },
            Some(ClusterFlag::Inline(value)) => value,
            None => {
                forwarded.push(arg.to_string());
                continue;
            }
        };
        if trim_quotes(value) != ctx.cluster_name {
            return Decision::Reject;
        }
        authorized = true;
    }

    if !authorized {
        return Decision::Reject;
    }
    Decision::Forward(forwarded)
}

pub(super) async fn run(
    exec: &Executor,
    command: &ParsedCommand,
    ctx: &AuthorizationContext,
    cancel: &CancellationToken,
) -> String {
    let args = match authorize(command.tokens(), ctx, &exec.default_namespace) {
        Decision::Disabled => {
            return format!(
                "Sorry, the admin hasn't given me the permission to execute kubectl command on cluster '{}'.",
                ctx.cluster_name
            );
        }
        Decision::Reject => {
            debug!("[{}] Not running kubectl {}", ctx.cluster_name, command.verb());
            return String::new();
        }
        Decision::Forward(args) => args,
    };

    let invocation = exec.runner.run(&exec.kubectl, &args, cancel).await;
    match invocation.failure {
        None => format!("Cluster: {}\n{}", ctx.cluster_name, invocation.output),
        Some(e) => {
            error!(
                "[{}] Error in executing kubectl command: {}",
                ctx.cluster_name, e
            );
            format!("Cluster: {}\n{}{}", ctx.cluster_name, invocation.output, e)
        }
    }
}
