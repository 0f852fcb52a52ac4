//! Chat command handling: tokenizing, routing by verb and the per-verb
//! handlers. Every outcome is text; an empty string means "say nothing".

pub mod filters;
pub mod kubectl;
pub mod notifier;
pub mod version;

use crate::config::Config;
use crate::filters::FilterRegistry;
use crate::pipeline::NotifySwitch;
use crate::runner::ProcessRunner;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const UNSUPPORTED_CMD_MSG: &str = "Command not supported. Please check the documentation for supported commands.";
pub const INCOMPLETE_CMD_MSG: &str = "You missed to pass options for the command. Please check the documentation for command options.";

pub const CLUSTER_FLAG: &str = "--cluster-name";

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
}

/// A chat message split into whitespace-delimited tokens; the first one is
/// the verb.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    tokens: Vec<String>,
}

impl ParsedCommand {
    pub fn verb(&self) -> &str {
        &self.tokens[0]
    }

    pub fn args(&self) -> &[String] {
        &self.tokens[1..]
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

pub fn parse(message: &str) -> Result<ParsedCommand, ParseError> {
    let tokens: Vec<String> = message.split_whitespace().map(String::from).collect();
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(ParsedCommand { tokens })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Kubectl,
    Notifier,
    Filters,
    Ping,
    Version,
}

/// Verb allowlist. Every verb maps to exactly one handler.
const VERBS: &[(&str, Verb)] = &[
    ("api-resources", Verb::Kubectl),
    ("api-versions", Verb::Kubectl),
    ("cluster-info", Verb::Kubectl),
    ("describe", Verb::Kubectl),
    ("diff", Verb::Kubectl),
    ("explain", Verb::Kubectl),
    ("get", Verb::Kubectl),
    ("logs", Verb::Kubectl),
    ("top", Verb::Kubectl),
    ("auth", Verb::Kubectl),
    ("notifier", Verb::Notifier),
    ("filters", Verb::Filters),
    ("ping", Verb::Ping),
    ("version", Verb::Version),
];

pub fn lookup_verb(token: &str) -> Option<Verb> {
    VERBS.iter().find(|(v, _)| *v == token).map(|(_, verb)| *verb)
}

/// What the sender of one message is entitled to.
#[derive(Debug, Clone)]
pub struct AuthorizationContext {
    pub cluster_name: String,
    /// The message came from a pre-authorized admin channel.
    pub is_auth_channel: bool,
    /// kubectl passthrough is permitted on this deployment.
    pub allow_kubectl: bool,
}

impl AuthorizationContext {
    pub fn new(config: &Config, is_auth_channel: bool) -> Self {
        AuthorizationContext {
            cluster_name: config.settings.cluster_name.clone(),
            is_auth_channel,
            allow_kubectl: config.settings.allow_kubectl,
        }
    }
}

/// Outcome of looking for `--cluster-name` in a command.
#[derive(Debug, PartialEq)]
enum ClusterScope {
    Absent,
    Matches,
    Mismatch,
}

/// Checks every `--cluster-name value` / `--cluster-name=value` in `tokens`
/// against `cluster`. A flag with no value counts as a mismatch.
fn cluster_scope(tokens: &[String], cluster: &str) -> ClusterScope {
    let mut scope = ClusterScope::Absent;
    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        let value = match kubectl::cluster_flag(token) {
            Some(kubectl::ClusterFlag::Separate) => match iter.next() {
                Some(value) => value.as_str(),
                None => return ClusterScope::Mismatch,
            },
            Some(kubectl::ClusterFlag::Inline(value)) => value,
            None => continue,
        };
        if crate::utils::trim_quotes(value) != cluster {
            return ClusterScope::Mismatch;
        }
        scope = ClusterScope::Matches;
    }
    scope
}

/// Shared state the command handlers operate on.
pub struct Executor {
    filters: Arc<FilterRegistry>,
    notify: Arc<NotifySwitch>,
    runner: Arc<dyn ProcessRunner>,
    kubectl: PathBuf,
    default_namespace: String,
    config_path: PathBuf,
}

impl Executor {
    pub fn new(
        config: &Config,
        config_path: PathBuf,
        filters: Arc<FilterRegistry>,
        notify: Arc<NotifySwitch>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Executor {
            filters,
            notify,
            runner,
            kubectl: config.settings.kubectl.binary.clone(),
            default_namespace: config.settings.kubectl.default_namespace.clone(),
            config_path,
        }
    }

    /// Handle one chat message and return the reply. An empty reply must
    /// not be posted.
    pub async fn execute(
        &self,
        message: &str,
        ctx: &AuthorizationContext,
        cancel: &CancellationToken,
    ) -> String {
        let command = match parse(message) {
            Ok(command) => command,
            Err(e) => {
                debug!("Ignoring message: {}", e);
                return String::new();
            }
        };

        match lookup_verb(command.verb()) {
            Some(Verb::Kubectl) => kubectl::run(self, &command, ctx, cancel).await,
            Some(Verb::Notifier) => notifier::run(self, &command, ctx),
            Some(Verb::Filters) => filters::run(self, &command, ctx).await,
            Some(Verb::Ping) => {
                let version = version::run(self, &command, ctx, cancel).await;
                if version.is_empty() {
                    return String::new();
                }
                format!("pong from cluster '{}'\n\n{}", ctx.cluster_name, version)
            }
            Some(Verb::Version) => version::run(self, &command, ctx, cancel).await,
            None if ctx.is_auth_channel => UNSUPPORTED_CMD_MSG.to_string(),
            None => String::new(),
        }
    }
}
