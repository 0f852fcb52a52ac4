mod cli;
mod config;
mod execute;
mod filters;
mod kubernetes;
mod pipeline;
mod runner;
mod types;
mod utils;

use anyhow::Context;
use clap::Parser;
use kube::{Client, config as kube_config};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use cli::{Cli, Command};
use config::Config;
use execute::{AuthorizationContext, Executor};
use filters::FilterRegistry;
use kubernetes::{ResourceWatch, spawn_event_watchers, spawn_pod_watchers};
use pipeline::{EventPipeline, Notifier, NotifySwitch, StdoutNotifier};
use runner::KubectlRunner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Replies go to stdout, so logs go to stderr
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = config::resolve_path(cli.config.as_deref());
    let mut config = Config::load(&config_path)?;
    config.settings.cluster_name = cluster_name(&config);
    info!(
        "[{}] Loaded configuration from {}",
        config.settings.cluster_name,
        config_path.display()
    );

    let filters = Arc::new(FilterRegistry::with_defaults().await);
    let notify = Arc::new(NotifySwitch::default());
    let runner = Arc::new(KubectlRunner::new(Duration::from_secs(
        config.settings.kubectl.timeout_seconds,
    )));

    // Ctrl-C cancels whatever kubectl invocation is in flight
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down");
            shutdown.cancel();
        }
    });

    match cli.command {
        Command::Exec { channel, message } => {
            let executor = Executor::new(&config, config_path, filters, notify, runner);
            let channel = channel.unwrap_or_else(|| config.communications.slack.channel.clone());
            let ctx = AuthorizationContext::new(&config, config.is_auth_channel(&channel));
            let reply = executor.execute(&message.join(" "), &ctx, &cancel).await;
            if !reply.is_empty() {
                println!("{}", reply);
            }
            Ok(())
        }
        Command::Run { channel } => {
            let channel = channel.unwrap_or_else(|| config.communications.slack.channel.clone());
            run(config, config_path, channel, filters, notify, runner, cancel).await
        }
    }
}

/// Resolve the cluster name: the configured one, else the current kubeconfig
/// context.
fn cluster_name(config: &Config) -> String {
    if !config.settings.cluster_name.is_empty() {
        return config.settings.cluster_name.clone();
    }
    match kube_config::Kubeconfig::read() {
        Ok(kubeconfig) => kubeconfig
            .current_context
            .as_deref()
            .unwrap_or("default")
            .to_string(),
        Err(e) => {
            warn!("No cluster name configured and no kubeconfig ({}), using 'default'", e);
            "default".to_string()
        }
    }
}

async fn run(
    config: Config,
    config_path: PathBuf,
    channel: String,
    filters: Arc<FilterRegistry>,
    notify: Arc<NotifySwitch>,
    runner: Arc<KubectlRunner>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let cluster = config.settings.cluster_name.clone();

    let notifier: Arc<dyn Notifier> = Arc::new(StdoutNotifier);
    let pipeline = Arc::new(EventPipeline::new(
        filters.clone(),
        notify.clone(),
        notifier.clone(),
        config.recommendations.0,
    ));

    let pods = config.resource("v1/pods");
    let events = config.resource("v1/events");
    if pods.is_none() && events.is_none() {
        warn!("[{}] No v1/pods or v1/events resource configured, not watching", cluster);
    } else {
        let client = Client::try_default()
            .await
            .context("Failed to create Kubernetes client")?;
        if let Some(resource) = pods {
            info!("[{}] Watching pods", cluster);
            spawn_pod_watchers(
                client.clone(),
                cluster.clone(),
                ResourceWatch::from_resource(resource),
                pipeline.clone(),
            );
        }
        if let Some(resource) = events {
            info!("[{}] Watching events", cluster);
            spawn_event_watchers(
                client,
                cluster.clone(),
                ResourceWatch::from_resource(resource),
                pipeline,
            );
        }
    }

    if let Err(e) = notifier
        .send_message(&format!("...and now my watch begins for cluster '{}'!", cluster))
        .await
    {
        error!("[{}] Failed to send startup message: {:#}", cluster, e);
    }

    let executor = Executor::new(&config, config_path, filters, notify, runner);
    let ctx = AuthorizationContext::new(&config, config.is_auth_channel(&channel));
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(message) => {
                        let reply = executor.execute(&message, &ctx, &cancel).await;
                        if !reply.is_empty() {
                            println!("{}", reply);
                        }
                    }
                    None => {
                        // stdin closed; keep watching until interrupted
                        cancel.cancelled().await;
                        break;
                    }
                }
            }
            _ = cancel.cancelled() => break,
        }
    }
    Ok(())
}
