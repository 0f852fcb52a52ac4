use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kube-herald")]
#[command(about = "Enrich Kubernetes events with recommendations and answer kubectl commands from chat")]
pub struct Cli {
    /// Config file (default: $CONFIG_PATH/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Watch pods and answer chat commands read from stdin
    Run {
        /// Channel the console speaks for (default: the configured slack channel)
        #[arg(long)]
        channel: Option<String>,
    },
    /// Handle a single chat command and print the reply
    Exec {
        /// Channel the command is sent from (default: the configured slack channel)
        #[arg(long)]
        channel: Option<String>,

        /// The chat message, e.g. `get pods --cluster-name prod`
        #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        message: Vec<String>,
    },
}
