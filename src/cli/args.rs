// src/cli/args.rs
use clap::Parser;
use std::path::PathBuf;

/// Options taken before the task name; everything from the task name on is `command`.
#[derive(Parser, Debug, Default)]
#[command(name = "tasker", no_binary_name = true, disable_version_flag = true)]
pub struct RunnerArgs {
    /// List hidden tasks and hidden groups too.
    #[arg(short, long)]
    pub all: bool,

    /// Only list tasks carrying one of these tags.
    #[arg(short, long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Only list tasks whose name or summary matches this regular expression.
    #[arg(short, long)]
    pub search: Option<String>,

    /// List important tasks before the others.
    #[arg(long)]
    pub important_first: bool,

    /// List hidden tasks after the others.
    #[arg(long)]
    pub hidden_last: bool,

    /// Show task aliases in the listing.
    #[arg(long)]
    pub aliases: bool,

    /// Read configuration from this file instead of discovering `tasker.toml`.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Raise log verbosity; repeat for more.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// The task or group, followed by its own arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}
