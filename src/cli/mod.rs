// src/cli/mod.rs

//! The command-line front end: runner options, logging setup, error reporting
//! and rendering of whatever a dispatch produced.

pub mod args;
pub mod display;

use crate::constants::EXTRA_ARGS_DELIMITER;
use crate::core::config_loader::{self, ConfigError, ErrorMode, ListingConfig};
use crate::core::dispatcher::{DispatchError, Outcome, split_extra_args, usage_exit_code};
use crate::core::listing::ListingSettings;
use crate::core::registry::RegistrationError;
use crate::models::ModuleDef;
use crate::state::Runtime;
use args::RunnerArgs;
use clap::Parser;
use clap::error::ErrorKind;
use colored::Colorize;
use std::env;
use std::process::ExitCode;
use thiserror::Error;

pub use display::{print_outcome, render_listing};

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// Invalid runner options, before any task name.
    #[error(transparent)]
    Usage(clap::Error),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Dispatch(err) => err.exit_code(),
            Self::Usage(err) => usage_exit_code(err),
            _ => 1,
        }
    }

    fn clap_error(&self) -> Option<&clap::Error> {
        match self {
            Self::Usage(err) | Self::Dispatch(DispatchError::Usage(err)) => Some(err),
            _ => None,
        }
    }
}

/// Listing settings from config, overridden by runner options.
pub fn listing_settings(config: &ListingConfig, args: &RunnerArgs) -> ListingSettings {
    let mut settings = ListingSettings::from_config(config);
    if args.all {
        settings = settings.reveal_hidden();
    }
    if !args.tags.is_empty() {
        settings.filter.tags = args.tags.clone();
    }
    if args.search.is_some() {
        settings.filter.search = args.search.clone();
    }
    settings.sort.important_first |= args.important_first;
    settings.sort.hidden_last |= args.hidden_last;
    settings.show_aliases |= args.aliases;
    settings
}

fn parse_runner_args(front: &[String]) -> Result<Result<RunnerArgs, String>, CliError> {
    match RunnerArgs::try_parse_from(front) {
        Ok(args) => Ok(Ok(args)),
        Err(err) if err.kind() == ErrorKind::DisplayHelp => Ok(Err(err.render().to_string())),
        Err(err) => Err(CliError::Usage(err)),
    }
}

/// Parses runner options and dispatches the rest against a loaded runtime.
///
/// Everything after `--` is kept away from the runner options and handed to
/// the task as extra args.
pub fn execute(rt: &mut Runtime, argv: &[String]) -> Result<Outcome, CliError> {
    let (front, extra) = split_extra_args(argv);
    let args = match parse_runner_args(front)? {
        Ok(args) => args,
        Err(help) => return Ok(Outcome::Help(help)),
    };
    log::debug!("Runner args: {:?}", args);

    let mut command = args.command.clone();
    if argv.iter().any(|arg| arg == EXTRA_ARGS_DELIMITER) {
        command.push(EXTRA_ARGS_DELIMITER.to_string());
        command.extend(extra.iter().cloned());
    }

    let settings = listing_settings(&rt.config().listing, &args);
    Ok(rt.dispatch_with(&command, &settings)?)
}

/// Prints an error the way the front end reports it and returns the exit code.
pub fn report_error(err: &CliError) -> u8 {
    match err.clap_error() {
        Some(clap_err) => {
            if clap_err.print().is_err() {
                eprintln!("{}", clap_err);
            }
        }
        None => eprintln!("{}: {}", "Error".red().bold(), err),
    }
    err.exit_code()
}

/// Executes and prints the outcome. With `on_error = "exit"` a failure is
/// reported and the process exits; with `"raise"` it is returned.
pub fn run(rt: &mut Runtime, argv: &[String]) -> Result<Outcome, CliError> {
    match execute(rt, argv) {
        Ok(outcome) => {
            print_outcome(&outcome);
            Ok(outcome)
        }
        Err(err) => match rt.config().on_error {
            ErrorMode::Raise => Err(err),
            ErrorMode::Exit => {
                let code = report_error(&err);
                std::process::exit(i32::from(code));
            }
        },
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}

fn bootstrap(entry: &ModuleDef, argv: &[String]) -> Result<Outcome, CliError> {
    let (front, _) = split_extra_args(argv);
    // Help is rendered later by `execute`; here only -v and -c matter.
    let early = RunnerArgs::try_parse_from(front).unwrap_or_default();
    init_logging(early.verbose);

    let cwd = env::current_dir().unwrap_or_default();
    let config = config_loader::load(early.config.as_deref(), &cwd)?;
    let mut rt = Runtime::new(config);
    rt.load(entry)?;
    let outcome = execute(&mut rt, argv)?;
    print_outcome(&outcome);
    Ok(outcome)
}

/// The whole program for a binary whose tasks live in `entry`.
pub fn main_for(entry: &ModuleDef) -> ExitCode {
    let argv: Vec<String> = env::args().skip(1).collect();
    match bootstrap(entry, &argv) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => ExitCode::from(report_error(&err)),
    }
}
