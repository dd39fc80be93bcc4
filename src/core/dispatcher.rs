// src/core/dispatcher.rs

//! Turns an argv into a listing, a help text or a task run.
//!
//! Resolution order for the first argument:
//! 1. a trailing `:` lists that group, hidden entries included;
//! 2. an exact task name;
//! 3. an alias;
//! 4. a bare group name, listed like 1.

use crate::constants::{EXTRA_ARGS_DELIMITER, GROUP_SUFFIX};
use crate::core::cli_surface::{Parsed, SurfaceError};
use crate::core::converters::{self, ConversionError};
use crate::core::invocation::{BindError, Invocation};
use crate::core::listing::{self, FilterError, Listing, ListingSettings};
use crate::core::parameters::ParamKind;
use crate::core::registry::Task;
use crate::models::{GroupId, TaskHandle, Value};
use crate::state::Runtime;
use clap::error::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("no tasks loaded")]
    NoTasksLoaded,
    #[error("task or group '{name}' not found")]
    NotFound { name: String },
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Usage(#[from] clap::Error),
    #[error(transparent)]
    Call(#[from] BindError),
    #[error("task '{task}' failed: {source:#}")]
    TaskFailed {
        task: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    /// Usage errors keep the parser's own code, except a missing required
    /// value which is a plain user error like everything else (1).
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(err) => usage_exit_code(err),
            _ => 1,
        }
    }
}

/// Exit code for a parser error.
pub fn usage_exit_code(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::MissingRequiredArgument => 1,
        _ => u8::try_from(err.exit_code()).unwrap_or(2),
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;

/// What a dispatch produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Listing(Listing),
    /// Help requested with `-h`/`--help`; the text is ready to print.
    Help(String),
    Completed { task: String, value: Value },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    NoTasks,
    Listing,
    GroupListing(GroupId),
    Task(TaskHandle),
    NotFound(String),
}

/// Splits argv at the first `--`; the delimiter itself belongs to neither side.
pub fn split_extra_args(argv: &[String]) -> (&[String], &[String]) {
    match argv.iter().position(|arg| arg == EXTRA_ARGS_DELIMITER) {
        Some(pos) => (
            argv.get(..pos).unwrap_or_default(),
            argv.get(pos + 1..).unwrap_or_default(),
        ),
        None => (argv, &[]),
    }
}

/// Decides what the first argument refers to in the entry module.
pub fn resolve(rt: &Runtime, first: Option<&str>) -> Resolution {
    let (Some(module), Some(registry)) = (rt.entry(), rt.entry_registry()) else {
        return Resolution::NoTasks;
    };
    if registry.is_empty() {
        return Resolution::NoTasks;
    }
    let Some(name) = first else {
        return Resolution::Listing;
    };

    if let Some(path) = name.strip_suffix(GROUP_SUFFIX) {
        let group = if path.is_empty() {
            rt.default_group(module)
        } else {
            rt.find_group(module, path)
        };
        return group.map_or_else(
            || Resolution::NotFound(name.to_string()),
            Resolution::GroupListing,
        );
    }

    if let Some(index) = registry.resolve(name) {
        log::debug!("Resolved '{}' to a task", name);
        return Resolution::Task(TaskHandle { module, index });
    }
    if let Some(group) = rt.find_group(module, name) {
        log::debug!("Resolved '{}' to a group", name);
        return Resolution::GroupListing(group);
    }
    Resolution::NotFound(name.to_string())
}

/// Runs the dispatch state machine over `argv` (without the program name).
pub fn dispatch(
    rt: &mut Runtime,
    argv: &[String],
    settings: &ListingSettings,
) -> DispatchResult<Outcome> {
    let (args, extra_args) = split_extra_args(argv);
    rt.set_extra_args(extra_args.to_vec());

    let first = args.first().map(String::as_str);
    match resolve(rt, first) {
        Resolution::NoTasks => Err(DispatchError::NoTasksLoaded),
        Resolution::NotFound(name) => Err(DispatchError::NotFound { name }),
        Resolution::Listing => Ok(Outcome::Listing(listing::build_listing(
            rt, settings, None,
        )?)),
        Resolution::GroupListing(group) => {
            let settings = settings.clone().reveal_hidden();
            Ok(Outcome::Listing(listing::build_listing(
                rt,
                &settings,
                Some(group),
            )?))
        }
        Resolution::Task(handle) => {
            let task = rt.task(handle).ok_or_else(|| {
                DispatchError::Internal(format!("dangling task handle {:?}", handle))
            })?;
            invoke(task, args.get(1..).unwrap_or_default(), rt.extra_args())
        }
    }
}

fn invoke(task: &Task, args: &[String], extra_args: &[String]) -> DispatchResult<Outcome> {
    log::debug!("Invoking '{}' with {:?}", task.name, args);
    let parsed = match task.surface.parse(args) {
        Ok(parsed) => parsed,
        Err(SurfaceError::Clap(err)) => {
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    Ok(Outcome::Help(err.render().to_string()))
                }
                _ => Err(DispatchError::Usage(err)),
            };
        }
        Err(err @ SurfaceError::Matches { .. }) => {
            return Err(DispatchError::Internal(err.to_string()));
        }
    };

    let invocation = coerce(task, &parsed, extra_args)?;
    let value = task
        .run(&invocation)
        .map_err(|source| DispatchError::TaskFailed {
            task: task.name.clone(),
            source,
        })?;
    Ok(Outcome::Completed {
        task: task.name.clone(),
        value,
    })
}

/// Converts parsed tokens into bound values, falling back to defaults.
pub fn coerce(
    task: &Task,
    parsed: &[(usize, Parsed)],
    extra_args: &[String],
) -> DispatchResult<Invocation> {
    let mut values = Vec::with_capacity(task.params.len());
    let mut varargs = Vec::new();

    for (index, param) in task.params.iter().enumerate() {
        let given = parsed
            .iter()
            .find(|(i, _)| *i == index)
            .map_or(&Parsed::Absent, |(_, p)| p);

        match param.kind {
            ParamKind::VarKeyword => continue,
            ParamKind::VarPositional => {
                if let Parsed::Many(tokens) = given {
                    for token in tokens {
                        varargs.push(converters::convert_token(param, token)?);
                    }
                }
                continue;
            }
            _ => {}
        }

        let value = match given {
            Parsed::Flag(flag) => Value::Bool(*flag),
            Parsed::Single(token) => converters::convert_token(param, token)?,
            Parsed::Many(tokens) => {
                converters::convert_tokens(param, tokens.iter().map(String::as_str))?
            }
            Parsed::Absent => param.default.clone().ok_or_else(|| {
                DispatchError::Internal(format!(
                    "parameter '{}' of task '{}' has no value and no default",
                    param.name, task.name
                ))
            })?,
        };
        values.push((param.name.clone(), value));
    }

    Ok(Invocation::new(
        task.name.clone(),
        values,
        varargs,
        extra_args.to_vec(),
    ))
}
