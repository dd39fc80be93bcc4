// src/core/cli_surface.rs

//! Synthesizes a task's command line from its classified parameters.
//!
//! The surface is computed once at registration as a list of [`ArgSpec`]s.
//! A fresh `clap::Command` is built from it for every dispatch.

use crate::constants::HELP_SHORT_FLAG;
use crate::core::parameters::{ParamKind, ParamType, Parameter};
use crate::models::Value;
use clap::parser::{MatchesError, ValueSource};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error(transparent)]
    Clap(#[from] clap::Error),
    #[error("cannot read argument '{id}': {source}")]
    Matches {
        id: String,
        #[source]
        source: MatchesError,
    },
}

pub type SurfaceResult<T> = Result<T, SurfaceError>;

// --- SHORT FLAGS ---

/// Hands out single-letter flags in declaration order.
///
/// A parameter gets the lowercase first letter of its name, else the
/// uppercase one, else nothing. The help flag only takes `-h` if no
/// parameter did.
#[derive(Debug, Clone, Default)]
pub struct ShortFlagAllocator {
    claimed: HashSet<char>,
}

impl ShortFlagAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_claimed(&self, short: char) -> bool {
        self.claimed.contains(&short)
    }

    pub fn claim(&mut self, name: &str) -> Option<char> {
        let first = name.chars().next().filter(char::is_ascii_alphabetic)?;
        [first.to_ascii_lowercase(), first.to_ascii_uppercase()]
            .into_iter()
            .find(|candidate| self.claimed.insert(*candidate))
    }
}

// --- ARGUMENT SPECS ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgKind {
    Positional {
        value_name: String,
        required: bool,
        multiple: bool,
    },
    Option {
        long: String,
        short: Option<char>,
        value_name: String,
        required: bool,
        multiple: bool,
    },
    /// A zero-argument flag storing `sets` when present.
    Toggle {
        long: String,
        short: Option<char>,
        sets: bool,
    },
}

/// One command-line argument, tied to the parameter it fills.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    /// The parameter name; doubles as the clap argument id.
    pub id: String,
    pub param_index: usize,
    pub kind: ArgKind,
    pub help: Option<String>,
}

impl ArgSpec {
    fn to_arg(&self) -> Arg {
        let mut arg = Arg::new(self.id.clone());
        if let Some(help) = &self.help {
            arg = arg.help(help.clone());
        }
        match &self.kind {
            ArgKind::Positional {
                value_name,
                required,
                multiple,
            } => {
                arg = arg.value_name(value_name.clone()).required(*required);
                if *multiple {
                    arg.action(ArgAction::Append).num_args(1..)
                } else {
                    arg.action(ArgAction::Set)
                }
            }
            ArgKind::Option {
                long,
                short,
                value_name,
                required,
                multiple,
            } => {
                arg = arg
                    .long(long.clone())
                    .value_name(value_name.clone())
                    .required(*required);
                if let Some(short) = short {
                    arg = arg.short(*short);
                }
                match (*multiple, *required) {
                    (true, true) => arg.action(ArgAction::Append).num_args(1..),
                    (true, false) => arg.action(ArgAction::Append).num_args(0..),
                    (false, _) => arg.action(ArgAction::Set).num_args(1),
                }
            }
            ArgKind::Toggle { long, short, sets } => {
                arg = arg.long(long.clone());
                if let Some(short) = short {
                    arg = arg.short(*short);
                }
                arg.action(if *sets {
                    ArgAction::SetTrue
                } else {
                    ArgAction::SetFalse
                })
            }
        }
    }
}

/// What the command line said about one parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// Not given; the default applies.
    Absent,
    Flag(bool),
    Single(String),
    Many(Vec<String>),
}

// --- SURFACE ---

/// The synthesized command line of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliSurface {
    pub command_name: String,
    pub about: Option<String>,
    pub specs: Vec<ArgSpec>,
    /// Parameters left off the command line because their type is unsupported.
    pub skipped: Vec<String>,
    /// `-h` for `--help`, unless a parameter took it.
    pub help_short: Option<char>,
}

impl CliSurface {
    pub fn synthesize(command_name: &str, about: Option<&str>, params: &[Parameter]) -> Self {
        let mut shorts = ShortFlagAllocator::new();
        let mut specs = Vec::new();
        let mut skipped = Vec::new();

        for (param_index, param) in params.iter().enumerate() {
            if param.kind == ParamKind::VarKeyword {
                continue;
            }
            if !param.is_cli_assignable() {
                skipped.push(param.name.clone());
                continue;
            }

            let cli_name = param.cli_name();
            let value_name = param
                .options
                .metavar
                .clone()
                .unwrap_or_else(|| cli_name.to_uppercase());

            let kind = match param.kind {
                ParamKind::KeywordOnly => {
                    let short = shorts.claim(&cli_name);
                    if param.ty == ParamType::Bool {
                        let default = param.default.as_ref().and_then(Value::as_bool);
                        ArgKind::Toggle {
                            long: cli_name,
                            short,
                            sets: !default.unwrap_or(false),
                        }
                    } else {
                        ArgKind::Option {
                            long: cli_name,
                            short,
                            value_name,
                            required: param.is_required(),
                            multiple: param.is_multi(),
                        }
                    }
                }
                _ => ArgKind::Positional {
                    value_name,
                    required: param.is_required(),
                    multiple: param.is_multi(),
                },
            };

            specs.push(ArgSpec {
                id: param.name.clone(),
                param_index,
                kind,
                help: help_text(param),
            });
        }

        Self {
            command_name: command_name.to_string(),
            about: about.map(str::to_string),
            specs,
            skipped,
            help_short: Some(HELP_SHORT_FLAG).filter(|h| !shorts.is_claimed(*h)),
        }
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(self.command_name.clone())
            .no_binary_name(true)
            .allow_negative_numbers(true)
            .disable_version_flag(true)
            .disable_help_flag(true)
            .override_usage(self.usage());
        if let Some(about) = &self.about {
            cmd = cmd.about(about.clone());
        }
        let mut help = Arg::new("help")
            .long("help")
            .help("Print help")
            .action(ArgAction::Help);
        if let Some(short) = self.help_short {
            help = help.short(short);
        }
        self.specs
            .iter()
            .fold(cmd, |cmd, spec| cmd.arg(spec.to_arg()))
            .arg(help)
    }

    /// A compact usage line, e.g. `hello [NAME]`.
    pub fn usage(&self) -> String {
        let mut parts = vec![self.command_name.clone()];

        let has_optional_flags = self.specs.iter().any(|spec| match &spec.kind {
            ArgKind::Option { required, .. } => !required,
            ArgKind::Toggle { .. } => true,
            ArgKind::Positional { .. } => false,
        });
        if has_optional_flags {
            parts.push("[OPTIONS]".to_string());
        }

        for spec in &self.specs {
            match &spec.kind {
                ArgKind::Option {
                    long,
                    value_name,
                    required: true,
                    multiple,
                    ..
                } => parts.push(format!(
                    "--{} <{}>{}",
                    long,
                    value_name,
                    if *multiple { "..." } else { "" }
                )),
                ArgKind::Positional {
                    value_name,
                    required,
                    multiple,
                } => {
                    let dots = if *multiple { "..." } else { "" };
                    parts.push(if *required {
                        format!("<{}>{}", value_name, dots)
                    } else {
                        format!("[{}]{}", value_name, dots)
                    });
                }
                _ => {}
            }
        }
        parts.join(" ")
    }

    /// Runs clap over `args` and reports, per surfaced parameter, what was given.
    pub fn parse(&self, args: &[String]) -> SurfaceResult<Vec<(usize, Parsed)>> {
        let matches = self.command().try_get_matches_from(args)?;
        self.specs
            .iter()
            .map(|spec| Ok((spec.param_index, read_spec(&matches, spec)?)))
            .collect()
    }
}

fn read_spec(matches: &ArgMatches, spec: &ArgSpec) -> SurfaceResult<Parsed> {
    let id = spec.id.as_str();
    let matches_err = |source| SurfaceError::Matches {
        id: spec.id.clone(),
        source,
    };

    if matches.value_source(id) != Some(ValueSource::CommandLine) {
        return Ok(Parsed::Absent);
    }

    let multiple = match &spec.kind {
        ArgKind::Toggle { .. } => {
            let flag = matches.try_get_one::<bool>(id).map_err(matches_err)?;
            return Ok(flag.map_or(Parsed::Absent, |b| Parsed::Flag(*b)));
        }
        ArgKind::Positional { multiple, .. } | ArgKind::Option { multiple, .. } => *multiple,
    };

    if multiple {
        let values = matches
            .try_get_many::<String>(id)
            .map_err(matches_err)?
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        Ok(Parsed::Many(values))
    } else {
        let value = matches.try_get_one::<String>(id).map_err(matches_err)?;
        Ok(value.map_or(Parsed::Absent, |v| Parsed::Single(v.clone())))
    }
}

fn help_text(param: &Parameter) -> Option<String> {
    let mut help = param.help().map(str::to_string);

    if !param.options.choices.is_empty() {
        let choices = format!("[possible values: {}]", param.options.choices.join(", "));
        help = Some(match help {
            Some(text) => format!("{} {}", text, choices),
            None => choices,
        });
    }

    let shown_default = match (&param.ty, &param.default) {
        (ParamType::Bool, _) | (_, None) | (_, Some(Value::None)) => None,
        (_, Some(default)) => Some(format!("[default: {}]", default)),
    };
    match (help, shown_default) {
        (Some(text), Some(default)) => Some(format!("{} {}", text, default)),
        (None, default) => default,
        (text, None) => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parameters::Param;

    fn params(decls: Vec<Param>) -> Vec<Parameter> {
        decls.into_iter().map(|p| p.build().unwrap()).collect()
    }

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_short_flag_allocation() {
        let mut shorts = ShortFlagAllocator::new();
        assert_eq!(shorts.claim("force"), Some('f'));
        assert_eq!(shorts.claim("fast"), Some('F'));
        assert_eq!(shorts.claim("full"), None);
        assert_eq!(shorts.claim("host"), Some('h'));
        assert_eq!(shorts.claim("hash"), Some('H'));
        assert_eq!(shorts.claim("9lives"), None);
    }

    #[test]
    fn test_help_flag_yields_h_to_parameters() {
        let p = params(vec![Param::keyword("verbose").default(false)]);
        let surface = CliSurface::synthesize("t", None, &p);
        assert_eq!(surface.help_short, Some('h'));
        let err = surface.parse(&args(&["-h"])).unwrap_err();
        assert!(matches!(err, SurfaceError::Clap(e) if e.kind() == clap::error::ErrorKind::DisplayHelp));

        let p = params(vec![
            Param::keyword("host").default("localhost"),
            Param::keyword("hash").default(false),
        ]);
        let surface = CliSurface::synthesize("t", None, &p);
        assert_eq!(surface.help_short, None);
        let parsed = surface.parse(&args(&["-h", "example.org", "-H"])).unwrap();
        assert_eq!(
            parsed,
            vec![
                (0, Parsed::Single("example.org".into())),
                (1, Parsed::Flag(true)),
            ]
        );
        let err = surface.parse(&args(&["--help"])).unwrap_err();
        assert!(matches!(err, SurfaceError::Clap(e) if e.kind() == clap::error::ErrorKind::DisplayHelp));
    }

    #[test]
    fn test_usage_line() {
        let p = params(vec![Param::positional("name").annotation("str").default("alice")]);
        let surface = CliSurface::synthesize("hello", None, &p);
        assert_eq!(surface.usage(), "hello [NAME]");

        let p = params(vec![
            Param::positional("src"),
            Param::var_positional("rest"),
            Param::keyword("dry_run").default(false),
        ]);
        let surface = CliSurface::synthesize("copy", None, &p);
        assert_eq!(surface.usage(), "copy [OPTIONS] <SRC> [REST]...");
    }

    #[test]
    fn test_keyword_specs() {
        let p = params(vec![
            Param::keyword("dry_run").default(false),
            Param::keyword("color").default(true),
            Param::keyword("jobs").default(4),
            Param::keyword("files").annotation("list[str] | None").default(Value::None),
        ]);
        let surface = CliSurface::synthesize("build", None, &p);
        let kinds: Vec<&ArgKind> = surface.specs.iter().map(|s| &s.kind).collect();
        assert_eq!(
            kinds[0],
            &ArgKind::Toggle {
                long: "dry-run".into(),
                short: Some('d'),
                sets: true
            }
        );
        assert_eq!(
            kinds[1],
            &ArgKind::Toggle {
                long: "color".into(),
                short: Some('c'),
                sets: false
            }
        );
        assert!(matches!(kinds[2], ArgKind::Option { short: Some('j'), multiple: false, .. }));
        assert!(matches!(kinds[3], ArgKind::Option { short: Some('f'), multiple: true, required: false, .. }));
    }

    #[test]
    fn test_unsupported_params_are_skipped() {
        let p = params(vec![
            Param::positional("name"),
            Param::keyword("opts").annotation("dict[str, str]").default(Value::opaque("dict")),
            Param::var_keyword("extra"),
        ]);
        let surface = CliSurface::synthesize("t", None, &p);
        assert_eq!(surface.specs.len(), 1);
        assert_eq!(surface.skipped, vec!["opts".to_string()]);
    }

    #[test]
    fn test_parse_reports_each_parameter() {
        let p = params(vec![
            Param::positional("name").default("alice"),
            Param::keyword("force").default(false),
            Param::keyword("tags").annotation("list[str]").default(Vec::<String>::new()),
        ]);
        let surface = CliSurface::synthesize("t", None, &p);

        let parsed = surface.parse(&args(&["bob", "-f", "--tags", "a", "b"])).unwrap();
        assert_eq!(
            parsed,
            vec![
                (0, Parsed::Single("bob".into())),
                (1, Parsed::Flag(true)),
                (2, Parsed::Many(vec!["a".into(), "b".into()])),
            ]
        );

        let parsed = surface.parse(&[]).unwrap();
        assert!(parsed.iter().all(|(_, value)| *value == Parsed::Absent));
    }

    #[test]
    fn test_negative_numbers_are_values() {
        let p = params(vec![Param::positional("offset").annotation("int")]);
        let surface = CliSurface::synthesize("t", None, &p);
        let parsed = surface.parse(&args(&["-5"])).unwrap();
        assert_eq!(parsed, vec![(0, Parsed::Single("-5".into()))]);
    }

    #[test]
    fn test_missing_required_argument_is_a_clap_error() {
        let p = params(vec![Param::positional("target")]);
        let surface = CliSurface::synthesize("t", None, &p);
        assert!(matches!(surface.parse(&[]), Err(SurfaceError::Clap(_))));
    }

    #[test]
    fn test_help_text_shows_default() {
        let p = params(vec![Param::keyword("jobs").default(4).help("Parallel jobs")]);
        let surface = CliSurface::synthesize("t", None, &p);
        assert_eq!(
            surface.specs[0].help.as_deref(),
            Some("Parallel jobs [default: 4]")
        );
    }
}
