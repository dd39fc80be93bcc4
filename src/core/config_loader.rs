// src/core/config_loader.rs

//! # Config Loader
//!
//! Reads `tasker.toml` files and layers them into a [`Config`].
//!
//! Layers, lowest precedence first: built-in defaults, the user file in the
//! platform config directory, the project file found by walking up from the
//! working directory (or an explicit `--config` path). Every field is optional
//! in a file; a field set in a higher layer replaces the lower one.

use crate::constants::{
    DEFAULT_PRIVATE_PREFIX, PROJECT_CONFIG_FILENAME, USER_CONFIG_DIR, USER_CONFIG_FILENAME,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file '{path}': {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// --- FILE LAYER ---

/// One configuration file as written on disk.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub private_prefix: Option<String>,
    pub alias_separator: Option<String>,
    pub on_error: Option<ErrorMode>,
    #[serde(default)]
    pub listing: ListingConfigFile,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ListingConfigFile {
    pub important_first: Option<bool>,
    pub hidden_last: Option<bool>,
    pub show_hidden_tasks: Option<bool>,
    pub show_hidden_groups: Option<bool>,
    pub show_aliases: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub search: Option<String>,
}

// --- RESOLVED CONFIG ---

/// What a front end does with a user-facing error.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Report it and exit the process with a non-zero code.
    #[default]
    Exit,
    /// Hand it back to the embedding program.
    Raise,
}

/// Listing defaults; command-line options are applied on top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingConfig {
    pub important_first: bool,
    pub hidden_last: bool,
    pub show_hidden_tasks: bool,
    pub show_hidden_groups: bool,
    pub show_aliases: bool,
    pub tags: Vec<String>,
    pub search: Option<String>,
}

/// The configuration a runtime works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Identifiers with this prefix are hidden and lose the prefix in their name.
    pub private_prefix: String,
    /// Placed between an alias namespace and an alias.
    pub alias_separator: String,
    pub on_error: ErrorMode,
    pub listing: ListingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            private_prefix: DEFAULT_PRIVATE_PREFIX.to_string(),
            alias_separator: String::new(),
            on_error: ErrorMode::default(),
            listing: ListingConfig::default(),
        }
    }
}

impl Config {
    /// Merges file layers, lowest precedence first, over the defaults.
    pub fn resolve<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = ConfigFile>,
    {
        let mut config = Self::default();
        for layer in layers {
            config.apply(layer);
        }
        config
    }

    fn apply(&mut self, layer: ConfigFile) {
        if let Some(prefix) = layer.private_prefix {
            self.private_prefix = prefix;
        }
        if let Some(separator) = layer.alias_separator {
            self.alias_separator = separator;
        }
        self.on_error = layer.on_error.unwrap_or(self.on_error);

        let listing = layer.listing;
        let target = &mut self.listing;
        target.important_first = listing.important_first.unwrap_or(target.important_first);
        target.hidden_last = listing.hidden_last.unwrap_or(target.hidden_last);
        target.show_hidden_tasks = listing.show_hidden_tasks.unwrap_or(target.show_hidden_tasks);
        target.show_hidden_groups = listing
            .show_hidden_groups
            .unwrap_or(target.show_hidden_groups);
        target.show_aliases = listing.show_aliases.unwrap_or(target.show_aliases);
        if let Some(tags) = listing.tags {
            target.tags = tags;
        }
        target.search = listing.search.or(target.search.take());
    }
}

// --- LOADING ---

pub fn from_toml_str(content: &str, path: &Path) -> ConfigResult<ConfigFile> {
    toml::from_str(content).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_file(path: &Path) -> ConfigResult<ConfigFile> {
    log::debug!("Reading config file {}", path.display());
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    from_toml_str(&content, path)
}

/// Walks up from `start` looking for the project config file.
pub fn discover(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_CONFIG_FILENAME))
        .find(|candidate| candidate.is_file())
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(USER_CONFIG_DIR).join(USER_CONFIG_FILENAME))
}

/// Loads the user layer and then the project layer.
///
/// `explicit` replaces project discovery and must exist. Discovered and user
/// files are optional.
pub fn load(explicit: Option<&Path>, cwd: &Path) -> ConfigResult<Config> {
    let mut layers = Vec::new();

    if let Some(path) = user_config_path().filter(|p| p.is_file()) {
        layers.push(load_file(&path)?);
    }

    let project = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => discover(cwd),
    };
    if let Some(path) = project {
        layers.push(load_file(&path)?);
    }

    let config = Config::resolve(layers);
    log::debug!("Resolved config: {:?}", config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.private_prefix, "_");
        assert_eq!(config.alias_separator, "");
        assert_eq!(config.on_error, ErrorMode::Exit);
        assert!(!config.listing.important_first);
    }

    #[test]
    fn test_parse_full_file() {
        let file = from_toml_str(
            r#"
            private_prefix = "priv_"
            alias_separator = "-"
            on_error = "raise"

            [listing]
            important_first = true
            tags = ["ci", "docs"]
            search = "^build"
            "#,
            Path::new("tasker.toml"),
        )
        .unwrap();
        let config = Config::resolve([file]);
        assert_eq!(config.private_prefix, "priv_");
        assert_eq!(config.alias_separator, "-");
        assert_eq!(config.on_error, ErrorMode::Raise);
        assert!(config.listing.important_first);
        assert_eq!(config.listing.tags, vec!["ci", "docs"]);
        assert_eq!(config.listing.search.as_deref(), Some("^build"));
    }

    #[test]
    fn test_later_layers_win_field_by_field() {
        let user = ConfigFile {
            alias_separator: Some(":".into()),
            listing: ListingConfigFile {
                hidden_last: Some(true),
                search: Some("user".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let project = ConfigFile {
            private_prefix: Some("x_".into()),
            listing: ListingConfigFile {
                hidden_last: Some(false),
                ..Default::default()
            },
            ..Default::default()
        };
        let config = Config::resolve([user, project]);
        assert_eq!(config.alias_separator, ":");
        assert_eq!(config.private_prefix, "x_");
        assert!(!config.listing.hidden_last);
        assert_eq!(config.listing.search.as_deref(), Some("user"));
    }

    #[test]
    fn test_unknown_keys_are_errors() {
        let err = from_toml_str("colour = true", Path::new("tasker.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse { .. }));
        assert!(err.to_string().contains("tasker.toml"));
    }

    #[test]
    fn test_discover_walks_up() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(discover(&nested), None);

        let file = dir.path().join(PROJECT_CONFIG_FILENAME);
        fs::write(&file, "alias_separator = \".\"\n").unwrap();
        assert_eq!(discover(&nested), Some(file.clone()));

        let config = load(Some(&file), &nested).unwrap();
        assert_eq!(config.alias_separator, ".");
    }

    #[test]
    fn test_missing_explicit_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            load_file(&missing),
            Err(ConfigError::Io { .. })
        ));
    }
}
