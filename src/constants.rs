// src/constants.rs

/// The name of the group every module owns implicitly.
pub const DEFAULT_GROUP_NAME: &str = "default";

/// Separator placed between namespace segments and task names (`outer.inner.task`).
pub const NAMESPACE_SEPARATOR: &str = ".";

/// A trailing marker that turns a CLI argument into a group listing request (`build:`).
pub const GROUP_SUFFIX: char = ':';

/// Everything after this token on argv is handed to the task body untouched.
pub const EXTRA_ARGS_DELIMITER: &str = "--";

/// Identifiers starting with this prefix are hidden unless marked visible.
pub const DEFAULT_PRIVATE_PREFIX: &str = "_";

/// Short flag `--help` takes when no parameter has claimed it.
pub const HELP_SHORT_FLAG: char = 'h';

/// The name of the project configuration file.
pub const PROJECT_CONFIG_FILENAME: &str = "tasker.toml";

/// The name of the user-level configuration file (inside the platform config dir).
pub const USER_CONFIG_FILENAME: &str = "config.toml";

/// The directory holding tasker's user-level configuration.
pub const USER_CONFIG_DIR: &str = "tasker";
