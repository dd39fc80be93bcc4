//! tasker: register plain functions as tasks and run them from a command line
//! synthesized out of their signatures.
//!
//! A program declares its tasks in a [`ModuleDef`] loader, hands it to
//! [`cli::main_for`], and gets listing, grouping, namespaced inclusion of
//! other modules, per-task `--help` and typed argument conversion for free.
//!
//! ```no_run
//! use tasker::{ModuleDef, Param, TaskDef, Value};
//!
//! static TASKS: ModuleDef = ModuleDef::new("tasks", |scope| {
//!     scope.task(
//!         TaskDef::new("hello", |inv| Ok(Value::from(format!("Hello, {}!", inv.str("name")?))))
//!             .param(Param::positional("name").annotation("str").default("world")),
//!     )?;
//!     Ok(())
//! });
//!
//! fn main() -> std::process::ExitCode {
//!     tasker::cli::main_for(&TASKS)
//! }
//! ```

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod state;

pub use crate::core::dispatcher::{DispatchError, Outcome};
pub use crate::core::groups::GroupDef;
pub use crate::core::inclusion::IncludeOptions;
pub use crate::core::invocation::{CallArgs, Invocation};
pub use crate::core::parameters::Param;
pub use crate::core::registry::{RegistrationError, Task, TaskDef};
pub use crate::core::scope::Scope;
pub use crate::models::{ModuleDef, TaskHandle, Value};
pub use crate::state::Runtime;
