// src/core/invocation.rs

//! The arguments a task body receives, and direct-call binding.

use crate::core::parameters::ParamKind;
use crate::core::registry::Task;
use crate::models::Value;
use anyhow::anyhow;
use thiserror::Error;

/// Raised when a direct call does not fit the task's signature.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindError {
    #[error("task '{task}' takes {expected} positional argument(s) but {given} were given")]
    TooManyPositional {
        task: String,
        expected: usize,
        given: usize,
    },
    #[error("task '{task}' got an unexpected keyword argument '{name}'")]
    UnexpectedKeyword { task: String, name: String },
    #[error("task '{task}' got multiple values for argument '{name}'")]
    MultipleValues { task: String, name: String },
    #[error("task '{task}' is missing a value for required argument '{name}'")]
    Missing { task: String, name: String },
}

/// Bound arguments of one task run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    task: String,
    values: Vec<(String, Value)>,
    varargs: Vec<Value>,
    kwargs: Vec<(String, Value)>,
    extra_args: Vec<String>,
}

impl Invocation {
    pub(crate) fn new(
        task: impl Into<String>,
        values: Vec<(String, Value)>,
        varargs: Vec<Value>,
        extra_args: Vec<String>,
    ) -> Self {
        Self {
            task: task.into(),
            values,
            varargs,
            kwargs: Vec::new(),
            extra_args,
        }
    }

    /// The name the task was invoked under.
    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value)
    }

    fn require(&self, name: &str) -> anyhow::Result<&Value> {
        self.get(name)
            .ok_or_else(|| anyhow!("task '{}' has no parameter '{}'", self.task, name))
    }

    fn mismatch(&self, name: &str, expected: &str, value: &Value) -> anyhow::Error {
        anyhow!(
            "parameter '{}' of task '{}' is {} not {}",
            name,
            self.task,
            value.type_name(),
            expected
        )
    }

    pub fn str(&self, name: &str) -> anyhow::Result<&str> {
        let value = self.require(name)?;
        value
            .as_str()
            .ok_or_else(|| self.mismatch(name, "str", value))
    }

    pub fn int(&self, name: &str) -> anyhow::Result<i64> {
        let value = self.require(name)?;
        value
            .as_int()
            .ok_or_else(|| self.mismatch(name, "int", value))
    }

    pub fn float(&self, name: &str) -> anyhow::Result<f64> {
        let value = self.require(name)?;
        value
            .as_float()
            .ok_or_else(|| self.mismatch(name, "float", value))
    }

    pub fn flag(&self, name: &str) -> anyhow::Result<bool> {
        let value = self.require(name)?;
        value
            .as_bool()
            .ok_or_else(|| self.mismatch(name, "bool", value))
    }

    /// List values; an optional list left at `None` reads as empty.
    pub fn list(&self, name: &str) -> anyhow::Result<&[Value]> {
        match self.require(name)? {
            Value::None => Ok(&[]),
            Value::List(items) => Ok(items),
            other => Err(self.mismatch(name, "list", other)),
        }
    }

    /// Values collected by the variadic-positional parameter.
    pub fn varargs(&self) -> &[Value] {
        &self.varargs
    }

    /// Keyword values collected by the variadic-keyword parameter.
    pub fn kwargs(&self) -> &[(String, Value)] {
        &self.kwargs
    }

    /// Tokens after `--` on the command line.
    pub fn extra_args(&self) -> &[String] {
        &self.extra_args
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

// --- DIRECT CALLS ---

/// Arguments for [`crate::state::Runtime::call`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.push((name.into(), value.into()));
        self
    }
}

/// Binds call arguments to `task`'s parameters: positionals in order, then
/// keywords by name, then defaults.
pub fn bind(task: &Task, call: CallArgs, extra_args: Vec<String>) -> Result<Invocation, BindError> {
    let params = &task.params;
    let mut slots: Vec<Option<Value>> = vec![None; params.len()];
    let mut varargs = Vec::new();
    let mut kwargs = Vec::new();

    let positional: Vec<usize> = params
        .iter()
        .enumerate()
        .filter(|(_, p)| p.kind.is_positional())
        .map(|(i, _)| i)
        .collect();
    let accepts_varargs = params.iter().any(|p| p.kind == ParamKind::VarPositional);
    let accepts_kwargs = params.iter().any(|p| p.kind == ParamKind::VarKeyword);

    let given = call.args.len();
    let mut args = call.args.into_iter();
    for (&index, value) in positional.iter().zip(args.by_ref()) {
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(value);
        }
    }
    let rest: Vec<Value> = args.collect();
    if !rest.is_empty() {
        if !accepts_varargs {
            return Err(BindError::TooManyPositional {
                task: task.name.clone(),
                expected: positional.len(),
                given,
            });
        }
        varargs = rest;
    }

    for (name, value) in call.kwargs {
        let target = params
            .iter()
            .position(|p| p.name == name && (p.kind.is_positional() || p.kind == ParamKind::KeywordOnly));
        match target.and_then(|i| slots.get_mut(i)) {
            Some(Some(_)) => {
                return Err(BindError::MultipleValues {
                    task: task.name.clone(),
                    name,
                });
            }
            Some(slot) => *slot = Some(value),
            None if accepts_kwargs => kwargs.push((name, value)),
            None => {
                return Err(BindError::UnexpectedKeyword {
                    task: task.name.clone(),
                    name,
                });
            }
        }
    }

    let mut values = Vec::with_capacity(params.len());
    for (param, slot) in params.iter().zip(slots) {
        if param.kind.is_variadic() {
            continue;
        }
        let value = match (slot, &param.default) {
            (Some(value), _) => value,
            (None, Some(default)) => default.clone(),
            (None, None) => {
                return Err(BindError::Missing {
                    task: task.name.clone(),
                    name: param.name.clone(),
                });
            }
        };
        values.push((param.name.clone(), value));
    }

    let mut invocation = Invocation::new(task.name.clone(), values, varargs, extra_args);
    invocation.kwargs = kwargs;
    Ok(invocation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parameters::Param;
    use crate::core::registry::{TaskDef, TaskOrigin};
    use crate::models::{GroupId, ModuleId};

    fn task(def: TaskDef) -> Task {
        let origin = TaskOrigin {
            module: ModuleId(0),
            index: 0,
        };
        Task::from_def(def, "_", GroupId(0), origin).unwrap()
    }

    fn copy_task() -> Task {
        task(
            TaskDef::new("copy", |_| Ok(Value::None))
                .param(Param::positional("src"))
                .param(Param::positional("dst").default("out"))
                .param(Param::var_positional("rest"))
                .param(Param::keyword("force").default(false))
                .param(Param::var_keyword("extra")),
        )
    }

    #[test]
    fn test_bind_positionals_and_defaults() {
        let inv = bind(&copy_task(), CallArgs::new().arg("a"), vec![]).unwrap();
        assert_eq!(inv.str("src").unwrap(), "a");
        assert_eq!(inv.str("dst").unwrap(), "out");
        assert!(!inv.flag("force").unwrap());
        assert!(inv.varargs().is_empty());
    }

    #[test]
    fn test_bind_varargs_and_kwargs() {
        let call = CallArgs::new()
            .arg("a")
            .arg("b")
            .arg(1)
            .arg(2)
            .kwarg("force", true)
            .kwarg("color", "red");
        let inv = bind(&copy_task(), call, vec!["x".into()]).unwrap();
        assert_eq!(inv.varargs(), &[Value::Int(1), Value::Int(2)]);
        assert!(inv.flag("force").unwrap());
        assert_eq!(inv.kwargs(), &[("color".to_string(), Value::from("red"))]);
        assert_eq!(inv.extra_args(), &["x".to_string()]);
    }

    #[test]
    fn test_bind_errors() {
        let simple = task(TaskDef::new("one", |_| Ok(Value::None)).param(Param::positional("a")));
        assert!(matches!(
            bind(&simple, CallArgs::new(), vec![]),
            Err(BindError::Missing { .. })
        ));
        assert!(matches!(
            bind(&simple, CallArgs::new().arg(1).arg(2), vec![]),
            Err(BindError::TooManyPositional { .. })
        ));
        assert!(matches!(
            bind(&simple, CallArgs::new().kwarg("b", 1), vec![]),
            Err(BindError::UnexpectedKeyword { .. })
        ));
        assert!(matches!(
            bind(&simple, CallArgs::new().arg(1).kwarg("a", 2), vec![]),
            Err(BindError::MultipleValues { .. })
        ));
    }

    #[test]
    fn test_typed_accessors() {
        let inv = Invocation::new(
            "t",
            vec![
                ("n".into(), Value::Int(3)),
                ("files".into(), Value::None),
            ],
            vec![],
            vec![],
        );
        assert_eq!(inv.int("n").unwrap(), 3);
        assert_eq!(inv.float("n").unwrap(), 3.0);
        assert!(inv.list("files").unwrap().is_empty());
        assert!(inv.str("n").unwrap_err().to_string().contains("int not str"));
        assert!(inv.int("missing").is_err());
    }
}
