// src/core/registry.rs

use crate::core::cli_surface::CliSurface;
use crate::core::commons::{first_line, hyphenate, is_cli_name, prefix_name};
use crate::core::invocation::Invocation;
use crate::core::parameters::{Param, Parameter, ParameterError};
use crate::models::{GroupId, ModuleId, Value};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("invalid parameter in task '{task}': {source}")]
    Parameter {
        task: String,
        #[source]
        source: ParameterError,
    },
    #[error("'{identifier}' is not a valid task identifier")]
    InvalidIdentifier { identifier: String },
    #[error("'{name}' is not a valid name")]
    InvalidName { name: String },
    #[error("task '{name}' already exists in '{scope}'")]
    DuplicateTask { name: String, scope: String },
    #[error("alias '{alias}' of task '{task}' already exists in '{scope}'")]
    DuplicateAlias {
        alias: String,
        task: String,
        scope: String,
    },
    #[error("module '{module}' finished loading with {open} group(s) still open")]
    UnbalancedGroups { module: String, open: usize },
    #[error("unknown group '{name}'")]
    UnknownGroup { name: String },
    #[error("unknown task '{name}'")]
    UnknownTask { name: String },
    #[error("failed to load module '{module}': {source}")]
    ModuleLoad {
        module: String,
        #[source]
        source: Box<RegistrationError>,
    },
}

pub type RegistryResult<T> = Result<T, RegistrationError>;

/// A task body. Receives the bound arguments and returns the task's value.
pub type TaskFn = Arc<dyn Fn(&Invocation) -> anyhow::Result<Value> + Send + Sync>;

// --- TASK DEFINITION ---

/// Everything an author declares about a task.
///
/// ```
/// use tasker::core::parameters::Param;
/// use tasker::core::registry::TaskDef;
///
/// let def = TaskDef::new("hello", |inv| Ok(inv.get("name").cloned().unwrap_or_default()))
///     .doc("Greets someone.")
///     .param(Param::positional("name").annotation("str").default("alice"));
/// # let _ = def;
/// ```
#[derive(Clone)]
pub struct TaskDef {
    pub(crate) identifier: String,
    pub(crate) name: Option<String>,
    pub(crate) doc: Option<String>,
    pub(crate) params: Vec<Param>,
    pub(crate) aliases: Vec<String>,
    pub(crate) tags: BTreeSet<String>,
    pub(crate) hidden: Option<bool>,
    pub(crate) important: bool,
    pub(crate) body: TaskFn,
}

impl TaskDef {
    pub fn new<F>(identifier: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Invocation) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            identifier: identifier.into(),
            name: None,
            doc: None,
            params: Vec::new(),
            aliases: Vec::new(),
            tags: BTreeSet::new(),
            hidden: None,
            important: false,
            body: Arc::new(body),
        }
    }

    /// Overrides the name derived from the identifier.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn params(mut self, params: impl IntoIterator<Item = Param>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// `hidden(false)` keeps a private-prefixed task visible.
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = Some(hidden);
        self
    }

    pub fn important(mut self) -> Self {
        self.important = true;
        self
    }
}

impl fmt::Debug for TaskDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDef")
            .field("identifier", &self.identifier)
            .field("name", &self.name)
            .field("params", &self.params)
            .field("aliases", &self.aliases)
            .finish_non_exhaustive()
    }
}

/// The CLI name of an identifier: private prefix stripped, underscores hyphenated.
pub fn task_name(identifier: &str, private_prefix: &str) -> String {
    let bare = match identifier.strip_prefix(private_prefix) {
        Some(rest) if !private_prefix.is_empty() && !rest.is_empty() => rest,
        _ => identifier,
    };
    hyphenate(bare)
}

// --- TASKS ---

/// Marks a task as a copy made by an inclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inclusion {
    /// The module whose registry the task was copied from.
    pub module: ModuleId,
    pub module_name: String,
    pub namespace: Option<String>,
}

/// Where a task was first registered. Shared by all its copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskOrigin {
    pub module: ModuleId,
    pub index: usize,
}

/// A registered task.
#[derive(Clone)]
pub struct Task {
    pub name: String,
    pub identifier: String,
    pub aliases: Vec<String>,
    pub group: GroupId,
    pub hidden: bool,
    pub important: bool,
    pub tags: BTreeSet<String>,
    pub doc: Option<String>,
    pub params: Vec<Parameter>,
    pub surface: CliSurface,
    /// The module that declared the underlying function.
    pub source_module: ModuleId,
    pub included_from: Option<Inclusion>,
    pub(crate) origin: TaskOrigin,
    pub(crate) body: TaskFn,
}

impl Task {
    /// Classifies and validates a definition into a task.
    pub(crate) fn from_def(
        def: TaskDef,
        private_prefix: &str,
        group: GroupId,
        origin: TaskOrigin,
    ) -> RegistryResult<Self> {
        if !crate::core::commons::is_identifier(&def.identifier) {
            return Err(RegistrationError::InvalidIdentifier {
                identifier: def.identifier,
            });
        }

        let name = def
            .name
            .unwrap_or_else(|| task_name(&def.identifier, private_prefix));
        for candidate in std::iter::once(&name).chain(def.aliases.iter()) {
            if !is_cli_name(candidate) {
                return Err(RegistrationError::InvalidName {
                    name: candidate.clone(),
                });
            }
        }

        let params = def
            .params
            .into_iter()
            .map(Param::build)
            .collect::<Result<Vec<_>, _>>()
            .and_then(|params| {
                crate::core::parameters::validate_signature(&params).map(|()| params)
            })
            .map_err(|source| RegistrationError::Parameter {
                task: name.clone(),
                source,
            })?;

        let is_private =
            !private_prefix.is_empty() && def.identifier.starts_with(private_prefix);
        let about = def.doc.as_deref().and_then(first_line);
        let surface = CliSurface::synthesize(&name, about, &params);

        let mut aliases = Vec::with_capacity(def.aliases.len());
        for alias in def.aliases {
            if !aliases.contains(&alias) {
                aliases.push(alias);
            }
        }

        Ok(Self {
            name,
            identifier: def.identifier,
            aliases,
            group,
            hidden: def.hidden.unwrap_or(is_private),
            important: def.important,
            tags: def.tags,
            doc: def.doc,
            params,
            surface,
            source_module: origin.module,
            included_from: None,
            origin,
            body: def.body,
        })
    }

    /// An independent copy placed in `group`, marked as coming through `included_from`.
    pub fn copy(&self, group: GroupId, included_from: Inclusion) -> Self {
        let mut task = self.clone();
        task.group = group;
        task.included_from = Some(included_from);
        task
    }

    /// Prepends `namespace` to the name and `alias_prefix` to every alias.
    pub fn prefixed(
        mut self,
        namespace: Option<&str>,
        alias_prefix: Option<&str>,
        alias_separator: &str,
    ) -> Self {
        self.name = crate::core::commons::namespaced(namespace, &self.name);
        self.aliases = self
            .aliases
            .iter()
            .map(|alias| prefix_name(alias_prefix, alias_separator, alias))
            .collect();
        self.surface.command_name = self.name.clone();
        self
    }

    pub fn summary(&self) -> Option<&str> {
        self.doc.as_deref().and_then(first_line)
    }

    pub fn usage(&self) -> String {
        self.surface.usage()
    }

    /// Two tasks wrap the same declared function.
    pub fn same_origin(&self, other: &Task) -> bool {
        self.origin == other.origin
    }

    pub(crate) fn run(&self, invocation: &Invocation) -> anyhow::Result<Value> {
        (self.body)(invocation)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("identifier", &self.identifier)
            .field("aliases", &self.aliases)
            .field("group", &self.group)
            .field("hidden", &self.hidden)
            .field("important", &self.important)
            .field("tags", &self.tags)
            .field("params", &self.params)
            .field("source_module", &self.source_module)
            .field("included_from", &self.included_from)
            .finish_non_exhaustive()
    }
}

// --- REGISTRY ---

/// The tasks visible from one module, in registration order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    scope: String,
    tasks: Vec<Task>,
    by_name: HashMap<String, usize>,
    by_alias: HashMap<String, usize>,
}

impl Registry {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            ..Self::default()
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Adds a task, rejecting name and alias clashes. Returns its index.
    pub fn register(&mut self, task: Task) -> RegistryResult<usize> {
        if self.by_name.contains_key(&task.name) {
            return Err(RegistrationError::DuplicateTask {
                name: task.name,
                scope: self.scope.clone(),
            });
        }
        if let Some(alias) = task.aliases.iter().find(|a| self.by_alias.contains_key(*a)) {
            return Err(RegistrationError::DuplicateAlias {
                alias: alias.clone(),
                task: task.name.clone(),
                scope: self.scope.clone(),
            });
        }

        let index = self.tasks.len();
        self.by_name.insert(task.name.clone(), index);
        for alias in &task.aliases {
            self.by_alias.insert(alias.clone(), index);
        }
        log::debug!("Registered task '{}' in '{}'", task.name, self.scope);
        self.tasks.push(task);
        Ok(index)
    }

    pub fn find(&self, name: &str) -> Option<&Task> {
        self.by_name.get(name).and_then(|&i| self.tasks.get(i))
    }

    pub fn find_alias(&self, alias: &str) -> Option<&Task> {
        self.by_alias.get(alias).and_then(|&i| self.tasks.get(i))
    }

    /// Exact name first, then alias.
    pub fn resolve(&self, name_or_alias: &str) -> Option<usize> {
        self.by_name
            .get(name_or_alias)
            .or_else(|| self.by_alias.get(name_or_alias))
            .copied()
    }

    pub fn get(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
        self.by_name.clear();
        self.by_alias.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(def: TaskDef) -> Task {
        let origin = TaskOrigin {
            module: ModuleId(0),
            index: 0,
        };
        Task::from_def(def, "_", GroupId(0), origin).unwrap()
    }

    fn noop(identifier: &str) -> TaskDef {
        TaskDef::new(identifier, |_| Ok(Value::None))
    }

    #[test]
    fn test_task_names() {
        assert_eq!(task_name("build_docs", "_"), "build-docs");
        assert_eq!(task_name("_deploy", "_"), "deploy");
        assert_eq!(task_name("priv_deploy", "priv_"), "deploy");
        assert_eq!(task_name("_", "_"), "");
        assert_eq!(task_name("plain", ""), "plain");
    }

    #[test]
    fn test_private_prefix_hides_unless_visible() {
        assert!(make(noop("_internal")).hidden);
        assert!(!make(noop("_internal").hidden(false)).hidden);
        assert!(make(noop("public").hidden(true)).hidden);
        assert!(!make(noop("public")).hidden);
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let mut registry = Registry::new("tasks");
        registry.register(make(noop("build"))).unwrap();
        let err = registry.register(make(noop("build"))).unwrap_err();
        assert!(err.to_string().contains("already exists in"));
    }

    #[test]
    fn test_duplicate_alias_is_rejected() {
        let mut registry = Registry::new("tasks");
        registry.register(make(noop("build").alias("b"))).unwrap();
        let err = registry
            .register(make(noop("bundle").alias("b")))
            .unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateAlias { .. }));
        assert!(err.to_string().contains("already exists in"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_by_name_and_alias() {
        let mut registry = Registry::new("tasks");
        registry.register(make(noop("build").alias("b"))).unwrap();
        registry.register(make(noop("test").alias("t"))).unwrap();

        assert_eq!(registry.find("test").map(|t| t.identifier.as_str()), Some("test"));
        assert_eq!(registry.find_alias("b").map(|t| t.name.as_str()), Some("build"));
        assert_eq!(registry.resolve("t"), Some(1));
        assert_eq!(registry.resolve("missing"), None);
    }

    #[test]
    fn test_copy_is_independent() {
        let original = make(noop("build").alias("b"));
        let inclusion = Inclusion {
            module: ModuleId(1),
            module_name: "lib".into(),
            namespace: Some("lib".into()),
        };
        let copy = original
            .copy(GroupId(3), inclusion.clone())
            .prefixed(Some("lib"), Some("l"), "");

        assert_eq!(copy.name, "lib.build");
        assert_eq!(copy.aliases, vec!["lb".to_string()]);
        assert_eq!(copy.group, GroupId(3));
        assert_eq!(copy.included_from, Some(inclusion));
        assert_eq!(copy.surface.command_name, "lib.build");
        assert!(copy.same_origin(&original));

        assert_eq!(original.name, "build");
        assert!(original.included_from.is_none());
    }

    #[test]
    fn test_parameter_errors_name_the_task() {
        let def = noop("foo").param(Param::keyword("force").annotation("bool"));
        let origin = TaskOrigin {
            module: ModuleId(0),
            index: 0,
        };
        let err = Task::from_def(def, "_", GroupId(0), origin).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("foo"));
        assert!(message.contains("bool params must"));
    }

    #[test]
    fn test_invalid_identifiers_and_aliases() {
        let origin = TaskOrigin {
            module: ModuleId(0),
            index: 0,
        };
        assert!(matches!(
            Task::from_def(noop("not valid"), "_", GroupId(0), origin),
            Err(RegistrationError::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            Task::from_def(noop("ok").alias("bad:"), "_", GroupId(0), origin),
            Err(RegistrationError::InvalidName { .. })
        ));
    }
}
