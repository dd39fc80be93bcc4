// src/core/inclusion.rs

//! Copies tasks from one module's registry into another's.
//!
//! A copy gets the caller's namespace prepended to its name, the alias
//! namespace prepended to each alias, and lands in the caller's active group.
//! Groups below the source root are recreated under that group, so including
//! a module merges its group tree into the caller's.

use crate::core::commons::is_cli_name;
use crate::core::groups::GroupDef;
use crate::core::registry::{Inclusion, RegistrationError, RegistryResult, Task};
use crate::models::{GroupId, ModuleId, TaskHandle};
use crate::state::Runtime;
use std::fmt;
use std::sync::Arc;

/// Decides which tasks an inclusion copies.
pub type TaskFilter = Arc<dyn Fn(&Task) -> bool + Send + Sync>;

/// How an inclusion renames and selects tasks.
#[derive(Clone, Default)]
pub struct IncludeOptions {
    pub namespace: Option<String>,
    /// Prefix for aliases; falls back to `namespace`.
    pub alias_namespace: Option<String>,
    pub include_hidden: bool,
    pub filter: Option<TaskFilter>,
}

impl IncludeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn alias_namespace(mut self, alias_namespace: impl Into<String>) -> Self {
        self.alias_namespace = Some(alias_namespace.into());
        self
    }

    pub fn include_hidden(mut self) -> Self {
        self.include_hidden = true;
        self
    }

    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Task) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    fn namespace_str(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| !ns.is_empty())
    }

    fn alias_prefix(&self) -> Option<&str> {
        self.alias_namespace
            .as_deref()
            .or(self.namespace.as_deref())
            .filter(|ns| !ns.is_empty())
    }

    fn selects(&self, task: &Task) -> bool {
        (self.include_hidden || !task.hidden) && self.filter.as_ref().is_none_or(|f| f(task))
    }

    fn validate(&self) -> RegistryResult<()> {
        for ns in [self.namespace_str(), self.alias_prefix()].into_iter().flatten() {
            if !is_cli_name(ns) || ns.ends_with('.') {
                return Err(RegistrationError::InvalidName {
                    name: ns.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for IncludeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncludeOptions")
            .field("namespace", &self.namespace)
            .field("alias_namespace", &self.alias_namespace)
            .field("include_hidden", &self.include_hidden)
            .field("filter", &self.filter.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// What is being included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Module(ModuleId),
    Task(TaskHandle),
    Group(GroupId),
}

/// A task picked for copying, with its group path below the source root.
struct Selected {
    task: Task,
    path: Vec<GroupDef>,
}

/// Copies the tasks of `source` into `target`'s registry under `group`.
///
/// Returns handles of the tasks now reachable in `target` because of this call.
pub(crate) fn include(
    rt: &mut Runtime,
    target: ModuleId,
    group: GroupId,
    source: Source,
    options: &IncludeOptions,
) -> RegistryResult<Vec<TaskHandle>> {
    options.validate()?;

    let source_module = match source {
        Source::Module(module) => module,
        Source::Task(handle) => handle.module(),
        Source::Group(id) => rt
            .groups()
            .get(id)
            .map(|g| g.module)
            .ok_or_else(|| RegistrationError::UnknownGroup {
                name: format!("#{}", id.0),
            })?,
    };

    if matches!(source, Source::Module(_))
        && (Some(source_module) == rt.entry() || source_module == target)
    {
        // The entry module's tasks stay where they are.
        let count = rt.registry(source_module).map_or(0, |r| r.len());
        log::debug!(
            "Including entry module '{}' in place ({} tasks)",
            rt.module_name(source_module).unwrap_or_default(),
            count
        );
        return Ok((0..count)
            .map(|index| TaskHandle {
                module: source_module,
                index,
            })
            .collect());
    }

    let selected = select(rt, source, source_module, options)?;
    let module_name = rt.module_name(source_module).unwrap_or_default().to_string();
    let scope_name = rt.module_name(target).unwrap_or_default().to_string();
    let mut handles = Vec::with_capacity(selected.len());

    for Selected { task, path } in selected {
        let dest = path
            .iter()
            .fold(group, |parent, def| rt.groups_mut().find_or_create(parent, def));

        let inclusion = Inclusion {
            module: source_module,
            module_name: module_name.clone(),
            namespace: options.namespace_str().map(str::to_string),
        };
        let copy = task.copy(dest, inclusion).prefixed(
            options.namespace_str(),
            options.alias_prefix(),
            &rt.config().alias_separator,
        );

        let registry = rt
            .registry_mut(target)
            .ok_or_else(|| RegistrationError::UnknownTask {
                name: copy.name.clone(),
            })?;

        if let Some(existing) = registry.find(&copy.name) {
            if arrived_before(existing, &copy) {
                log::debug!(
                    "Skipping '{}' from '{}': already present in '{}'",
                    copy.name,
                    module_name,
                    scope_name
                );
                continue;
            }
            return Err(RegistrationError::DuplicateTask {
                name: copy.name,
                scope: scope_name,
            });
        }

        log::debug!("Including '{}' from '{}' into '{}'", copy.name, module_name, scope_name);
        let index = registry.register(copy)?;
        handles.push(TaskHandle {
            module: target,
            index,
        });
    }

    Ok(handles)
}

/// The same function reaching a scope that already holds it under this name.
///
/// That is the case when it comes back to the module declaring it (an include
/// cycle) or arrives through a second inclusion path (a diamond). Arriving
/// twice through the same path is a collision.
fn arrived_before(existing: &Task, copy: &Task) -> bool {
    if !existing.same_origin(copy) {
        return false;
    }
    match (&existing.included_from, &copy.included_from) {
        (None, _) => true,
        (Some(old), Some(new)) => old.module != new.module,
        (Some(_), None) => false,
    }
}

fn select(
    rt: &Runtime,
    source: Source,
    source_module: ModuleId,
    options: &IncludeOptions,
) -> RegistryResult<Vec<Selected>> {
    let registry = rt
        .registry(source_module)
        .ok_or_else(|| RegistrationError::UnknownTask {
            name: format!("module #{}", source_module.0),
        })?;
    let groups = rt.groups();

    let (tasks, root): (Vec<&Task>, Option<GroupId>) = match source {
        Source::Module(_) => (
            registry.tasks().iter().collect(),
            rt.default_group(source_module),
        ),
        Source::Task(handle) => {
            let task = registry
                .get(handle.index)
                .ok_or_else(|| RegistrationError::UnknownTask {
                    name: format!("#{}", handle.index),
                })?;
            (vec![task], None)
        }
        Source::Group(id) => {
            let subtree = groups.subtree(id);
            (
                registry
                    .tasks()
                    .iter()
                    .filter(|t| subtree.contains(&t.group))
                    .collect(),
                Some(id),
            )
        }
    };

    Ok(tasks
        .into_iter()
        .filter(|task| options.selects(task))
        .map(|task| Selected {
            path: root.map_or_else(Vec::new, |root| relative_path(rt, root, task.group)),
            task: task.clone(),
        })
        .collect())
}

/// Group definitions from just below `root` down to `group`.
fn relative_path(rt: &Runtime, root: GroupId, group: GroupId) -> Vec<GroupDef> {
    let groups = rt.groups();
    let mut path = Vec::new();
    let mut current = group;
    while current != root {
        let Some(g) = groups.get(current) else {
            break;
        };
        path.push(GroupDef {
            name: g.name.clone(),
            description: g.description.clone(),
            hidden: g.hidden,
        });
        match g.parent {
            Some(parent) => current = parent,
            None => return Vec::new(),
        }
    }
    path.reverse();
    path
}
