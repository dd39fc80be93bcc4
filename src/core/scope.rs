// src/core/scope.rs

//! The handle a module loader registers through.

use crate::constants::NAMESPACE_SEPARATOR;
use crate::core::commons::is_cli_name;
use crate::core::config_loader::Config;
use crate::core::groups::GroupDef;
use crate::core::inclusion::{self, IncludeOptions, Source};
use crate::core::registry::{RegistrationError, RegistryResult, Task, TaskDef, TaskOrigin};
use crate::models::{GroupId, ModuleDef, ModuleId, TaskHandle};
use crate::state::Runtime;
use std::ops::{Deref, DerefMut};

/// Registration context of one module while its loader runs.
///
/// Tasks attach to the innermost open group; with no group open they go to
/// the module's default group.
pub struct Scope<'rt> {
    rt: &'rt mut Runtime,
    module: ModuleId,
    root: GroupId,
    stack: Vec<GroupId>,
}

impl<'rt> Scope<'rt> {
    pub(crate) fn new(rt: &'rt mut Runtime, module: ModuleId, root: GroupId) -> Self {
        Self {
            rt,
            module,
            root,
            stack: Vec::new(),
        }
    }

    pub fn module(&self) -> ModuleId {
        self.module
    }

    pub fn config(&self) -> &Config {
        self.rt.config()
    }

    pub fn current_group(&self) -> GroupId {
        self.stack.last().copied().unwrap_or(self.root)
    }

    /// Groups entered and not yet exited.
    pub fn open_groups(&self) -> usize {
        self.stack.len()
    }

    /// Registers a task in this module under the current group.
    pub fn task(&mut self, def: TaskDef) -> RegistryResult<TaskHandle> {
        let group = self.current_group();
        let registry = self
            .rt
            .registry(self.module)
            .ok_or_else(|| RegistrationError::UnknownTask {
                name: def.identifier.clone(),
            })?;
        let origin = TaskOrigin {
            module: self.module,
            index: registry.len(),
        };
        let task = Task::from_def(def, &self.rt.config().private_prefix, group, origin)?;

        let registry = self
            .rt
            .registry_mut(self.module)
            .ok_or_else(|| RegistrationError::UnknownTask {
                name: task.name.clone(),
            })?;
        let index = registry.register(task)?;
        Ok(TaskHandle {
            module: self.module,
            index,
        })
    }

    /// Enters a group until the returned guard is dropped.
    ///
    /// ```
    /// use tasker::core::groups::GroupDef;
    /// use tasker::core::registry::TaskDef;
    /// use tasker::models::{ModuleDef, Value};
    /// use tasker::state::Runtime;
    ///
    /// static MODULE: ModuleDef = ModuleDef::new("tasks", |scope| {
    ///     let mut release = scope.group(GroupDef::new("release"))?;
    ///     release.task(TaskDef::new("publish", |_| Ok(Value::None)))?;
    ///     Ok(())
    /// });
    ///
    /// let mut rt = Runtime::default();
    /// rt.load(&MODULE).unwrap();
    /// assert!(rt.find_task("publish").is_some());
    /// ```
    pub fn group(&mut self, def: GroupDef) -> RegistryResult<GroupGuard<'_, 'rt>> {
        let id = self.enter_group(def)?;
        Ok(GroupGuard { scope: self, id })
    }

    /// Enters a group without a guard. Pair with [`Scope::exit_group`].
    pub fn enter_group(&mut self, def: GroupDef) -> RegistryResult<GroupId> {
        if !is_cli_name(&def.name) || def.name.contains(NAMESPACE_SEPARATOR) {
            return Err(RegistrationError::InvalidName { name: def.name });
        }
        let parent = self.current_group();
        let id = self.rt.groups_mut().find_or_create(parent, &def);
        self.stack.push(id);
        Ok(id)
    }

    pub fn exit_group(&mut self) -> RegistryResult<GroupId> {
        self.stack.pop().ok_or_else(|| RegistrationError::UnbalancedGroups {
            module: self.rt.module_name(self.module).unwrap_or_default().to_string(),
            open: 0,
        })
    }

    /// Loads `module` if needed and copies its tasks into this module.
    pub fn include(
        &mut self,
        module: &ModuleDef,
        options: IncludeOptions,
    ) -> RegistryResult<Vec<TaskHandle>> {
        let source = self.rt.load_module(module)?;
        self.include_source(Source::Module(source), &options)
    }

    /// Copies a single task into this module.
    pub fn include_task(
        &mut self,
        task: TaskHandle,
        options: IncludeOptions,
    ) -> RegistryResult<Vec<TaskHandle>> {
        self.include_source(Source::Task(task), &options)
    }

    /// Copies every task of a group, and of the groups below it, into this module.
    pub fn include_group(
        &mut self,
        group: GroupId,
        options: IncludeOptions,
    ) -> RegistryResult<Vec<TaskHandle>> {
        self.include_source(Source::Group(group), &options)
    }

    fn include_source(
        &mut self,
        source: Source,
        options: &IncludeOptions,
    ) -> RegistryResult<Vec<TaskHandle>> {
        let group = self.current_group();
        inclusion::include(self.rt, self.module, group, source, options)
    }

    /// A group of a loaded module by dotted path, e.g. `release.docs`.
    pub fn find_group(&self, module: ModuleId, path: &str) -> Option<GroupId> {
        self.rt.find_group(module, path)
    }

    /// Loads `module` without including anything, returning its id.
    pub fn load(&mut self, module: &ModuleDef) -> RegistryResult<ModuleId> {
        self.rt.load_module(module)
    }

    pub fn runtime(&self) -> &Runtime {
        self.rt
    }
}

/// Keeps a group open; dropping it exits the group.
pub struct GroupGuard<'s, 'rt> {
    scope: &'s mut Scope<'rt>,
    id: GroupId,
}

impl GroupGuard<'_, '_> {
    pub fn group_id(&self) -> GroupId {
        self.id
    }
}

impl<'rt> Deref for GroupGuard<'_, 'rt> {
    type Target = Scope<'rt>;

    fn deref(&self) -> &Self::Target {
        self.scope
    }
}

impl DerefMut for GroupGuard<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.scope
    }
}

impl Drop for GroupGuard<'_, '_> {
    fn drop(&mut self) {
        self.scope.stack.pop();
    }
}
