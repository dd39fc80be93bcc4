// src/state.rs

//! The runtime context: every registry, the group forest, the loaded-module
//! cache, configuration and extra args of one process invocation.

use crate::core::config_loader::Config;
use crate::core::dispatcher::{self, DispatchError, DispatchResult, Outcome};
use crate::core::groups::GroupTree;
use crate::core::invocation::{self, CallArgs};
use crate::core::listing::ListingSettings;
use crate::core::registry::{RegistrationError, Registry, RegistryResult, Task};
use crate::core::scope::Scope;
use crate::models::{GroupId, ModuleDef, ModuleId, TaskHandle, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Pending,
    /// The loader is running; includes of this module see what it has registered so far.
    Loading,
    Loaded,
}

#[derive(Debug, Clone)]
pub struct ModuleState {
    pub name: &'static str,
    pub registry: Registry,
    pub status: LoadStatus,
    pub default_group: GroupId,
}

#[derive(Debug, Default)]
pub struct Runtime {
    config: Config,
    modules: Vec<ModuleState>,
    module_index: HashMap<&'static str, ModuleId>,
    groups: GroupTree,
    entry: Option<ModuleId>,
    extra_args: Vec<String>,
}

impl Runtime {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    /// Loads the entry module, whose registry the dispatcher and listing work on.
    pub fn load(&mut self, entry: &ModuleDef) -> RegistryResult<ModuleId> {
        let id = self.register_module(entry);
        self.entry = Some(id);
        self.run_loader(id, entry)?;
        Ok(id)
    }

    /// Loads a module once. Already loaded or loading modules are returned as they are.
    pub(crate) fn load_module(&mut self, def: &ModuleDef) -> RegistryResult<ModuleId> {
        if let Some(&id) = self.module_index.get(def.name) {
            log::trace!("Module '{}' already known", def.name);
            return Ok(id);
        }
        let id = self.register_module(def);
        self.run_loader(id, def)
            .map_err(|source| RegistrationError::ModuleLoad {
                module: def.name.to_string(),
                source: Box::new(source),
            })?;
        Ok(id)
    }

    fn register_module(&mut self, def: &ModuleDef) -> ModuleId {
        if let Some(&id) = self.module_index.get(def.name) {
            return id;
        }
        let id = ModuleId(self.modules.len());
        let default_group = self.groups.add_root(id);
        self.modules.push(ModuleState {
            name: def.name,
            registry: Registry::new(def.name),
            status: LoadStatus::Pending,
            default_group,
        });
        self.module_index.insert(def.name, id);
        id
    }

    fn run_loader(&mut self, id: ModuleId, def: &ModuleDef) -> RegistryResult<()> {
        let Some(state) = self.modules.get_mut(id.0) else {
            return Ok(());
        };
        if state.status != LoadStatus::Pending {
            return Ok(());
        }
        state.status = LoadStatus::Loading;
        let root = state.default_group;

        log::debug!("Loading module '{}'", def.name);
        let mut scope = Scope::new(self, id, root);
        (def.load)(&mut scope)?;
        let open = scope.open_groups();
        if open != 0 {
            return Err(RegistrationError::UnbalancedGroups {
                module: def.name.to_string(),
                open,
            });
        }

        if let Some(state) = self.modules.get_mut(id.0) {
            state.status = LoadStatus::Loaded;
            log::debug!(
                "Loaded module '{}' with {} tasks",
                def.name,
                state.registry.len()
            );
        }
        Ok(())
    }

    /// Forgets every module, task, group and extra arg. Configuration is kept.
    pub fn reset(&mut self) {
        self.modules.clear();
        self.module_index.clear();
        self.groups.clear();
        self.entry = None;
        self.extra_args.clear();
    }

    // --- LOOKUPS ---

    pub fn entry(&self) -> Option<ModuleId> {
        self.entry
    }

    pub fn module_id(&self, name: &str) -> Option<ModuleId> {
        self.module_index.get(name).copied()
    }

    pub fn module(&self, id: ModuleId) -> Option<&ModuleState> {
        self.modules.get(id.0)
    }

    pub fn module_name(&self, id: ModuleId) -> Option<&'static str> {
        self.module(id).map(|m| m.name)
    }

    pub fn default_group(&self, id: ModuleId) -> Option<GroupId> {
        self.module(id).map(|m| m.default_group)
    }

    pub fn registry(&self, id: ModuleId) -> Option<&Registry> {
        self.module(id).map(|m| &m.registry)
    }

    pub(crate) fn registry_mut(&mut self, id: ModuleId) -> Option<&mut Registry> {
        self.modules.get_mut(id.0).map(|m| &mut m.registry)
    }

    pub fn entry_registry(&self) -> Option<&Registry> {
        self.entry.and_then(|id| self.registry(id))
    }

    pub fn task(&self, handle: TaskHandle) -> Option<&Task> {
        self.registry(handle.module)
            .and_then(|registry| registry.get(handle.index))
    }

    /// Looks a name or alias up in the entry module.
    pub fn find_task(&self, name_or_alias: &str) -> Option<TaskHandle> {
        self.find_task_in(self.entry?, name_or_alias)
    }

    /// Looks a name or alias up in any loaded module, e.g. to include one task.
    pub fn find_task_in(&self, module: ModuleId, name_or_alias: &str) -> Option<TaskHandle> {
        self.registry(module)?
            .resolve(name_or_alias)
            .map(|index| TaskHandle { module, index })
    }

    /// A group of `module` by dotted path below its root.
    pub fn find_group(&self, module: ModuleId, path: &str) -> Option<GroupId> {
        let root = self.default_group(module)?;
        self.groups.find_by_path(root, path).into_iter().next()
    }

    pub fn groups(&self) -> &GroupTree {
        &self.groups
    }

    pub(crate) fn groups_mut(&mut self) -> &mut GroupTree {
        &mut self.groups
    }

    /// Tokens that followed `--` in the last dispatch.
    pub fn extra_args(&self) -> &[String] {
        &self.extra_args
    }

    pub(crate) fn set_extra_args(&mut self, extra_args: Vec<String>) {
        self.extra_args = extra_args;
    }

    // --- EXECUTION ---

    /// Calls a task directly, bypassing the command line.
    pub fn call(&self, handle: TaskHandle, args: CallArgs) -> DispatchResult<Value> {
        let task = self.task(handle).ok_or_else(|| {
            DispatchError::Internal("task handle does not belong to this runtime".to_string())
        })?;
        let invocation = invocation::bind(task, args, self.extra_args.clone())?;
        task.run(&invocation)
            .map_err(|source| DispatchError::TaskFailed {
                task: task.name.clone(),
                source,
            })
    }

    /// Dispatches `argv` (without the program name) with the configured listing settings.
    pub fn dispatch(&mut self, argv: &[String]) -> DispatchResult<Outcome> {
        let settings = ListingSettings::from_config(&self.config.listing);
        dispatcher::dispatch(self, argv, &settings)
    }

    pub fn dispatch_with(
        &mut self,
        argv: &[String],
        settings: &ListingSettings,
    ) -> DispatchResult<Outcome> {
        dispatcher::dispatch(self, argv, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::groups::GroupDef;
    use crate::core::inclusion::IncludeOptions;
    use crate::core::parameters::Param;
    use crate::core::registry::TaskDef;

    fn noop(identifier: &str) -> TaskDef {
        TaskDef::new(identifier, |_| Ok(Value::None))
    }

    static LIB: ModuleDef = ModuleDef::new("lib", |scope| {
        scope.task(noop("lint"))?;
        let mut docs = scope.group(GroupDef::new("docs").description("Documentation"))?;
        docs.task(noop("build_docs").alias("bd"))?;
        Ok(())
    });

    static APP: ModuleDef = ModuleDef::new("app", |scope| {
        scope.task(noop("run"))?;
        scope.include(&LIB, IncludeOptions::new().namespace("lib"))?;
        Ok(())
    });

    #[test]
    fn test_load_registers_entry_and_dependencies() {
        let mut rt = Runtime::default();
        let app = rt.load(&APP).unwrap();
        assert_eq!(rt.entry(), Some(app));
        assert!(rt.module_id("lib").is_some());

        let names: Vec<&str> = rt
            .entry_registry()
            .unwrap()
            .tasks()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["run", "lib.lint", "lib.build-docs"]);
        assert!(rt.find_task("libbd").is_some());
    }

    #[test]
    fn test_included_groups_are_mirrored() {
        let mut rt = Runtime::default();
        let app = rt.load(&APP).unwrap();
        let docs = rt.find_group(app, "docs").unwrap();
        assert_eq!(
            rt.groups().get(docs).and_then(|g| g.description.as_deref()),
            Some("Documentation")
        );
        let handle = rt.find_task("lib.build-docs").unwrap();
        assert_eq!(rt.task(handle).map(|t| t.group), Some(docs));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut rt = Runtime::default();
        rt.load(&APP).unwrap();
        rt.set_extra_args(vec!["x".into()]);
        rt.reset();
        assert!(rt.entry_registry().is_none());
        assert!(rt.module_id("lib").is_none());
        assert!(rt.groups().is_empty());
        assert!(rt.extra_args().is_empty());

        rt.load(&APP).unwrap();
        assert_eq!(rt.entry_registry().map(Registry::len), Some(3));
    }

    #[test]
    fn test_unbalanced_groups_are_reported() {
        static LEAKY: ModuleDef = ModuleDef::new("leaky", |scope| {
            scope.enter_group(GroupDef::new("open"))?;
            Ok(())
        });
        let mut rt = Runtime::default();
        let err = rt.load(&LEAKY).unwrap_err();
        assert!(matches!(err, RegistrationError::UnbalancedGroups { open: 1, .. }));
    }

    #[test]
    fn test_direct_call_uses_defaults() {
        static GREET: ModuleDef = ModuleDef::new("greet", |scope| {
            scope.task(
                TaskDef::new("hello", |inv| Ok(Value::from(inv.str("name")?)))
                    .param(Param::positional("name").annotation("str").default("alice")),
            )?;
            Ok(())
        });
        let mut rt = Runtime::default();
        rt.load(&GREET).unwrap();
        let hello = rt.find_task("hello").unwrap();
        assert_eq!(rt.call(hello, CallArgs::new()).unwrap(), Value::from("alice"));
        assert_eq!(
            rt.call(hello, CallArgs::new().arg("bob")).unwrap(),
            Value::from("bob")
        );
    }
}
