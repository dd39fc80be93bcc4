// src/core/groups.rs

use crate::constants::{DEFAULT_GROUP_NAME, NAMESPACE_SEPARATOR};
use crate::models::{GroupId, ModuleId};

/// Declares a group; entering it is [`crate::core::scope::Scope::group`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupDef {
    pub name: String,
    pub description: Option<String>,
    pub hidden: bool,
}

impl GroupDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: Option<String>,
    pub hidden: bool,
    pub parent: Option<GroupId>,
    pub module: ModuleId,
    /// The implicit root group every module owns.
    pub is_default: bool,
    children: Vec<GroupId>,
}

/// Arena of every group known to a runtime. Each module owns one root.
#[derive(Debug, Clone, Default)]
pub struct GroupTree {
    groups: Vec<Group>,
}

impl GroupTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, mut group: Group) -> GroupId {
        let id = GroupId(self.groups.len());
        group.id = id;
        if let Some(parent) = group.parent.and_then(|p| self.groups.get_mut(p.0)) {
            parent.children.push(id);
        }
        self.groups.push(group);
        id
    }

    /// Creates the default root group for `module`.
    pub fn add_root(&mut self, module: ModuleId) -> GroupId {
        self.push(Group {
            id: GroupId(0),
            name: DEFAULT_GROUP_NAME.to_string(),
            description: None,
            hidden: false,
            parent: None,
            module,
            is_default: true,
            children: Vec::new(),
        })
    }

    /// Returns the child of `parent` called `def.name`, creating it if needed.
    ///
    /// An existing group keeps its settings; a missing description is filled in.
    pub fn find_or_create(&mut self, parent: GroupId, def: &GroupDef) -> GroupId {
        if let Some(existing) = self.child_named(parent, &def.name) {
            if let Some(group) = self.groups.get_mut(existing.0) {
                if group.description.is_none() {
                    group.description.clone_from(&def.description);
                }
                group.hidden |= def.hidden;
            }
            return existing;
        }

        let module = self.get(parent).map_or(ModuleId(0), |p| p.module);
        let id = self.push(Group {
            id: GroupId(0),
            name: def.name.clone(),
            description: def.description.clone(),
            hidden: def.hidden,
            parent: Some(parent),
            module,
            is_default: false,
            children: Vec::new(),
        });
        log::debug!("Created group '{}'", self.full_name(id));
        id
    }

    pub fn get(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(id.0)
    }

    pub fn child_named(&self, parent: GroupId, name: &str) -> Option<GroupId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&child| self.get(child).is_some_and(|g| g.name == name))
    }

    /// Children in creation order.
    pub fn children(&self, id: GroupId) -> &[GroupId] {
        self.get(id)
            .map(|g| g.children.as_slice())
            .unwrap_or_default()
    }

    /// The root of the tree `id` belongs to.
    pub fn root_of(&self, id: GroupId) -> GroupId {
        let mut current = id;
        while let Some(parent) = self.get(current).and_then(|g| g.parent) {
            current = parent;
        }
        current
    }

    /// Names from just below the root down to `id`. Empty for a root.
    pub fn path(&self, id: GroupId) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = self.get(id);
        while let Some(group) = current {
            if group.parent.is_none() {
                break;
            }
            path.push(group.name.as_str());
            current = group.parent.and_then(|p| self.get(p));
        }
        path.reverse();
        path
    }

    /// Dotted path below the root, e.g. `release.docs`; a root is `default`.
    pub fn full_name(&self, id: GroupId) -> String {
        let path = self.path(id);
        if path.is_empty() {
            DEFAULT_GROUP_NAME.to_string()
        } else {
            path.join(NAMESPACE_SEPARATOR)
        }
    }

    /// Hidden itself or below a hidden ancestor.
    pub fn is_effectively_hidden(&self, id: GroupId) -> bool {
        let mut current = self.get(id);
        while let Some(group) = current {
            if group.hidden {
                return true;
            }
            current = group.parent.and_then(|p| self.get(p));
        }
        false
    }

    /// `id` and every group below it, depth-first in creation order.
    pub fn subtree(&self, id: GroupId) -> Vec<GroupId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Groups under `root` whose full name is `query`, or whose path ends with it.
    pub fn find_by_path(&self, root: GroupId, query: &str) -> Vec<GroupId> {
        if query == DEFAULT_GROUP_NAME {
            return vec![root];
        }
        let suffix = format!("{}{}", NAMESPACE_SEPARATOR, query);
        let candidates: Vec<(GroupId, String)> = self
            .subtree(root)
            .into_iter()
            .filter(|&id| id != root)
            .map(|id| (id, self.full_name(id)))
            .collect();

        let exact: Vec<GroupId> = candidates
            .iter()
            .filter(|(_, name)| name == query)
            .map(|(id, _)| *id)
            .collect();
        if !exact.is_empty() {
            return exact;
        }
        candidates
            .into_iter()
            .filter(|(_, name)| name.ends_with(&suffix))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (GroupTree, GroupId, GroupId, GroupId) {
        let mut groups = GroupTree::new();
        let root = groups.add_root(ModuleId(0));
        let release = groups.find_or_create(root, &GroupDef::new("release"));
        let docs = groups.find_or_create(release, &GroupDef::new("docs").hidden(true));
        (groups, root, release, docs)
    }

    #[test]
    fn test_find_or_create_reuses_groups() {
        let (mut groups, root, release, _) = tree();
        let again = groups.find_or_create(root, &GroupDef::new("release").description("Ship it"));
        assert_eq!(again, release);
        assert_eq!(
            groups.get(release).and_then(|g| g.description.as_deref()),
            Some("Ship it")
        );
        assert_eq!(groups.children(root), &[release]);
    }

    #[test]
    fn test_paths_and_names() {
        let (groups, root, release, docs) = tree();
        assert_eq!(groups.full_name(root), "default");
        assert_eq!(groups.full_name(docs), "release.docs");
        assert_eq!(groups.path(release), vec!["release"]);
        assert_eq!(groups.root_of(docs), root);
    }

    #[test]
    fn test_hidden_is_inherited() {
        let (mut groups, _, release, docs) = tree();
        let api = groups.find_or_create(docs, &GroupDef::new("api"));
        assert!(!groups.is_effectively_hidden(release));
        assert!(groups.is_effectively_hidden(docs));
        assert!(groups.is_effectively_hidden(api));
    }

    #[test]
    fn test_find_by_path() {
        let (groups, root, release, docs) = tree();
        assert_eq!(groups.find_by_path(root, "release"), vec![release]);
        assert_eq!(groups.find_by_path(root, "release.docs"), vec![docs]);
        assert_eq!(groups.find_by_path(root, "docs"), vec![docs]);
        assert_eq!(groups.find_by_path(root, "default"), vec![root]);
        assert!(groups.find_by_path(root, "ocs").is_empty());
    }

    #[test]
    fn test_subtree_is_depth_first() {
        let (mut groups, root, release, docs) = tree();
        let tools = groups.find_or_create(root, &GroupDef::new("tools"));
        assert_eq!(groups.subtree(root), vec![root, release, docs, tools]);
    }
}
