// src/core/listing.rs

//! Filtering, ordering and layout of the task listing.
//!
//! [`filter_tasks`] and [`sort_tasks`] are pure functions over task
//! references. [`build_listing`] lays the result out along the group forest.

use crate::core::config_loader::ListingConfig;
use crate::core::registry::Task;
use crate::models::GroupId;
use crate::state::Runtime;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum FilterError {
    #[error("cannot filter by tags {tags:?}: none of the listed tasks has any tags")]
    NoTaggedTasks { tags: Vec<String> },
    #[error("invalid search pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

pub type ListingResult<T> = Result<T, FilterError>;

// --- SETTINGS ---

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSettings {
    pub show_hidden_groups: bool,
    pub show_hidden_tasks: bool,
    pub tags: Vec<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortSettings {
    pub important_first: bool,
    pub hidden_last: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingSettings {
    pub filter: FilterSettings,
    pub sort: SortSettings,
    pub show_aliases: bool,
}

impl ListingSettings {
    pub fn from_config(config: &ListingConfig) -> Self {
        Self {
            filter: FilterSettings {
                show_hidden_groups: config.show_hidden_groups,
                show_hidden_tasks: config.show_hidden_tasks,
                tags: config.tags.clone(),
                search: config.search.clone(),
            },
            sort: SortSettings {
                important_first: config.important_first,
                hidden_last: config.hidden_last,
            },
            show_aliases: config.show_aliases,
        }
    }

    /// Shows everything; used when listing a single group.
    pub fn reveal_hidden(mut self) -> Self {
        self.filter.show_hidden_groups = true;
        self.filter.show_hidden_tasks = true;
        self
    }
}

// --- FILTERING ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStage {
    HiddenGroups,
    HiddenTasks,
    Tags,
    Search,
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HiddenGroups => "hidden groups",
            Self::HiddenTasks => "hidden tasks",
            Self::Tags => "tags",
            Self::Search => "search",
        })
    }
}

/// How many tasks were left after a filter stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterStep {
    pub stage: FilterStage,
    pub remaining: usize,
}

#[derive(Debug, Clone)]
pub struct FilterResult<'a> {
    pub tasks: Vec<&'a Task>,
    pub trace: Vec<FilterStep>,
    /// Tasks dropped because they are hidden.
    pub hidden_tasks: usize,
    /// Tasks dropped because their group is hidden.
    pub hidden_in_groups: usize,
}

/// Runs the filter stages in order, stopping as soon as nothing is left.
pub fn filter_tasks<'a, I>(
    tasks: I,
    hidden_groups: &HashSet<GroupId>,
    settings: &FilterSettings,
) -> ListingResult<FilterResult<'a>>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut result = FilterResult {
        tasks: tasks.into_iter().collect(),
        trace: Vec::new(),
        hidden_tasks: 0,
        hidden_in_groups: 0,
    };

    if !settings.show_hidden_groups {
        let before = result.tasks.len();
        result.tasks.retain(|task| !hidden_groups.contains(&task.group));
        result.hidden_in_groups = before - result.tasks.len();
        if result.step(FilterStage::HiddenGroups) {
            return Ok(result);
        }
    }

    if !settings.show_hidden_tasks {
        let before = result.tasks.len();
        result.tasks.retain(|task| !task.hidden);
        result.hidden_tasks = before - result.tasks.len();
        if result.step(FilterStage::HiddenTasks) {
            return Ok(result);
        }
    }

    if !settings.tags.is_empty() {
        if result.tasks.iter().all(|task| task.tags.is_empty()) {
            return Err(FilterError::NoTaggedTasks {
                tags: settings.tags.clone(),
            });
        }
        result
            .tasks
            .retain(|task| settings.tags.iter().any(|tag| task.tags.contains(tag)));
        if result.step(FilterStage::Tags) {
            return Ok(result);
        }
    }

    if let Some(pattern) = settings.search.as_deref() {
        let re = Regex::new(pattern).map_err(|source| FilterError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        result.tasks.retain(|task| {
            re.is_match(&task.name) || task.summary().is_some_and(|line| re.is_match(line))
        });
        result.step(FilterStage::Search);
    }

    Ok(result)
}

impl FilterResult<'_> {
    /// Records a stage; true when the list is now empty.
    fn step(&mut self, stage: FilterStage) -> bool {
        self.trace.push(FilterStep {
            stage,
            remaining: self.tasks.len(),
        });
        log::debug!("Filter stage '{}': {} tasks left", stage, self.tasks.len());
        self.tasks.is_empty()
    }
}

/// Alphabetical, with the optional important-first and hidden-last partitions.
pub fn sort_tasks(tasks: &mut [&Task], settings: SortSettings) {
    tasks.sort_by(|a, b| {
        sort_key(a, settings)
            .cmp(&sort_key(b, settings))
            .then_with(|| a.name.cmp(&b.name))
    });
}

fn sort_key(task: &Task, settings: SortSettings) -> (bool, bool) {
    (
        settings.hidden_last && task.hidden,
        settings.important_first && !task.important,
    )
}

// --- LAYOUT ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingEntry {
    Group {
        id: GroupId,
        name: String,
        full_name: String,
        description: Option<String>,
        depth: usize,
    },
    Task {
        name: String,
        aliases: Vec<String>,
        summary: Option<String>,
        usage: String,
        depth: usize,
        important: bool,
        hidden: bool,
    },
}

/// A rendered-ready listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub entries: Vec<ListingEntry>,
    pub hidden_tasks: usize,
    pub hidden_in_groups: usize,
    pub trace: Vec<FilterStep>,
    pub show_aliases: bool,
}

impl Listing {
    pub fn task_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                ListingEntry::Task { name, .. } => Some(name.as_str()),
                ListingEntry::Group { .. } => None,
            })
            .collect()
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                ListingEntry::Group { full_name, .. } => Some(full_name.as_str()),
                ListingEntry::Task { .. } => None,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lists the entry module's tasks below `root` (its default group when `None`).
///
/// The default group comes first, then its child groups in creation order,
/// each followed by its own children. Groups with nothing to show are left out.
pub fn build_listing(
    rt: &Runtime,
    settings: &ListingSettings,
    root: Option<GroupId>,
) -> ListingResult<Listing> {
    let Some(registry) = rt.entry_registry() else {
        return Ok(Listing::default());
    };
    let groups = rt.groups();
    let Some(root) = root.or_else(|| rt.entry().and_then(|m| rt.default_group(m))) else {
        return Ok(Listing::default());
    };

    let subtree = groups.subtree(root);
    let hidden_groups: HashSet<GroupId> = subtree
        .iter()
        .copied()
        .filter(|&id| groups.is_effectively_hidden(id))
        .collect();
    let in_subtree: HashSet<GroupId> = subtree.iter().copied().collect();

    let filtered = filter_tasks(
        registry.tasks().iter().filter(|t| in_subtree.contains(&t.group)),
        &hidden_groups,
        &settings.filter,
    )?;

    let mut listing = Listing {
        entries: Vec::new(),
        hidden_tasks: filtered.hidden_tasks,
        hidden_in_groups: filtered.hidden_in_groups,
        trace: filtered.trace,
        show_aliases: settings.show_aliases,
    };
    let flat_children = groups.get(root).is_some_and(|g| g.is_default);
    lay_out(
        rt,
        &filtered.tasks,
        settings.sort,
        root,
        0,
        flat_children,
        &mut listing.entries,
    );
    Ok(listing)
}

fn lay_out(
    rt: &Runtime,
    tasks: &[&Task],
    sort: SortSettings,
    group: GroupId,
    depth: usize,
    flat_children: bool,
    out: &mut Vec<ListingEntry>,
) {
    let groups = rt.groups();
    let subtree: HashSet<GroupId> = groups.subtree(group).into_iter().collect();
    if !tasks.iter().any(|t| subtree.contains(&t.group)) {
        return;
    }

    let mut own: Vec<&Task> = tasks.iter().copied().filter(|t| t.group == group).collect();
    if let Some(g) = groups.get(group) {
        if !own.is_empty() || !g.is_default {
            out.push(ListingEntry::Group {
                id: group,
                name: g.name.clone(),
                full_name: groups.full_name(group),
                description: g.description.clone(),
                depth,
            });
        }
    }

    sort_tasks(&mut own, sort);
    out.extend(own.into_iter().map(|task| ListingEntry::Task {
        name: task.name.clone(),
        aliases: task.aliases.clone(),
        summary: task.summary().map(str::to_string),
        usage: task.usage(),
        depth: depth + 1,
        important: task.important,
        hidden: task.hidden,
    }));

    let child_depth = if flat_children { depth } else { depth + 1 };
    for &child in groups.children(group) {
        lay_out(rt, tasks, sort, child, child_depth, false, out);
    }
}
