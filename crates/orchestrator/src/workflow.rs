//! Workflow tracker: task completion and dependency resolution.
//!
//! Tasks are display strings such as `"2. 确认身份"` or `"1. 产品介绍*"`. The
//! leading ordinal and the trailing `*` are presentation; the *sanitized* name
//! (`"确认身份"`) is what the model reports back and what the persona shows.
//! A trailing `*` marks a task as always available: it is offered again after
//! it has been completed.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, trace};

/// Suffix marking a task that stays available after completion.
pub const ALWAYS_AVAILABLE_MARKER: char = '*';

/// Strip the leading ordinal and trailing marker from a task name.
///
/// The ordinal is a run of ASCII digits, an optional `.`, then any whitespace.
pub fn sanitize_task_name(name: &str) -> String {
    let trimmed = name.trim();
    let after_digits = trimmed.trim_start_matches(|c: char| c.is_ascii_digit());
    let without_ordinal = if after_digits.len() == trimmed.len() {
        trimmed
    } else {
        after_digits.strip_prefix('.').unwrap_or(after_digits).trim_start()
    };
    without_ordinal
        .trim_end_matches(ALWAYS_AVAILABLE_MARKER)
        .trim()
        .to_string()
}

/// Find the task a reference names.
///
/// Tried in order: the full task string (case-insensitive), the numeric id
/// (`"2"` matches `"2. 确认身份"`), then the sanitized name (case-insensitive).
pub fn find_task<'a, S: AsRef<str>>(tasks: &'a [S], name_or_id: &str) -> Option<&'a str> {
    let wanted = name_or_id.trim();
    let names = || tasks.iter().map(|t| t.as_ref());

    names()
        .find(|task| task.trim().to_lowercase() == wanted.to_lowercase())
        .or_else(|| {
            names().find(|task| {
                task.trim()
                    .strip_prefix(wanted)
                    .and_then(|rest| rest.chars().next())
                    .is_some_and(|c| c == '.' || c.is_whitespace())
            })
        })
        .or_else(|| {
            names().find(|task| sanitize_task_name(task).to_lowercase() == wanted.to_lowercase())
        })
}

/// Prerequisite edges between tasks, keyed by task display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyRules {
    edges: IndexMap<String, Vec<String>>,
}

impl DependencyRules {
    /// Parse `A -> B, C` lines against the current task list.
    ///
    /// Lines without an arrow, tasks not in the list and prerequisites not in
    /// the list are skipped. A later line for the same task replaces an earlier one.
    pub fn parse<S: AsRef<str>>(text: &str, tasks: &[S]) -> Self {
        let mut edges = IndexMap::new();

        for line in text.lines() {
            if !line.contains("->") {
                continue;
            }
            let mut parts = line.split("->");
            let (Some(head), Some(tail)) = (parts.next(), parts.next()) else {
                continue;
            };
            let Some(task) = find_task(tasks, head) else {
                trace!("Skipping dependency line for unknown task: {}", line.trim());
                continue;
            };

            let prerequisites: Vec<String> = tail
                .split(',')
                .filter_map(|name| find_task(tasks, name))
                .map(str::to_string)
                .collect();

            if !prerequisites.is_empty() {
                edges.insert(task.to_string(), prerequisites);
            }
        }

        debug!("Parsed {} dependency rules", edges.len());
        Self { edges }
    }

    /// Prerequisites of `task`, empty when it has none.
    pub fn prerequisites(&self, task: &str) -> &[String] {
        self.edges.get(task).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
}

/// One workflow step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    name: String,
    sanitized: String,
    status: TaskStatus,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let sanitized = sanitize_task_name(&name);
        Self {
            name,
            sanitized,
            status: TaskStatus::Pending,
        }
    }

    /// Display name, as configured.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sanitized_name(&self) -> &str {
        &self.sanitized
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn is_always_available(&self) -> bool {
        self.name.trim_end().ends_with(ALWAYS_AVAILABLE_MARKER)
    }
}

/// Per-session task completion state.
#[derive(Debug, Clone, Default)]
pub struct WorkflowTracker {
    tasks: Vec<Task>,
}

impl WorkflowTracker {
    pub fn new<I, S>(tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tracker = Self::default();
        tracker.update_tasks(tasks);
        tracker
    }

    /// Replace the task list; every task starts pending.
    pub fn update_tasks<I, S>(&mut self, tasks: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tasks = tasks
            .into_iter()
            .map(|task| -> String { task.into() })
            .filter(|name| !name.trim().is_empty())
            .map(Task::new)
            .collect();
    }

    /// Mark the task `name` refers to as completed.
    ///
    /// Returns the task's display name when one matched. Unknown names are ignored.
    pub fn complete(&mut self, name: &str) -> Option<String> {
        let names: Vec<&str> = self.tasks.iter().map(Task::name).collect();
        let matched = find_task(&names, name)?.to_string();

        if let Some(task) = self.tasks.iter_mut().find(|t| t.name == matched) {
            task.status = TaskStatus::Completed;
        }
        Some(matched)
    }

    /// Mark every task completed.
    pub fn complete_all(&mut self) {
        for task in &mut self.tasks {
            task.status = TaskStatus::Completed;
        }
    }

    /// Tasks that can be worked on now, in list order.
    ///
    /// A pending task is available when all its prerequisites are completed. A
    /// completed task is available again only if it carries the marker.
    pub fn available_tasks(&self, rules: &DependencyRules) -> Vec<&Task> {
        let completed: HashSet<&str> = self
            .tasks
            .iter()
            .filter(|t| t.is_completed())
            .map(Task::name)
            .collect();

        self.tasks
            .iter()
            .filter(|task| match task.status {
                TaskStatus::Pending => rules
                    .prerequisites(&task.name)
                    .iter()
                    .all(|p| completed.contains(p.as_str())),
                TaskStatus::Completed => task.is_always_available(),
            })
            .collect()
    }

    /// True when no task is pending.
    pub fn is_workflow_complete(&self) -> bool {
        self.tasks.iter().all(Task::is_completed)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task_names(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_tasks() -> Vec<&'static str> {
        vec!["1. 产品介绍*", "2. 确认身份", "3. 套餐推荐", "4. 办理确认", "5. 结束语"]
    }

    fn chain_rules(tasks: &[&str]) -> DependencyRules {
        DependencyRules::parse("2 -> 1\n3 -> 2\n4 -> 3 \n5 -> 4", tasks)
    }

    fn names(tasks: Vec<&Task>) -> Vec<&str> {
        tasks.into_iter().map(Task::name).collect()
    }

    #[test]
    fn test_sanitize_task_name() {
        assert_eq!(sanitize_task_name("1. 产品介绍*"), "产品介绍");
        assert_eq!(sanitize_task_name("  12 结束语 "), "结束语");
        assert_eq!(sanitize_task_name("确认身份"), "确认身份");
    }

    #[test]
    fn test_find_task_precedence() {
        let tasks = ["2. 确认身份", "3. 套餐推荐", "确认身份"];
        // Exact string beats sanitized match on an earlier entry.
        assert_eq!(find_task(&tasks, "确认身份"), Some("确认身份"));
        assert_eq!(find_task(&tasks, "3"), Some("3. 套餐推荐"));
        assert_eq!(find_task(&tasks, "2. 确认身份"), Some("2. 确认身份"));
        assert_eq!(find_task(&tasks, "9"), None);
    }

    #[test]
    fn test_numeric_prefix_requires_separator() {
        let tasks = ["12. 结束语", "1. 产品介绍"];
        assert_eq!(find_task(&tasks, "1"), Some("1. 产品介绍"));
    }

    #[test]
    fn test_parse_skips_unknown_and_malformed_lines() {
        let tasks = default_tasks();
        let rules = DependencyRules::parse("2 -> 1, 9\nnonsense\n7 -> 1\n3 ->\n", &tasks);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.prerequisites("2. 确认身份"), ["1. 产品介绍*".to_string()]);
        assert!(rules.prerequisites("3. 套餐推荐").is_empty());
    }

    #[test]
    fn test_available_follows_chain() {
        let tasks = default_tasks();
        let rules = chain_rules(&tasks);
        let mut tracker = WorkflowTracker::new(tasks.clone());

        assert_eq!(names(tracker.available_tasks(&rules)), vec!["1. 产品介绍*"]);

        tracker.complete("产品介绍");
        // Marker keeps task 1 on offer after completion.
        assert_eq!(
            names(tracker.available_tasks(&rules)),
            vec!["1. 产品介绍*", "2. 确认身份"]
        );

        tracker.complete("2");
        assert_eq!(
            names(tracker.available_tasks(&rules)),
            vec!["1. 产品介绍*", "3. 套餐推荐"]
        );
    }

    #[test]
    fn test_available_never_includes_unmet_prerequisites() {
        let tasks = default_tasks();
        let rules = chain_rules(&tasks);
        let mut tracker = WorkflowTracker::new(tasks.clone());

        // Completing out of order does not unlock task 4's successor chain early.
        tracker.complete("3. 套餐推荐");
        for task in tracker.available_tasks(&rules) {
            if !task.is_completed() {
                for prereq in rules.prerequisites(task.name()) {
                    let done = tracker
                        .tasks()
                        .iter()
                        .any(|t| t.name() == prereq && t.is_completed());
                    assert!(done, "{} offered before {}", task.name(), prereq);
                }
            }
        }
    }

    #[test]
    fn test_complete_is_idempotent_and_ignores_unknown() {
        let mut once = WorkflowTracker::new(default_tasks());
        let mut twice = WorkflowTracker::new(default_tasks());

        once.complete("确认身份");
        twice.complete("确认身份");
        twice.complete("确认身份");
        assert_eq!(once.tasks(), twice.tasks());

        assert_eq!(once.complete("不存在"), None);
    }

    #[test]
    fn test_workflow_complete() {
        let mut tracker = WorkflowTracker::new(default_tasks());
        assert!(!tracker.is_workflow_complete());
        tracker.complete_all();
        assert!(tracker.is_workflow_complete());

        tracker.update_tasks(vec!["a", "b"]);
        assert!(!tracker.is_workflow_complete());
        assert_eq!(tracker.task_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_no_prerequisites_means_available() {
        let tracker = WorkflowTracker::new(vec!["1. a", "2. b"]);
        let rules = DependencyRules::default();
        assert_eq!(tracker.available_tasks(&rules).len(), 2);
    }
}
