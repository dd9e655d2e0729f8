//! Display ordering for task hierarchies
//!
//! Tasks arrive as a flat list with `parent_id` links. The sorter emits root
//! tasks by due date and places every task's subtree directly after it, with
//! siblings ordered by `(level, due_date)`. Tasks that cannot be reached from a
//! root (dangling or cross-project parents, cycles) are appended at the end.
//!
//! The output is always a permutation of the input. If the ordering pass panics
//! or produces anything else, the input order is returned unchanged.

use crate::models::{Task, TaskNode};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, warn};

/// Diagnostics collected while ordering
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SortReport {
    /// Number of tasks without a parent
    pub root_count: usize,
    /// Ids of tasks appended because no root reaches them, in output order
    pub orphans: Vec<String>,
    /// Subset of `orphans` whose ancestor chain loops back on itself
    pub cyclic: Vec<String>,
    /// How often the walk met a task it had already emitted
    pub revisits: usize,
    /// `true` when the input order was returned unchanged
    pub fell_back: bool,
}

/// Ordered tasks plus diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchySort {
    pub tasks: Vec<Task>,
    pub report: SortReport,
}

/// Order tasks for display
///
/// # Examples
///
/// ```
/// use tasktree_core::{sort_hierarchically, Task};
///
/// fn task(id: &str, parent: Option<&str>, due: &str) -> Task {
///     Task {
///         id: id.to_string(),
///         name: id.to_string(),
///         project_id: "p1".to_string(),
///         parent_id: parent.map(str::to_string),
///         completed: false,
///         start_date: due.to_string(),
///         due_date: due.to_string(),
///         completion_date: None,
///         notes: String::new(),
///         assignee: "me".to_string(),
///         level: 0,
///         collapsed: false,
///         created_at: due.to_string(),
///         updated_at: due.to_string(),
///     }
/// }
///
/// let tasks = vec![
///     task("child", Some("root"), "2024-03-02"),
///     task("late", None, "2024-03-09"),
///     task("root", None, "2024-03-05"),
/// ];
/// let ids: Vec<_> = sort_hierarchically(tasks).into_iter().map(|t| t.id).collect();
/// assert_eq!(ids, ["root", "child", "late"]);
/// ```
#[must_use]
pub fn sort_hierarchically(tasks: Vec<Task>) -> Vec<Task> {
    sort_with_report(tasks).tasks
}

/// Order tasks for display and report what was found along the way
#[must_use]
pub fn sort_with_report(tasks: Vec<Task>) -> HierarchySort {
    sort_with_planner(tasks, plan_order)
}

pub(crate) fn sort_with_planner<P>(tasks: Vec<Task>, planner: P) -> HierarchySort
where
    P: FnOnce(&[Task]) -> (Vec<usize>, SortReport),
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| planner(&tasks)));

    let (order, report) = match outcome {
        Ok((order, report)) if is_permutation(&order, tasks.len()) => (order, report),
        Ok((order, _)) => {
            error!(
                expected = tasks.len(),
                produced = order.len(),
                "Hierarchy ordering lost or duplicated tasks, keeping input order"
            );
            return fallback(tasks);
        }
        Err(_) => {
            error!(count = tasks.len(), "Hierarchy ordering panicked, keeping input order");
            return fallback(tasks);
        }
    };

    if !report.orphans.is_empty() {
        warn!(
            count = report.orphans.len(),
            orphans = ?report.orphans,
            "Tasks not reachable from any root were appended"
        );
    }
    if !report.cyclic.is_empty() {
        warn!(cyclic = ?report.cyclic, "Parent links form a cycle");
    }
    if report.revisits > 0 {
        debug!(revisits = report.revisits, "Skipped already emitted tasks");
    }

    let mut slots: Vec<Option<Task>> = tasks.into_iter().map(Some).collect();
    let tasks = order.iter().filter_map(|&i| slots[i].take()).collect();
    HierarchySort { tasks, report }
}

fn fallback(tasks: Vec<Task>) -> HierarchySort {
    HierarchySort {
        tasks,
        report: SortReport {
            fell_back: true,
            ..SortReport::default()
        },
    }
}

fn is_permutation(order: &[usize], len: usize) -> bool {
    if order.len() != len {
        return false;
    }
    let mut seen = vec![false; len];
    for &i in order {
        match seen.get_mut(i) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    true
}

fn by_due_date(tasks: &[Task]) -> impl Fn(&usize, &usize) -> Ordering + '_ {
    |&a, &b| tasks[a].due_date.cmp(&tasks[b].due_date)
}

fn by_level_then_due_date(tasks: &[Task]) -> impl Fn(&usize, &usize) -> Ordering + '_ {
    |&a, &b| {
        tasks[a]
            .level
            .cmp(&tasks[b].level)
            .then_with(|| tasks[a].due_date.cmp(&tasks[b].due_date))
    }
}

/// Children of each `(parent id, project id)`, siblings already ordered
fn child_index(tasks: &[Task]) -> HashMap<(&str, &str), Vec<usize>> {
    let mut children: HashMap<(&str, &str), Vec<usize>> = HashMap::new();
    for (i, task) in tasks.iter().enumerate() {
        if let Some(parent) = task.parent() {
            children
                .entry((parent, task.project_id.as_str()))
                .or_default()
                .push(i);
        }
    }
    let compare = by_level_then_due_date(tasks);
    for group in children.values_mut() {
        group.sort_by(&compare);
    }
    children
}

/// Compute the output order as indices into `tasks`
fn plan_order(tasks: &[Task]) -> (Vec<usize>, SortReport) {
    let children = child_index(tasks);
    let mut roots: Vec<usize> = (0..tasks.len()).filter(|&i| tasks[i].is_root()).collect();
    roots.sort_by(by_due_date(tasks));

    let mut report = SortReport {
        root_count: roots.len(),
        ..SortReport::default()
    };
    let mut visited = vec![false; tasks.len()];
    let mut order = Vec::with_capacity(tasks.len());
    let mut stack = Vec::new();

    for &root in &roots {
        stack.push(root);
        while let Some(i) = stack.pop() {
            if visited[i] {
                report.revisits += 1;
                continue;
            }
            visited[i] = true;
            order.push(i);

            let key = (tasks[i].id.as_str(), tasks[i].project_id.as_str());
            if let Some(group) = children.get(&key) {
                for &child in group.iter().rev() {
                    if visited[child] {
                        report.revisits += 1;
                    } else {
                        stack.push(child);
                    }
                }
            }
        }
    }

    let mut orphans: Vec<usize> = (0..tasks.len()).filter(|&i| !visited[i]).collect();
    if !orphans.is_empty() {
        orphans.sort_by(by_level_then_due_date(tasks));
        let loops = cyclic_members(tasks, &orphans, &visited);
        for &i in &orphans {
            report.orphans.push(tasks[i].id.clone());
            if loops[i] {
                report.cyclic.push(tasks[i].id.clone());
            }
        }
        order.extend(orphans);
    }

    (order, report)
}

/// Mark orphans whose chain of same-project parents loops
fn cyclic_members(tasks: &[Task], orphans: &[usize], visited: &[bool]) -> Vec<bool> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Unknown,
        OnPath,
        Cyclic,
        Acyclic,
    }

    let mut first_by_id: HashMap<&str, usize> = HashMap::with_capacity(tasks.len());
    for (i, task) in tasks.iter().enumerate() {
        first_by_id.entry(task.id.as_str()).or_insert(i);
    }
    let parent_of = |i: usize| -> Option<usize> {
        let parent = first_by_id.get(tasks[i].parent()?).copied()?;
        (tasks[parent].project_id == tasks[i].project_id && !visited[parent]).then_some(parent)
    };

    let mut state = vec![State::Unknown; tasks.len()];
    let mut path = Vec::new();
    for &start in orphans {
        let mut current = Some(start);
        let outcome = loop {
            match current {
                None => break State::Acyclic,
                Some(i) => match state[i] {
                    State::Unknown => {
                        state[i] = State::OnPath;
                        path.push(i);
                        current = parent_of(i);
                    }
                    State::OnPath => break State::Cyclic,
                    resolved => break resolved,
                },
            }
        };
        for i in path.drain(..) {
            state[i] = outcome;
        }
    }

    state.into_iter().map(|s| s == State::Cyclic).collect()
}

/// Nest the descendants of `root_id` under it
///
/// Children are ordered like [`sort_hierarchically`] orders siblings. Each task
/// appears at most once, so cycles terminate. Returns `None` when no task has
/// the given id.
#[must_use]
pub fn build_task_tree(root_id: &str, tasks: &[Task]) -> Option<TaskNode> {
    let root = tasks.iter().position(|t| t.id == root_id)?;
    let children = child_index(tasks);

    let mut visited = vec![false; tasks.len()];
    let mut preorder = Vec::new();
    let mut tree_children: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut stack = vec![root];
    visited[root] = true;

    while let Some(i) = stack.pop() {
        preorder.push(i);
        let key = (tasks[i].id.as_str(), tasks[i].project_id.as_str());
        let Some(group) = children.get(&key) else {
            continue;
        };
        let kept: Vec<usize> = group.iter().copied().filter(|&c| !visited[c]).collect();
        for &child in &kept {
            visited[child] = true;
        }
        stack.extend(kept.iter().rev());
        tree_children.insert(i, kept);
    }

    // Children follow their parent in pre-order, so building in reverse
    // finishes every child before its parent.
    let mut built: HashMap<usize, TaskNode> = HashMap::with_capacity(preorder.len());
    for &i in preorder.iter().rev() {
        let nested = tree_children
            .remove(&i)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| built.remove(&c))
            .collect();
        built.insert(
            i,
            TaskNode {
                task: tasks[i].clone(),
                children: nested,
            },
        );
    }
    built.remove(&root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::task;

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_empty_input() {
        let sorted = sort_with_report(vec![]);
        assert!(sorted.tasks.is_empty());
        assert_eq!(sorted.report, SortReport::default());
    }

    #[test]
    fn test_roots_by_due_date() {
        let tasks = vec![
            task("a", None, "2024-03-05"),
            task("b", None, "2024-03-01"),
            task("c", None, "2024-03-10"),
        ];
        assert_eq!(ids(&sort_hierarchically(tasks)), ["b", "a", "c"]);
    }

    #[test]
    fn test_children_follow_parent() {
        let tasks = vec![
            task("c2", Some("r1"), "2024-03-03"),
            task("r2", None, "2024-03-02"),
            task("r1", None, "2024-03-01"),
            task("c1", Some("r1"), "2024-03-09"),
            task("g1", Some("c2"), "2024-03-04"),
        ];
        assert_eq!(
            ids(&sort_hierarchically(tasks)),
            ["r1", "c2", "g1", "c1", "r2"]
        );
    }

    #[test]
    fn test_siblings_ordered_by_level_then_due_date() {
        let mut deep = task("deep", Some("r"), "2024-03-01");
        deep.level = 2;
        let tasks = vec![
            task("r", None, "2024-03-01"),
            deep,
            task("late", Some("r"), "2024-03-08"),
            task("early", Some("r"), "2024-03-02"),
        ];
        assert_eq!(
            ids(&sort_hierarchically(tasks)),
            ["r", "early", "late", "deep"]
        );
    }

    #[test]
    fn test_ties_keep_input_order() {
        let tasks = vec![
            task("x", None, "2024-03-01"),
            task("y", None, "2024-03-01"),
            task("z", None, "2024-03-01"),
        ];
        assert_eq!(ids(&sort_hierarchically(tasks)), ["x", "y", "z"]);
    }

    #[test]
    fn test_empty_parent_is_root() {
        let tasks = vec![
            task("b", Some(""), "2024-03-02"),
            task("a", None, "2024-03-01"),
        ];
        let sorted = sort_with_report(tasks);
        assert_eq!(ids(&sorted.tasks), ["a", "b"]);
        assert_eq!(sorted.report.root_count, 2);
    }

    #[test]
    fn test_two_node_cycle_is_appended_once() {
        let tasks = vec![
            task("root", None, "2024-03-01"),
            task("a", Some("b"), "2024-03-02"),
            task("b", Some("a"), "2024-03-03"),
        ];
        let sorted = sort_with_report(tasks);

        assert_eq!(ids(&sorted.tasks), ["root", "a", "b"]);
        assert_eq!(sorted.report.orphans, ["a", "b"]);
        assert_eq!(sorted.report.cyclic, ["a", "b"]);
        assert!(!sorted.report.fell_back);
    }

    #[test]
    fn test_self_parent_is_cyclic_orphan() {
        let tasks = vec![task("loop", Some("loop"), "2024-03-01")];
        let sorted = sort_with_report(tasks);

        assert_eq!(ids(&sorted.tasks), ["loop"]);
        assert_eq!(sorted.report.cyclic, ["loop"]);
    }

    #[test]
    fn test_dangling_parent_is_not_cyclic() {
        let mut high = task("high", Some("gone"), "2024-03-01");
        high.level = 3;
        let tasks = vec![
            high,
            task("low", Some("gone"), "2024-03-05"),
            task("root", None, "2024-03-09"),
        ];
        let sorted = sort_with_report(tasks);

        assert_eq!(ids(&sorted.tasks), ["root", "low", "high"]);
        assert_eq!(sorted.report.orphans, ["low", "high"]);
        assert!(sorted.report.cyclic.is_empty());
    }

    #[test]
    fn test_cross_project_parent_is_orphan() {
        let mut foreign = task("child", Some("root"), "2024-03-02");
        foreign.project_id = "p-other".to_string();
        let tasks = vec![task("root", None, "2024-03-01"), foreign];
        let sorted = sort_with_report(tasks);

        assert_eq!(ids(&sorted.tasks), ["root", "child"]);
        assert_eq!(sorted.report.orphans, ["child"]);
    }

    #[test]
    fn test_duplicate_ids_each_emitted_once() {
        let tasks = vec![
            task("dup", None, "2024-03-01"),
            task("dup", None, "2024-03-02"),
            task("kid", Some("dup"), "2024-03-03"),
        ];
        let sorted = sort_with_report(tasks);

        assert_eq!(sorted.tasks.len(), 3);
        assert_eq!(ids(&sorted.tasks), ["dup", "kid", "dup"]);
        assert_eq!(sorted.report.revisits, 1);
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let n = 50_000;
        let mut tasks = vec![task("n0", None, "2024-03-01")];
        for i in 1..n {
            let parent = format!("n{}", i - 1);
            tasks.push(task(&format!("n{i}"), Some(&parent), "2024-03-01"));
        }
        tasks.reverse();

        let sorted = sort_hierarchically(tasks);
        assert_eq!(sorted.len(), n);
        assert_eq!(sorted[0].id, "n0");
        assert_eq!(sorted[n - 1].id, format!("n{}", n - 1));
    }

    #[test]
    fn test_panicking_planner_keeps_input_order() {
        let tasks = vec![
            task("b", None, "2024-03-02"),
            task("a", None, "2024-03-01"),
        ];
        let sorted = sort_with_planner(tasks, |_| panic!("boom"));

        assert_eq!(ids(&sorted.tasks), ["b", "a"]);
        assert!(sorted.report.fell_back);
    }

    #[test]
    fn test_non_permutation_keeps_input_order() {
        let tasks = vec![
            task("b", None, "2024-03-02"),
            task("a", None, "2024-03-01"),
        ];
        let sorted = sort_with_planner(tasks, |_| (vec![1, 1], SortReport::default()));

        assert_eq!(ids(&sorted.tasks), ["b", "a"]);
        assert!(sorted.report.fell_back);
    }

    #[test]
    fn test_is_permutation() {
        assert!(is_permutation(&[2, 0, 1], 3));
        assert!(!is_permutation(&[0, 1], 3));
        assert!(!is_permutation(&[0, 0, 1], 3));
        assert!(!is_permutation(&[0, 1, 3], 3));
    }

    #[test]
    fn test_build_task_tree() {
        let tasks = vec![
            task("r", None, "2024-03-01"),
            task("c2", Some("r"), "2024-03-05"),
            task("c1", Some("r"), "2024-03-02"),
            task("g", Some("c1"), "2024-03-03"),
            task("other", None, "2024-03-01"),
        ];
        let tree = build_task_tree("r", &tasks).unwrap();

        assert_eq!(tree.task.id, "r");
        assert_eq!(tree.task_count(), 4);
        let kids: Vec<_> = tree.children.iter().map(|n| n.task.id.as_str()).collect();
        assert_eq!(kids, ["c1", "c2"]);
        assert_eq!(tree.children[0].children[0].task.id, "g");
    }

    #[test]
    fn test_build_task_tree_with_cycle_terminates() {
        let tasks = vec![
            task("a", Some("b"), "2024-03-01"),
            task("b", Some("a"), "2024-03-02"),
        ];
        let tree = build_task_tree("a", &tasks).unwrap();

        assert_eq!(tree.task_count(), 2);
        assert_eq!(tree.children[0].task.id, "b");
        assert!(tree.children[0].children.is_empty());
    }

    #[test]
    fn test_build_task_tree_missing_root() {
        assert!(build_task_tree("nope", &[task("a", None, "2024-03-01")]).is_none());
    }
}
