//! Summary/subtask hierarchy derived from outline levels.

use crate::types::Task;

/// Parent index per task: the nearest preceding task with a smaller
/// outline level.
pub fn outline_parents(tasks: &[Task]) -> Vec<Option<usize>> {
    let mut parents = Vec::with_capacity(tasks.len());
    // Indices of the open ancestors, innermost last
    let mut stack: Vec<usize> = Vec::new();

    for (i, task) in tasks.iter().enumerate() {
        while let Some(&top) = stack.last() {
            if tasks[top].outline_level >= task.outline_level {
                stack.pop();
            } else {
                break;
            }
        }
        parents.push(stack.last().copied());
        stack.push(i);
    }
    parents
}

/// True for tasks that have at least one outline child
pub fn has_children(parents: &[Option<usize>]) -> Vec<bool> {
    let mut flags = vec![false; parents.len()];
    for parent in parents.iter().flatten() {
        flags[*parent] = true;
    }
    flags
}

/// Leaf tasks under each task. A leaf lists only itself.
pub fn leaf_descendants(parents: &[Option<usize>]) -> Vec<Vec<usize>> {
    let summary = has_children(parents);
    let mut leaves = vec![Vec::new(); parents.len()];
    for i in (0..parents.len()).filter(|&i| !summary[i]) {
        leaves[i].push(i);
        let mut up = parents[i];
        while let Some(ancestor) = up {
            leaves[ancestor].push(i);
            up = parents[ancestor];
        }
    }
    leaves
}

/// True when `ancestor` is a proper outline ancestor of `task`
pub fn is_ancestor(parents: &[Option<usize>], ancestor: usize, task: usize) -> bool {
    let mut up = parents[task];
    while let Some(a) = up {
        if a == ancestor {
            return true;
        }
        up = parents[a];
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn parents_follow_outline_levels() {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        let levels = [1, 2, 3, 2, 1, 2];
        let tasks: Vec<Task> = levels
            .iter()
            .enumerate()
            .map(|(i, level)| Task::new(format!("T{}", i), start, 8.0).with_outline_level(*level))
            .collect();

        let parents = outline_parents(&tasks);
        assert_eq!(parents, vec![None, Some(0), Some(1), Some(0), None, Some(4)]);
        assert_eq!(has_children(&parents), vec![true, true, false, false, true, false]);

        let leaves = leaf_descendants(&parents);
        assert_eq!(leaves[0], vec![2, 3]);
        assert_eq!(leaves[2], vec![2]);
        assert_eq!(leaves[4], vec![5]);
        assert!(is_ancestor(&parents, 0, 2));
        assert!(!is_ancestor(&parents, 2, 0));
        assert!(!is_ancestor(&parents, 3, 3));
    }
}
