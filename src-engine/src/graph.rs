//! Dependency graph over tasks
//!
//! Built once per snapshot. Construction fails on dangling references and on
//! cycles; a successfully built graph always has a topological order.
//!
//! Scheduling runs over leaf tasks only. A link that touches a summary task
//! is expanded onto every leaf underneath it, so `A -> Phase` constrains each
//! task in the phase and `Phase -> B` waits for all of them.

use crate::error::{Result, ScheduleError};
use crate::outline::{is_ancestor, leaf_descendants, outline_parents};
use crate::types::{Dependency, LinkType, Task};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Adjacency entry. `task` is the task at the other end of the link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub dependency: usize,
    pub task: usize,
    pub link_type: LinkType,
    pub lag_hours: f64,
}

/// Successor and predecessor lists for one set of edges
#[derive(Debug, Clone)]
struct Adjacency {
    successors: Vec<Vec<Edge>>,
    predecessors: Vec<Vec<Edge>>,
}

impl Adjacency {
    fn with_len(n: usize) -> Self {
        Self {
            successors: vec![Vec::new(); n],
            predecessors: vec![Vec::new(); n],
        }
    }

    fn link(&mut self, dependency: usize, pred: usize, succ: usize, dep: &Dependency) {
        self.successors[pred].push(Edge {
            dependency,
            task: succ,
            link_type: dep.link_type,
            lag_hours: dep.lag_hours,
        });
        self.predecessors[succ].push(Edge {
            dependency,
            task: pred,
            link_type: dep.link_type,
            lag_hours: dep.lag_hours,
        });
    }

    /// Kahn's algorithm; ties go to the task that came first in the input.
    /// On failure returns the members of one cycle.
    fn sort(&self) -> std::result::Result<Vec<usize>, Vec<usize>> {
        let n = self.successors.len();
        let mut in_degree: Vec<usize> = self.predecessors.iter().map(Vec::len).collect();
        let mut ready: BinaryHeap<Reverse<usize>> = (0..n)
            .filter(|&i| in_degree[i] == 0)
            .map(Reverse)
            .collect();

        let mut order = Vec::with_capacity(n);
        while let Some(Reverse(i)) = ready.pop() {
            order.push(i);
            for edge in &self.successors[i] {
                in_degree[edge.task] -= 1;
                if in_degree[edge.task] == 0 {
                    ready.push(Reverse(edge.task));
                }
            }
        }

        if order.len() < n {
            let mut placed = vec![false; n];
            for &i in &order {
                placed[i] = true;
            }
            return Err(self.find_cycle(&placed));
        }
        Ok(order)
    }

    /// Every task Kahn could not place has an unplaced predecessor, so
    /// walking predecessors from any of them must revisit a task.
    fn find_cycle(&self, placed: &[bool]) -> Vec<usize> {
        let Some(start) = placed.iter().position(|p| !p) else {
            return Vec::new();
        };

        let mut seen_at: HashMap<usize, usize> = HashMap::new();
        let mut walk = Vec::new();
        let mut current = start;
        loop {
            if let Some(&pos) = seen_at.get(&current) {
                // walk[pos..] follows predecessor links; flip to successor order
                let mut cycle: Vec<usize> = walk[pos..].to_vec();
                cycle.reverse();
                let first = cycle
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, task)| **task)
                    .map(|(k, _)| k)
                    .unwrap_or(0);
                cycle.rotate_left(first);
                return cycle;
            }
            seen_at.insert(current, walk.len());
            walk.push(current);

            match self.predecessors[current].iter().find(|e| !placed[e.task]) {
                Some(edge) => current = edge.task,
                None => return walk,
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct DependencyGraph {
    ids: Vec<String>,
    index: HashMap<String, usize>,
    /// Links as recorded
    declared: Adjacency,
    /// Leaf-to-leaf links the passes run over
    leaf_links: Adjacency,
    order: Vec<usize>,
    edge_count: usize,
}

impl DependencyGraph {
    pub fn build(tasks: &[Task], dependencies: &[Dependency]) -> Result<Self> {
        let mut index = HashMap::with_capacity(tasks.len());
        for (i, task) in tasks.iter().enumerate() {
            if index.insert(task.id.clone(), i).is_some() {
                return Err(ScheduleError::DuplicateTaskId(task.id.clone()));
            }
        }

        let parents = outline_parents(tasks);
        let leaves = leaf_descendants(&parents);
        let mut declared = Adjacency::with_len(tasks.len());
        let mut leaf_links = Adjacency::with_len(tasks.len());
        // Declared links minus the ones between a summary and its own subtree
        let mut ordering = Adjacency::with_len(tasks.len());
        let mut nested = 0usize;

        for (d, dep) in dependencies.iter().enumerate() {
            let lookup = |task_id: &str| {
                index.get(task_id).copied().ok_or_else(|| ScheduleError::DanglingReference {
                    dependency_id: dep.id.clone(),
                    task_id: task_id.to_string(),
                })
            };
            let pred = lookup(&dep.predecessor_id)?;
            let succ = lookup(&dep.successor_id)?;
            declared.link(d, pred, succ, dep);

            if is_ancestor(&parents, pred, succ) || is_ancestor(&parents, succ, pred) {
                nested += 1;
                continue;
            }
            ordering.link(d, pred, succ, dep);
            for &from in &leaves[pred] {
                for &to in &leaves[succ] {
                    leaf_links.link(d, from, to, dep);
                }
            }
        }

        let ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
        let cycle_error = |cycle: Vec<usize>| ScheduleError::CycleDetected {
            task_ids: cycle.into_iter().map(|i| ids[i].clone()).collect(),
        };

        // Cycles are reported between leaves, where the passes would loop
        leaf_links.sort().map_err(cycle_error)?;

        // Place summaries too: every leaf link is an ordering constraint, and
        // so is every declared link outside a summary's own subtree
        for (from, edges) in leaf_links.successors.iter().enumerate() {
            for edge in edges {
                ordering.link(edge.dependency, from, edge.task, &dependencies[edge.dependency]);
            }
        }
        let order = ordering.sort().map_err(cycle_error)?;

        if nested > 0 {
            tracing::debug!(nested, "links between a summary and its own subtasks ignored");
        }
        tracing::debug!(
            tasks = ids.len(),
            dependencies = dependencies.len(),
            "dependency graph built"
        );
        Ok(Self {
            ids,
            index,
            declared,
            leaf_links,
            order,
            edge_count: dependencies.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// True when no task has a predecessor or successor
    pub fn is_isolated(&self) -> bool {
        self.edge_count == 0
    }

    pub fn index_of(&self, task_id: &str) -> Option<usize> {
        self.index.get(task_id).copied()
    }

    pub fn task_id(&self, index: usize) -> &str {
        &self.ids[index]
    }

    /// Task indices in topological order
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn topological_order(&self) -> Vec<&str> {
        self.order.iter().map(|&i| self.ids[i].as_str()).collect()
    }

    /// Leaf links into a leaf task; empty for summaries
    pub fn incoming(&self, index: usize) -> &[Edge] {
        &self.leaf_links.predecessors[index]
    }

    /// Leaf links out of a leaf task; empty for summaries
    pub fn outgoing(&self, index: usize) -> &[Edge] {
        &self.leaf_links.successors[index]
    }

    /// Declared predecessors, summaries included
    pub fn predecessors_of(&self, task_id: &str) -> Vec<&str> {
        self.index_of(task_id)
            .map(|i| self.declared.predecessors[i].iter().map(|e| self.ids[e.task].as_str()).collect())
            .unwrap_or_default()
    }

    /// Declared successors, summaries included
    pub fn successors_of(&self, task_id: &str) -> Vec<&str> {
        self.index_of(task_id)
            .map(|i| self.declared.successors[i].iter().map(|e| self.ids[e.task].as_str()).collect())
            .unwrap_or_default()
    }

    /// All leaf tasks reachable from `index` through leaf links, excluding
    /// `index` itself, in topological order.
    pub fn downstream_of(&self, index: usize) -> Vec<usize> {
        let mut reached = vec![false; self.ids.len()];
        let mut stack = vec![index];
        while let Some(i) = stack.pop() {
            for edge in &self.leaf_links.successors[i] {
                if !reached[edge.task] {
                    reached[edge.task] = true;
                    stack.push(edge.task);
                }
            }
        }
        self.order.iter().copied().filter(|&i| reached[i] && i != index).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn tasks(ids: &[&str]) -> Vec<Task> {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        ids.iter().map(|id| Task::new(*id, start, 8.0)).collect()
    }

    #[test]
    fn topological_order_respects_links_and_input_order() {
        let tasks = tasks(&["C", "A", "B", "D"]);
        let deps = vec![Dependency::new("d1", "A", "B"), Dependency::new("d2", "B", "C")];
        let graph = DependencyGraph::build(&tasks, &deps).unwrap();

        assert_eq!(graph.topological_order(), vec!["A", "B", "C", "D"]);
        assert_eq!(graph.predecessors_of("C"), vec!["B"]);
        assert_eq!(graph.successors_of("A"), vec!["B"]);
        assert!(graph.successors_of("D").is_empty());
        assert!(!graph.is_isolated());
    }

    #[test]
    fn dangling_reference_is_fatal() {
        let tasks = tasks(&["A"]);
        let deps = vec![Dependency::new("d1", "A", "ghost")];
        let err = DependencyGraph::build(&tasks, &deps).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::DanglingReference { dependency_id: "d1".into(), task_id: "ghost".into() }
        );
    }

    #[test]
    fn cycle_reports_exactly_its_members() {
        let tasks = tasks(&["A", "B", "C", "D"]);
        let deps = vec![
            Dependency::new("d1", "A", "B"),
            Dependency::new("d2", "B", "C"),
            Dependency::new("d3", "C", "A"),
            Dependency::new("d4", "C", "D"),
        ];
        match DependencyGraph::build(&tasks, &deps) {
            Err(ScheduleError::CycleDetected { task_ids }) => assert_eq!(task_ids, vec!["A", "B", "C"]),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let tasks = tasks(&["A", "B"]);
        let deps = vec![Dependency::new("d1", "A", "A")];
        match DependencyGraph::build(&tasks, &deps) {
            Err(ScheduleError::CycleDetected { task_ids }) => assert_eq!(task_ids, vec!["A"]),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let tasks = tasks(&["A", "A"]);
        assert_eq!(
            DependencyGraph::build(&tasks, &[]).unwrap_err(),
            ScheduleError::DuplicateTaskId("A".into())
        );
    }

    #[test]
    fn summary_links_expand_onto_their_leaves() {
        let tasks = vec![
            Task::new("X", Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(), 8.0),
            Task::new("Phase", Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(), 0.0).summary(),
            Task::new("W1", Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(), 8.0).with_outline_level(2),
            Task::new("W2", Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(), 8.0).with_outline_level(2),
            Task::new("Y", Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(), 8.0),
        ];
        let deps = vec![Dependency::new("d1", "X", "Phase"), Dependency::new("d2", "Phase", "Y")];
        let graph = DependencyGraph::build(&tasks, &deps).unwrap();

        let into = |i: usize| graph.incoming(i).iter().map(|e| graph.task_id(e.task)).collect::<Vec<_>>();
        assert_eq!(into(2), vec!["X"]);
        assert_eq!(into(3), vec!["X"]);
        assert_eq!(into(4), vec!["W1", "W2"]);
        assert!(graph.incoming(1).is_empty() && graph.outgoing(1).is_empty());

        // Declared view is untouched
        assert_eq!(graph.successors_of("Phase"), vec!["Y"]);
        assert_eq!(graph.topological_order(), vec!["X", "Phase", "W1", "W2", "Y"]);
        assert_eq!(graph.downstream_of(0), vec![2, 3, 4]);
    }

    #[test]
    fn cycle_through_a_summary_is_detected() {
        let tasks = vec![
            Task::new("A", Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(), 8.0),
            Task::new("Phase", Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(), 0.0).summary(),
            Task::new("W", Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(), 8.0).with_outline_level(2),
        ];
        let deps = vec![Dependency::new("d1", "A", "Phase"), Dependency::new("d2", "W", "A")];
        match DependencyGraph::build(&tasks, &deps) {
            Err(ScheduleError::CycleDetected { task_ids }) => assert_eq!(task_ids, vec!["A", "W"]),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn links_inside_a_summary_subtree_are_ignored() {
        let tasks = vec![
            Task::new("Phase", Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(), 0.0).summary(),
            Task::new("W", Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(), 8.0).with_outline_level(2),
        ];
        let deps = vec![Dependency::new("d1", "Phase", "W")];
        let graph = DependencyGraph::build(&tasks, &deps).unwrap();
        assert!(graph.incoming(1).is_empty());
        assert_eq!(graph.predecessors_of("W"), vec!["Phase"]);
    }

    #[test]
    fn downstream_follows_all_paths() {
        let tasks = tasks(&["A", "B", "C", "D"]);
        let deps = vec![
            Dependency::new("d1", "A", "B"),
            Dependency::new("d2", "A", "C"),
            Dependency::new("d3", "C", "D"),
        ];
        let graph = DependencyGraph::build(&tasks, &deps).unwrap();
        let c = graph.index_of("C").unwrap();
        assert_eq!(graph.downstream_of(0), vec![1, 2, 3]);
        assert_eq!(graph.downstream_of(c), vec![3]);
    }
}
