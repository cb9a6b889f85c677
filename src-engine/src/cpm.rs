//! CPM (Critical Path Method) calculation engine
//!
//! Implements forward pass, backward pass, slack calculation, summary
//! roll-up and critical path extraction over a validated dependency graph.
//!
//! All arithmetic happens in business hours measured from the project
//! origin (start of the working day holding the earliest task start);
//! instants are derived from the offsets at the end.

use crate::calendar::{Boundary, WorkCalendar};
use crate::config::ScheduleConfig;
use crate::graph::DependencyGraph;
use crate::outline::{has_children, outline_parents};
use crate::types::{
    Calendar, ConstraintKind, InfeasibleScheduleWarning, LinkType, ScheduleResult, ScheduleStats,
    SchedulingMode, Task, TaskSchedule,
};
use chrono::{DateTime, NaiveDate, Utc};

/// Offsets closer than this are the same instant
const ROUNDING_HOURS: f64 = 1e-9;

/// Working arrays for one calculation, indexed like the task slice
struct Passes {
    duration: Vec<f64>,
    planned_start: Vec<f64>,
    summary: Vec<bool>,
    es: Vec<f64>,
    ef: Vec<f64>,
    ls: Vec<f64>,
    lf: Vec<f64>,
    raw_slack: Vec<f64>,
    free_slack: Vec<f64>,
    critical: Vec<bool>,
}

impl Passes {
    fn new(tasks: &[Task], calendar: &WorkCalendar, origin: NaiveDate) -> Self {
        let n = tasks.len();
        let parents = outline_parents(tasks);
        Self {
            duration: tasks.iter().map(Task::effective_duration).collect(),
            planned_start: tasks
                .iter()
                .map(|t| calendar.to_offset(origin, t.start_date))
                .collect(),
            summary: has_children(&parents),
            es: vec![0.0; n],
            ef: vec![0.0; n],
            ls: vec![0.0; n],
            lf: vec![0.0; n],
            raw_slack: vec![0.0; n],
            free_slack: vec![0.0; n],
            critical: vec![false; n],
        }
    }
}

/// Offset of a constraint date
fn constraint_offset(task: &Task, calendar: &WorkCalendar, origin: NaiveDate) -> Option<(ConstraintKind, f64)> {
    task.constraint
        .as_ref()
        .map(|c| (c.kind, calendar.to_offset(origin, c.date)))
}

/// Earliest start of `succ_duration`-long successor implied by one link
fn forward_constraint(link: LinkType, pred_es: f64, pred_ef: f64, lag: f64, succ_duration: f64) -> f64 {
    match link {
        LinkType::FinishToStart => pred_ef + lag,
        LinkType::StartToStart => pred_es + lag,
        LinkType::FinishToFinish => pred_ef + lag - succ_duration,
        LinkType::StartToFinish => pred_es + lag - succ_duration,
    }
}

/// Latest finish of a `pred_duration`-long predecessor implied by one link
fn backward_constraint(link: LinkType, succ_ls: f64, succ_lf: f64, lag: f64, pred_duration: f64) -> f64 {
    match link {
        LinkType::FinishToStart => succ_ls - lag,
        LinkType::StartToStart => succ_ls - lag + pred_duration,
        LinkType::FinishToFinish => succ_lf - lag,
        LinkType::StartToFinish => succ_lf - lag + pred_duration,
    }
}

/// Forward pass - calculate Early Start (ES) and Early Finish (EF).
/// Returns the dependency-driven start of every task with predecessors.
fn forward_pass(
    graph: &DependencyGraph,
    tasks: &[Task],
    calendar: &WorkCalendar,
    origin: NaiveDate,
    p: &mut Passes,
) -> Vec<(usize, f64)> {
    let mut driven_starts = Vec::new();

    for &i in graph.order() {
        if p.summary[i] {
            continue;
        }
        let task = &tasks[i];
        let duration = p.duration[i];

        // Take the maximum (latest) start from all predecessors
        let driven = graph
            .incoming(i)
            .iter()
            .map(|e| forward_constraint(e.link_type, p.es[e.task], p.ef[e.task], e.lag_hours, duration))
            .fold(None, |acc: Option<f64>, c| Some(acc.map_or(c, |a| a.max(c))));

        if let Some(required) = driven {
            driven_starts.push((i, required));
        }
        let mut es = match (task.scheduling_mode, driven) {
            (SchedulingMode::Auto, Some(required)) => required,
            (SchedulingMode::Manual, _) | (SchedulingMode::Auto, None) => p.planned_start[i],
        };

        if task.scheduling_mode == SchedulingMode::Auto {
            match constraint_offset(task, calendar, origin) {
                Some((ConstraintKind::StartNoEarlierThan, at)) => es = es.max(at),
                Some((ConstraintKind::FinishNoEarlierThan, at)) => es = es.max(at - duration),
                Some((ConstraintKind::MustFinishOn, at)) => es = at - duration,
                // Late constraints are applied in the backward pass
                Some((ConstraintKind::StartNoLaterThan, _))
                | Some((ConstraintKind::FinishNoLaterThan, _))
                | None => {}
            }
        }

        p.es[i] = es;
        p.ef[i] = es + duration;
    }

    driven_starts
}

/// Backward pass - calculate Late Start (LS) and Late Finish (LF)
fn backward_pass(
    graph: &DependencyGraph,
    tasks: &[Task],
    calendar: &WorkCalendar,
    origin: NaiveDate,
    project_finish: f64,
    p: &mut Passes,
) {
    for &i in graph.order().iter().rev() {
        if p.summary[i] {
            continue;
        }
        let task = &tasks[i];
        let duration = p.duration[i];

        // Take the minimum (earliest) late finish from all successors
        let mut lf = graph
            .outgoing(i)
            .iter()
            .map(|e| backward_constraint(e.link_type, p.ls[e.task], p.lf[e.task], e.lag_hours, duration))
            .fold(project_finish, f64::min);

        if task.scheduling_mode == SchedulingMode::Manual {
            lf = lf.min(p.planned_start[i] + duration);
        } else {
            match constraint_offset(task, calendar, origin) {
                Some((ConstraintKind::StartNoLaterThan, at)) => lf = lf.min(at + duration),
                Some((ConstraintKind::FinishNoLaterThan, at)) | Some((ConstraintKind::MustFinishOn, at)) => {
                    lf = lf.min(at)
                }
                Some((ConstraintKind::StartNoEarlierThan, _))
                | Some((ConstraintKind::FinishNoEarlierThan, _))
                | None => {}
            }
        }

        p.lf[i] = lf;
        p.ls[i] = lf - duration;
    }
}

/// Calculate total and free slack, then mark criticality for leaf tasks
fn calculate_slack(graph: &DependencyGraph, config: &ScheduleConfig, p: &mut Passes) {
    for i in 0..p.es.len() {
        if p.summary[i] {
            continue;
        }
        let mut raw = p.ls[i] - p.es[i];
        if raw.abs() < ROUNDING_HOURS {
            raw = 0.0;
        }
        p.raw_slack[i] = raw;
        p.critical[i] = raw < config.critical_tolerance_hours;

        let total = raw.max(0.0);
        let free = graph
            .outgoing(i)
            .iter()
            .map(|e| {
                let s = e.task;
                match e.link_type {
                    LinkType::FinishToStart => p.es[s] - p.ef[i] - e.lag_hours,
                    LinkType::StartToStart => p.es[s] - p.es[i] - e.lag_hours,
                    LinkType::FinishToFinish => p.ef[s] - p.ef[i] - e.lag_hours,
                    LinkType::StartToFinish => p.ef[s] - p.es[i] - e.lag_hours,
                }
            })
            .fold(None, |acc: Option<f64>, gap| Some(acc.map_or(gap, |a| a.min(gap))));

        // Free slack cannot exceed total slack
        p.free_slack[i] = free.map_or(total, |f| f.clamp(0.0, total));
    }
}

/// Roll summary dates and criticality up from their descendants.
/// Children always follow their parent in input order, so walking the
/// input backwards finishes every child before its parent.
fn roll_up_summaries(tasks: &[Task], p: &mut Passes) {
    let parents = outline_parents(tasks);
    let n = tasks.len();
    let mut seen = vec![false; n];

    for i in (0..n).rev() {
        if let Some(parent) = parents[i] {
            if seen[parent] {
                p.es[parent] = p.es[parent].min(p.es[i]);
                p.ef[parent] = p.ef[parent].max(p.ef[i]);
                p.ls[parent] = p.ls[parent].min(p.ls[i]);
                p.lf[parent] = p.lf[parent].max(p.lf[i]);
                p.raw_slack[parent] = p.raw_slack[parent].min(p.raw_slack[i]);
                p.critical[parent] |= p.critical[i];
            } else {
                seen[parent] = true;
                p.es[parent] = p.es[i];
                p.ef[parent] = p.ef[i];
                p.ls[parent] = p.ls[i];
                p.lf[parent] = p.lf[i];
                p.raw_slack[parent] = p.raw_slack[i];
                p.critical[parent] = p.critical[i];
            }
            p.free_slack[parent] = 0.0;
        }
    }
}

/// Critical leaf tasks in topological order. Without any links between
/// leaf tasks the longest task stands in, so the path is never empty.
fn extract_critical_path(graph: &DependencyGraph, tasks: &[Task], p: &Passes) -> Vec<String> {
    let linked = (0..tasks.len())
        .filter(|&i| !p.summary[i])
        .any(|i| !graph.outgoing(i).is_empty());

    if !linked {
        let mut longest: Option<usize> = None;
        for i in (0..tasks.len()).filter(|&i| !p.summary[i]) {
            if longest.map_or(true, |l| p.duration[i] > p.duration[l]) {
                longest = Some(i);
            }
        }
        return longest.map(|i| vec![tasks[i].id.clone()]).unwrap_or_default();
    }

    graph
        .order()
        .iter()
        .filter(|&&i| !p.summary[i] && p.critical[i])
        .map(|&i| tasks[i].id.clone())
        .collect()
}

fn empty_result() -> ScheduleResult {
    ScheduleResult {
        tasks: Vec::new(),
        critical_path: Vec::new(),
        project_duration_hours: 0.0,
        project_start: DateTime::<Utc>::default(),
        project_finish: DateTime::<Utc>::default(),
        warnings: Vec::new(),
        stats: ScheduleStats::default(),
    }
}

/// Main CPM calculation function.
///
/// `graph` must have been built from `tasks`. Never fails for a valid
/// graph; infeasible constraint sets come back as warnings with display
/// slack clamped to zero.
pub fn compute(
    graph: &DependencyGraph,
    tasks: &[Task],
    calendar: &Calendar,
    config: &ScheduleConfig,
) -> ScheduleResult {
    let Some(first_start) = tasks.iter().map(|t| t.start_date).min() else {
        return empty_result();
    };
    debug_assert_eq!(graph.len(), tasks.len());

    let work = WorkCalendar::new(calendar, config);
    let origin = first_start.date_naive();

    let mut p = Passes::new(tasks, &work, origin);

    // Step 1: Forward pass
    let driven_starts = forward_pass(graph, tasks, &work, origin, &mut p);

    // Step 2: Project finish = latest early finish of any sink
    let project_finish = (0..tasks.len())
        .filter(|&i| !p.summary[i] && graph.outgoing(i).is_empty())
        .map(|i| p.ef[i])
        .fold(f64::NEG_INFINITY, f64::max);
    let project_finish = if project_finish.is_finite() { project_finish } else { 0.0 };

    let project_start = (0..tasks.len())
        .filter(|&i| !p.summary[i])
        .map(|i| p.es[i])
        .fold(f64::INFINITY, f64::min);
    let project_start = if project_start.is_finite() { project_start } else { 0.0 };
    let project_duration = project_finish - project_start;

    // Step 3: Backward pass
    backward_pass(graph, tasks, &work, origin, project_finish, &mut p);

    // Step 4: Slack and criticality
    calculate_slack(graph, config, &mut p);

    // Step 5: Summary roll-up
    roll_up_summaries(tasks, &mut p);

    let critical_path = extract_critical_path(graph, tasks, &p);

    // Stored starts that contradict the links into the task
    let mut warnings = Vec::new();
    for (i, required) in driven_starts {
        let early_by = required - p.planned_start[i];
        if early_by > config.critical_tolerance_hours {
            let message = match tasks[i].scheduling_mode {
                SchedulingMode::Manual => format!(
                    "manually scheduled task {} starts {:.2}h before its predecessors allow",
                    tasks[i].id, early_by
                ),
                SchedulingMode::Auto => format!(
                    "task {} is dated {:.2}h before its predecessors allow; rescheduled to its early start",
                    tasks[i].id, early_by
                ),
            };
            warnings.push(InfeasibleScheduleWarning {
                task_id: tasks[i].id.clone(),
                slack_hours: -early_by,
                message,
            });
        }
    }
    for (i, task) in tasks.iter().enumerate() {
        if !p.summary[i] && p.raw_slack[i] < -config.critical_tolerance_hours {
            warnings.push(InfeasibleScheduleWarning {
                task_id: task.id.clone(),
                slack_hours: p.raw_slack[i],
                message: format!(
                    "task {} has {:.2}h of negative slack; its constraints cannot all be met",
                    task.id, p.raw_slack[i]
                ),
            });
        }
    }
    if !warnings.is_empty() {
        tracing::warn!(count = warnings.len(), "schedule is infeasible");
    }

    let finish_boundary = |duration: f64| {
        if duration > ROUNDING_HOURS {
            Boundary::Finish
        } else {
            Boundary::Start
        }
    };

    let schedules: Vec<TaskSchedule> = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let span = p.ef[i] - p.es[i];
            let slack = p.raw_slack[i].max(0.0);
            let critical = p.critical[i];
            TaskSchedule {
                task_id: task.id.clone(),
                earliest_start: work.from_offset(origin, p.es[i], Boundary::Start),
                earliest_finish: work.from_offset(origin, p.ef[i], finish_boundary(span)),
                latest_start: work.from_offset(origin, p.ls[i], Boundary::Start),
                latest_finish: work.from_offset(origin, p.lf[i], finish_boundary(p.lf[i] - p.ls[i])),
                earliest_start_hours: p.es[i],
                earliest_finish_hours: p.ef[i],
                latest_start_hours: p.ls[i],
                latest_finish_hours: p.lf[i],
                slack_hours: slack,
                raw_slack_hours: p.raw_slack[i],
                free_slack_hours: p.free_slack[i],
                is_critical: critical,
                is_near_critical: !critical && slack <= config.near_critical_threshold_hours,
                is_summary: p.summary[i],
            }
        })
        .collect();

    let stats = ScheduleStats {
        task_count: tasks.len(),
        critical_count: schedules.iter().filter(|s| s.is_critical && !s.is_summary).count(),
        near_critical_count: schedules.iter().filter(|s| s.is_near_critical && !s.is_summary).count(),
        dependency_count: graph.edge_count(),
    };

    tracing::debug!(
        tasks = stats.task_count,
        critical = stats.critical_count,
        duration_hours = project_duration,
        "CPM complete"
    );

    ScheduleResult {
        tasks: schedules,
        critical_path,
        project_duration_hours: project_duration,
        project_start: work.from_offset(origin, project_start, Boundary::Start),
        project_finish: work.from_offset(origin, project_finish, Boundary::Finish),
        warnings,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dependency;
    use chrono::{Duration, TimeZone};

    fn monday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
    }

    fn task(id: &str, hours: f64) -> Task {
        Task::new(id, monday(), hours).with_finish(monday() + Duration::hours(hours as i64))
    }

    /// Task starting at 09:00 on the given day of March 2024
    fn task_on(id: &str, day: u32, hours: f64) -> Task {
        let start = Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap();
        Task::new(id, start, hours).with_finish(start + Duration::hours(hours as i64))
    }

    fn run(tasks: &[Task], deps: &[Dependency]) -> ScheduleResult {
        let graph = DependencyGraph::build(tasks, deps).unwrap();
        compute(&graph, tasks, &Calendar::default(), &ScheduleConfig::default())
    }

    #[test]
    fn chain_is_fully_critical() {
        let tasks = vec![task_on("A", 4, 8.0), task_on("B", 5, 8.0), task_on("C", 6, 8.0)];
        let deps = vec![Dependency::new("d1", "A", "B"), Dependency::new("d2", "B", "C")];
        let result = run(&tasks, &deps);

        assert_eq!(result.project_duration_hours, 24.0);
        assert_eq!(result.critical_path, vec!["A", "B", "C"]);
        for s in &result.tasks {
            assert_eq!(s.slack_hours, 0.0, "{}", s.task_id);
            assert!(s.is_critical);
        }
        let c = result.task("C").unwrap();
        assert_eq!(c.earliest_start, Utc.with_ymd_and_hms(2024, 3, 6, 9, 0, 0).unwrap());
        assert_eq!(c.earliest_finish, Utc.with_ymd_and_hms(2024, 3, 6, 17, 0, 0).unwrap());
        assert_eq!(result.project_finish, c.earliest_finish);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn parallel_branch_has_slack() {
        let tasks = vec![task("A", 0.0).milestone(), task("B", 16.0), task("D", 4.0)];
        let deps = vec![Dependency::new("d1", "A", "B"), Dependency::new("d2", "A", "D")];
        let result = run(&tasks, &deps);

        assert_eq!(result.project_duration_hours, 16.0);
        let d = result.task("D").unwrap();
        assert_eq!(d.slack_hours, 12.0);
        assert_eq!(d.free_slack_hours, 12.0);
        assert!(!d.is_critical);
        assert!(d.is_near_critical);
        assert_eq!(result.critical_path, vec!["A", "B"]);
    }

    #[test]
    fn link_types_resolve_their_own_constraints() {
        let tasks = vec![task("P", 8.0), task("SS", 4.0), task("FF", 4.0), task("SF", 4.0)];
        let deps = vec![
            Dependency::new("d1", "P", "SS").with_type(LinkType::StartToStart).with_lag(2.0),
            Dependency::new("d2", "P", "FF").with_type(LinkType::FinishToFinish),
            Dependency::new("d3", "P", "SF").with_type(LinkType::StartToFinish).with_lag(6.0),
        ];
        let result = run(&tasks, &deps);

        assert_eq!(result.task("SS").unwrap().earliest_start_hours, 2.0);
        assert_eq!(result.task("FF").unwrap().earliest_start_hours, 4.0);
        assert_eq!(result.task("FF").unwrap().earliest_finish_hours, 8.0);
        assert_eq!(result.task("SF").unwrap().earliest_start_hours, 2.0);
        assert_eq!(result.task("SF").unwrap().earliest_finish_hours, 6.0);
    }

    #[test]
    fn lag_and_lead_shift_successors() {
        let tasks = vec![task("A", 8.0), task("B", 8.0), task("C", 8.0)];
        let deps = vec![
            Dependency::new("d1", "A", "B").with_lag(4.0),
            Dependency::new("d2", "B", "C").with_lag(-2.0),
        ];
        let result = run(&tasks, &deps);
        assert_eq!(result.task("B").unwrap().earliest_start_hours, 12.0);
        assert_eq!(result.task("C").unwrap().earliest_start_hours, 18.0);
        assert_eq!(result.project_duration_hours, 26.0);
    }

    #[test]
    fn milestone_ignores_supplied_duration() {
        let tasks = vec![task("A", 8.0), task("M", 40.0).milestone()];
        let deps = vec![Dependency::new("d1", "A", "M")];
        let result = run(&tasks, &deps);

        let m = result.task("M").unwrap();
        assert_eq!(m.earliest_finish, m.earliest_start);
        assert_eq!(m.earliest_finish_hours, m.earliest_start_hours);
        assert_eq!(result.project_duration_hours, 8.0);
    }

    #[test]
    fn manual_successor_before_predecessor_is_infeasible() {
        let pinned_start = Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap();
        let mut b = Task::new("B", pinned_start, 8.0).manual();
        b.finish_date = pinned_start + Duration::hours(8);
        let tasks = vec![task("A", 16.0), b];
        let deps = vec![Dependency::new("d1", "A", "B")];
        let result = run(&tasks, &deps);

        assert!(result.is_infeasible());
        let a = result.task("A").unwrap();
        assert_eq!(a.raw_slack_hours, -8.0);
        assert_eq!(a.slack_hours, 0.0);
        assert!(a.is_critical);
        assert!(result.warnings.iter().any(|w| w.task_id == "A"));
        assert!(result.warnings.iter().any(|w| w.task_id == "B" && w.slack_hours == -8.0));
    }

    #[test]
    fn finish_no_later_than_produces_negative_slack() {
        let deadline = Utc.with_ymd_and_hms(2024, 3, 4, 17, 0, 0).unwrap();
        let tasks = vec![
            task_on("A", 4, 8.0),
            task_on("B", 5, 8.0).with_constraint(ConstraintKind::FinishNoLaterThan, deadline),
        ];
        let deps = vec![Dependency::new("d1", "A", "B")];
        let result = run(&tasks, &deps);

        assert_eq!(result.task("B").unwrap().raw_slack_hours, -8.0);
        assert_eq!(result.task("A").unwrap().raw_slack_hours, -8.0);
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn start_no_earlier_than_delays_the_task() {
        let not_before = Utc.with_ymd_and_hms(2024, 3, 6, 9, 0, 0).unwrap();
        let tasks = vec![task("A", 8.0).with_constraint(ConstraintKind::StartNoEarlierThan, not_before)];
        let result = run(&tasks, &[]);
        assert_eq!(result.task("A").unwrap().earliest_start, not_before);
    }

    #[test]
    fn start_no_later_than_caps_the_late_dates() {
        let cutoff = Utc.with_ymd_and_hms(2024, 3, 4, 11, 0, 0).unwrap();
        let tasks = vec![
            task("A", 16.0),
            task("B", 4.0).with_constraint(ConstraintKind::StartNoLaterThan, cutoff),
        ];
        let result = run(&tasks, &[]);

        let b = result.task("B").unwrap();
        assert_eq!(b.earliest_start_hours, 0.0);
        assert_eq!(b.latest_start_hours, 2.0);
        assert_eq!(b.latest_finish_hours, 6.0);
        assert_eq!(b.latest_start, cutoff);
        assert_eq!(b.slack_hours, 2.0);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn finish_no_earlier_than_pushes_the_start() {
        let not_before = Utc.with_ymd_and_hms(2024, 3, 4, 17, 0, 0).unwrap();
        let tasks = vec![task("A", 4.0).with_constraint(ConstraintKind::FinishNoEarlierThan, not_before)];
        let result = run(&tasks, &[]);

        let a = result.task("A").unwrap();
        assert_eq!(a.earliest_start_hours, 4.0);
        assert_eq!(a.earliest_finish_hours, 8.0);
        assert_eq!(a.earliest_start, Utc.with_ymd_and_hms(2024, 3, 4, 13, 0, 0).unwrap());
        assert_eq!(a.earliest_finish, not_before);
    }

    #[test]
    fn must_finish_on_pins_the_task_and_squeezes_predecessors() {
        let due = Utc.with_ymd_and_hms(2024, 3, 4, 17, 0, 0).unwrap();
        let tasks = vec![
            task_on("A", 4, 8.0),
            task_on("B", 5, 8.0).with_constraint(ConstraintKind::MustFinishOn, due),
        ];
        let deps = vec![Dependency::new("d1", "A", "B")];
        let result = run(&tasks, &deps);

        let b = result.task("B").unwrap();
        assert_eq!(b.earliest_start_hours, 0.0);
        assert_eq!(b.earliest_finish, due);
        assert_eq!(b.latest_finish_hours, 8.0);
        assert_eq!(b.raw_slack_hours, 0.0);

        let a = result.task("A").unwrap();
        assert_eq!(a.latest_finish_hours, 0.0);
        assert_eq!(a.raw_slack_hours, -8.0);
        assert_eq!(a.slack_hours, 0.0);
        assert!(a.is_critical);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].task_id, "A");
    }

    #[test]
    fn successor_dated_before_its_predecessor_finishes_warns() {
        let tasks = vec![task("A", 16.0), task("B", 8.0)];
        let deps = vec![Dependency::new("d1", "A", "B")];
        let result = run(&tasks, &deps);

        assert!(result.is_infeasible());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].task_id, "B");
        assert_eq!(result.warnings[0].slack_hours, -16.0);
        // Auto tasks are still scheduled at their early start
        assert_eq!(result.task("B").unwrap().earliest_start_hours, 16.0);
        assert!(result.tasks.iter().all(|t| t.raw_slack_hours >= 0.0));
    }

    #[test]
    fn duration_is_measured_from_the_first_start() {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 13, 0, 0).unwrap();
        let tasks = vec![Task::new("A", start, 8.0).with_finish(Utc.with_ymd_and_hms(2024, 3, 5, 13, 0, 0).unwrap())];
        let result = run(&tasks, &[]);

        assert_eq!(result.project_duration_hours, 8.0);
        assert_eq!(result.project_start, start);
        assert_eq!(result.project_finish, Utc.with_ymd_and_hms(2024, 3, 5, 13, 0, 0).unwrap());
    }

    #[test]
    fn successor_of_a_summary_waits_for_the_whole_phase() {
        let tasks = vec![
            task("Phase", 0.0).summary(),
            task("W", 16.0).with_outline_level(2),
            task("X", 8.0),
        ];
        let deps = vec![Dependency::new("d1", "Phase", "X")];
        let result = run(&tasks, &deps);

        let x = result.task("X").unwrap();
        assert_eq!(x.earliest_start_hours, 16.0);
        assert_eq!(x.earliest_finish_hours, 24.0);
        assert_eq!(result.project_duration_hours, 24.0);
        assert_eq!(result.critical_path, vec!["W", "X"]);
        assert_eq!(result.task("Phase").unwrap().earliest_finish_hours, 16.0);
    }

    #[test]
    fn link_into_a_summary_holds_back_every_child() {
        let tasks = vec![
            task("A", 8.0),
            task("Phase", 0.0).summary(),
            task("W1", 8.0).with_outline_level(2),
            task("W2", 4.0).with_outline_level(2),
        ];
        let deps = vec![Dependency::new("d1", "A", "Phase")];
        let result = run(&tasks, &deps);

        assert_eq!(result.task("W1").unwrap().earliest_start_hours, 8.0);
        assert_eq!(result.task("W2").unwrap().earliest_start_hours, 8.0);
        assert_eq!(result.task("W2").unwrap().slack_hours, 4.0);
        assert_eq!(result.task("A").unwrap().free_slack_hours, 0.0);
        let phase = result.task("Phase").unwrap();
        assert_eq!(phase.earliest_start_hours, 8.0);
        assert_eq!(phase.earliest_finish_hours, 16.0);
        assert_eq!(result.critical_path, vec!["A", "W1"]);
    }

    #[test]
    fn isolated_tasks_fall_back_to_longest() {
        let tasks = vec![task("A", 4.0), task("B", 12.0), task("C", 12.0)];
        let result = run(&tasks, &[]);
        assert_eq!(result.critical_path, vec!["B"]);
        assert_eq!(result.project_duration_hours, 12.0);
    }

    #[test]
    fn summaries_roll_up_from_children() {
        let tasks = vec![
            task("S", 0.0).summary(),
            task("A", 8.0).with_outline_level(2),
            task("B", 8.0).with_outline_level(2),
            task("C", 4.0),
        ];
        let deps = vec![Dependency::new("d1", "A", "B")];
        let result = run(&tasks, &deps);

        let s = result.task("S").unwrap();
        assert!(s.is_summary);
        assert_eq!(s.earliest_start_hours, 0.0);
        assert_eq!(s.earliest_finish_hours, 16.0);
        assert!(s.is_critical);
        assert_eq!(result.critical_path, vec!["A", "B"]);
        assert_eq!(result.stats.critical_count, 2);
        assert_eq!(result.task("C").unwrap().slack_hours, 12.0);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let tasks = vec![task("A", 8.0), task("B", 6.0), task("C", 3.0)];
        let deps = vec![Dependency::new("d1", "A", "B"), Dependency::new("d2", "A", "C")];
        assert_eq!(run(&tasks, &deps), run(&tasks, &deps));
    }

    #[test]
    fn empty_project_is_empty() {
        let result = run(&[], &[]);
        assert!(result.tasks.is_empty());
        assert!(result.critical_path.is_empty());
    }
}
