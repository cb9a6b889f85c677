//! Type definitions for the timeline engine
//!
//! These types mirror the JSON records exchanged with the task store and the
//! rendering layer.
//! IMPORTANT: Field names use camelCase via serde rename to match JS

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Precedence link type between a predecessor and a successor
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LinkType {
    /// Successor cannot start before the predecessor finishes
    #[default]
    #[serde(alias = "FS")]
    FinishToStart,
    #[serde(alias = "SS")]
    StartToStart,
    #[serde(alias = "FF")]
    FinishToFinish,
    #[serde(alias = "SF")]
    StartToFinish,
}

impl LinkType {
    /// Short code used in labels ("FS", "SS", "FF", "SF")
    pub fn code(self) -> &'static str {
        match self {
            LinkType::FinishToStart => "FS",
            LinkType::StartToStart => "SS",
            LinkType::FinishToFinish => "FF",
            LinkType::StartToFinish => "SF",
        }
    }
}

/// Dependency link between tasks
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub id: String,
    pub predecessor_id: String,
    pub successor_id: String,

    #[serde(rename = "type", default)]
    pub link_type: LinkType,

    /// Lag in business hours (negative = lead time)
    #[serde(default)]
    pub lag_hours: f64,
}

impl Dependency {
    pub fn new(id: impl Into<String>, predecessor_id: impl Into<String>, successor_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            predecessor_id: predecessor_id.into(),
            successor_id: successor_id.into(),
            link_type: LinkType::FinishToStart,
            lag_hours: 0.0,
        }
    }

    pub fn with_type(mut self, link_type: LinkType) -> Self {
        self.link_type = link_type;
        self
    }

    pub fn with_lag(mut self, lag_hours: f64) -> Self {
        self.lag_hours = lag_hours;
        self
    }
}

/// Scheduling mode
/// Auto: CPM calculates dates from dependencies
/// Manual: User-fixed dates, the task is pinned where it was placed
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SchedulingMode {
    #[default]
    #[serde(alias = "Auto")]
    Auto,
    #[serde(alias = "Manual")]
    Manual,
}

/// Date constraint kinds. Absence of a constraint means "as soon as possible".
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ConstraintKind {
    #[serde(alias = "snet")]
    StartNoEarlierThan,
    #[serde(alias = "snlt")]
    StartNoLaterThan,
    #[serde(alias = "fnet")]
    FinishNoEarlierThan,
    #[serde(alias = "fnlt")]
    FinishNoLaterThan,
    #[serde(alias = "mfo")]
    MustFinishOn,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DateConstraint {
    #[serde(rename = "type")]
    pub kind: ConstraintKind,
    pub date: DateTime<Utc>,
}

/// Task entity - the atomic unit of scheduling
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    // === Identity & Hierarchy ===
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,

    /// Hierarchy depth (1 = root). The parent is the nearest preceding task
    /// with a smaller level.
    #[serde(default = "default_outline_level")]
    pub outline_level: u32,

    #[serde(default)]
    pub is_summary_task: bool,

    #[serde(default)]
    pub is_milestone: bool,

    // === Scheduling (Input) ===
    pub start_date: DateTime<Utc>,
    pub finish_date: DateTime<Utc>,

    /// Authoritative for bar length and CPM arithmetic. May drift from the
    /// business-time span between the dates.
    pub duration_hours: f64,

    #[serde(default)]
    pub scheduling_mode: SchedulingMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<DateConstraint>,

    // === Status ===
    #[serde(default)]
    pub percent_complete: u8,

    // === Assignment & Display ===
    /// Weak references into the external user directory
    #[serde(default)]
    pub assignee_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

fn default_outline_level() -> u32 {
    1
}

impl Task {
    pub fn new(id: impl Into<String>, start_date: DateTime<Utc>, duration_hours: f64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            outline_level: 1,
            is_summary_task: false,
            is_milestone: false,
            start_date,
            finish_date: start_date,
            duration_hours,
            scheduling_mode: SchedulingMode::Auto,
            constraint: None,
            percent_complete: 0,
            assignee_ids: Vec::new(),
            color: None,
        }
    }

    pub fn with_finish(mut self, finish_date: DateTime<Utc>) -> Self {
        self.finish_date = finish_date;
        self
    }

    pub fn with_outline_level(mut self, level: u32) -> Self {
        self.outline_level = level;
        self
    }

    pub fn summary(mut self) -> Self {
        self.is_summary_task = true;
        self
    }

    pub fn milestone(mut self) -> Self {
        self.is_milestone = true;
        self
    }

    pub fn manual(mut self) -> Self {
        self.scheduling_mode = SchedulingMode::Manual;
        self
    }

    pub fn with_constraint(mut self, kind: ConstraintKind, date: DateTime<Utc>) -> Self {
        self.constraint = Some(DateConstraint { kind, date });
        self
    }

    pub fn with_progress(mut self, percent_complete: u8) -> Self {
        self.percent_complete = percent_complete;
        self
    }

    /// Duration used by CPM. Milestones always take zero time.
    pub fn effective_duration(&self) -> f64 {
        if self.is_milestone {
            0.0
        } else {
            self.duration_hours
        }
    }
}

/// Timeline payload as returned by the task store
/// (`GET /projects/{id}/timeline`)
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSnapshot {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl TimelineSnapshot {
    pub fn new(tasks: Vec<Task>, dependencies: Vec<Dependency>) -> Self {
        Self { tasks, dependencies }
    }
}

/// Task mutation accepted by the task store (`PUT /tasks/{id}`)
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_complete: Option<u8>,
}

/// A concrete update the caller should send to the task store
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdatePayload {
    pub task_id: String,
    pub start_date: DateTime<Utc>,
    pub duration_hours: f64,
    pub percent_complete: u8,
}

/// Date-specific calendar exception. A bare string (holiday name) marks the
/// day as non-working; the object form can also turn a weekend into a
/// working day.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum CalendarException {
    Holiday(String),
    Override {
        working: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl CalendarException {
    pub fn is_working(&self) -> bool {
        match self {
            CalendarException::Holiday(_) => false,
            CalendarException::Override { working, .. } => *working,
        }
    }
}

/// Calendar configuration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Calendar {
    /// Working days (0=Sun, 1=Mon, ..., 6=Sat)
    #[serde(default = "default_working_days")]
    pub working_days: Vec<u32>,

    /// Date-specific exceptions keyed by "YYYY-MM-DD"
    #[serde(default)]
    pub exceptions: BTreeMap<NaiveDate, CalendarException>,
}

fn default_working_days() -> Vec<u32> {
    vec![1, 2, 3, 4, 5]
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            working_days: default_working_days(),
            exceptions: BTreeMap::new(),
        }
    }
}

/// Per-task CPM output
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskSchedule {
    pub task_id: String,

    pub earliest_start: DateTime<Utc>,
    pub earliest_finish: DateTime<Utc>,
    pub latest_start: DateTime<Utc>,
    pub latest_finish: DateTime<Utc>,

    /// Business-hour offsets from the project origin
    pub earliest_start_hours: f64,
    pub earliest_finish_hours: f64,
    pub latest_start_hours: f64,
    pub latest_finish_hours: f64,

    /// Total slack clamped to >= 0 for display
    pub slack_hours: f64,
    /// Total slack as computed; negative means infeasible
    pub raw_slack_hours: f64,
    pub free_slack_hours: f64,

    pub is_critical: bool,
    pub is_near_critical: bool,
    pub is_summary: bool,
}

/// Non-fatal diagnostic: the constraints cannot all be met
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InfeasibleScheduleWarning {
    pub task_id: String,
    pub slack_hours: f64,
    pub message: String,
}

/// CPM calculation statistics
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStats {
    pub task_count: usize,
    pub critical_count: usize,
    pub near_critical_count: usize,
    pub dependency_count: usize,
}

/// CPM calculation result
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResult {
    /// One entry per input task, in input order
    pub tasks: Vec<TaskSchedule>,
    pub critical_path: Vec<String>,
    pub project_duration_hours: f64,
    pub project_start: DateTime<Utc>,
    pub project_finish: DateTime<Utc>,
    #[serde(default)]
    pub warnings: Vec<InfeasibleScheduleWarning>,
    pub stats: ScheduleStats,
}

impl ScheduleResult {
    pub fn task(&self, task_id: &str) -> Option<&TaskSchedule> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    pub fn is_infeasible(&self) -> bool {
        !self.warnings.is_empty()
    }
}
