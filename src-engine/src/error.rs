//! Error taxonomy for the timeline engine.
//!
//! Every variant is fatal to the computation that raised it: the dataset is
//! not analyzable and the UI should show a whole-timeline error state.
//! Infeasible schedules are reported as warnings inside `ScheduleResult`.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("dependency {dependency_id} references missing task {task_id}")]
    DanglingReference { dependency_id: String, task_id: String },

    #[error("dependency cycle detected: {}", .task_ids.join(" -> "))]
    CycleDetected { task_ids: Vec<String> },

    #[error("task {task_id} finishes ({finish}) before it starts ({start})")]
    InvalidDateRange {
        task_id: String,
        start: DateTime<Utc>,
        finish: DateTime<Utc>,
    },

    #[error("duplicate task id: {0}")]
    DuplicateTaskId(String),

    #[error("task {task_id}: invalid {field}: {reason}")]
    InvalidTaskField {
        task_id: String,
        field: &'static str,
        reason: String,
    },

    #[error("invalid calendar: {0}")]
    InvalidCalendar(String),

    #[error("task {0} not found")]
    UnknownTask(String),

    #[error("no baseline has been saved")]
    NoBaseline,
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
