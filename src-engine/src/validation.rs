//! Data-validation boundary.
//!
//! Rejects records the engine cannot analyze before a graph is built:
//! - Duplicate task IDs
//! - Finish dates before start dates
//! - Out-of-range progress, outline levels and durations
//! - Non-finite or unbounded lags

use crate::error::{Result, ScheduleError};
use crate::types::{Dependency, Task, TimelineSnapshot};
use std::collections::HashSet;

/// Longest duration or lag accepted, about a century of calendar time
pub const MAX_SPAN_HOURS: f64 = 100.0 * 365.0 * 24.0;

pub fn validate_snapshot(snapshot: &TimelineSnapshot) -> Result<()> {
    validate_tasks(&snapshot.tasks)?;
    validate_dependencies(&snapshot.dependencies)
}

pub fn validate_tasks(tasks: &[Task]) -> Result<()> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen.insert(task.id.as_str()) {
            return Err(ScheduleError::DuplicateTaskId(task.id.clone()));
        }
        validate_task(task)?;
    }
    Ok(())
}

pub fn validate_task(task: &Task) -> Result<()> {
    if task.finish_date < task.start_date {
        return Err(ScheduleError::InvalidDateRange {
            task_id: task.id.clone(),
            start: task.start_date,
            finish: task.finish_date,
        });
    }

    let invalid = |field: &'static str, reason: String| ScheduleError::InvalidTaskField {
        task_id: task.id.clone(),
        field,
        reason,
    };

    validate_duration(task)?;
    if task.percent_complete > 100 {
        return Err(invalid(
            "percentComplete",
            format!("{} exceeds 100", task.percent_complete),
        ));
    }
    if task.outline_level == 0 {
        return Err(invalid("outlineLevel", "must be at least 1".to_string()));
    }
    Ok(())
}

/// Duration must be a finite, non-negative number of bounded size
pub fn validate_duration(task: &Task) -> Result<()> {
    let reason = if !task.duration_hours.is_finite() || task.duration_hours < 0.0 {
        format!("{} is not a non-negative number", task.duration_hours)
    } else if task.duration_hours > MAX_SPAN_HOURS {
        format!("{} exceeds {} hours", task.duration_hours, MAX_SPAN_HOURS)
    } else {
        return Ok(());
    };
    Err(ScheduleError::InvalidTaskField {
        task_id: task.id.clone(),
        field: "durationHours",
        reason,
    })
}

fn validate_dependencies(dependencies: &[Dependency]) -> Result<()> {
    for dep in dependencies {
        if !dep.lag_hours.is_finite() {
            return Err(ScheduleError::InvalidTaskField {
                task_id: dep.successor_id.clone(),
                field: "lagHours",
                reason: format!("dependency {} has a non-finite lag", dep.id),
            });
        }
        if dep.lag_hours.abs() > MAX_SPAN_HOURS {
            return Err(ScheduleError::InvalidTaskField {
                task_id: dep.successor_id.clone(),
                field: "lagHours",
                reason: format!("dependency {} lag {} exceeds {} hours", dep.id, dep.lag_hours, MAX_SPAN_HOURS),
            });
        }
    }
    Ok(())
}
