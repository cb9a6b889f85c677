//! Baseline snapshots and variance against the current schedule

use crate::calendar::calendar_days_between;
use crate::types::Task;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BaselineEntry {
    pub task_id: String,
    pub planned_start: DateTime<Utc>,
    pub planned_finish: DateTime<Utc>,
    pub planned_duration_hours: f64,
}

/// Frozen copy of the planned dates, handed to and from external storage
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    pub project_id: String,
    pub captured_at: DateTime<Utc>,
    pub entries: Vec<BaselineEntry>,
}

impl Baseline {
    pub fn capture(project_id: impl Into<String>, tasks: &[Task], captured_at: DateTime<Utc>) -> Self {
        Self {
            project_id: project_id.into(),
            captured_at,
            entries: tasks
                .iter()
                .map(|t| BaselineEntry {
                    task_id: t.id.clone(),
                    planned_start: t.start_date,
                    planned_finish: t.finish_date,
                    planned_duration_hours: t.duration_hours,
                })
                .collect(),
        }
    }

    pub fn entry(&self, task_id: &str) -> Option<&BaselineEntry> {
        self.entries.iter().find(|e| e.task_id == task_id)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum VarianceStatus {
    OnTrack,
    Ahead,
    Behind,
    /// Not in the baseline
    New,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub task_id: String,
    pub status: VarianceStatus,
    /// Whole calendar days, positive = later than planned
    pub start_variance_days: Option<i64>,
    pub end_variance_days: Option<i64>,
    pub duration_variance_hours: Option<f64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BaselineComparison {
    pub results: Vec<ComparisonResult>,
    pub on_track_count: usize,
    pub ahead_count: usize,
    pub behind_count: usize,
    pub new_count: usize,
    /// Baseline tasks that no longer exist
    pub removed_task_ids: Vec<String>,
}

fn classify(end_variance: i64, tolerance_days: i64) -> VarianceStatus {
    if end_variance > tolerance_days {
        VarianceStatus::Behind
    } else if end_variance < -tolerance_days {
        VarianceStatus::Ahead
    } else {
        VarianceStatus::OnTrack
    }
}

pub fn compare(current: &[Task], baseline: &Baseline, tolerance_days: i64) -> BaselineComparison {
    let planned: HashMap<&str, &BaselineEntry> =
        baseline.entries.iter().map(|e| (e.task_id.as_str(), e)).collect();

    let results: Vec<ComparisonResult> = current
        .iter()
        .map(|task| match planned.get(task.id.as_str()) {
            Some(entry) => {
                let start = calendar_days_between(entry.planned_start, task.start_date).round() as i64;
                let end = calendar_days_between(entry.planned_finish, task.finish_date).round() as i64;
                ComparisonResult {
                    task_id: task.id.clone(),
                    status: classify(end, tolerance_days),
                    start_variance_days: Some(start),
                    end_variance_days: Some(end),
                    duration_variance_hours: Some(task.duration_hours - entry.planned_duration_hours),
                }
            }
            None => ComparisonResult {
                task_id: task.id.clone(),
                status: VarianceStatus::New,
                start_variance_days: None,
                end_variance_days: None,
                duration_variance_hours: None,
            },
        })
        .collect();

    let count = |status: VarianceStatus| results.iter().filter(|r| r.status == status).count();
    let live: HashSet<&str> = current.iter().map(|t| t.id.as_str()).collect();

    BaselineComparison {
        on_track_count: count(VarianceStatus::OnTrack),
        ahead_count: count(VarianceStatus::Ahead),
        behind_count: count(VarianceStatus::Behind),
        new_count: count(VarianceStatus::New),
        removed_task_ids: baseline
            .entries
            .iter()
            .filter(|e| !live.contains(e.task_id.as_str()))
            .map(|e| e.task_id.clone())
            .collect(),
        results,
    }
}
