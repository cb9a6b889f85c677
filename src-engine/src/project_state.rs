//! Project State Container
//!
//! Holds the project snapshot the engine works on, a memoized schedule and
//! the saved baseline. The external task store stays the source of truth;
//! this container only mirrors it between refreshes.

use crate::baseline::{self, Baseline, BaselineComparison};
use crate::calendar::{Boundary, WorkCalendar};
use crate::config::ScheduleConfig;
use crate::error::{Result, ScheduleError};
use crate::validation;
use crate::types::{
    Calendar, ScheduleResult, SchedulingMode, Task, TaskUpdate, TaskUpdatePayload, TimelineSnapshot,
};
use chrono::{DateTime, Utc};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Project state container
#[derive(Default)]
pub struct ProjectState {
    snapshot: TimelineSnapshot,
    calendar: Calendar,
    config: ScheduleConfig,
    baseline: Option<Baseline>,
    /// Last schedule and the hash of the inputs it was computed from.
    /// Inputs that cannot be hashed are never served from the memo.
    cache: Option<(Option<u64>, ScheduleResult)>,
}

/// Hash of everything a schedule depends on
fn input_hash(snapshot: &TimelineSnapshot, calendar: &Calendar, config: &ScheduleConfig) -> Option<u64> {
    let bytes = serde_json::to_vec(&(snapshot, calendar, config)).ok()?;
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    Some(hasher.finish())
}

/// Move a task's start or duration, keeping its finish consistent with
/// the calendar. The task is left untouched when the result is invalid.
fn apply_to_task(task: &mut Task, update: &TaskUpdate, work: &WorkCalendar) -> Result<()> {
    let mut edited = task.clone();
    let rescheduled = update.start_date.is_some() || update.duration_hours.is_some();
    if let Some(start) = update.start_date {
        edited.start_date = start;
    }
    if let Some(duration) = update.duration_hours {
        edited.duration_hours = duration;
    }
    if let Some(percent) = update.percent_complete {
        edited.percent_complete = percent;
    }
    if rescheduled {
        validation::validate_duration(&edited)?;
        edited.finish_date = if edited.is_milestone {
            edited.start_date
        } else {
            work.add_work_hours(edited.start_date, edited.duration_hours, Boundary::Finish)
        };
    }
    validation::validate_task(&edited)?;
    *task = edited;
    Ok(())
}

impl ProjectState {
    /// Create new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole snapshot (initial load or bulk sync)
    pub fn load(&mut self, snapshot: TimelineSnapshot) {
        self.snapshot = snapshot;
    }

    pub fn set_calendar(&mut self, calendar: Calendar) {
        self.calendar = calendar;
    }

    pub fn set_config(&mut self, config: ScheduleConfig) {
        self.config = config;
    }

    pub fn snapshot(&self) -> &TimelineSnapshot {
        &self.snapshot
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    pub fn task_count(&self) -> usize {
        self.snapshot.tasks.len()
    }

    /// Add a new task, or replace the one with the same id
    pub fn upsert_task(&mut self, task: Task) {
        match self.snapshot.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task,
            None => self.snapshot.tasks.push(task),
        }
    }

    /// Delete a task together with the dependencies that reference it
    pub fn delete_task(&mut self, task_id: &str) -> Result<()> {
        let before = self.snapshot.tasks.len();
        self.snapshot.tasks.retain(|t| t.id != task_id);
        if self.snapshot.tasks.len() == before {
            return Err(ScheduleError::UnknownTask(task_id.to_string()));
        }
        self.snapshot
            .dependencies
            .retain(|d| d.predecessor_id != task_id && d.successor_id != task_id);
        Ok(())
    }

    /// Apply an update the user made and return the payload for the store
    pub fn apply_update(&mut self, task_id: &str, update: &TaskUpdate) -> Result<TaskUpdatePayload> {
        let work = WorkCalendar::new(&self.calendar, &self.config);
        let task = self
            .snapshot
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| ScheduleError::UnknownTask(task_id.to_string()))?;
        apply_to_task(task, update, &work)?;
        Ok(TaskUpdatePayload {
            task_id: task.id.clone(),
            start_date: task.start_date,
            duration_hours: task.duration_hours,
            percent_complete: task.percent_complete,
        })
    }

    /// Compute what an update implies without applying it: the payload for
    /// the edited task followed by one for every auto-scheduled task whose
    /// early start would no longer match its stored start.
    pub fn propose_update(&self, task_id: &str, update: &TaskUpdate) -> Result<Vec<TaskUpdatePayload>> {
        let mut draft = self.snapshot.clone();
        let work = WorkCalendar::new(&self.calendar, &self.config);
        let edited = draft
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| ScheduleError::UnknownTask(task_id.to_string()))?;
        apply_to_task(edited, update, &work)?;

        let graph = crate::prepare(&draft, &self.calendar, &self.config)?;
        let result = crate::cpm::compute(&graph, &draft.tasks, &self.calendar, &self.config);

        let mut payloads = Vec::new();
        if let Some(index) = graph.index_of(task_id) {
            let task = &draft.tasks[index];
            payloads.push(TaskUpdatePayload {
                task_id: task.id.clone(),
                start_date: task.start_date,
                duration_hours: task.duration_hours,
                percent_complete: task.percent_complete,
            });

            for i in graph.downstream_of(index) {
                let task = &draft.tasks[i];
                let scheduled = &result.tasks[i];
                if task.scheduling_mode == SchedulingMode::Auto
                    && !scheduled.is_summary
                    && scheduled.earliest_start != task.start_date
                {
                    payloads.push(TaskUpdatePayload {
                        task_id: task.id.clone(),
                        start_date: scheduled.earliest_start,
                        duration_hours: task.duration_hours,
                        percent_complete: task.percent_complete,
                    });
                }
            }
        }

        tracing::debug!(task_id, affected = payloads.len(), "update proposed");
        Ok(payloads)
    }

    /// Current schedule, recomputed only when the inputs changed
    pub fn schedule(&mut self) -> Result<&ScheduleResult> {
        let key = input_hash(&self.snapshot, &self.calendar, &self.config);
        let entry = match self.cache.take() {
            Some((cached, result)) if cached.is_some() && cached == key => {
                tracing::trace!("schedule served from memo");
                (cached, result)
            }
            _ => (key, crate::analyze(&self.snapshot, &self.calendar, &self.config)?),
        };
        Ok(&self.cache.insert(entry).1)
    }

    /// Whether `schedule()` would reuse the memoized result
    pub fn is_schedule_cached(&self) -> bool {
        match (&self.cache, input_hash(&self.snapshot, &self.calendar, &self.config)) {
            (Some((Some(cached), _)), Some(key)) => *cached == key,
            _ => false,
        }
    }

    /// Freeze the current plan. Replaces any earlier baseline.
    pub fn save_baseline(&mut self, project_id: &str, captured_at: DateTime<Utc>) -> &Baseline {
        self.baseline
            .insert(Baseline::capture(project_id, &self.snapshot.tasks, captured_at))
    }

    /// Restore a baseline handed back by external storage
    pub fn load_baseline(&mut self, baseline: Baseline) {
        self.baseline = Some(baseline);
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    pub fn compare_baseline(&self) -> Result<BaselineComparison> {
        let saved = self.baseline.as_ref().ok_or(ScheduleError::NoBaseline)?;
        Ok(baseline::compare(
            &self.snapshot.tasks,
            saved,
            self.config.baseline_tolerance_days,
        ))
    }

    /// Clear all state
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
