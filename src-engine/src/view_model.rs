//! Renderable timeline geometry
//!
//! Composes the date grid and a schedule into bars and dependency arrows.
//! Any renderer (canvas, SVG, DOM) can draw the result without knowing
//! about CPM.

use crate::calendar::{Boundary, WorkCalendar};
use crate::config::{ScheduleConfig, ViewConfig};
use crate::date_grid::{GridLayout, GridTick};
use crate::outline::outline_parents;
use crate::types::{Calendar, Dependency, LinkType, ScheduleResult, Task, TaskSchedule};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BarKind {
    Task,
    Summary,
    /// Drawn as a marker, not a bar
    Milestone,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BarStyle {
    Normal,
    NearCritical,
    Critical,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskBar {
    pub task_id: String,
    pub label: String,
    pub row: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub progress_width: f64,
    pub kind: BarKind,
    pub style: BarStyle,
    pub fill: String,
    /// e.g. "1d 4h", absent for critical and summary bars
    pub slack_label: Option<String>,
}

impl TaskBar {
    fn mid_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    fn right(&self) -> f64 {
        self.x + self.width
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DependencyArrow {
    pub dependency_id: String,
    pub from_task_id: String,
    pub to_task_id: String,
    pub link_type: LinkType,
    /// Orthogonal polyline, first point on the predecessor
    pub points: Vec<Point>,
    pub is_critical: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineModel {
    pub grid: GridLayout,
    pub ticks: Vec<GridTick>,
    pub bars: Vec<TaskBar>,
    pub arrows: Vec<DependencyArrow>,
    pub content_width: f64,
    pub content_height: f64,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

fn anchors(link: LinkType) -> (Side, Side) {
    match link {
        LinkType::FinishToStart => (Side::Right, Side::Left),
        LinkType::StartToStart => (Side::Left, Side::Left),
        LinkType::FinishToFinish => (Side::Right, Side::Right),
        LinkType::StartToFinish => (Side::Left, Side::Right),
    }
}

fn format_slack(hours: f64, hours_per_day: f64) -> String {
    let hours = hours.round() as i64;
    let per_day = (hours_per_day.round() as i64).max(1);
    match (hours / per_day, hours % per_day) {
        (0, h) => format!("{}h", h),
        (d, 0) => format!("{}d", d),
        (d, h) => format!("{}d {}h", d, h),
    }
}

fn style_of(schedule: &TaskSchedule) -> BarStyle {
    if schedule.is_critical {
        BarStyle::Critical
    } else if schedule.is_near_critical {
        BarStyle::NearCritical
    } else {
        BarStyle::Normal
    }
}

/// Route one link between two bars
fn route(from: &TaskBar, to: &TaskBar, link: LinkType, view: &ViewConfig) -> Vec<Point> {
    let stub = view.arrow_stub_px;
    let (exit, entry) = anchors(link);

    let start = Point {
        x: if exit == Side::Right { from.right() } else { from.x },
        y: from.mid_y(),
    };
    let end = Point {
        x: if entry == Side::Left { to.x } else { to.right() },
        y: to.mid_y(),
    };
    let out_x = if exit == Side::Right { start.x + stub } else { start.x - stub };
    let in_x = if entry == Side::Left { end.x - stub } else { end.x + stub };

    let direct_at = match (exit, entry) {
        (Side::Right, Side::Left) => (out_x <= in_x).then_some(out_x),
        (Side::Left, Side::Right) => (out_x >= in_x).then_some(out_x),
        (Side::Left, Side::Left) => Some(out_x.min(in_x)),
        (Side::Right, Side::Right) => Some(out_x.max(in_x)),
    };

    let mut points = match direct_at {
        Some(x) => vec![start, Point { x, y: start.y }, Point { x, y: end.y }, end],
        None => {
            // Run back through the gap between the two rows
            let row_top = from.row as f64 * view.row_height_px;
            let channel_y = if to.row > from.row {
                row_top + view.row_height_px
            } else {
                row_top
            };
            vec![
                start,
                Point { x: out_x, y: start.y },
                Point { x: out_x, y: channel_y },
                Point { x: in_x, y: channel_y },
                Point { x: in_x, y: end.y },
                end,
            ]
        }
    };
    points.dedup();
    points
}

/// Earliest start and latest finish over all tasks
pub fn task_span(tasks: &[Task]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = tasks.iter().map(|t| t.start_date).min()?;
    let finish = tasks.iter().map(|t| t.finish_date).max()?;
    Some((start, finish.max(start)))
}

pub fn build(
    tasks: &[Task],
    dependencies: &[Dependency],
    schedule: &ScheduleResult,
    grid: &GridLayout,
    calendar: &Calendar,
    schedule_config: &ScheduleConfig,
    view: &ViewConfig,
) -> TimelineModel {
    let work = WorkCalendar::new(calendar, schedule_config);
    let by_id: HashMap<&str, &TaskSchedule> =
        schedule.tasks.iter().map(|s| (s.task_id.as_str(), s)).collect();

    let mut bars: Vec<TaskBar> = tasks
        .iter()
        .enumerate()
        .map(|(row, task)| {
            let scheduled = by_id.get(task.id.as_str()).copied();
            let is_summary = scheduled.map_or(false, |s| s.is_summary);
            let style = scheduled.map_or(BarStyle::Normal, style_of);
            let kind = if is_summary {
                BarKind::Summary
            } else if task.is_milestone {
                BarKind::Milestone
            } else {
                BarKind::Task
            };

            let x = grid.date_to_x(task.start_date);
            let (width, height) = match kind {
                BarKind::Milestone => (0.0, view.milestone_size_px),
                _ => {
                    let finish = work.add_work_hours(task.start_date, task.duration_hours, Boundary::Finish);
                    ((grid.date_to_x(finish) - x).max(view.min_bar_width_px), view.bar_height_px)
                }
            };

            let palette = &view.palette;
            let default_fill = match (kind, style) {
                (BarKind::Summary, _) => &palette.summary,
                (_, BarStyle::Critical) => &palette.critical,
                (_, BarStyle::NearCritical) => &palette.near_critical,
                (BarKind::Milestone, BarStyle::Normal) => &palette.milestone,
                (BarKind::Task, BarStyle::Normal) => &palette.normal,
            };

            let slack_label = scheduled
                .filter(|s| !s.is_summary && !s.is_critical && s.slack_hours > 0.0)
                .map(|s| format_slack(s.slack_hours, work.hours_per_day()));

            TaskBar {
                task_id: task.id.clone(),
                label: task.name.clone(),
                row,
                x,
                y: row as f64 * view.row_height_px + (view.row_height_px - height) / 2.0,
                width,
                height,
                progress_width: width * f64::from(task.percent_complete.min(100)) / 100.0,
                kind,
                style,
                fill: task.color.clone().unwrap_or_else(|| default_fill.clone()),
                slack_label,
            }
        })
        .collect();

    // Summary bars span their descendants; children follow parents
    let parents = outline_parents(tasks);
    for i in (0..tasks.len()).rev() {
        if let Some(parent) = parents[i] {
            let (left, right) = (bars[i].x, bars[i].right());
            let summary = &mut bars[parent];
            if summary.kind == BarKind::Summary {
                let new_left = summary.x.min(left);
                let new_right = summary.right().max(right);
                summary.x = new_left;
                summary.width = new_right - new_left;
                summary.progress_width =
                    summary.width * f64::from(tasks[parent].percent_complete.min(100)) / 100.0;
            }
        }
    }

    let row_of: HashMap<&str, usize> = tasks.iter().enumerate().map(|(i, t)| (t.id.as_str(), i)).collect();
    let arrows = dependencies
        .iter()
        .filter_map(|dep| {
            let from = &bars[*row_of.get(dep.predecessor_id.as_str())?];
            let to = &bars[*row_of.get(dep.successor_id.as_str())?];
            let critical = |id: &str| by_id.get(id).map_or(false, |s| s.is_critical && !s.is_summary);
            Some(DependencyArrow {
                dependency_id: dep.id.clone(),
                from_task_id: dep.predecessor_id.clone(),
                to_task_id: dep.successor_id.clone(),
                link_type: dep.link_type,
                points: route(from, to, dep.link_type, view),
                is_critical: critical(&dep.predecessor_id) && critical(&dep.successor_id),
            })
        })
        .collect();

    TimelineModel {
        ticks: grid.ticks(),
        content_width: grid.content_width(),
        content_height: tasks.len() as f64 * view.row_height_px,
        grid: grid.clone(),
        bars,
        arrows,
    }
}
