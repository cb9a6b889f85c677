//! Timeline scheduling engine
//!
//! Computation core behind the Gantt/timeline views: critical path
//! scheduling, baseline variance and the geometry a renderer draws.
//!
//! ```no_run
//! use timeline_engine::{analyze, Calendar, ScheduleConfig, TimelineSnapshot};
//!
//! let snapshot: TimelineSnapshot = serde_json::from_str(r#"{ "tasks": [], "dependencies": [] }"#).unwrap();
//! let result = analyze(&snapshot, &Calendar::default(), &ScheduleConfig::default()).unwrap();
//! println!("critical path: {:?}", result.critical_path);
//! ```

pub mod baseline;
pub mod calendar;
pub mod config;
pub mod cpm;
pub mod date_grid;
pub mod error;
pub mod graph;
pub mod outline;
pub mod project_state;
pub mod types;
pub mod validation;
pub mod view_model;

pub use baseline::{Baseline, BaselineComparison, BaselineEntry, ComparisonResult, VarianceStatus};
pub use config::{EngineConfig, GridConfig, Palette, ScheduleConfig, ViewConfig};
pub use date_grid::{zoom_to_fit, GridLayout, GridTick, ViewMode};
pub use error::{Result, ScheduleError};
pub use graph::DependencyGraph;
pub use project_state::ProjectState;
pub use types::*;
pub use view_model::{task_span, BarKind, BarStyle, DependencyArrow, Point, TaskBar, TimelineModel};

use calendar::WorkCalendar;

/// Validate a snapshot and build its dependency graph. Any error here
/// means the timeline as a whole cannot be analyzed.
pub fn prepare(snapshot: &TimelineSnapshot, calendar: &Calendar, config: &ScheduleConfig) -> Result<DependencyGraph> {
    WorkCalendar::new(calendar, config).validate()?;
    validation::validate_snapshot(snapshot)?;
    DependencyGraph::build(&snapshot.tasks, &snapshot.dependencies)
}

/// Validate, build and run CPM in one call
pub fn analyze(snapshot: &TimelineSnapshot, calendar: &Calendar, config: &ScheduleConfig) -> Result<ScheduleResult> {
    let graph = prepare(snapshot, calendar, config)?;
    Ok(cpm::compute(&graph, &snapshot.tasks, calendar, config))
}
