//! Timeline Engine - WASM bindings
//!
//! This crate exposes the timeline scheduling engine to the single-page
//! application as a `TimelineEngine` class that can be used directly or via
//! a Web Worker.
//!
//! ## Usage from JavaScript
//!
//! ```javascript
//! import init, { TimelineEngine } from 'timeline_wasm';
//!
//! await init();
//! const engine = new TimelineEngine();
//! engine.initialize({ tasks, dependencies }, calendar, config);
//! const schedule = engine.calculate();
//! const model = engine.viewModel({ viewMode: 'week', zoom: 1, viewportWidthPx: 1200 });
//! ```

mod utils;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use timeline_engine::{
    view_model, zoom_to_fit, Baseline, Calendar, EngineConfig, GridLayout, ProjectState, ScheduleError,
    TaskUpdate, TimelineSnapshot, ViewMode,
};
use wasm_bindgen::prelude::*;

// Import console.log for debugging
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    pub fn log(s: &str);

    #[wasm_bindgen(js_namespace = console)]
    fn warn(s: &str);
}

/// Log macro for console output
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => (crate::log(&format_args!($($t)*).to_string()))
}

/// Viewport description for `layout` and `viewModel`
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
struct ViewRequest {
    /// Defaults to the span of all tasks
    range_start: Option<DateTime<Utc>>,
    range_end: Option<DateTime<Utc>>,
    view_mode: ViewMode,
    /// Ignored when `fit_to_view` is set
    zoom: Option<f64>,
    viewport_width_px: f64,
    pan_px: f64,
    fit_to_view: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EngineStatus {
    initialized: bool,
    task_count: usize,
    dependency_count: usize,
    has_baseline: bool,
    schedule_cached: bool,
}

fn js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}: {}", context, err))
}

fn schedule_error(err: ScheduleError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Serialize as plain JS objects (not `Map`s)
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| js_error("Failed to serialize result", e))
}

fn now() -> DateTime<Utc> {
    Utc.timestamp_millis_opt(js_sys::Date::now() as i64)
        .single()
        .unwrap_or_default()
}

/// The timeline engine exposed to JavaScript
///
/// Holds the project snapshot, calendar and configuration, and provides
/// methods for scheduling, geometry and baseline comparison.
#[wasm_bindgen]
pub struct TimelineEngine {
    project: ProjectState,
    config: EngineConfig,
    initialized: bool,
}

impl TimelineEngine {
    fn ensure_initialized(&self) -> Result<(), JsValue> {
        if self.initialized {
            Ok(())
        } else {
            Err(JsValue::from_str("Engine not initialized"))
        }
    }

    fn grid_for(&self, request: &ViewRequest) -> GridLayout {
        let span = view_model::task_span(&self.project.snapshot().tasks);
        let now = now();
        let start = request.range_start.or(span.map(|s| s.0)).unwrap_or(now);
        let end = request.range_end.or(span.map(|s| s.1)).unwrap_or(start);

        let zoom = if request.fit_to_view {
            zoom_to_fit(start, end, request.view_mode, request.viewport_width_px, &self.config.grid)
        } else {
            request.zoom.unwrap_or(1.0)
        };
        let grid = GridLayout::layout(
            start,
            end,
            request.view_mode,
            zoom,
            request.viewport_width_px,
            &self.config.grid,
        );
        grid.panned(request.pan_px)
    }
}

#[wasm_bindgen]
impl TimelineEngine {
    /// Create a new TimelineEngine instance
    #[wasm_bindgen(constructor)]
    pub fn new() -> TimelineEngine {
        utils::set_panic_hook();
        log("[WASM] TimelineEngine created");
        TimelineEngine {
            project: ProjectState::new(),
            config: EngineConfig::default(),
            initialized: false,
        }
    }

    /// Initialize the engine with a timeline snapshot, calendar and config
    ///
    /// # Arguments
    /// * `snapshot_val` - `{ tasks, dependencies }` as returned by the task store
    /// * `calendar_val` - Calendar object (`undefined` for Mon-Fri)
    /// * `config_val` - Partial EngineConfig (`undefined` for defaults)
    pub fn initialize(&mut self, snapshot_val: JsValue, calendar_val: JsValue, config_val: JsValue) -> Result<(), JsValue> {
        let snapshot: TimelineSnapshot = serde_wasm_bindgen::from_value(snapshot_val)
            .map_err(|e| js_error("Failed to deserialize snapshot", e))?;

        let calendar: Calendar = if calendar_val.is_undefined() || calendar_val.is_null() {
            Calendar::default()
        } else {
            serde_wasm_bindgen::from_value(calendar_val).map_err(|e| js_error("Failed to deserialize calendar", e))?
        };

        let config: EngineConfig = if config_val.is_undefined() || config_val.is_null() {
            EngineConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config_val).map_err(|e| js_error("Failed to deserialize config", e))?
        };

        self.project.clear();
        self.project.load(snapshot);
        self.project.set_calendar(calendar);
        self.project.set_config(config.schedule.clone());
        self.config = config;
        self.initialized = true;

        console_log!("[WASM] Engine initialized with {} tasks", self.project.task_count());
        Ok(())
    }

    /// Sync the whole snapshot (bulk replace after a store refresh)
    pub fn sync(&mut self, snapshot_val: JsValue) -> Result<(), JsValue> {
        self.ensure_initialized()?;
        let snapshot: TimelineSnapshot = serde_wasm_bindgen::from_value(snapshot_val)
            .map_err(|e| js_error("Failed to deserialize snapshot", e))?;
        self.project.load(snapshot);
        console_log!("[WASM] Synced {} tasks", self.project.task_count());
        Ok(())
    }

    /// Update calendar configuration
    #[wasm_bindgen(js_name = updateCalendar)]
    pub fn update_calendar(&mut self, calendar_val: JsValue) -> Result<(), JsValue> {
        let calendar: Calendar = serde_wasm_bindgen::from_value(calendar_val)
            .map_err(|e| js_error("Failed to deserialize calendar", e))?;
        self.project.set_calendar(calendar);
        log("[WASM] Calendar updated");
        Ok(())
    }

    /// Replace engine configuration
    #[wasm_bindgen(js_name = updateConfig)]
    pub fn update_config(&mut self, config_val: JsValue) -> Result<(), JsValue> {
        let config: EngineConfig = serde_wasm_bindgen::from_value(config_val)
            .map_err(|e| js_error("Failed to deserialize config", e))?;
        self.project.set_config(config.schedule.clone());
        self.config = config;
        Ok(())
    }

    /// Run CPM calculation and return the ScheduleResult
    ///
    /// Unchanged inputs return the memoized result. Validation failures
    /// (dangling links, cycles, bad date ranges) reject with a message for
    /// the whole-timeline error state.
    pub fn calculate(&mut self) -> Result<JsValue, JsValue> {
        self.ensure_initialized()?;
        let result = self.project.schedule().map_err(schedule_error)?;

        if result.is_infeasible() {
            warn(&format!(
                "[WASM] Schedule infeasible: {} warning(s)",
                result.warnings.len()
            ));
        }
        console_log!(
            "[WASM] CPM complete: {} tasks, {} critical, {:.1}h",
            result.stats.task_count,
            result.stats.critical_count,
            result.project_duration_hours
        );
        to_js(result)
    }

    /// Grid parameters for a viewport
    pub fn layout(&self, request_val: JsValue) -> Result<JsValue, JsValue> {
        let request: ViewRequest = serde_wasm_bindgen::from_value(request_val)
            .map_err(|e| js_error("Failed to deserialize view request", e))?;
        to_js(&self.grid_for(&request))
    }

    /// Zoom factor that fits every task into `viewport_width_px`
    #[wasm_bindgen(js_name = zoomToFit)]
    pub fn zoom_to_fit(&self, view_mode_val: JsValue, viewport_width_px: f64) -> Result<f64, JsValue> {
        let view_mode: ViewMode = serde_wasm_bindgen::from_value(view_mode_val)
            .map_err(|e| js_error("Failed to deserialize view mode", e))?;
        let (start, end) = view_model::task_span(&self.project.snapshot().tasks)
            .ok_or_else(|| JsValue::from_str("No tasks to fit"))?;
        Ok(zoom_to_fit(start, end, view_mode, viewport_width_px, &self.config.grid))
    }

    /// Bars, arrows and ticks for the current schedule
    #[wasm_bindgen(js_name = viewModel)]
    pub fn view_model(&mut self, request_val: JsValue) -> Result<JsValue, JsValue> {
        self.ensure_initialized()?;
        let request: ViewRequest = serde_wasm_bindgen::from_value(request_val)
            .map_err(|e| js_error("Failed to deserialize view request", e))?;
        let grid = self.grid_for(&request);

        let schedule = self.project.schedule().map_err(schedule_error)?.clone();
        let snapshot = self.project.snapshot();
        let model = view_model::build(
            &snapshot.tasks,
            &snapshot.dependencies,
            &schedule,
            &grid,
            self.project.calendar(),
            self.project.config(),
            &self.config.view,
        );
        to_js(&model)
    }

    /// Apply a user edit; returns the payload for `PUT /tasks/{id}`
    #[wasm_bindgen(js_name = applyUpdate)]
    pub fn apply_update(&mut self, task_id: String, update_val: JsValue) -> Result<JsValue, JsValue> {
        self.ensure_initialized()?;
        let update: TaskUpdate = serde_wasm_bindgen::from_value(update_val)
            .map_err(|e| js_error("Failed to deserialize update", e))?;
        let payload = self.project.apply_update(&task_id, &update).map_err(schedule_error)?;
        to_js(&payload)
    }

    /// Payloads a prospective edit implies for the task and its dependents
    #[wasm_bindgen(js_name = proposeUpdate)]
    pub fn propose_update(&self, task_id: String, update_val: JsValue) -> Result<JsValue, JsValue> {
        self.ensure_initialized()?;
        let update: TaskUpdate = serde_wasm_bindgen::from_value(update_val)
            .map_err(|e| js_error("Failed to deserialize update", e))?;
        let payloads = self.project.propose_update(&task_id, &update).map_err(schedule_error)?;
        to_js(&payloads)
    }

    /// Delete a task and its links
    #[wasm_bindgen(js_name = deleteTask)]
    pub fn delete_task(&mut self, task_id: String) -> Result<(), JsValue> {
        self.ensure_initialized()?;
        self.project.delete_task(&task_id).map_err(schedule_error)
    }

    /// Freeze the current plan; returns the snapshot for external storage
    #[wasm_bindgen(js_name = saveBaseline)]
    pub fn save_baseline(&mut self, project_id: String) -> Result<JsValue, JsValue> {
        self.ensure_initialized()?;
        let baseline = self.project.save_baseline(&project_id, now());
        console_log!("[WASM] Baseline saved with {} entries", baseline.entries.len());
        to_js(baseline)
    }

    /// Restore a baseline loaded from external storage
    #[wasm_bindgen(js_name = loadBaseline)]
    pub fn load_baseline(&mut self, baseline_val: JsValue) -> Result<(), JsValue> {
        let baseline: Baseline = serde_wasm_bindgen::from_value(baseline_val)
            .map_err(|e| js_error("Failed to deserialize baseline", e))?;
        self.project.load_baseline(baseline);
        Ok(())
    }

    /// Variance of the current tasks against the saved baseline
    #[wasm_bindgen(js_name = compareBaseline)]
    pub fn compare_baseline(&self) -> Result<JsValue, JsValue> {
        self.ensure_initialized()?;
        let report = self.project.compare_baseline().map_err(schedule_error)?;
        to_js(&report)
    }

    /// Get current task count
    #[wasm_bindgen(js_name = taskCount)]
    pub fn task_count(&self) -> usize {
        self.project.task_count()
    }

    /// Check if engine is initialized
    #[wasm_bindgen(js_name = isInitialized)]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Engine status (for debugging)
    pub fn status(&self) -> Result<JsValue, JsValue> {
        to_js(&EngineStatus {
            initialized: self.initialized,
            task_count: self.project.task_count(),
            dependency_count: self.project.snapshot().dependencies.len(),
            has_baseline: self.project.baseline().is_some(),
            schedule_cached: self.project.is_schedule_cached(),
        })
    }

    /// Dispose and free resources
    pub fn dispose(&mut self) {
        self.project.clear();
        self.config = EngineConfig::default();
        self.initialized = false;
        log("[WASM] Engine disposed");
    }
}

impl Default for TimelineEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Module initialization - called when WASM module is loaded
#[wasm_bindgen(start)]
pub fn main() {
    utils::set_panic_hook();
    log("[WASM] Timeline WASM module loaded");
}
