//! Engine configuration
//!
//! All structs deserialize from partial JSON objects; missing fields take the
//! defaults below.

use serde::{Deserialize, Serialize};

/// Scheduling and comparison tunables
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleConfig {
    /// Slack below this is treated as zero
    pub critical_tolerance_hours: f64,
    /// Tasks with slack up to this are flagged near-critical
    pub near_critical_threshold_hours: f64,
    /// Length of the business day
    pub hours_per_day: f64,
    /// Hour of day (UTC) at which business time starts
    pub workday_start_hour: u32,
    /// Baseline end variance (days) still considered on-track
    pub baseline_tolerance_days: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            critical_tolerance_hours: 0.01,
            near_critical_threshold_hours: 16.0,
            hours_per_day: 8.0,
            workday_start_hour: 9,
            baseline_tolerance_days: 2,
        }
    }
}

/// Date grid tunables
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GridConfig {
    pub day_width_px: f64,
    pub week_width_px: f64,
    pub month_width_px: f64,
    pub quarter_width_px: f64,
    /// Smallest legible unit width
    pub min_unit_px: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            day_width_px: 80.0,
            week_width_px: 120.0,
            month_width_px: 200.0,
            quarter_width_px: 240.0,
            min_unit_px: 20.0,
            min_zoom: 0.1,
            max_zoom: 5.0,
        }
    }
}

/// Bar colours per style
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Palette {
    pub normal: String,
    pub critical: String,
    pub near_critical: String,
    pub summary: String,
    pub milestone: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            normal: "#1e88e5".to_string(),
            critical: "#e53935".to_string(),
            near_critical: "#fb8c00".to_string(),
            summary: "#455a64".to_string(),
            milestone: "#6a1b9a".to_string(),
        }
    }
}

/// Timeline geometry tunables
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewConfig {
    pub row_height_px: f64,
    pub bar_height_px: f64,
    pub min_bar_width_px: f64,
    pub milestone_size_px: f64,
    /// Horizontal run of an arrow before it turns
    pub arrow_stub_px: f64,
    pub palette: Palette,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            row_height_px: 32.0,
            bar_height_px: 20.0,
            min_bar_width_px: 2.0,
            milestone_size_px: 12.0,
            arrow_stub_px: 10.0,
            palette: Palette::default(),
        }
    }
}

/// Everything a host supplies in one object
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub schedule: ScheduleConfig,
    pub grid: GridConfig,
    pub view: ViewConfig,
}
