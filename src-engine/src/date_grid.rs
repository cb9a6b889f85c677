//! Date-to-pixel mapping for the timeline canvas
//!
//! A `GridLayout` is a pure value: changing zoom, pan or viewport builds a
//! new layout and never touches the schedule.

use crate::calendar::shift;
use crate::config::GridConfig;
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: f64 = 86_400.0;
const DAYS_PER_MONTH: f64 = 365.2425 / 12.0;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ViewMode {
    #[default]
    Day,
    Week,
    Month,
    Quarter,
}

impl ViewMode {
    /// Length of one grid unit. Months and quarters use the mean
    /// Gregorian month so the mapping stays linear.
    pub fn unit_seconds(self) -> f64 {
        match self {
            ViewMode::Day => SECONDS_PER_DAY,
            ViewMode::Week => 7.0 * SECONDS_PER_DAY,
            ViewMode::Month => DAYS_PER_MONTH * SECONDS_PER_DAY,
            ViewMode::Quarter => 3.0 * DAYS_PER_MONTH * SECONDS_PER_DAY,
        }
    }

    pub fn base_width(self, config: &GridConfig) -> f64 {
        match self {
            ViewMode::Day => config.day_width_px,
            ViewMode::Week => config.week_width_px,
            ViewMode::Month => config.month_width_px,
            ViewMode::Quarter => config.quarter_width_px,
        }
    }

    /// Start of the unit containing `date`
    fn unit_floor(self, date: NaiveDate) -> NaiveDate {
        match self {
            ViewMode::Day => date,
            ViewMode::Week => date - Duration::days(i64::from(date.weekday().num_days_from_monday())),
            ViewMode::Month => date.with_day(1).unwrap_or(date),
            ViewMode::Quarter => {
                let month = (date.month() - 1) / 3 * 3 + 1;
                NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
            }
        }
    }

    fn next_unit(self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            ViewMode::Day => date.succ_opt(),
            ViewMode::Week => date.checked_add_signed(Duration::days(7)),
            ViewMode::Month => date.checked_add_months(Months::new(1)),
            ViewMode::Quarter => date.checked_add_months(Months::new(3)),
        }
    }

    fn label(self, date: NaiveDate) -> String {
        match self {
            ViewMode::Day => date.format("%b %d").to_string(),
            ViewMode::Week => date.format("W%V").to_string(),
            ViewMode::Month => date.format("%b %Y").to_string(),
            ViewMode::Quarter => format!("Q{} {}", (date.month() - 1) / 3 + 1, date.year()),
        }
    }
}

/// Header gridline
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GridTick {
    pub x: f64,
    pub date: DateTime<Utc>,
    pub label: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GridLayout {
    pub view_mode: ViewMode,
    /// Range start snapped down to a unit boundary; maps to `origin_x`
    pub range_start: DateTime<Utc>,
    pub range_end: DateTime<Utc>,
    pub pixels_per_unit: f64,
    pub origin_x: f64,
    pub units_visible: f64,
    /// Zoom factor after clamping
    pub zoom: f64,
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

impl GridLayout {
    pub fn layout(
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        view_mode: ViewMode,
        zoom: f64,
        viewport_width_px: f64,
        config: &GridConfig,
    ) -> Self {
        let zoom = if zoom.is_finite() {
            zoom.clamp(config.min_zoom, config.max_zoom)
        } else {
            1.0
        };
        let base = view_mode.base_width(config);
        let max_unit = (base * config.max_zoom).max(config.min_unit_px);
        let pixels_per_unit = (base * zoom).clamp(config.min_unit_px, max_unit);

        let snapped = midnight(view_mode.unit_floor(range_start.date_naive()));
        Self {
            view_mode,
            range_start: snapped,
            range_end: range_end.max(snapped),
            pixels_per_unit,
            origin_x: 0.0,
            units_visible: viewport_width_px.max(0.0) / pixels_per_unit,
            zoom,
        }
    }

    /// Horizontal pan; positive `dx` moves the content right
    pub fn panned(&self, dx: f64) -> Self {
        Self {
            origin_x: self.origin_x + dx,
            ..self.clone()
        }
    }

    pub fn date_to_x(&self, date: DateTime<Utc>) -> f64 {
        let seconds = (date - self.range_start).num_seconds() as f64;
        self.origin_x + seconds / self.view_mode.unit_seconds() * self.pixels_per_unit
    }

    pub fn x_to_date(&self, x: f64) -> DateTime<Utc> {
        let units = (x - self.origin_x) / self.pixels_per_unit;
        let seconds = (units * self.view_mode.unit_seconds()).round() as i64;
        shift(self.range_start, seconds)
    }

    /// Pixel width of the whole range
    pub fn content_width(&self) -> f64 {
        self.date_to_x(self.range_end) - self.origin_x
    }

    /// Unit boundaries from the snapped start through the range end
    pub fn ticks(&self) -> Vec<GridTick> {
        let mut ticks = Vec::new();
        let mut date = self.range_start.date_naive();
        while midnight(date) <= self.range_end {
            ticks.push(GridTick {
                x: self.date_to_x(midnight(date)),
                date: midnight(date),
                label: self.view_mode.label(date),
            });
            date = match self.view_mode.next_unit(date) {
                Some(next) => next,
                None => break,
            };
        }
        ticks
    }
}

/// Zoom factor that fits `[span_start, span_end]` into the viewport,
/// clamped to the configured zoom range.
pub fn zoom_to_fit(
    span_start: DateTime<Utc>,
    span_end: DateTime<Utc>,
    view_mode: ViewMode,
    viewport_width_px: f64,
    config: &GridConfig,
) -> f64 {
    let seconds = (span_end - span_start).num_seconds().max(0) as f64;
    let units = (seconds / view_mode.unit_seconds()).max(f64::EPSILON);
    let zoom = viewport_width_px / (units * view_mode.base_width(config));
    if zoom.is_finite() {
        zoom.clamp(config.min_zoom, config.max_zoom)
    } else {
        config.max_zoom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn day_mode_maps_days_to_base_width() {
        let config = GridConfig::default();
        let grid = GridLayout::layout(at(2024, 3, 4), at(2024, 3, 31), ViewMode::Day, 1.0, 800.0, &config);

        assert_eq!(grid.pixels_per_unit, 80.0);
        assert_eq!(grid.units_visible, 10.0);
        assert_eq!(grid.date_to_x(at(2024, 3, 4)), 0.0);
        assert_eq!(grid.date_to_x(at(2024, 3, 6)), 160.0);
        assert_eq!(grid.x_to_date(160.0), at(2024, 3, 6));
    }

    #[test]
    fn unit_width_is_clamped() {
        let config = GridConfig::default();
        let tiny = GridLayout::layout(at(2024, 3, 4), at(2024, 3, 5), ViewMode::Day, 0.1, 800.0, &config);
        assert_eq!(tiny.pixels_per_unit, config.min_unit_px);

        let huge = GridLayout::layout(at(2024, 3, 4), at(2024, 3, 5), ViewMode::Week, 50.0, 800.0, &config);
        assert_eq!(huge.zoom, 5.0);
        assert_eq!(huge.pixels_per_unit, 600.0);
    }

    #[test]
    fn ranges_snap_to_unit_boundaries() {
        let config = GridConfig::default();
        // Wednesday
        let mid_week = Utc.with_ymd_and_hms(2024, 3, 6, 15, 30, 0).unwrap();
        let week = GridLayout::layout(mid_week, at(2024, 4, 1), ViewMode::Week, 1.0, 800.0, &config);
        assert_eq!(week.range_start, at(2024, 3, 4));

        let quarter = GridLayout::layout(mid_week, at(2024, 12, 1), ViewMode::Quarter, 1.0, 800.0, &config);
        assert_eq!(quarter.range_start, at(2024, 1, 1));
        let labels: Vec<String> = quarter.ticks().into_iter().map(|t| t.label).collect();
        assert_eq!(labels, vec!["Q1 2024", "Q2 2024", "Q3 2024", "Q4 2024"]);
    }

    #[test]
    fn far_away_pixels_clamp_to_the_date_range() {
        let config = GridConfig::default();
        let grid = GridLayout::layout(at(2024, 3, 4), at(2024, 3, 31), ViewMode::Day, 1.0, 800.0, &config);
        assert_eq!(grid.x_to_date(1e300), DateTime::<Utc>::MAX_UTC);
        assert_eq!(grid.x_to_date(-1e300), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn pan_shifts_every_position() {
        let config = GridConfig::default();
        let grid = GridLayout::layout(at(2024, 3, 4), at(2024, 3, 31), ViewMode::Day, 1.0, 800.0, &config);
        let moved = grid.panned(-40.0);
        assert_eq!(moved.date_to_x(at(2024, 3, 5)), 40.0);
        assert_eq!(moved.x_to_date(40.0), at(2024, 3, 5));
    }

    #[test]
    fn zoom_to_fit_fills_the_viewport() {
        let config = GridConfig::default();
        let zoom = zoom_to_fit(at(2024, 3, 1), at(2024, 3, 21), ViewMode::Day, 800.0, &config);
        assert_eq!(zoom, 0.5);

        let grid = GridLayout::layout(at(2024, 3, 1), at(2024, 3, 21), ViewMode::Day, zoom, 800.0, &config);
        assert_eq!(grid.content_width(), 800.0);

        let clamped = zoom_to_fit(at(2024, 3, 1), at(2024, 3, 1), ViewMode::Day, 800.0, &config);
        assert_eq!(clamped, config.max_zoom);
    }
}
