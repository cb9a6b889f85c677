//! Business-time calculations
//!
//! Converts instants to business-hour offsets from a project origin and
//! back, honouring working weekdays and dated exceptions (holidays,
//! working weekends).

use crate::config::ScheduleConfig;
use crate::error::{Result, ScheduleError};
use crate::types::Calendar;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc};

const EPSILON_HOURS: f64 = 1e-9;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Which end of a working day a whole-day offset resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// 8h from the origin -> start of the next working day
    Start,
    /// 8h from the origin -> end of the first working day
    Finish,
}

/// Calendar plus the business-day shape
#[derive(Debug, Clone)]
pub struct WorkCalendar<'a> {
    calendar: &'a Calendar,
    hours_per_day: f64,
    workday_start_hour: u32,
}

impl<'a> WorkCalendar<'a> {
    pub fn new(calendar: &'a Calendar, config: &ScheduleConfig) -> Self {
        Self {
            calendar,
            hours_per_day: config.hours_per_day,
            workday_start_hour: config.workday_start_hour,
        }
    }

    pub fn hours_per_day(&self) -> f64 {
        self.hours_per_day
    }

    /// Rejects calendars on which no date could ever be a working day, plus
    /// day shapes that do not fit in 24 hours.
    pub fn validate(&self) -> Result<()> {
        if self.calendar.working_days.is_empty() {
            return Err(ScheduleError::InvalidCalendar("no working days".to_string()));
        }
        if let Some(day) = self.calendar.working_days.iter().find(|d| **d > 6) {
            return Err(ScheduleError::InvalidCalendar(format!(
                "working day index {} out of range 0-6",
                day
            )));
        }
        if !(self.hours_per_day > 0.0)
            || f64::from(self.workday_start_hour) + self.hours_per_day > 24.0
        {
            return Err(ScheduleError::InvalidCalendar(format!(
                "a {}h day starting at {}:00 does not fit in 24 hours",
                self.hours_per_day, self.workday_start_hour
            )));
        }
        Ok(())
    }

    /// Check if a date is a working day based on the calendar
    pub fn is_work_day(&self, date: NaiveDate) -> bool {
        // Exceptions win over the weekly pattern
        if let Some(exception) = self.calendar.exceptions.get(&date) {
            return exception.is_working();
        }

        // 0=Sunday, 1=Monday, etc.
        let day_index = date.weekday().num_days_from_sunday();
        self.calendar.working_days.contains(&day_index)
    }

    /// First working day on or after `date`
    pub fn next_work_day(&self, date: NaiveDate) -> NaiveDate {
        let mut current = date;
        while !self.is_work_day(current) {
            current = match current.succ_opt() {
                Some(d) => d,
                None => break,
            };
        }
        current
    }

    /// Signed count of working days in `[from, to)`; negative when `to`
    /// precedes `from`.
    pub fn work_days_between(&self, from: NaiveDate, to: NaiveDate) -> i64 {
        if from == to {
            return 0;
        }
        let (lo, hi, sign) = if from < to { (from, to, 1) } else { (to, from, -1) };

        let mut count = 0;
        let mut current = lo;
        while current < hi {
            if self.is_work_day(current) {
                count += 1;
            }
            current = match current.succ_opt() {
                Some(d) => d,
                None => break,
            };
        }
        count * sign
    }

    /// Business hours already elapsed on the instant's own day
    fn hours_into_day(&self, instant: DateTime<Utc>) -> f64 {
        if !self.is_work_day(instant.date_naive()) {
            return 0.0;
        }
        let seconds = f64::from(instant.num_seconds_from_midnight());
        let elapsed = seconds / 3600.0 - f64::from(self.workday_start_hour);
        elapsed.clamp(0.0, self.hours_per_day)
    }

    /// Business-hour offset of `instant` from the start of `origin`
    pub fn to_offset(&self, origin: NaiveDate, instant: DateTime<Utc>) -> f64 {
        let days = self.work_days_between(origin, instant.date_naive());
        days as f64 * self.hours_per_day + self.hours_into_day(instant)
    }

    /// Inverse of `to_offset`, resolved to working time
    pub fn from_offset(&self, origin: NaiveDate, hours: f64, boundary: Boundary) -> DateTime<Utc> {
        let mut days = (hours / self.hours_per_day).floor();
        let mut remainder = hours - days * self.hours_per_day;
        if remainder < EPSILON_HOURS {
            remainder = 0.0;
        }
        if self.hours_per_day - remainder < EPSILON_HOURS {
            days += 1.0;
            remainder = 0.0;
        }
        if boundary == Boundary::Finish && remainder == 0.0 && hours > EPSILON_HOURS {
            days -= 1.0;
            remainder = self.hours_per_day;
        }

        let date = self.nth_work_day(origin, days as i64);
        let midnight = date.and_time(NaiveTime::MIN).and_utc();
        let seconds = i64::from(self.workday_start_hour) * 3600 + (remainder * 3600.0).round() as i64;
        shift(midnight, seconds)
    }

    /// Working day `n` counted from the first working day at or after `origin`
    fn nth_work_day(&self, origin: NaiveDate, n: i64) -> NaiveDate {
        let mut date = self.next_work_day(origin);
        let mut remaining = n.abs();
        while remaining > 0 {
            let stepped = if n > 0 { date.succ_opt() } else { date.pred_opt() };
            date = match stepped {
                Some(d) => d,
                None => break,
            };
            if self.is_work_day(date) {
                remaining -= 1;
            }
        }
        date
    }

    /// Add business hours to an instant
    pub fn add_work_hours(&self, instant: DateTime<Utc>, hours: f64, boundary: Boundary) -> DateTime<Utc> {
        let origin = instant.date_naive();
        self.from_offset(origin, self.to_offset(origin, instant) + hours, boundary)
    }
}

/// `instant` moved by `seconds`, saturating at the limits chrono can represent
pub(crate) fn shift(instant: DateTime<Utc>, seconds: i64) -> DateTime<Utc> {
    Duration::try_seconds(seconds)
        .and_then(|delta| instant.checked_add_signed(delta))
        .unwrap_or(if seconds < 0 { DateTime::<Utc>::MIN_UTC } else { DateTime::<Utc>::MAX_UTC })
}

/// Signed calendar days from `from` to `to`, fractional
pub fn calendar_days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / SECONDS_PER_DAY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CalendarException;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekends_and_holidays_are_skipped() {
        let mut calendar = Calendar::default();
        calendar
            .exceptions
            .insert(date(2024, 3, 6), CalendarException::Holiday("Founders day".into()));
        calendar.exceptions.insert(
            date(2024, 3, 9),
            CalendarException::Override { working: true, description: None },
        );
        let config = ScheduleConfig::default();
        let work = WorkCalendar::new(&calendar, &config);

        // 2024-03-04 is a Monday
        assert!(work.is_work_day(date(2024, 3, 4)));
        assert!(!work.is_work_day(date(2024, 3, 6)));
        assert!(work.is_work_day(date(2024, 3, 9)));
        assert!(!work.is_work_day(date(2024, 3, 10)));
        // Mon, Tue, Thu, Fri, Sat
        assert_eq!(work.work_days_between(date(2024, 3, 4), date(2024, 3, 11)), 5);
        assert_eq!(work.work_days_between(date(2024, 3, 11), date(2024, 3, 4)), -5);
    }

    #[test]
    fn offsets_round_trip_through_business_time() {
        let calendar = Calendar::default();
        let config = ScheduleConfig::default();
        let work = WorkCalendar::new(&calendar, &config);
        let origin = date(2024, 3, 1); // Friday

        assert_eq!(work.to_offset(origin, at(2024, 3, 1, 9)), 0.0);
        assert_eq!(work.to_offset(origin, at(2024, 3, 1, 13)), 4.0);
        assert_eq!(work.to_offset(origin, at(2024, 3, 4, 9)), 8.0);

        assert_eq!(work.from_offset(origin, 8.0, Boundary::Start), at(2024, 3, 4, 9));
        assert_eq!(work.from_offset(origin, 8.0, Boundary::Finish), at(2024, 3, 1, 17));
        assert_eq!(work.from_offset(origin, 12.0, Boundary::Start), at(2024, 3, 4, 13));
        assert_eq!(work.from_offset(origin, -8.0, Boundary::Start), at(2024, 2, 29, 9));
    }

    #[test]
    fn add_work_hours_crosses_the_weekend() {
        let calendar = Calendar::default();
        let config = ScheduleConfig::default();
        let work = WorkCalendar::new(&calendar, &config);

        let friday_noon = at(2024, 3, 1, 12);
        assert_eq!(work.add_work_hours(friday_noon, 8.0, Boundary::Finish), at(2024, 3, 4, 12));
        assert_eq!(work.add_work_hours(at(2024, 3, 4, 9), 16.0, Boundary::Finish), at(2024, 3, 5, 17));
    }

    #[test]
    fn calendar_without_working_days_is_rejected() {
        let calendar = Calendar { working_days: Vec::new(), ..Calendar::default() };
        let config = ScheduleConfig::default();
        assert!(matches!(
            WorkCalendar::new(&calendar, &config).validate(),
            Err(ScheduleError::InvalidCalendar(_))
        ));
    }

    #[test]
    fn shifting_past_the_representable_range_saturates() {
        assert_eq!(shift(at(2024, 3, 4, 9), i64::MAX), DateTime::<Utc>::MAX_UTC);
        assert_eq!(shift(at(2024, 3, 4, 9), i64::MIN), DateTime::<Utc>::MIN_UTC);
        assert_eq!(shift(at(2024, 3, 4, 9), 3600), at(2024, 3, 4, 10));
    }

    #[test]
    fn calendar_days_are_signed() {
        assert_eq!(calendar_days_between(at(2024, 3, 4, 9), at(2024, 3, 7, 9)), 3.0);
        assert_eq!(calendar_days_between(at(2024, 3, 7, 9), at(2024, 3, 4, 9)), -3.0);
    }
}
