//! Closed calendar-date windows.

use std::fmt;

use chrono::{Duration, NaiveDate};

use crate::error::AppError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive range of calendar dates, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AppError> {
        if start > end {
            return Err(AppError::InvalidWindow(format!(
                "start {start} is after end {end}."
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse a window from two `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, AppError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered (always >= 1).
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn contains_window(&self, other: &DateWindow) -> bool {
        self.contains(other.start) && self.contains(other.end)
    }

    /// Day offsets of `other` relative to this window's start.
    pub fn offsets_of(&self, other: &DateWindow) -> (i64, i64) {
        (
            (other.start - self.start).num_days(),
            (other.end - self.start).num_days(),
        )
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let start = self.start;
        (0..self.num_days()).map(move |i| start + Duration::days(i))
    }

    /// Split into consecutive sub-windows of at most `max_days` days each.
    pub fn split(&self, max_days: i64) -> Vec<DateWindow> {
        let max_days = max_days.max(1);
        let mut out = Vec::new();
        let mut cursor = self.start;
        while cursor <= self.end {
            let chunk_end = (cursor + Duration::days(max_days - 1)).min(self.end);
            out.push(DateWindow {
                start: cursor,
                end: chunk_end,
            });
            cursor = chunk_end + Duration::days(1);
        }
        out
    }

    /// Same window with the end moved back to `limit` when it runs past it.
    pub fn clamp_end(&self, limit: NaiveDate) -> Option<DateWindow> {
        let end = self.end.min(limit);
        DateWindow::new(self.start, end).ok()
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|e| AppError::InvalidWindow(format!("invalid date '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn rejects_reversed_windows() {
        assert!(matches!(
            DateWindow::parse("2022-04-28", "2022-04-24"),
            Err(AppError::InvalidWindow(_))
        ));
        assert!(DateWindow::parse("2022-13-01", "2022-04-24").is_err());
    }

    #[test]
    fn counts_days_inclusively() {
        let w = DateWindow::parse("2022-04-24", "2022-04-28").unwrap();
        assert_eq!(w.num_days(), 5);
        assert_eq!(w.days().count(), 5);
        assert_eq!(DateWindow::single_day(d(2022, 4, 24)).num_days(), 1);
    }

    #[test]
    fn offsets_are_day_differences_from_start() {
        let synthetic = DateWindow::parse("2022-03-01", "2022-06-17").unwrap();
        let request = DateWindow::parse("2022-04-24", "2022-04-28").unwrap();
        assert_eq!(synthetic.offsets_of(&request), (54, 58));
        assert!(synthetic.contains_window(&request));
    }

    #[test]
    fn split_covers_window_without_gaps() {
        let w = DateWindow::parse("2022-04-01", "2022-04-20").unwrap();
        let parts = w.split(7);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], DateWindow::new(d(2022, 4, 1), d(2022, 4, 7)).unwrap());
        assert_eq!(parts[1].start(), d(2022, 4, 8));
        assert_eq!(parts[2], DateWindow::new(d(2022, 4, 15), d(2022, 4, 20)).unwrap());
        let total: i64 = parts.iter().map(DateWindow::num_days).sum();
        assert_eq!(total, w.num_days());
    }

    #[test]
    fn split_by_one_day_yields_each_day() {
        let w = DateWindow::parse("2022-04-24", "2022-04-26").unwrap();
        let parts = w.split(1);
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.num_days() == 1));
    }

    #[test]
    fn clamp_end_drops_future_days() {
        let w = DateWindow::parse("2022-04-24", "2022-05-10").unwrap();
        assert_eq!(w.clamp_end(d(2022, 4, 30)).unwrap().end(), d(2022, 4, 30));
        assert!(w.clamp_end(d(2022, 4, 1)).is_none());
    }
}
