//! Month grid layout.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::date_range::first_of_month;

pub const GRID_ROWS: usize = 6;
pub const GRID_COLS: usize = 7;
pub const GRID_LENGTH: usize = GRID_ROWS * GRID_COLS;

/// First column of the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    pub fn weekday(self) -> Weekday {
        match self {
            WeekStart::Sunday => Weekday::Sun,
            WeekStart::Monday => Weekday::Mon,
        }
    }

    /// Weekdays in column order.
    pub fn columns(self) -> [Weekday; GRID_COLS] {
        let mut day = self.weekday();
        std::array::from_fn(|_| {
            let current = day;
            day = day.succ();
            current
        })
    }
}

impl fmt::Display for WeekStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeekStart::Sunday => write!(f, "sunday"),
            WeekStart::Monday => write!(f, "monday"),
        }
    }
}

impl FromStr for WeekStart {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sunday" | "sun" => Ok(WeekStart::Sunday),
            "monday" | "mon" => Ok(WeekStart::Monday),
            other => Err(format!("Unknown week start '{other}'. Expected sunday or monday")),
        }
    }
}

/// The 6x7 block of dates shown for one month, padded with days of the
/// neighbouring months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthGrid {
    start: NaiveDate,
    month: NaiveDate,
    week_start: WeekStart,
}

impl MonthGrid {
    pub fn new(date: NaiveDate, week_start: WeekStart) -> Self {
        let month = first_of_month(date);
        MonthGrid {
            start: Self::start_grid_date(month, week_start),
            month,
            week_start,
        }
    }

    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.start + Days::new(GRID_LENGTH as u64 - 1)
    }

    /// First day of the month this grid shows.
    pub const fn month(&self) -> NaiveDate {
        self.month
    }

    pub const fn week_start(&self) -> WeekStart {
        self.week_start
    }

    pub fn date(&self, idx: usize) -> NaiveDate {
        self.start + Days::new(idx.min(GRID_LENGTH - 1) as u64)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(GRID_LENGTH)
    }

    pub fn row(&self, row_idx: usize) -> [NaiveDate; GRID_COLS] {
        let first = self.date(row_idx.min(GRID_ROWS - 1) * GRID_COLS);
        std::array::from_fn(|i| first + Days::new(i as u64))
    }

    pub fn rows(&self) -> impl Iterator<Item = [NaiveDate; GRID_COLS]> + '_ {
        (0..GRID_ROWS).map(|r| self.row(r))
    }

    /// Grid index of `date`, `None` when it falls outside the grid.
    pub fn idx(&self, date: NaiveDate) -> Option<usize> {
        let days = (date - self.start).num_days();
        usize::try_from(days).ok().filter(|idx| *idx < GRID_LENGTH)
    }

    pub fn row_idx(&self, date: NaiveDate) -> Option<usize> {
        self.idx(date).map(|idx| idx / GRID_COLS)
    }

    pub fn col_idx(&self, date: NaiveDate) -> Option<usize> {
        self.idx(date).map(|idx| idx % GRID_COLS)
    }

    pub fn in_month(&self, date: NaiveDate) -> bool {
        first_of_month(date) == self.month
    }

    pub fn next_month(&self) -> MonthGrid {
        MonthGrid::new(self.month + Months::new(1), self.week_start)
    }

    pub fn prev_month(&self) -> MonthGrid {
        MonthGrid::new(self.month - Months::new(1), self.week_start)
    }

    fn start_grid_date(month: NaiveDate, week_start: WeekStart) -> NaiveDate {
        let first = month.weekday().num_days_from_sunday();
        let column0 = week_start.weekday().num_days_from_sunday();
        month - Days::new(u64::from((7 + first - column0) % 7))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_sunday_grid_for_june_2024() {
        // June 1st 2024 is a Saturday
        let grid = MonthGrid::new(date(2024, 6, 17), WeekStart::Sunday);

        assert_eq!(grid.start(), date(2024, 5, 26));
        assert_eq!(grid.end(), date(2024, 7, 6));
        assert_eq!(grid.idx(date(2024, 6, 3)), Some(8));
        assert_eq!(grid.row_idx(date(2024, 6, 3)), Some(1));
        assert_eq!(grid.col_idx(date(2024, 6, 3)), Some(1));
    }

    #[test]
    fn test_monday_grid() {
        let grid = MonthGrid::new(date(2024, 6, 1), WeekStart::Monday);
        assert_eq!(grid.start(), date(2024, 5, 27));
        assert_eq!(grid.row(0)[0].weekday(), Weekday::Mon);
    }

    #[test]
    fn test_month_starting_on_week_start_has_no_leading_padding() {
        // September 1st 2024 is a Sunday
        let grid = MonthGrid::new(date(2024, 9, 10), WeekStart::Sunday);
        assert_eq!(grid.start(), date(2024, 9, 1));
    }

    #[test]
    fn test_dates_outside_grid() {
        let grid = MonthGrid::new(date(2024, 6, 1), WeekStart::Sunday);
        assert_eq!(grid.idx(date(2024, 5, 25)), None);
        assert_eq!(grid.idx(date(2024, 7, 7)), None);
        assert!(grid.in_month(date(2024, 6, 30)));
        assert!(!grid.in_month(date(2024, 7, 1)));
    }

    #[test]
    fn test_month_navigation_over_year_boundary() {
        let grid = MonthGrid::new(date(2024, 12, 31), WeekStart::Sunday);
        assert_eq!(grid.next_month().month(), date(2025, 1, 1));
        assert_eq!(grid.prev_month().month(), date(2024, 11, 1));
        assert_eq!(grid.dates().count(), GRID_LENGTH);
        assert_eq!(grid.rows().count(), GRID_ROWS);
    }

    #[test]
    fn test_week_start_parsing() {
        assert_eq!("Monday".parse::<WeekStart>(), Ok(WeekStart::Monday));
        assert!("friday".parse::<WeekStart>().is_err());
        assert_eq!(WeekStart::Monday.columns()[6], Weekday::Sun);
    }
}
