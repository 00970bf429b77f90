//! Half-open time ranges used for event queries.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{CalgridError, CalgridResult};

/// A half-open range `[start, end)` of UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Build a range, rejecting empty or inverted ones.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> CalgridResult<Self> {
        if start >= end {
            return Err(CalgridError::TimeRange(format!(
                "start {} is not before end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(TimeRange { start, end })
    }

    /// The local day `date` in `tz`, from its midnight to the next one.
    pub fn day(tz: &Tz, date: NaiveDate) -> Self {
        let next = date + Days::new(1);
        TimeRange {
            start: start_of_day(tz, date),
            end: start_of_day(tz, next),
        }
    }

    /// The local calendar month containing `date` in `tz`.
    pub fn month(tz: &Tz, date: NaiveDate) -> Self {
        let first = first_of_month(date);
        let next = first + Months::new(1);
        TimeRange {
            start: start_of_day(tz, first),
            end: start_of_day(tz, next),
        }
    }

    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn start_millis(&self) -> i64 {
        self.start.timestamp_millis()
    }

    pub fn end_millis(&self) -> i64 {
        self.end.timestamp_millis()
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// First instant of `date` in `tz`.
///
/// Zones that skip midnight on DST changes start the day at the first valid local time.
pub fn start_of_day(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => (1..=24)
            .filter_map(|h| {
                tz.from_local_datetime(&(midnight + chrono::Duration::minutes(30 * h)))
                    .earliest()
            })
            .next()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| midnight.and_utc()),
    }
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// Parse YYYY-MM-DD
pub fn parse_date(s: &str) -> CalgridResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
        CalgridError::TimeRange(format!("Invalid date format '{}'. Expected YYYY-MM-DD", s))
    })
}

/// Parse YYYY-MM into the first day of that month
pub fn parse_month(s: &str) -> CalgridResult<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d").map_err(|_| {
        CalgridError::TimeRange(format!("Invalid month format '{}'. Expected YYYY-MM", s))
    })
}
