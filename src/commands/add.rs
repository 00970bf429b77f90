use anyhow::{Context, Result};
use calgrid_core::config::{CalgridConfig, parse_duration};
use calgrid_core::date_range::{parse_date, start_of_day};
use calgrid_core::CalendarId;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use owo_colors::OwoColorize;

use crate::render::{Render, render_day};
use crate::session::Session;

/// Arguments of `calgrid add`.
pub struct AddRequest {
    pub title: String,
    pub date: Option<String>,
    pub at: Option<String>,
    pub duration: Option<String>,
    pub calendar: Option<i64>,
}

pub async fn run(config: &CalgridConfig, request: AddRequest) -> Result<()> {
    let date = request.date.as_deref().map(parse_date).transpose()?;
    let at = request.at.as_deref().map(parse_time).transpose()?;
    let duration = match request.duration.as_deref() {
        Some(input) => parse_duration(input)?,
        None => config.event_duration()?,
    };
    let calendar = request.calendar.map(CalendarId);

    let mut session = Session::open(config).await?;
    let tz = session.screen.settings().timezone;
    let date = date.unwrap_or_else(|| session.screen.selected());
    let start = local_start(&tz, date, at);

    session.select(date).await?;

    let mut outcome = session
        .screen
        .add_event_at(&request.title, start, duration, calendar)
        .await;
    if session.should_retry(outcome.as_ref()).await? {
        outcome = session
            .screen
            .add_event_at(&request.title, start, duration, calendar)
            .await;
        session.settle().await?;
    }

    match outcome {
        Some(outcome) if outcome.is_success() => {
            println!("{}", outcome.render());
            println!();
            println!("{}", render_day(date, &session.screen.day_list(), &tz));
        }
        Some(_) => {}
        None if request.title.trim().is_empty() => {
            println!("{}", "Title cannot be empty".yellow());
        }
        None => {}
    }

    Ok(())
}

/// Parse HH:MM
fn parse_time(input: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(input, "%H:%M")
        .with_context(|| format!("Invalid time '{input}'. Expected HH:MM"))
}

/// The instant of `at` on `date` in `tz`, or the start of the day.
fn local_start(tz: &Tz, date: NaiveDate, at: Option<NaiveTime>) -> DateTime<Utc> {
    at.and_then(|time| tz.from_local_datetime(&date.and_time(time)).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| start_of_day(tz, date))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_start_applies_zone() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();

        let start = local_start(&chrono_tz::Europe::Berlin, date, Some(nine));
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 3, 7, 0, 0).unwrap());

        let midnight = local_start(&Tz::UTC, date, None);
        assert_eq!(midnight, Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_time() {
        assert!(parse_time("09:30").is_ok());
        assert!(parse_time("9.30").is_err());
    }
}
