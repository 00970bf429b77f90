//! RRULE expansion for recurring events.
//!
//! Expands a recurring event into the begin/end pairs of its instances within a range.
//! The rule is evaluated in the event's own zone so wall-clock times survive DST changes.

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;
use tracing::warn;

/// Upper bound on generated instances per event and query.
const MAX_INSTANCES: u16 = 1000;

/// A recurring event as stored.
#[derive(Debug, Clone, Copy)]
pub struct Recurring<'a> {
    pub dtstart: i64,
    pub dtend: i64,
    pub rrule: &'a str,
    pub tz: Tz,
}

/// Build an iCalendar-format rule string for the rrule crate parser.
fn build_rrule_string(start: DateTime<Utc>, rrule: &str, tz: Tz) -> String {
    let dtstart = if tz == Tz::UTC {
        format!("DTSTART:{}", start.format("%Y%m%dT%H%M%SZ"))
    } else {
        format!(
            "DTSTART;TZID={}:{}",
            tz.name(),
            start.with_timezone(&tz).format("%Y%m%dT%H%M%S")
        )
    };

    let rule = rrule.strip_prefix("RRULE:").unwrap_or(rrule);
    format!("{dtstart}\nRRULE:{rule}")
}

/// Expand `event` into `(begin, end)` instance pairs (epoch ms) whose begin lies in `[begin, end)`.
pub fn expand(event: Recurring<'_>, begin: i64, end: i64) -> Result<Vec<(i64, i64)>, String> {
    let start = Utc
        .timestamp_millis_opt(event.dtstart)
        .single()
        .ok_or_else(|| format!("invalid dtstart {}", event.dtstart))?;
    let (Some(range_start), Some(range_end)) = (
        Utc.timestamp_millis_opt(begin).single(),
        Utc.timestamp_millis_opt(end).single(),
    ) else {
        return Err(format!("invalid range [{begin}, {end})"));
    };

    let rrule_set: RRuleSet = build_rrule_string(start, event.rrule, event.tz)
        .parse()
        .map_err(|e| format!("Failed to parse RRULE '{}': {}", event.rrule, e))?;

    // Widen the window by a second on both sides; exact bounds are applied below.
    let tz: rrule::Tz = Utc.into();
    let after = (range_start - Duration::seconds(1)).with_timezone(&tz);
    let before = (range_end + Duration::seconds(1)).with_timezone(&tz);

    let result = rrule_set.after(after).before(before).all(MAX_INSTANCES);
    if result.dates.len() >= usize::from(MAX_INSTANCES) {
        warn!(
            rrule = event.rrule,
            limit = MAX_INSTANCES,
            "Recurring event has too many instances in range, listing only the first ones"
        );
    }
    let duration = event.dtend.saturating_sub(event.dtstart).max(0);

    let instances = result
        .dates
        .iter()
        .map(|occ| occ.timestamp_millis())
        .filter(|b| *b >= begin && *b < end)
        .map(|b| (b, b + duration))
        .collect();

    Ok(instances)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap().timestamp_millis()
    }

    #[test]
    fn test_daily_rule_expands_within_range() {
        let event = Recurring {
            dtstart: ms(2024, 6, 3, 9, 0),
            dtend: ms(2024, 6, 3, 9, 30),
            rrule: "FREQ=DAILY;COUNT=10",
            tz: Tz::UTC,
        };

        let instances = expand(event, ms(2024, 6, 5, 0, 0), ms(2024, 6, 7, 0, 0)).unwrap();
        assert_eq!(
            instances,
            vec![
                (ms(2024, 6, 5, 9, 0), ms(2024, 6, 5, 9, 30)),
                (ms(2024, 6, 6, 9, 0), ms(2024, 6, 6, 9, 30)),
            ]
        );
    }

    #[test]
    fn test_range_end_is_exclusive() {
        let event = Recurring {
            dtstart: ms(2024, 6, 3, 0, 0),
            dtend: ms(2024, 6, 3, 1, 0),
            rrule: "RRULE:FREQ=DAILY;COUNT=5",
            tz: Tz::UTC,
        };

        let instances = expand(event, ms(2024, 6, 3, 0, 0), ms(2024, 6, 5, 0, 0)).unwrap();
        assert_eq!(instances.len(), 2);
    }

    #[test]
    fn test_weekly_rule_keeps_local_wall_clock_across_dst() {
        // 09:00 in Berlin is 07:00 UTC in summer and 08:00 UTC in winter
        let tz = chrono_tz::Europe::Berlin;
        let start = tz.with_ymd_and_hms(2024, 10, 21, 9, 0, 0).unwrap().with_timezone(&Utc);
        let event = Recurring {
            dtstart: start.timestamp_millis(),
            dtend: start.timestamp_millis() + 3_600_000,
            rrule: "FREQ=WEEKLY;COUNT=2",
            tz,
        };

        let instances = expand(event, ms(2024, 10, 1, 0, 0), ms(2024, 11, 30, 0, 0)).unwrap();
        assert_eq!(instances[0].0, ms(2024, 10, 21, 7, 0));
        assert_eq!(instances[1].0, ms(2024, 10, 28, 8, 0));
    }

    #[test]
    fn test_dense_rule_is_capped() {
        let event = Recurring {
            dtstart: ms(2024, 6, 1, 0, 0),
            dtend: ms(2024, 6, 1, 0, 1),
            rrule: "FREQ=MINUTELY",
            tz: Tz::UTC,
        };

        let instances = expand(event, ms(2024, 6, 1, 0, 0), ms(2024, 6, 2, 0, 0)).unwrap();
        assert_eq!(instances.len(), usize::from(MAX_INSTANCES));
        assert_eq!(instances[0].0, ms(2024, 6, 1, 0, 0));
    }

    #[test]
    fn test_invalid_rule_is_an_error() {
        let event = Recurring {
            dtstart: ms(2024, 6, 3, 9, 0),
            dtend: ms(2024, 6, 3, 10, 0),
            rrule: "FREQ=SOMETIMES",
            tz: Tz::UTC,
        };

        assert!(expand(event, ms(2024, 6, 1, 0, 0), ms(2024, 7, 1, 0, 0)).is_err());
    }
}
