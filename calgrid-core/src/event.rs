//! Calendar and event records.
//!
//! These are immutable snapshots mapped from store rows by the gateway.
//! Timestamps are kept in UTC; the display zone is only applied when
//! bucketing or rendering.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider-assigned calendar id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CalendarId(pub i64);

/// Provider-assigned event id. Valid ids are positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub i64);

impl fmt::Display for CalendarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One visible calendar source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarInfo {
    pub id: CalendarId,
    pub name: String,
    pub account_name: String,
    pub account_type: String,
}

/// The calendar an event belongs to, as reported alongside the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRef {
    pub id: CalendarId,
    pub name: String,
}

/// A single event instance.
///
/// For recurring events every occurrence is its own `Event` sharing the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub description: Option<String>,
    pub calendar: Option<CalendarRef>,
}

impl Event {
    pub fn new(id: EventId, title: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Event {
            id,
            title: title.into(),
            start,
            end,
            description: None,
            calendar: None,
        }
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    pub fn calendar_name(&self) -> Option<&str> {
        self.calendar.as_ref().map(|c| c.name.as_str())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Everything needed to create an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub calendar_id: CalendarId,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub description: Option<String>,
    /// RRULE value without the `RRULE:` prefix, e.g. `FREQ=WEEKLY;COUNT=4`
    pub rrule: Option<String>,
}

impl NewEvent {
    pub fn new(
        calendar_id: CalendarId,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        NewEvent {
            calendar_id,
            title: title.into(),
            start,
            end,
            description: None,
            rrule: None,
        }
    }
}
