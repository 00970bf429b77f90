//! Typed access to a calendar store.
//!
//! The gateway issues read queries and write commands against a [`CalendarStore`]
//! and maps the raw rows it gets back into [`CalendarInfo`] and [`Event`] records.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::config::local_timezone;
use crate::date_range::TimeRange;
use crate::error::{GatewayError, GatewayResult, WriteOp};
use crate::event::{CalendarId, CalendarInfo, CalendarRef, Event, EventId, NewEvent};
use crate::store::columns as col;
use crate::store::{CalendarStore, Query, Row, Table, Value};

pub struct CalendarGateway<S: ?Sized> {
    store: Arc<S>,
    timezone: Tz,
}

impl<S: ?Sized> Clone for CalendarGateway<S> {
    fn clone(&self) -> Self {
        CalendarGateway {
            store: Arc::clone(&self.store),
            timezone: self.timezone,
        }
    }
}

impl<S: CalendarStore + ?Sized> CalendarGateway<S> {
    /// A gateway that tags new events with the device time zone.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_timezone(store, local_timezone())
    }

    pub fn with_timezone(store: Arc<S>, timezone: Tz) -> Self {
        CalendarGateway { store, timezone }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// All visible calendars.
    pub async fn list_calendars(&self) -> GatewayResult<Vec<CalendarInfo>> {
        let Some(rows) = self.store.query(Query::Calendars { visible_only: true }).await? else {
            debug!("Calendar query returned no cursor");
            return Ok(Vec::new());
        };

        Ok(map_rows(rows, calendar_from_row))
    }

    /// Event instances whose start lies in `range`, ordered by start.
    pub async fn list_events(&self, range: TimeRange) -> GatewayResult<Vec<Event>> {
        let query = Query::Instances {
            begin: range.start_millis(),
            end: range.end_millis(),
        };
        let Some(rows) = self.store.query(query).await? else {
            debug!("Instances query returned no cursor");
            return Ok(Vec::new());
        };

        let mut events = map_rows(rows, event_from_row);
        // Guard against stores that match on overlap instead of start
        events.retain(|e| range.contains(e.start));
        events.sort_by_key(|e| (e.start, e.id));
        Ok(events)
    }

    /// Insert a plain event, returning its new id.
    pub async fn insert_event(
        &self,
        calendar_id: CalendarId,
        title: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> GatewayResult<EventId> {
        self.insert(NewEvent::new(calendar_id, title, start, end)).await
    }

    pub async fn insert(&self, event: NewEvent) -> GatewayResult<EventId> {
        let values = Row::new()
            .with(col::CALENDAR_ID, event.calendar_id.0)
            .with(col::TITLE, event.title.as_str())
            .with(col::DTSTART, event.start.timestamp_millis())
            .with(col::DTEND, event.end.timestamp_millis())
            .with(col::DESCRIPTION, event.description)
            .with(col::EVENT_TIMEZONE, self.timezone.name())
            .with(col::RRULE, event.rrule);

        match self.store.insert(Table::Events, values).await? {
            Some(id) if id > 0 => {
                debug!(id, title = %event.title, "Inserted event");
                Ok(EventId(id))
            }
            other => {
                warn!(?other, title = %event.title, "Calendar store declined insert");
                Err(GatewayError::WriteRejected(WriteOp::Insert))
            }
        }
    }

    /// Change only the title of event `id`.
    pub async fn update_event(&self, id: EventId, title: &str) -> GatewayResult<()> {
        let values = Row::new().with(col::TITLE, title);
        let affected = self.store.update(Table::Events, id.0, values).await?;
        if affected == 0 {
            warn!(%id, "Calendar store rejected update");
            return Err(GatewayError::WriteRejected(WriteOp::Update));
        }
        debug!(%id, title, "Updated event title");
        Ok(())
    }

    pub async fn delete_event(&self, id: EventId) -> GatewayResult<()> {
        let affected = self.store.delete(Table::Events, id.0).await?;
        if affected == 0 {
            warn!(%id, "Calendar store rejected delete");
            return Err(GatewayError::WriteRejected(WriteOp::Delete));
        }
        debug!(%id, "Deleted event");
        Ok(())
    }
}

/// Map every row, dropping the ones that fail.
fn map_rows<T>(rows: Vec<Row>, map: fn(&Row) -> GatewayResult<T>) -> Vec<T> {
    rows.iter()
        .filter_map(|row| match map(row) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping row: {e}");
                None
            }
        })
        .collect()
}

fn malformed(column: &str) -> GatewayError {
    GatewayError::MalformedRow {
        column: column.to_string(),
    }
}

fn require_int(row: &Row, column: &str) -> GatewayResult<i64> {
    row.int(column).ok_or_else(|| malformed(column))
}

fn require_millis(row: &Row, column: &str) -> GatewayResult<DateTime<Utc>> {
    let millis = require_int(row, column)?;
    DateTime::from_timestamp_millis(millis).ok_or_else(|| malformed(column))
}

/// Text column that must be present but may be null.
fn nullable_text(row: &Row, column: &str) -> GatewayResult<String> {
    match row.get(column) {
        Some(Value::Text(s)) => Ok(s.clone()),
        Some(Value::Null) => Ok(String::new()),
        _ => Err(malformed(column)),
    }
}

fn calendar_from_row(row: &Row) -> GatewayResult<CalendarInfo> {
    Ok(CalendarInfo {
        id: CalendarId(require_int(row, col::ID)?),
        name: nullable_text(row, col::CALENDAR_DISPLAY_NAME)?,
        account_name: row.text(col::ACCOUNT_NAME).unwrap_or_default().to_string(),
        account_type: row.text(col::ACCOUNT_TYPE).unwrap_or_default().to_string(),
    })
}

fn event_from_row(row: &Row) -> GatewayResult<Event> {
    let start = require_millis(row, col::BEGIN)?;
    let end = match row.int(col::END) {
        Some(_) => require_millis(row, col::END)?,
        None => start,
    };

    let calendar = row.int(col::CALENDAR_ID).map(|id| CalendarRef {
        id: CalendarId(id),
        name: row
            .text(col::CALENDAR_DISPLAY_NAME)
            .unwrap_or_default()
            .to_string(),
    });

    Ok(Event {
        id: EventId(require_int(row, col::EVENT_ID)?),
        title: nullable_text(row, col::TITLE)?,
        start,
        end,
        description: row.text(col::DESCRIPTION).map(str::to_string),
        calendar,
    })
}
