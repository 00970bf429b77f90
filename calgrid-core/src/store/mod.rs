//! The calendar store seam.
//!
//! A calendar store is the external table pair (calendars, events) that owns
//! persistence and recurrence. calgrid only talks to it through [`CalendarStore`],
//! exchanging loosely typed [`Row`]s the way a content provider does.

mod memory;
mod row;

pub use memory::{MemoryStore, Permissions};
pub use row::{Row, Value};

use async_trait::async_trait;
use thiserror::Error;

/// Column names shared by the store and the gateway.
pub mod columns {
    pub const ID: &str = "_id";
    pub const CALENDAR_DISPLAY_NAME: &str = "calendar_displayName";
    pub const ACCOUNT_NAME: &str = "account_name";
    pub const ACCOUNT_TYPE: &str = "account_type";
    pub const VISIBLE: &str = "visible";

    pub const TITLE: &str = "title";
    pub const DTSTART: &str = "dtstart";
    pub const DTEND: &str = "dtend";
    pub const DESCRIPTION: &str = "description";
    pub const CALENDAR_ID: &str = "calendar_id";
    pub const EVENT_TIMEZONE: &str = "eventTimezone";
    pub const RRULE: &str = "rrule";

    // Instances projection
    pub const EVENT_ID: &str = "event_id";
    pub const BEGIN: &str = "begin";
    pub const END: &str = "end";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Calendars,
    Events,
}

/// Read queries understood by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    Calendars { visible_only: bool },
    /// Event instances whose begin lies in `[begin, end)`, epoch milliseconds.
    Instances { begin: i64, end: i64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Permission denied")]
    PermissionDenied,

    #[error("Calendar store unavailable: {0}")]
    Unavailable(String),

    #[error("Could not persist calendar store: {0}")]
    Persist(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// An external calendar store.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// Run a read query. `Ok(None)` means the store produced no cursor.
    async fn query(&self, query: Query) -> StoreResult<Option<Vec<Row>>>;

    /// Insert a row, returning the new id or `None` when the store declined it.
    async fn insert(&self, table: Table, values: Row) -> StoreResult<Option<i64>>;

    /// Merge `values` into the row `id`, returning the number of affected rows.
    async fn update(&self, table: Table, id: i64, values: Row) -> StoreResult<usize>;

    /// Delete the row `id`, returning the number of affected rows.
    async fn delete(&self, table: Table, id: i64) -> StoreResult<usize>;
}
