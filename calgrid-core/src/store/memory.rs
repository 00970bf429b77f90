//! In-process calendar store.
//!
//! Holds the calendars and events tables in memory, enforces read/write
//! permissions, expands recurring events for the instances projection and can
//! snapshot itself to a JSON file after every write.
//!
//! Writes are applied to a copy of the tables. The copy only replaces the live
//! tables once its snapshot is on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::columns as col;
use super::{CalendarStore, Query, Row, StoreError, StoreResult, Table, Value};
use crate::recurrence::{self, Recurring};

/// Access the caller has been granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub read: bool,
    pub write: bool,
}

impl Permissions {
    pub const ALL: Permissions = Permissions { read: true, write: true };
    pub const NONE: Permissions = Permissions { read: false, write: false };
}

impl Default for Permissions {
    fn default() -> Self {
        Permissions::ALL
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Tables {
    #[serde(default)]
    permissions: Permissions,
    /// The user already answered the access prompt and refused.
    #[serde(default)]
    prompt_refused: bool,
    #[serde(default)]
    calendars: BTreeMap<i64, Row>,
    #[serde(default)]
    events: BTreeMap<i64, Row>,
    #[serde(default)]
    last_calendar_id: i64,
    #[serde(default)]
    last_event_id: i64,
}

impl Tables {
    fn table_mut(&mut self, table: Table) -> &mut BTreeMap<i64, Row> {
        match table {
            Table::Calendars => &mut self.calendars,
            Table::Events => &mut self.events,
        }
    }

    fn next_id(&mut self, table: Table) -> i64 {
        let last = match table {
            Table::Calendars => &mut self.last_calendar_id,
            Table::Events => &mut self.last_event_id,
        };
        *last += 1;
        *last
    }

    fn calendar_visible(&self, id: i64) -> bool {
        self.calendars
            .get(&id)
            .is_some_and(|c| c.flag(col::VISIBLE).unwrap_or(true))
    }

    fn require_write(&self) -> StoreResult<()> {
        if self.permissions.write {
            Ok(())
        } else {
            Err(StoreError::PermissionDenied)
        }
    }
}

#[derive(Debug)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    /// Serializes writers so a commit never overwrites a concurrent one.
    writer: tokio::sync::Mutex<()>,
    available: Mutex<bool>,
    path: Option<PathBuf>,
}

impl MemoryStore {
    /// An empty store that lives only in memory.
    pub fn new() -> Self {
        MemoryStore::with_tables(Tables::default(), None)
    }

    /// Open a store persisted at `path`, starting empty if the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        let tables = tokio::task::spawn_blocking({
            let path = path.clone();
            move || read_snapshot(&path)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("Task join error: {e}")))??;

        Ok(MemoryStore::with_tables(tables, Some(path)))
    }

    fn with_tables(tables: Tables, path: Option<PathBuf>) -> Self {
        MemoryStore {
            tables: Mutex::new(tables),
            writer: tokio::sync::Mutex::new(()),
            available: Mutex::new(true),
            path,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Add a visible calendar directly, bypassing permissions.
    pub async fn add_calendar(
        &self,
        name: &str,
        account_name: &str,
        account_type: &str,
    ) -> StoreResult<i64> {
        let row = Row::new()
            .with(col::CALENDAR_DISPLAY_NAME, name)
            .with(col::ACCOUNT_NAME, account_name)
            .with(col::ACCOUNT_TYPE, account_type)
            .with(col::VISIBLE, true);

        let id = self
            .commit(move |tables| {
                let id = tables.next_id(Table::Calendars);
                tables.calendars.insert(id, row.with(col::ID, id));
                Ok(Some(id))
            })
            .await?;
        Ok(id.unwrap_or_default())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.lock()?.calendars.is_empty())
    }

    pub fn permissions(&self) -> StoreResult<Permissions> {
        Ok(self.lock()?.permissions)
    }

    /// Grant or revoke access, as the platform would on a permission prompt.
    ///
    /// Clears a remembered prompt refusal, so the next denial asks again.
    pub async fn set_permissions(&self, permissions: Permissions) -> StoreResult<()> {
        self.commit(move |tables| {
            tables.permissions = permissions;
            tables.prompt_refused = false;
            Ok(Some(()))
        })
        .await?;
        Ok(())
    }

    /// Whether the user refused the access prompt since access was last changed.
    pub fn prompt_refused(&self) -> StoreResult<bool> {
        Ok(self.lock()?.prompt_refused)
    }

    pub async fn refuse_prompt(&self) -> StoreResult<()> {
        self.commit(|tables| {
            tables.prompt_refused = true;
            Ok(Some(()))
        })
        .await?;
        Ok(())
    }

    /// Simulate the provider going away: reads yield no cursor and inserts are declined.
    pub fn set_available(&self, available: bool) {
        match self.available.lock() {
            Ok(mut flag) => *flag = available,
            Err(poisoned) => *poisoned.into_inner() = available,
        }
    }

    fn is_available(&self) -> bool {
        self.available.lock().map(|flag| *flag).unwrap_or(false)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }

    /// Apply `change` to a copy of the tables, persist the copy and make it live.
    ///
    /// `change` returns `None` when it left the tables untouched; nothing is written then.
    async fn commit<T, F>(&self, change: F) -> StoreResult<Option<T>>
    where
        T: Send,
        F: FnOnce(&mut Tables) -> StoreResult<Option<T>> + Send,
    {
        let _writer = self.writer.lock().await;

        let mut next = self.lock()?.clone();
        let Some(value) = change(&mut next)? else {
            return Ok(None);
        };

        self.persist(&next).await?;
        *self.lock()? = next;

        Ok(Some(value))
    }

    async fn persist(&self, tables: &Tables) -> StoreResult<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };

        let content =
            serde_json::to_string_pretty(tables).map_err(|e| StoreError::Persist(e.to_string()))?;

        tokio::task::spawn_blocking(move || write_snapshot(&path, &content))
            .await
            .map_err(|e| StoreError::Persist(format!("Task join error: {e}")))?
    }

    fn calendar_rows(tables: &Tables, visible_only: bool) -> Vec<Row> {
        tables
            .calendars
            .values()
            .filter(|row| !visible_only || row.flag(col::VISIBLE).unwrap_or(true))
            .cloned()
            .collect()
    }

    fn instance_rows(tables: &Tables, begin: i64, end: i64) -> Vec<Row> {
        let mut instances: Vec<(i64, i64, Row)> = Vec::new();

        for (id, event) in &tables.events {
            let calendar_id = event.int(col::CALENDAR_ID).unwrap_or_default();
            if !tables.calendar_visible(calendar_id) {
                continue;
            }

            let Some(dtstart) = event.int(col::DTSTART) else {
                continue;
            };
            let dtend = event.int(col::DTEND).unwrap_or(dtstart);

            let occurrences = match event.text(col::RRULE) {
                Some(rule) => {
                    let tz = event
                        .text(col::EVENT_TIMEZONE)
                        .and_then(|name| name.parse::<Tz>().ok())
                        .unwrap_or(Tz::UTC);
                    let recurring = Recurring { dtstart, dtend, rrule: rule, tz };
                    match recurrence::expand(recurring, begin, end) {
                        Ok(occurrences) => occurrences,
                        Err(e) => {
                            warn!(event_id = id, "Skipping recurring event: {e}");
                            continue;
                        }
                    }
                }
                None if dtstart >= begin && dtstart < end => vec![(dtstart, dtend)],
                None => continue,
            };

            let calendar_name = tables
                .calendars
                .get(&calendar_id)
                .and_then(|c| c.text(col::CALENDAR_DISPLAY_NAME))
                .unwrap_or_default()
                .to_string();

            for (instance_begin, instance_end) in occurrences {
                let row = Row::new()
                    .with(col::EVENT_ID, *id)
                    .with(col::TITLE, event.get(col::TITLE).cloned().unwrap_or(Value::Null))
                    .with(col::BEGIN, instance_begin)
                    .with(col::END, instance_end)
                    .with(
                        col::DESCRIPTION,
                        event.get(col::DESCRIPTION).cloned().unwrap_or(Value::Null),
                    )
                    .with(col::CALENDAR_ID, calendar_id)
                    .with(col::CALENDAR_DISPLAY_NAME, calendar_name.as_str());
                instances.push((instance_begin, *id, row));
            }
        }

        instances.sort_by_key(|(begin, id, _)| (*begin, *id));
        instances.into_iter().map(|(_, _, row)| row).collect()
    }

    fn validate_event(tables: &Tables, values: &Row) -> Result<(), &'static str> {
        let calendar_id = values.int(col::CALENDAR_ID).ok_or(col::CALENDAR_ID)?;
        if !tables.calendars.contains_key(&calendar_id) {
            return Err(col::CALENDAR_ID);
        }
        values.int(col::DTSTART).ok_or(col::DTSTART)?;
        values
            .text(col::EVENT_TIMEZONE)
            .and_then(|name| name.parse::<Tz>().ok())
            .ok_or(col::EVENT_TIMEZONE)?;
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

#[async_trait]
impl CalendarStore for MemoryStore {
    async fn query(&self, query: Query) -> StoreResult<Option<Vec<Row>>> {
        if !self.is_available() {
            return Ok(None);
        }

        let tables = self.lock()?;
        if !tables.permissions.read {
            return Err(StoreError::PermissionDenied);
        }

        let rows = match query {
            Query::Calendars { visible_only } => Self::calendar_rows(&tables, visible_only),
            Query::Instances { begin, end } => Self::instance_rows(&tables, begin, end),
        };
        debug!(?query, rows = rows.len(), "Store query");

        Ok(Some(rows))
    }

    async fn insert(&self, table: Table, mut values: Row) -> StoreResult<Option<i64>> {
        if !self.is_available() {
            return Ok(None);
        }

        self.commit(move |tables| {
            tables.require_write()?;

            if table == Table::Events {
                if let Err(column) = Self::validate_event(tables, &values) {
                    debug!(column, "Store declined event insert");
                    return Ok(None);
                }
            }

            let id = tables.next_id(table);
            values.set(col::ID, id);
            tables.table_mut(table).insert(id, values);
            Ok(Some(id))
        })
        .await
    }

    async fn update(&self, table: Table, id: i64, mut values: Row) -> StoreResult<usize> {
        let updated = self
            .commit(move |tables| {
                tables.require_write()?;

                let Some(row) = tables.table_mut(table).get_mut(&id) else {
                    return Ok(None);
                };
                // The id column is not writable
                values.set(col::ID, id);
                row.merge(values);
                Ok(Some(1))
            })
            .await?;

        Ok(updated.unwrap_or(0))
    }

    async fn delete(&self, table: Table, id: i64) -> StoreResult<usize> {
        let deleted = self
            .commit(move |tables| {
                tables.require_write()?;

                if tables.table_mut(table).remove(&id).is_none() {
                    return Ok(None);
                }
                if table == Table::Calendars {
                    tables
                        .events
                        .retain(|_, event| event.int(col::CALENDAR_ID) != Some(id));
                }
                Ok(Some(1))
            })
            .await?;

        Ok(deleted.unwrap_or(0))
    }
}

fn read_snapshot(path: &Path) -> StoreResult<Tables> {
    if !path.exists() {
        return Ok(Tables::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| StoreError::Unavailable(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| StoreError::Unavailable(format!("{}: {e}", path.display())))
}

fn write_snapshot(path: &Path, content: &str) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Persist(e.to_string()))?;
    }
    std::fs::write(path, content).map_err(|e| StoreError::Persist(e.to_string()))
}
