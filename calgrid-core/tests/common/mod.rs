//! Store doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use calgrid_core::gateway::CalendarGateway;
use calgrid_core::store::{CalendarStore, MemoryStore, Query, Row, StoreResult, Table};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::sync::{Notify, Semaphore};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// A memory store with one calendar and a UTC gateway over it.
pub async fn memory_gateway() -> (Arc<MemoryStore>, CalendarGateway<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store.add_calendar("Personal", "me@example.com", "LOCAL").await.unwrap();
    let gateway = CalendarGateway::with_timezone(Arc::clone(&store), Tz::UTC);
    (store, gateway)
}

/// Answers every query with canned rows and accepts no writes.
#[derive(Debug, Default)]
pub struct ScriptedStore {
    pub calendars: Option<Vec<Row>>,
    pub instances: Option<Vec<Row>>,
    /// Id handed out for inserts.
    pub insert_id: Option<i64>,
}

#[async_trait]
impl CalendarStore for ScriptedStore {
    async fn query(&self, query: Query) -> StoreResult<Option<Vec<Row>>> {
        Ok(match query {
            Query::Calendars { .. } => self.calendars.clone(),
            Query::Instances { .. } => self.instances.clone(),
        })
    }

    async fn insert(&self, _table: Table, _values: Row) -> StoreResult<Option<i64>> {
        Ok(self.insert_id)
    }

    async fn update(&self, _table: Table, _id: i64, _values: Row) -> StoreResult<usize> {
        Ok(0)
    }

    async fn delete(&self, _table: Table, _id: i64) -> StoreResult<usize> {
        Ok(0)
    }
}

/// Wraps a memory store and holds instance queries until the gate opens.
#[derive(Debug)]
pub struct GatedStore {
    pub inner: MemoryStore,
    instance_queries: AtomicUsize,
    started: Notify,
    gate: Semaphore,
}

impl GatedStore {
    pub async fn new() -> Self {
        let inner = MemoryStore::new();
        inner.add_calendar("Personal", "me", "LOCAL").await.unwrap();
        GatedStore {
            inner,
            instance_queries: AtomicUsize::new(0),
            started: Notify::new(),
            gate: Semaphore::new(0),
        }
    }

    /// Wait until an instance query is blocked on the gate.
    pub async fn query_started(&self) {
        self.started.notified().await;
    }

    pub fn open(&self) {
        self.gate.add_permits(1000);
    }

    pub fn instance_queries(&self) -> usize {
        self.instance_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CalendarStore for GatedStore {
    async fn query(&self, query: Query) -> StoreResult<Option<Vec<Row>>> {
        if let Query::Instances { .. } = query {
            self.instance_queries.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }
        self.inner.query(query).await
    }

    async fn insert(&self, table: Table, values: Row) -> StoreResult<Option<i64>> {
        self.inner.insert(table, values).await
    }

    async fn update(&self, table: Table, id: i64, values: Row) -> StoreResult<usize> {
        self.inner.update(table, id, values).await
    }

    async fn delete(&self, table: Table, id: i64) -> StoreResult<usize> {
        self.inner.delete(table, id).await
    }
}
