//! Grouping of events by local calendar date.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::event::Event;

/// Events keyed by the local date of their start, in start order within each day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventsByDate {
    buckets: BTreeMap<NaiveDate, Vec<Event>>,
}

impl EventsByDate {
    pub fn new(events: &[Event], tz: Tz) -> Self {
        let mut buckets: BTreeMap<NaiveDate, Vec<Event>> = BTreeMap::new();
        for event in events {
            let date = event.start.with_timezone(&tz).date_naive();
            buckets.entry(date).or_default().push(event.clone());
        }
        for day in buckets.values_mut() {
            day.sort_by_key(|e| (e.start, e.id));
        }
        EventsByDate { buckets }
    }

    /// Events starting on `date`, empty when there are none.
    pub fn on(&self, date: NaiveDate) -> &[Event] {
        self.buckets.get(&date).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn first(&self, date: NaiveDate) -> Option<&Event> {
        self.on(date).first()
    }

    pub fn dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.buckets.keys()
    }

    /// Flatten back into one start-ordered list.
    pub fn events(&self) -> Vec<Event> {
        self.buckets.values().flatten().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
