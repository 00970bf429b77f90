//! End-to-end behaviour of the gateway and the month screen over the memory store.

mod common;

use std::sync::Arc;

use calgrid_core::date_range::TimeRange;
use calgrid_core::error::GatewayError;
use calgrid_core::gateway::CalendarGateway;
use calgrid_core::screen::{CalendarScreen, ScreenSettings};
use calgrid_core::state::{CalendarState, WriteOutcome};
use calgrid_core::store::MemoryStore;
use calgrid_core::{CalendarId, Event, NewEvent};
use chrono::Duration;
use chrono_tz::Tz;

use common::{at, date, memory_gateway};

#[tokio::test]
async fn test_standup_scenario() {
    let (_store, gateway) = memory_gateway().await;
    let calendars = gateway.list_calendars().await.unwrap();
    let calendar = calendars[0].id;

    let id = gateway
        .insert_event(calendar, "Standup", at(2024, 6, 3, 9, 0), at(2024, 6, 3, 9, 30))
        .await
        .unwrap();

    let range = TimeRange::new(at(2024, 6, 3, 0, 0), at(2024, 6, 4, 0, 0)).unwrap();
    let events = gateway.list_events(range).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Standup");

    let state = CalendarState::spawn(gateway.clone());
    let screen = CalendarScreen::new(state, ScreenSettings::default(), date(2024, 6, 3));
    screen.open().await;
    assert_eq!(screen.annotate(date(2024, 6, 3)).label.as_deref(), Some("Standup"));

    assert_eq!(screen.delete_event(id).await, WriteOutcome::Deleted(id));
    assert!(gateway.list_events(range).await.unwrap().is_empty());
    assert_eq!(screen.annotate(date(2024, 6, 3)).label, None);
}

#[tokio::test]
async fn test_list_events_only_returns_starts_inside_range() {
    let (_store, gateway) = memory_gateway().await;
    let calendar = CalendarId(1);

    // Hourly events across two days, some spanning range edges
    for hour in 0..48 {
        let start = at(2024, 6, 3, 0, 0) + Duration::hours(hour);
        gateway
            .insert_event(calendar, &format!("e{hour}"), start, start + Duration::minutes(90))
            .await
            .unwrap();
    }

    let ranges = [
        (at(2024, 6, 3, 0, 0), at(2024, 6, 3, 1, 0)),
        (at(2024, 6, 3, 5, 30), at(2024, 6, 3, 9, 0)),
        (at(2024, 6, 3, 23, 59), at(2024, 6, 4, 12, 0)),
        (at(2024, 6, 2, 0, 0), at(2024, 6, 6, 0, 0)),
    ];

    for (start, end) in ranges {
        let range = TimeRange::new(start, end).unwrap();
        let events = gateway.list_events(range).await.unwrap();
        assert!(events.iter().all(|e| e.start >= start && e.start < end));

        let expected = (0..48)
            .map(|h| at(2024, 6, 3, 0, 0) + Duration::hours(h))
            .filter(|s| *s >= start && *s < end)
            .count();
        assert_eq!(events.len(), expected);
    }
}

#[tokio::test]
async fn test_update_preserves_everything_but_title() {
    let (_store, gateway) = memory_gateway().await;
    let mut event = NewEvent::new(CalendarId(1), "Draft", at(2024, 6, 3, 9, 0), at(2024, 6, 3, 10, 0));
    event.description = Some("Bring slides".into());
    let id = gateway.insert(event).await.unwrap();

    let range = TimeRange::day(&Tz::UTC, date(2024, 6, 3));
    let before = gateway.list_events(range).await.unwrap().remove(0);
    gateway.update_event(id, "Quarterly review").await.unwrap();
    let after = gateway.list_events(range).await.unwrap().remove(0);

    assert_eq!(after.title, "Quarterly review");
    assert_eq!(
        after,
        Event {
            title: "Quarterly review".into(),
            ..before
        }
    );
}

#[tokio::test]
async fn test_recurring_instances_share_event_id() {
    let (_store, gateway) = memory_gateway().await;
    let mut event = NewEvent::new(CalendarId(1), "Gym", at(2024, 6, 3, 18, 0), at(2024, 6, 3, 19, 0));
    event.rrule = Some("FREQ=WEEKLY;COUNT=4".into());
    let id = gateway.insert(event).await.unwrap();

    let june = TimeRange::month(&Tz::UTC, date(2024, 6, 1));
    let events = gateway.list_events(june).await.unwrap();

    assert_eq!(events.len(), 4);
    assert!(events.iter().all(|e| e.id == id));
    assert_eq!(events[3].start, at(2024, 6, 24, 18, 0));

    gateway.delete_event(id).await.unwrap();
    assert!(gateway.list_events(june).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_store_snapshot_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    {
        let store = Arc::new(MemoryStore::open(&path).await.unwrap());
        let calendar = store.add_calendar("Personal", "me", "LOCAL").await.unwrap();
        let gateway = CalendarGateway::with_timezone(store, Tz::UTC);
        gateway
            .insert_event(CalendarId(calendar), "Standup", at(2024, 6, 3, 9, 0), at(2024, 6, 3, 9, 30))
            .await
            .unwrap();
    }

    let store = Arc::new(MemoryStore::open(&path).await.unwrap());
    assert!(!store.is_empty().unwrap());
    let gateway = CalendarGateway::with_timezone(store, Tz::UTC);
    let events = gateway
        .list_events(TimeRange::day(&Tz::UTC, date(2024, 6, 3)))
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Standup");
}

#[tokio::test]
async fn test_insert_that_cannot_be_saved_is_not_listed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let store = Arc::new(MemoryStore::open(&path).await.unwrap());
    let calendar = store.add_calendar("Personal", "me", "LOCAL").await.unwrap();
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();

    let gateway = CalendarGateway::with_timezone(store, Tz::UTC);
    let result = gateway
        .insert_event(CalendarId(calendar), "Ghost", at(2024, 6, 3, 9, 0), at(2024, 6, 3, 10, 0))
        .await;
    assert!(matches!(result, Err(GatewayError::Store(_))));

    let events = gateway
        .list_events(TimeRange::day(&Tz::UTC, date(2024, 6, 3)))
        .await
        .unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_display_zone_decides_the_grid_cell() {
    let store = Arc::new(MemoryStore::new());
    store.add_calendar("Personal", "me", "LOCAL").await.unwrap();
    let settings = ScreenSettings {
        timezone: chrono_tz::Asia::Seoul,
        ..Default::default()
    };
    let gateway = CalendarGateway::with_timezone(store, settings.timezone);
    let screen = CalendarScreen::new(CalendarState::spawn(gateway), settings, date(2024, 6, 3));
    screen.open().await;

    // 20:00 UTC on the 3rd is 05:00 on the 4th in Seoul
    screen
        .add_event_at("Call", at(2024, 6, 3, 20, 0), Duration::minutes(30), None)
        .await
        .unwrap();

    assert_eq!(screen.annotate(date(2024, 6, 3)).label, None);
    assert_eq!(screen.annotate(date(2024, 6, 4)).label.as_deref(), Some("Call"));
}
