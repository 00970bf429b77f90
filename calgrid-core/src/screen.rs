//! Controller for the month screen.
//!
//! [`CalendarScreen`] keeps the UI-only state (selected date, visible month),
//! turns gestures into intents and forwards event requests to the state
//! holder. Rendering reads [`CellAnnotation`]s and the day list from it.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::bucket::EventsByDate;
use crate::config::CalgridConfig;
use crate::date_range::{TimeRange, start_of_day};
use crate::error::CalgridResult;
use crate::event::{CalendarId, CalendarInfo, Event, EventId, NewEvent};
use crate::grid::{MonthGrid, WeekStart};
use crate::state::{CalendarStateHandle, Notice, WriteOutcome};

/// A user gesture on the grid or the day list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    TapDay(NaiveDate),
    LongPressDay(NaiveDate),
    TapEvent(EventId),
    LongPressEvent(EventId),
}

/// What a gesture asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    SelectDate(NaiveDate),
    /// Open the add dialog for this date.
    AddEvent(NaiveDate),
    /// Open the edit dialog for this event.
    EditEvent(EventId),
    DeleteEvent(EventId),
}

/// Display data for one grid cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellAnnotation {
    pub date: NaiveDate,
    pub in_month: bool,
    pub selected: bool,
    pub today: bool,
    /// Title of the first event of the day.
    pub label: Option<String>,
    /// Number of further events that day.
    pub more: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenSettings {
    pub timezone: Tz,
    pub week_start: WeekStart,
    pub event_duration: Duration,
    pub default_calendar: Option<CalendarId>,
}

impl ScreenSettings {
    pub fn from_config(config: &CalgridConfig) -> CalgridResult<Self> {
        Ok(ScreenSettings {
            timezone: config.timezone()?,
            week_start: config.week_start,
            event_duration: config.event_duration()?,
            default_calendar: config.default_calendar(),
        })
    }
}

impl Default for ScreenSettings {
    fn default() -> Self {
        ScreenSettings {
            timezone: Tz::UTC,
            week_start: WeekStart::default(),
            event_duration: Duration::hours(1),
            default_calendar: None,
        }
    }
}

pub struct CalendarScreen {
    state: CalendarStateHandle,
    settings: ScreenSettings,
    today: NaiveDate,
    selected: NaiveDate,
    grid: MonthGrid,
}

impl CalendarScreen {
    /// A screen showing the month of `today` with `today` selected.
    pub fn new(state: CalendarStateHandle, settings: ScreenSettings, today: NaiveDate) -> Self {
        let grid = MonthGrid::new(today, settings.week_start);
        CalendarScreen {
            state,
            settings,
            today,
            selected: today,
            grid,
        }
    }

    /// Today in the display zone.
    pub fn today_in(tz: &Tz) -> NaiveDate {
        Utc::now().with_timezone(tz).date_naive()
    }

    pub fn state(&self) -> &CalendarStateHandle {
        &self.state
    }

    pub fn settings(&self) -> &ScreenSettings {
        &self.settings
    }

    pub fn selected(&self) -> NaiveDate {
        self.selected
    }

    pub fn grid(&self) -> &MonthGrid {
        &self.grid
    }

    pub fn month_range(&self) -> TimeRange {
        TimeRange::month(&self.settings.timezone, self.grid.month())
    }

    /// Load calendars and the visible month.
    pub async fn open(&self) {
        self.state.load_calendars().await;
        self.state.load_events(self.month_range()).await;
    }

    /// Switch to the month containing `date` and load it.
    pub async fn show_month(&mut self, date: NaiveDate) {
        self.grid = MonthGrid::new(date, self.settings.week_start);
        self.state.load_events(self.month_range()).await;
    }

    pub async fn next_month(&mut self) {
        let month = self.grid.next_month().month();
        self.show_month(month).await;
    }

    pub async fn prev_month(&mut self) {
        let month = self.grid.prev_month().month();
        self.show_month(month).await;
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.selected = date;
    }

    /// Map a gesture to its intent. Only day taps change local state.
    pub fn dispatch(&mut self, gesture: Gesture) -> Intent {
        let intent = match gesture {
            Gesture::TapDay(date) => {
                self.select_date(date);
                Intent::SelectDate(date)
            }
            Gesture::LongPressDay(date) => {
                self.select_date(date);
                Intent::AddEvent(date)
            }
            Gesture::TapEvent(id) => Intent::EditEvent(id),
            Gesture::LongPressEvent(id) => Intent::DeleteEvent(id),
        };
        debug!(?gesture, ?intent, "Dispatched gesture");
        intent
    }

    /// Add an event at the start of `date` with the configured length.
    ///
    /// Returns `None` when the title is empty or there is no calendar to add to.
    pub async fn add_event(&self, title: &str, date: NaiveDate) -> Option<WriteOutcome> {
        let start = start_of_day(&self.settings.timezone, date);
        self.add_event_at(title, start, self.settings.event_duration, None)
            .await
    }

    pub async fn add_event_at(
        &self,
        title: &str,
        start: DateTime<Utc>,
        duration: Duration,
        calendar: Option<CalendarId>,
    ) -> Option<WriteOutcome> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }

        let Some(calendar_id) = self.target_calendar(calendar) else {
            self.state.notify(Notice::NoCalendar);
            return None;
        };

        let event = NewEvent::new(calendar_id, title, start, start + duration);
        Some(self.state.insert(event).await)
    }

    /// Rename an event. Empty titles are ignored.
    pub async fn edit_event(&self, id: EventId, title: &str) -> Option<WriteOutcome> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        Some(self.state.update_event(id, title).await)
    }

    pub async fn delete_event(&self, id: EventId) -> WriteOutcome {
        self.state.delete_event(id).await
    }

    /// The calendar new events go to: the requested one, the configured
    /// default if it is loaded, or the first loaded calendar.
    fn target_calendar(&self, requested: Option<CalendarId>) -> Option<CalendarId> {
        if requested.is_some() {
            return requested;
        }

        let calendars = self.state.calendars();
        self.settings
            .default_calendar
            .filter(|id| calendars.iter().any(|c| c.id == *id))
            .or_else(|| calendars.first().map(|c| c.id))
    }

    pub fn calendars(&self) -> Vec<CalendarInfo> {
        self.state.calendars()
    }

    /// The current events grouped by local start date.
    pub fn events_by_date(&self) -> EventsByDate {
        EventsByDate::new(&self.state.events().events, self.settings.timezone)
    }

    pub fn find_event(&self, id: EventId) -> Option<Event> {
        self.state.events().events.into_iter().find(|e| e.id == id)
    }

    /// Events of the selected date.
    pub fn day_list(&self) -> Vec<Event> {
        self.events_by_date().on(self.selected).to_vec()
    }

    pub fn annotate(&self, date: NaiveDate) -> CellAnnotation {
        self.annotate_with(&self.events_by_date(), date)
    }

    /// Annotations for every cell of the grid, row by row.
    pub fn cells(&self) -> Vec<CellAnnotation> {
        let by_date = self.events_by_date();
        self.grid
            .dates()
            .map(|date| self.annotate_with(&by_date, date))
            .collect()
    }

    fn annotate_with(&self, by_date: &EventsByDate, date: NaiveDate) -> CellAnnotation {
        let events = by_date.on(date);
        CellAnnotation {
            date,
            in_month: self.grid.in_month(date),
            selected: date == self.selected,
            today: date == self.today,
            label: events.first().map(|e| e.title.clone()),
            more: events.len().saturating_sub(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::gateway::CalendarGateway;
    use crate::grid::GRID_LENGTH;
    use crate::state::CalendarState;
    use crate::store::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn screen_with(store: Arc<MemoryStore>, settings: ScreenSettings) -> CalendarScreen {
        let gateway = CalendarGateway::with_timezone(store, settings.timezone);
        CalendarScreen::new(CalendarState::spawn(gateway), settings, date(2024, 6, 3))
    }

    async fn screen() -> (Arc<MemoryStore>, CalendarScreen) {
        let store = Arc::new(MemoryStore::new());
        store.add_calendar("Personal", "me", "LOCAL").await.unwrap();
        (Arc::clone(&store), screen_with(store, ScreenSettings::default()))
    }

    #[tokio::test]
    async fn test_gestures_map_to_intents() {
        let (_store, mut screen) = screen().await;

        assert_eq!(
            screen.dispatch(Gesture::TapDay(date(2024, 6, 10))),
            Intent::SelectDate(date(2024, 6, 10))
        );
        assert_eq!(screen.selected(), date(2024, 6, 10));
        assert_eq!(
            screen.dispatch(Gesture::LongPressDay(date(2024, 6, 12))),
            Intent::AddEvent(date(2024, 6, 12))
        );
        assert_eq!(screen.dispatch(Gesture::TapEvent(EventId(3))), Intent::EditEvent(EventId(3)));
        assert_eq!(
            screen.dispatch(Gesture::LongPressEvent(EventId(3))),
            Intent::DeleteEvent(EventId(3))
        );
    }

    #[tokio::test]
    async fn test_add_event_at_start_of_selected_day() {
        let (_store, screen) = screen().await;
        screen.open().await;

        let outcome = screen.add_event("Standup", date(2024, 6, 3)).await.unwrap();
        assert!(outcome.is_success());

        let day = screen.day_list();
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].start, start_of_day(&Tz::UTC, date(2024, 6, 3)));
        assert_eq!(day[0].end - day[0].start, Duration::hours(1));
    }

    #[tokio::test]
    async fn test_empty_titles_are_ignored() {
        let (_store, screen) = screen().await;
        screen.open().await;

        assert_eq!(screen.add_event("   ", date(2024, 6, 3)).await, None);
        assert_eq!(screen.edit_event(EventId(1), "").await, None);
        assert!(screen.day_list().is_empty());
    }

    #[tokio::test]
    async fn test_add_without_calendar_notifies() {
        let store = Arc::new(MemoryStore::new());
        let screen = screen_with(store, ScreenSettings::default());
        let mut notices = screen.state().subscribe_notices();
        screen.open().await;

        assert_eq!(screen.add_event("Lost", date(2024, 6, 3)).await, None);
        assert_eq!(notices.recv().await.unwrap(), Notice::NoCalendar);
    }

    #[tokio::test]
    async fn test_default_calendar_is_preferred() {
        let store = Arc::new(MemoryStore::new());
        store.add_calendar("Personal", "me", "LOCAL").await.unwrap();
        let work = store.add_calendar("Work", "me", "LOCAL").await.unwrap();
        let settings = ScreenSettings {
            default_calendar: Some(CalendarId(work)),
            ..Default::default()
        };
        let screen = screen_with(store, settings);
        screen.open().await;

        screen.add_event("Planning", date(2024, 6, 4)).await.unwrap();

        let by_date = screen.events_by_date();
        let event = &by_date.on(date(2024, 6, 4))[0];
        assert_eq!(event.calendar_name(), Some("Work"));
    }

    #[tokio::test]
    async fn test_cell_annotation_labels_first_event() {
        let (_store, screen) = screen().await;
        screen.open().await;
        let nine = start_of_day(&Tz::UTC, date(2024, 6, 3)) + Duration::hours(9);

        screen.add_event_at("Standup", nine, Duration::minutes(30), None).await;
        screen.add_event_at("Retro", nine + Duration::hours(5), Duration::hours(1), None).await;

        let cell = screen.annotate(date(2024, 6, 3));
        assert_eq!(cell.label.as_deref(), Some("Standup"));
        assert_eq!(cell.more, 1);
        assert!(cell.selected && cell.today && cell.in_month);

        let empty = screen.annotate(date(2024, 6, 4));
        assert_eq!(empty.label, None);
        assert_eq!(empty.more, 0);
    }

    #[tokio::test]
    async fn test_cells_cover_grid_and_month_navigation_reloads() {
        let (_store, mut screen) = screen().await;
        screen.open().await;
        screen.add_event("June", date(2024, 6, 20)).await;

        assert_eq!(screen.cells().len(), GRID_LENGTH);

        screen.next_month().await;
        assert_eq!(screen.grid().month(), date(2024, 7, 1));
        assert!(screen.cells().iter().all(|c| c.label.is_none()));

        screen.prev_month().await;
        assert_eq!(screen.annotate(date(2024, 6, 20)).label.as_deref(), Some("June"));
    }

    #[tokio::test]
    async fn test_edit_and_delete_flow() {
        let (_store, screen) = screen().await;
        screen.open().await;
        let Some(WriteOutcome::Inserted(id)) = screen.add_event("Draft", date(2024, 6, 3)).await else {
            panic!("insert failed");
        };

        screen.edit_event(id, "Final").await.unwrap();
        assert_eq!(screen.find_event(id).map(|e| e.title), Some("Final".to_string()));

        assert_eq!(screen.delete_event(id).await, WriteOutcome::Deleted(id));
        assert_eq!(screen.find_event(id), None);
    }
}
