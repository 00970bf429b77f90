//! One run of the front-end: the opened store, the screen and the permission gate.

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::{Context, Result};
use calgrid_core::config::CalgridConfig;
use calgrid_core::date_range::first_of_month;
use calgrid_core::gateway::CalendarGateway;
use calgrid_core::permission::{GateAction, PermissionGate};
use calgrid_core::screen::{CalendarScreen, Gesture, ScreenSettings};
use calgrid_core::state::{CalendarState, Notice, WriteOutcome};
use calgrid_core::store::{MemoryStore, Permissions};
use chrono::NaiveDate;
use dialoguer::Confirm;
use owo_colors::OwoColorize;
use tokio::sync::broadcast;
use tracing::info;

use crate::render::Render;

const SEED_CALENDAR_NAME: &str = "Personal";
const SEED_ACCOUNT_TYPE: &str = "LOCAL";

/// Open the store at the configured path, creating its first calendar on first use.
pub async fn open_store(config: &CalgridConfig) -> Result<Arc<MemoryStore>> {
    let path = config.store_path()?;
    let store = MemoryStore::open(&path)
        .await
        .with_context(|| format!("Could not open calendar store at {}", path.display()))?;

    if store.is_empty()? {
        let account = std::env::var("USER").unwrap_or_else(|_| "local".to_string());
        let id = store
            .add_calendar(SEED_CALENDAR_NAME, &account, SEED_ACCOUNT_TYPE)
            .await?;
        info!(id, path = %path.display(), "Created calendar store");
    }

    Ok(Arc::new(store))
}

pub struct Session {
    store: Arc<MemoryStore>,
    pub screen: CalendarScreen,
    gate: PermissionGate,
    notices: broadcast::Receiver<Notice>,
}

impl Session {
    /// Open the store, load calendars and the current month.
    pub async fn open(config: &CalgridConfig) -> Result<Self> {
        let settings = ScreenSettings::from_config(config)?;
        let store = open_store(config).await?;
        let gate = if store.prompt_refused()? {
            PermissionGate::after_refusal()
        } else {
            PermissionGate::new()
        };

        let gateway = CalendarGateway::with_timezone(Arc::clone(&store), settings.timezone);
        let state = CalendarState::spawn(gateway);
        let notices = state.subscribe_notices();
        let today = CalendarScreen::today_in(&settings.timezone);

        let mut session = Session {
            store,
            screen: CalendarScreen::new(state, settings, today),
            gate,
            notices,
        };

        session.screen.open().await;
        session.settle().await?;

        Ok(session)
    }

    /// Show the month of `date`, loading it if needed.
    pub async fn show_month(&mut self, date: NaiveDate) -> Result<()> {
        if first_of_month(date) != self.screen.grid().month() {
            self.screen.show_month(date).await;
            self.settle().await?;
        }
        Ok(())
    }

    /// Show the month of `date` and select the day.
    pub async fn select(&mut self, date: NaiveDate) -> Result<()> {
        self.show_month(date).await?;
        self.screen.dispatch(Gesture::TapDay(date));
        Ok(())
    }

    /// Print pending notices and deal with denied access.
    ///
    /// Returns whether calendar access is available.
    pub async fn settle(&mut self) -> Result<bool> {
        let mut prompted = false;

        loop {
            let mut denied = false;
            for notice in self.take_notices() {
                match notice {
                    Notice::PermissionDenied => denied = true,
                    other => eprintln!("{}", other.render()),
                }
            }

            if !denied {
                if prompted {
                    self.gate.on_granted();
                }
                return Ok(true);
            }

            match self.gate.on_denied() {
                GateAction::Prompt if ask_for_access()? => {
                    prompted = true;
                    self.store.set_permissions(Permissions::ALL).await?;
                    self.screen.open().await;
                }
                GateAction::Prompt => {
                    self.gate.on_denied();
                    self.store.refuse_prompt().await?;
                    print_blocked();
                    return Ok(false);
                }
                GateAction::ShowNotice => {
                    print_blocked();
                    return Ok(false);
                }
            }
        }
    }

    /// Settle notices after a write; true when the write should be retried.
    pub async fn should_retry(&mut self, outcome: Option<&WriteOutcome>) -> Result<bool> {
        let denied = matches!(outcome, Some(WriteOutcome::PermissionDenied));
        let granted = self.settle().await?;
        Ok(denied && granted)
    }

    fn take_notices(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        loop {
            match self.notices.try_recv() {
                Ok(notice) => notices.push(notice),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        notices.dedup();
        notices
    }
}

fn ask_for_access() -> Result<bool> {
    if !std::io::stdin().is_terminal() {
        return Ok(false);
    }

    let granted = Confirm::new()
        .with_prompt("calgrid needs access to your calendars. Grant access?")
        .default(true)
        .interact()?;
    Ok(granted)
}

fn print_blocked() {
    eprintln!("{}", Notice::PermissionDenied.render());
    eprintln!(
        "{}",
        "Run `calgrid permission grant` to allow calendar access.".dimmed()
    );
}
