//! Presentation state for a calendar screen.
//!
//! A single background worker owns the gateway and processes commands in the
//! order they were sent. Results are published through `watch` cells that any
//! number of readers can subscribe to, and transient notices go out on a
//! broadcast channel. Every write is followed by a reload of the last
//! requested range.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::date_range::TimeRange;
use crate::error::{GatewayError, GatewayResult, WriteOp};
use crate::event::{CalendarId, CalendarInfo, Event, EventId, NewEvent};
use crate::gateway::CalendarGateway;
use crate::store::CalendarStore;

const COMMAND_BUFFER: usize = 32;
const NOTICE_BUFFER: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
}

/// The events of the last requested range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSnapshot {
    pub range: Option<TimeRange>,
    pub events: Vec<Event>,
}

/// Something the user should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    PermissionDenied,
    WriteRejected(WriteOp),
    /// An event was requested but there is no calendar to put it in.
    NoCalendar,
    StoreFailure(String),
}

/// Result of a write request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted(EventId),
    Updated(EventId),
    Deleted(EventId),
    Rejected(WriteOp),
    PermissionDenied,
    Failed(String),
    /// The worker stopped before the write completed.
    Cancelled,
}

impl WriteOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            WriteOutcome::Inserted(_) | WriteOutcome::Updated(_) | WriteOutcome::Deleted(_)
        )
    }
}

enum StateCommand {
    LoadCalendars(Option<oneshot::Sender<()>>),
    LoadEvents(TimeRange, Option<oneshot::Sender<()>>),
    Refresh(Option<oneshot::Sender<()>>),
    Insert(NewEvent, oneshot::Sender<WriteOutcome>),
    Update(EventId, String, oneshot::Sender<WriteOutcome>),
    Delete(EventId, oneshot::Sender<WriteOutcome>),
}

/// The worker behind a [`CalendarStateHandle`].
pub struct CalendarState<S: CalendarStore + ?Sized> {
    gateway: CalendarGateway<S>,
    command_rx: mpsc::Receiver<StateCommand>,
    calendars: watch::Sender<Vec<CalendarInfo>>,
    events: watch::Sender<EventSnapshot>,
    load_state: watch::Sender<LoadState>,
    notices: broadcast::Sender<Notice>,
    cancel: CancellationToken,
    current_range: Option<TimeRange>,
    pending: Option<StateCommand>,
}

/// Cloneable handle to the calendar state worker.
///
/// Dropping the last handle stops the worker.
#[derive(Clone)]
pub struct CalendarStateHandle {
    command_tx: mpsc::Sender<StateCommand>,
    calendars: watch::Receiver<Vec<CalendarInfo>>,
    events: watch::Receiver<EventSnapshot>,
    load_state: watch::Receiver<LoadState>,
    notices: broadcast::Sender<Notice>,
    cancel: CancellationToken,
    _guard: Arc<DropGuard>,
}

impl<S: CalendarStore + ?Sized + 'static> CalendarState<S> {
    /// Start the worker on the current tokio runtime.
    pub fn spawn(gateway: CalendarGateway<S>) -> CalendarStateHandle {
        let (mut state, handle) = Self::new(gateway);
        tokio::spawn(async move {
            state.run().await;
        });
        handle
    }

    pub fn new(gateway: CalendarGateway<S>) -> (Self, CalendarStateHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (calendars_tx, calendars_rx) = watch::channel(Vec::new());
        let (events_tx, events_rx) = watch::channel(EventSnapshot::default());
        let (load_tx, load_rx) = watch::channel(LoadState::Idle);
        let (notice_tx, _) = broadcast::channel(NOTICE_BUFFER);
        let cancel = CancellationToken::new();

        let state = CalendarState {
            gateway,
            command_rx,
            calendars: calendars_tx,
            events: events_tx,
            load_state: load_tx,
            notices: notice_tx.clone(),
            cancel: cancel.clone(),
            current_range: None,
            pending: None,
        };

        let handle = CalendarStateHandle {
            command_tx,
            calendars: calendars_rx,
            events: events_rx,
            load_state: load_rx,
            notices: notice_tx,
            cancel: cancel.clone(),
            _guard: Arc::new(cancel.drop_guard()),
        };

        (state, handle)
    }

    /// Process commands until cancelled or every handle is gone.
    pub async fn run(&mut self) {
        info!("Calendar state worker started");

        loop {
            let command = match self.pending.take() {
                Some(command) => command,
                None => {
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => break,
                        command = self.command_rx.recv() => match command {
                            Some(command) => command,
                            None => break,
                        },
                    }
                }
            };

            if !self.handle(command).await {
                break;
            }
        }

        info!("Calendar state worker stopped");
    }

    /// Returns false once the worker was cancelled mid-command.
    async fn handle(&mut self, command: StateCommand) -> bool {
        match command {
            StateCommand::LoadCalendars(ack) => {
                let loaded = self.load_calendars().await;
                ack_all(ack);
                loaded
            }
            StateCommand::Refresh(ack) => match self.current_range {
                Some(range) => self.coalesced_load(range, ack).await,
                None => {
                    ack_all(ack);
                    true
                }
            },
            StateCommand::LoadEvents(range, ack) => self.coalesced_load(range, ack).await,
            StateCommand::Insert(event, reply) => {
                let result = self
                    .cancellable(self.gateway.insert(event))
                    .await
                    .map(|r| r.map(WriteOutcome::Inserted));
                self.finish_write(WriteOp::Insert, result, reply).await
            }
            StateCommand::Update(id, title, reply) => {
                let result = self
                    .cancellable(self.gateway.update_event(id, &title))
                    .await
                    .map(|r| r.map(|()| WriteOutcome::Updated(id)));
                self.finish_write(WriteOp::Update, result, reply).await
            }
            StateCommand::Delete(id, reply) => {
                let result = self
                    .cancellable(self.gateway.delete_event(id))
                    .await
                    .map(|r| r.map(|()| WriteOutcome::Deleted(id)));
                self.finish_write(WriteOp::Delete, result, reply).await
            }
        }
    }

    /// Load `range` once for this request and every queued request for the same range.
    async fn coalesced_load(&mut self, range: TimeRange, ack: Option<oneshot::Sender<()>>) -> bool {
        let mut acks = vec![ack];

        while let Ok(next) = self.command_rx.try_recv() {
            match next {
                StateCommand::LoadEvents(r, ack) if r == range => acks.push(ack),
                StateCommand::Refresh(ack) if self.current_range == Some(range) => acks.push(ack),
                other => {
                    self.pending = Some(other);
                    break;
                }
            }
        }

        if acks.len() > 1 {
            debug!(requests = acks.len(), "Coalesced event loads");
        }

        let loaded = self.load_events(range).await;
        for ack in acks {
            ack_all(ack);
        }
        loaded
    }

    async fn load_calendars(&mut self) -> bool {
        self.load_state.send_replace(LoadState::Loading);

        let Some(result) = self.cancellable(self.gateway.list_calendars()).await else {
            return false;
        };
        let calendars = self.unwrap_read(result);
        debug!(count = calendars.len(), "Loaded calendars");
        self.calendars.send_replace(calendars);

        self.load_state.send_replace(LoadState::Loaded);
        true
    }

    async fn load_events(&mut self, range: TimeRange) -> bool {
        self.current_range = Some(range);
        self.load_state.send_replace(LoadState::Loading);

        let Some(result) = self.cancellable(self.gateway.list_events(range)).await else {
            return false;
        };
        let events = self.unwrap_read(result);
        debug!(count = events.len(), "Loaded events");
        self.events.send_replace(EventSnapshot {
            range: Some(range),
            events,
        });

        self.load_state.send_replace(LoadState::Loaded);
        true
    }

    async fn finish_write(
        &mut self,
        op: WriteOp,
        result: Option<GatewayResult<WriteOutcome>>,
        reply: oneshot::Sender<WriteOutcome>,
    ) -> bool {
        // Cancelled: dropping the reply tells the caller
        let Some(result) = result else {
            return false;
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(GatewayError::PermissionDenied) => {
                self.notify(Notice::PermissionDenied);
                WriteOutcome::PermissionDenied
            }
            Err(GatewayError::WriteRejected(op)) => {
                self.notify(Notice::WriteRejected(op));
                WriteOutcome::Rejected(op)
            }
            Err(e) => {
                warn!(%op, "Write failed: {e}");
                self.notify(Notice::StoreFailure(e.to_string()));
                WriteOutcome::Failed(e.to_string())
            }
        };

        let reloaded = match self.current_range {
            Some(range) => self.load_events(range).await,
            None => true,
        };

        let _ = reply.send(outcome);
        reloaded
    }

    /// Turn a failed read into an empty list and a notice.
    fn unwrap_read<T>(&self, result: GatewayResult<Vec<T>>) -> Vec<T> {
        match result {
            Ok(items) => items,
            Err(GatewayError::PermissionDenied) => {
                warn!("Calendar read denied");
                self.notify(Notice::PermissionDenied);
                Vec::new()
            }
            Err(e) => {
                warn!("Calendar read failed: {e}");
                self.notify(Notice::StoreFailure(e.to_string()));
                Vec::new()
            }
        }
    }

    fn notify(&self, notice: Notice) {
        // No subscribers is fine
        let _ = self.notices.send(notice);
    }

    async fn cancellable<T>(&self, fut: impl Future<Output = T>) -> Option<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("Discarding result of cancelled request");
                None
            }
            result = fut => Some(result),
        }
    }
}

fn ack_all(ack: Option<oneshot::Sender<()>>) {
    if let Some(ack) = ack {
        let _ = ack.send(());
    }
}

impl CalendarStateHandle {
    /// Reload the calendar list and wait for it to be published.
    pub async fn load_calendars(&self) {
        let (tx, rx) = oneshot::channel();
        if self.send(StateCommand::LoadCalendars(Some(tx))).await {
            let _ = rx.await;
        }
    }

    /// Load the events of `range` and wait for them to be published.
    pub async fn load_events(&self, range: TimeRange) {
        let (tx, rx) = oneshot::channel();
        if self.send(StateCommand::LoadEvents(range, Some(tx))).await {
            let _ = rx.await;
        }
    }

    /// Queue a load of `range` without waiting for it.
    pub async fn request_events(&self, range: TimeRange) {
        self.send(StateCommand::LoadEvents(range, None)).await;
    }

    /// Reload the last requested range.
    pub async fn refresh(&self) {
        let (tx, rx) = oneshot::channel();
        if self.send(StateCommand::Refresh(Some(tx))).await {
            let _ = rx.await;
        }
    }

    pub async fn insert(&self, event: NewEvent) -> WriteOutcome {
        self.write(|reply| StateCommand::Insert(event, reply)).await
    }

    pub async fn insert_event(
        &self,
        calendar_id: CalendarId,
        title: &str,
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    ) -> WriteOutcome {
        self.insert(NewEvent::new(calendar_id, title, start, end)).await
    }

    pub async fn update_event(&self, id: EventId, title: &str) -> WriteOutcome {
        let title = title.to_string();
        self.write(|reply| StateCommand::Update(id, title, reply)).await
    }

    pub async fn delete_event(&self, id: EventId) -> WriteOutcome {
        self.write(|reply| StateCommand::Delete(id, reply)).await
    }

    pub fn calendars(&self) -> Vec<CalendarInfo> {
        self.calendars.borrow().clone()
    }

    pub fn events(&self) -> EventSnapshot {
        self.events.borrow().clone()
    }

    pub fn load_state(&self) -> LoadState {
        *self.load_state.borrow()
    }

    pub fn subscribe_calendars(&self) -> watch::Receiver<Vec<CalendarInfo>> {
        self.calendars.clone()
    }

    pub fn subscribe_events(&self) -> watch::Receiver<EventSnapshot> {
        self.events.clone()
    }

    pub fn subscribe_load_state(&self) -> watch::Receiver<LoadState> {
        self.load_state.clone()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Publish a notice that did not come from the worker.
    pub fn notify(&self, notice: Notice) {
        let _ = self.notices.send(notice);
    }

    /// Stop the worker. Requests in flight are dropped.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    async fn write(
        &self,
        command: impl FnOnce(oneshot::Sender<WriteOutcome>) -> StateCommand,
    ) -> WriteOutcome {
        let (tx, rx) = oneshot::channel();
        if !self.send(command(tx)).await {
            return WriteOutcome::Cancelled;
        }
        rx.await.unwrap_or(WriteOutcome::Cancelled)
    }

    async fn send(&self, command: StateCommand) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.command_tx.send(command).await.is_ok()
    }
}
