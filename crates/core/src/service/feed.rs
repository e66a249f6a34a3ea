//! The live sentiment feed: holds the current snapshot, fans refreshes out to listeners and
//! owns the periodic refresh timer.
//!
//! Refreshes build a complete snapshot off-lock and then swap it in. Every refresh takes a
//! ticket before generating; a result whose ticket is older than the last applied one is
//! dropped, so a slow refresh can never overwrite a newer snapshot.

use crate::analytics::generator::SnapshotSource;
use crate::domain::snapshot::SentimentSnapshot;
use crate::notify::{Notification, Notifier};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);
const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(10);
const FETCH_FAILED_TITLE: &str = "Failed to fetch latest market data";

type Listener = Arc<dyn Fn(&Arc<SentimentSnapshot>) + Send + Sync>;

#[derive(Debug, Clone)]
pub enum FeedState {
    Uninitialized,
    Loading {
        previous: Option<Arc<SentimentSnapshot>>,
    },
    Ready(Arc<SentimentSnapshot>),
    Error {
        reason: String,
        previous: Option<Arc<SentimentSnapshot>>,
    },
}

impl FeedState {
    pub fn snapshot(&self) -> Option<&Arc<SentimentSnapshot>> {
        match self {
            FeedState::Uninitialized => None,
            FeedState::Loading { previous } | FeedState::Error { previous, .. } => {
                previous.as_ref()
            }
            FeedState::Ready(s) => Some(s),
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            FeedState::Uninitialized => "uninitialized",
            FeedState::Loading { .. } => "loading",
            FeedState::Ready(_) => "ready",
            FeedState::Error { .. } => "error",
        }
    }
}

struct StateCell {
    state: FeedState,
    applied_ticket: u64,
    in_flight: usize,
}

struct Timer {
    id: u64,
    // Dropping the sender ends the timer loop at its next wait.
    _stop: oneshot::Sender<()>,
}

pub struct SentimentFeed {
    source: Arc<dyn SnapshotSource>,
    notifier: Arc<dyn Notifier>,
    cell: Mutex<StateCell>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    // Ticket of the last snapshot handed to listeners. Held for the whole delivery.
    delivered: Mutex<u64>,
    timer: Mutex<Option<Timer>>,
    next_ticket: AtomicU64,
    next_id: AtomicU64,
    disposed: AtomicBool,
}

impl SentimentFeed {
    pub fn new(source: Arc<dyn SnapshotSource>, notifier: Arc<dyn Notifier>) -> Arc<Self> {
        Arc::new(Self {
            source,
            notifier,
            cell: Mutex::new(StateCell {
                state: FeedState::Uninitialized,
                applied_ticket: 0,
                in_flight: 0,
            }),
            listeners: Mutex::new(Vec::new()),
            delivered: Mutex::new(0),
            timer: Mutex::new(None),
            next_ticket: AtomicU64::new(0),
            next_id: AtomicU64::new(1),
            disposed: AtomicBool::new(false),
        })
    }

    /// Registers `listener`. A held snapshot is delivered before this returns.
    pub fn subscribe<F>(self: &Arc<Self>, listener: F) -> Subscription
    where
        F: Fn(&Arc<SentimentSnapshot>) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let listener: Listener = Arc::new(listener);
        self.listeners.lock().push((id, Arc::clone(&listener)));

        if let Some(current) = self.current_data() {
            deliver(id, &listener, &current);
        }

        Subscription {
            feed: Arc::downgrade(self),
            id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Replaces any running timer, refreshes immediately, then every `interval`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_real_time_updates(self: &Arc<Self>, interval: Duration) -> StopHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = StopHandle {
            feed: Arc::downgrade(self),
            id,
        };
        if self.disposed.load(Ordering::Acquire) {
            tracing::warn!("feed is disposed; not starting real-time updates");
            return handle;
        }

        let interval = interval.max(MIN_REFRESH_INTERVAL);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let weak = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {}
                }
                let Some(feed) = weak.upgrade() else { break };
                feed.fetch_latest_data().await;
            }
            tracing::debug!(timer_id = id, "refresh timer exited");
        });

        let previous = self.timer.lock().replace(Timer { id, _stop: stop_tx });
        if let Some(previous) = previous {
            tracing::debug!(
                timer_id = previous.id,
                "replacing existing refresh timer"
            );
        }
        tracing::info!(
            timer_id = id,
            interval_ms = interval.as_millis() as u64,
            "real-time updates started"
        );
        handle
    }

    /// Cancels the active timer, if any.
    pub fn stop_real_time_updates(&self) {
        if let Some(timer) = self.timer.lock().take() {
            tracing::info!(timer_id = timer.id, "real-time updates stopped");
        }
    }

    pub fn is_updating(&self) -> bool {
        self.timer.lock().is_some()
    }

    fn stop_timer(&self, id: u64) {
        let mut timer = self.timer.lock();
        if timer.as_ref().is_some_and(|t| t.id == id) {
            *timer = None;
            tracing::info!(timer_id = id, "real-time updates stopped");
        }
    }

    /// Runs one refresh cycle.
    ///
    /// Returns the applied snapshot, the currently held one if this result was stale, or
    /// `None` when generation failed (the previous snapshot is kept).
    pub async fn fetch_latest_data(&self) -> Option<Arc<SentimentSnapshot>> {
        if self.disposed.load(Ordering::Acquire) {
            tracing::debug!("feed is disposed; ignoring refresh");
            return None;
        }

        let ticket = self.next_ticket.fetch_add(1, Ordering::AcqRel) + 1;
        let mut guard = InFlight::begin(&self.cell);

        match self.source.generate().await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                {
                    let mut cell = self.cell.lock();
                    guard.finish(&mut cell);
                    if ticket < cell.applied_ticket {
                        tracing::debug!(
                            ticket,
                            applied_ticket = cell.applied_ticket,
                            "discarding stale snapshot"
                        );
                        return cell.state.snapshot().cloned();
                    }
                    cell.applied_ticket = ticket;
                    cell.state = FeedState::Ready(Arc::clone(&snapshot));
                }

                tracing::info!(
                    ticket,
                    overall_sentiment = snapshot.overall_sentiment,
                    percent_change = snapshot.percent_change,
                    "snapshot refreshed"
                );
                self.broadcast(ticket, &snapshot);
                Some(snapshot)
            }
            Err(err) => {
                tracing::error!(ticket, error = ?err, "snapshot generation failed");
                {
                    let mut cell = self.cell.lock();
                    guard.finish(&mut cell);
                    if ticket >= cell.applied_ticket {
                        let previous = cell.state.snapshot().cloned();
                        cell.state = FeedState::Error {
                            reason: format!("{err:#}"),
                            previous,
                        };
                    }
                }
                self.notifier.notify(Notification::error(
                    FETCH_FAILED_TITLE,
                    "Showing the last available data. Retrying on the next refresh.",
                ));
                None
            }
        }
    }

    pub fn current_data(&self) -> Option<Arc<SentimentSnapshot>> {
        self.cell.lock().state.snapshot().cloned()
    }

    pub fn state(&self) -> FeedState {
        self.cell.lock().state.clone()
    }

    /// Stops the timer and drops every listener. Later refreshes are ignored.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
        self.stop_real_time_updates();
        let dropped = {
            let mut listeners = self.listeners.lock();
            let n = listeners.len();
            listeners.clear();
            n
        };
        tracing::info!(listeners = dropped, "feed disposed");
    }

    fn unsubscribe(&self, id: u64) {
        self.listeners.lock().retain(|(lid, _)| *lid != id);
    }

    /// Delivers `snapshot` unless a newer ticket was applied or delivered in the meantime.
    /// Returns whether listeners were called.
    fn broadcast(&self, ticket: u64, snapshot: &Arc<SentimentSnapshot>) -> bool {
        let mut delivered = self.delivered.lock();
        let applied = self.cell.lock().applied_ticket;
        if ticket <= *delivered || ticket != applied {
            tracing::debug!(ticket, applied_ticket = applied, "skipping superseded broadcast");
            return false;
        }
        *delivered = ticket;

        // Copy out so listeners run without the listener lock and may (un)subscribe.
        let listeners: Vec<(u64, Listener)> = self.listeners.lock().clone();
        for (id, listener) in &listeners {
            deliver(*id, listener, snapshot);
        }
        true
    }
}

fn deliver(id: u64, listener: &Listener, snapshot: &Arc<SentimentSnapshot>) {
    if catch_unwind(AssertUnwindSafe(|| listener(snapshot))).is_err() {
        tracing::error!(listener_id = id, "listener panicked while handling snapshot");
    }
}

/// Tracks one in-flight refresh so the state falls back out of `Loading` even when the
/// refresh future is dropped before it completes.
struct InFlight<'a> {
    cell: &'a Mutex<StateCell>,
    done: bool,
}

impl<'a> InFlight<'a> {
    fn begin(cell: &'a Mutex<StateCell>) -> Self {
        let mut c = cell.lock();
        c.in_flight += 1;
        if !matches!(c.state, FeedState::Loading { .. }) {
            let previous = c.state.snapshot().cloned();
            c.state = FeedState::Loading { previous };
        }
        Self { cell, done: false }
    }

    fn finish(&mut self, cell: &mut StateCell) {
        if !self.done {
            self.done = true;
            cell.in_flight = cell.in_flight.saturating_sub(1);
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let mut cell = self.cell.lock();
        cell.in_flight = cell.in_flight.saturating_sub(1);
        if cell.in_flight == 0 {
            if let FeedState::Loading { previous } = &cell.state {
                cell.state = match previous.clone() {
                    Some(s) => FeedState::Ready(s),
                    None => FeedState::Uninitialized,
                };
            }
        }
    }
}

/// One listener registration.
#[derive(Debug)]
pub struct Subscription {
    feed: Weak<SentimentFeed>,
    id: u64,
}

impl Subscription {
    /// Removes this registration. Calling it again is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(feed) = self.feed.upgrade() {
            feed.unsubscribe(self.id);
        }
    }
}

/// Stops the timer it was returned for. A handle whose timer was already replaced does nothing.
#[derive(Debug, Clone)]
pub struct StopHandle {
    feed: Weak<SentimentFeed>,
    id: u64,
}

impl StopHandle {
    pub fn stop(&self) {
        if let Some(feed) = self.feed.upgrade() {
            feed.stop_timer(self.id);
        }
    }
}
