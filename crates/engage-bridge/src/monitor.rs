// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unread-count monitor: a repeating 5-second poll, active only while a chat
// surface is open.
//
// Two states: Idle (no task) and Active (task ticking, first tick at t=0).
// Each tick asks the SDK for the unread count; a changed value is recorded
// and published as `onUnreadCountChanged`.  Fetch errors are logged and
// otherwise ignored — the next tick simply tries again.
//
// Stopping aborts the poll task.  An SDK request already in flight is not
// aborted; its completion lands in a dropped channel.  The recorded count
// survives stop/start cycles, so a completion arriving between a `logout`
// reset and the next tick of a running monitor can still publish a
// pre-reset value — a known caveat of the polling design, kept observable.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use engage_core::types::{EventName, Session};
use engage_sdk::MessengerSdk;

use crate::emitter::EventEmitter;

/// Fixed poll period while a chat surface is open.
pub const POLL_PERIOD: Duration = Duration::from_secs(5);

/// Repeating unread-count poll with an explicit cancellable task handle.
pub struct UnreadMonitor {
    sdk: Arc<dyn MessengerSdk>,
    emitter: Arc<EventEmitter>,
    session: Arc<Mutex<Session>>,
    /// Last observed count.  `None` until the first successful fetch — the
    /// baseline observation records without publishing.
    last_known: Arc<Mutex<Option<i64>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl UnreadMonitor {
    pub fn new(
        sdk: Arc<dyn MessengerSdk>,
        emitter: Arc<EventEmitter>,
        session: Arc<Mutex<Session>>,
    ) -> Self {
        Self {
            sdk,
            emitter,
            session,
            last_known: Arc::new(Mutex::new(None)),
            task: Mutex::new(None),
        }
    }

    /// Start polling.  Idempotent: a running monitor is left alone.
    pub fn start(&self) {
        let mut task = self.task.lock().expect("monitor task lock poisoned");
        if let Some(handle) = task.as_ref()
            && !handle.is_finished()
        {
            debug!("unread monitor already running");
            return;
        }

        let sdk = Arc::clone(&self.sdk);
        let emitter = Arc::clone(&self.emitter);
        let session = Arc::clone(&self.session);
        let last_known = Arc::clone(&self.last_known);

        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(POLL_PERIOD);
            loop {
                ticker.tick().await;

                let (tx, rx) = oneshot::channel();
                sdk.fetch_unread_count(Box::new(move |result| {
                    let _ = tx.send(result);
                }));

                match rx.await {
                    Ok(Ok(count)) => {
                        publish_count(count, &last_known, &session, &emitter);
                    }
                    Ok(Err(e)) => warn!(error = %e, "unread-count fetch failed"),
                    Err(_) => warn!("unread-count reply dropped"),
                }
            }
        }));

        info!("unread monitor started");
    }

    /// Stop polling.  Idempotent; the poll task is aborted.
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().expect("monitor task lock poisoned").take() {
            handle.abort();
            info!("unread monitor stopped");
        }
    }

    /// Whether the poll task is currently present.
    pub fn is_active(&self) -> bool {
        self.task
            .lock()
            .expect("monitor task lock poisoned")
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// The last observed count, `0` before any observation.
    pub fn last_known(&self) -> i64 {
        self.last_known
            .lock()
            .expect("last-known lock poisoned")
            .unwrap_or(0)
    }

    /// Reset the recorded count to zero (the `logout` path).
    pub fn reset(&self) {
        *self.last_known.lock().expect("last-known lock poisoned") = Some(0);
    }

    /// Record an out-of-band observation (the `getUnreadCount` command uses
    /// the same change-detection path as the poll).  Returns whether the
    /// value changed and an event was published.
    pub fn record_count(&self, count: u32) -> bool {
        publish_count(count, &self.last_known, &self.session, &self.emitter)
    }
}

impl Drop for UnreadMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Compare an observed count against the last known value; on change,
/// record it and publish `onUnreadCountChanged`.  The first observation
/// establishes the baseline silently.
fn publish_count(
    count: u32,
    last_known: &Mutex<Option<i64>>,
    session: &Mutex<Session>,
    emitter: &EventEmitter,
) -> bool {
    let changed = {
        let mut last = last_known.lock().expect("last-known lock poisoned");
        let prior = last.replace(count as i64);
        prior.is_some_and(|p| p != count as i64)
    };

    if changed {
        let (user_id, user_name) = {
            let session = session.lock().expect("session lock poisoned");
            (session.user_id.clone(), session.user_name.clone())
        };

        let mut payload = Map::new();
        payload.insert("unreadCount".to_owned(), Value::from(count));
        payload.insert(
            "userId".to_owned(),
            user_id.map(Value::String).unwrap_or(Value::Null),
        );
        payload.insert(
            "userName".to_owned(),
            user_name.map(Value::String).unwrap_or(Value::Null),
        );

        info!(count, "unread count changed");
        emitter.emit(EventName::UnreadCountChanged, payload);
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use engage_sdk::FakeSdk;

    fn monitor_with(sdk: Arc<FakeSdk>) -> (UnreadMonitor, Arc<EventEmitter>) {
        let emitter = Arc::new(EventEmitter::new());
        let session = Arc::new(Mutex::new(Session::default()));
        let monitor = UnreadMonitor::new(
            sdk as Arc<dyn MessengerSdk>,
            Arc::clone(&emitter),
            session,
        );
        (monitor, emitter)
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_exactly_on_changes() {
        let sdk = Arc::new(FakeSdk::instantiated());
        for count in [5, 5, 7, 7, 3] {
            sdk.script_unread(Ok(count));
        }

        let (monitor, emitter) = monitor_with(Arc::clone(&sdk));
        let mut rx = emitter.subscribe();

        monitor.start();
        // Ticks land at t = 0s, 5s, 10s, 15s, 20s.
        tokio::time::sleep(POLL_PERIOD * 4 + Duration::from_millis(50)).await;
        monitor.stop();

        let mut published = Vec::new();
        while let Ok(record) = rx.try_recv() {
            assert_eq!(record.event, EventName::UnreadCountChanged);
            published.push(record.payload["unreadCount"].as_i64().expect("count"));
        }
        assert_eq!(published, vec![7, 3]);
        assert_eq!(monitor.last_known(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_fires_immediately() {
        let sdk = Arc::new(FakeSdk::instantiated());
        sdk.script_unread(Ok(1));

        let (monitor, _emitter) = monitor_with(Arc::clone(&sdk));
        monitor.start();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(sdk.fetch_calls(), 1);
        monitor.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent() {
        let sdk = Arc::new(FakeSdk::instantiated());
        sdk.script_unread(Ok(1));

        let (monitor, _emitter) = monitor_with(Arc::clone(&sdk));
        monitor.start();
        monitor.start();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(sdk.fetch_calls(), 1);
        monitor.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_polling() {
        let sdk = Arc::new(FakeSdk::instantiated());
        for count in [2, 4, 6] {
            sdk.script_unread(Ok(count));
        }

        let (monitor, _emitter) = monitor_with(Arc::clone(&sdk));
        monitor.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        monitor.stop();
        assert!(!monitor.is_active());

        tokio::time::sleep(POLL_PERIOD * 3).await;
        assert_eq!(sdk.fetch_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_errors_are_skipped_and_polling_continues() {
        let sdk = Arc::new(FakeSdk::instantiated());
        sdk.script_unread(Ok(2));
        sdk.script_unread(Err(engage_core::EngageError::Sdk("transport down".to_owned())));
        sdk.script_unread(Ok(9));

        let (monitor, emitter) = monitor_with(Arc::clone(&sdk));
        let mut rx = emitter.subscribe();

        monitor.start();
        tokio::time::sleep(POLL_PERIOD * 2 + Duration::from_millis(50)).await;
        monitor.stop();

        let record = rx.try_recv().expect("one change event");
        assert_eq!(record.payload["unreadCount"], Value::from(9));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn reset_rebaselines_to_zero() {
        let sdk = Arc::new(FakeSdk::instantiated());
        let (monitor, emitter) = monitor_with(sdk);
        let mut rx = emitter.subscribe();

        assert!(!monitor.record_count(5)); // baseline, no event
        monitor.reset();
        assert_eq!(monitor.last_known(), 0);

        assert!(monitor.record_count(5)); // differs from the reset zero
        let record = rx.try_recv().expect("change event");
        assert_eq!(record.payload["unreadCount"], Value::from(5));
    }
}
