// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-subscriber event channel from the bridge to the application layer.
//
// At most one sink is registered at a time; subscribing again replaces the
// prior sink, matching the underlying event-channel semantics of the host
// framework.  Emitting with no sink is a silent no-op.  Records are stamped
// with epoch-millis at emission, and channel order is delivery order.

use std::sync::Mutex;

use serde_json::{Map, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use engage_core::types::{EventName, EventRecord};

/// Outbound notification channel with at most one active subscriber.
#[derive(Default)]
pub struct EventEmitter {
    sink: Mutex<Option<UnboundedSender<EventRecord>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber, implicitly replacing any prior one.  The
    /// replaced subscriber's receiver closes.
    pub fn subscribe(&self) -> UnboundedReceiver<EventRecord> {
        let (tx, rx) = mpsc::unbounded_channel();
        let replaced = self
            .sink
            .lock()
            .expect("event sink lock poisoned")
            .replace(tx)
            .is_some();
        if replaced {
            debug!("event subscriber replaced");
        }
        rx
    }

    /// Drop the current subscriber, if any.
    pub fn unsubscribe(&self) {
        self.sink.lock().expect("event sink lock poisoned").take();
    }

    pub fn has_subscriber(&self) -> bool {
        self.sink
            .lock()
            .expect("event sink lock poisoned")
            .is_some()
    }

    /// Emit an event to the current subscriber.
    ///
    /// No subscriber, or a subscriber whose receiver has been dropped,
    /// makes this a no-op; a dead sink is cleared so later emissions skip
    /// the send entirely.
    pub fn emit(&self, event: EventName, payload: Map<String, Value>) {
        let record = EventRecord::new(event, payload);

        let mut sink = self.sink.lock().expect("event sink lock poisoned");
        let receiver_gone = match sink.as_ref() {
            Some(tx) => tx.send(record).is_err(),
            None => {
                debug!(event = event.as_str(), "event emitted with no subscriber");
                false
            }
        };
        if receiver_gone {
            debug!(event = event.as_str(), "event receiver gone — clearing sink");
            sink.take();
        }
    }
}
