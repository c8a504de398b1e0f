// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engage Bridge — command dispatcher, session state, unread-count monitor,
// and the outbound event channel between the application layer and the
// messaging SDK.

pub mod dispatcher;
pub mod emitter;
pub mod monitor;

pub use dispatcher::{Bridge, CommandReply};
pub use emitter::EventEmitter;
pub use monitor::{POLL_PERIOD, UnreadMonitor};
