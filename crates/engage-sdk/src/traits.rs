// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Collaborator trait definitions: the opaque messaging SDK and the host
// shell's surface presenter.
//
// The bridge never reaches past these traits.  The SDK side mirrors the
// vendor API shape (property-style setters, completion-callback fetch);
// the presenter side is the one seam the host UI shell has to implement.

use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

use engage_core::error::Result;
use engage_core::types::AppearanceConfig;

/// Completion callback for an asynchronous unread-count fetch.
///
/// The SDK invokes it exactly once, from whatever execution context its
/// transport uses; the bridge marshals the value back itself.
pub type UnreadReply = Box<dyn FnOnce(Result<u32>) + Send + 'static>;

/// The vendored customer-messaging SDK, reduced to the capabilities the
/// bridge actually consumes.
pub trait MessengerSdk: Send + Sync {
    /// Initialize the SDK with an API credential and account domain.
    fn initialize(&self, api_secret: &str, domain: &str) -> Result<()>;

    /// Whether the underlying SDK instance exists and can take calls.
    fn is_instantiated(&self) -> bool;

    /// Set or clear the authenticated user identifier.
    fn set_user_identifier(&self, user_id: Option<&str>);

    /// Set or clear the display name.
    fn set_user_name(&self, user_name: Option<&str>);

    /// The SDK's current authentication-info map (empty when unset).
    fn authentication_info(&self) -> HashMap<String, String>;

    /// Replace the authentication-info map (`None` clears it).
    fn set_authentication_info(&self, info: Option<HashMap<String, String>>);

    /// Fetch the unread message count; the reply callback receives the
    /// count or the transport error.
    fn fetch_unread_count(&self, reply: UnreadReply);

    /// Register a push device token (raw bytes).
    fn set_device_token(&self, token: &[u8]) -> Result<()>;

    /// Offer a remote-notification payload to the SDK.  Returns whether the
    /// SDK consumed it.
    fn consume_remote_notification(&self, payload: &HashMap<String, String>) -> bool;
}

/// Identifier for one presented chat surface.
///
/// Repeated open/close cycles each mint a fresh id, so a close signal from
/// a superseded surface can be told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub Uuid);

impl SurfaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SurfaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a currently (or formerly) presented chat surface.
#[derive(Debug, Clone)]
pub struct SurfaceHandle {
    pub id: SurfaceId,
}

/// One-shot notification a surface fires when it is dismissed.
///
/// Back navigation and programmatic dismissal both run through this, so the
/// close path is identical either way.  The callback holds only a weak
/// reference back to the dispatcher — a lingering surface never keeps the
/// bridge alive.
pub struct CloseSignal(Option<Box<dyn FnOnce(SurfaceId) + Send>>);

impl CloseSignal {
    pub fn new(notify: impl FnOnce(SurfaceId) + Send + 'static) -> Self {
        Self(Some(Box::new(notify)))
    }

    /// Fire the signal for the given surface.  Subsequent fires are no-ops.
    pub fn fire(mut self, surface: SurfaceId) {
        if let Some(notify) = self.0.take() {
            notify(surface);
        }
    }
}

impl fmt::Debug for CloseSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CloseSignal")
            .field(&self.0.as_ref().map(|_| "pending"))
            .finish()
    }
}

/// The host shell's ability to put a chat surface on screen.
pub trait SurfacePresenter: Send + Sync {
    /// Present a chat surface styled with `appearance`.  The returned
    /// handle identifies the surface; the presenter must arrange for
    /// `on_closed` to fire with that id when the surface is dismissed.
    fn present(&self, appearance: &AppearanceConfig, on_closed: CloseSignal)
    -> Result<SurfaceHandle>;

    /// Re-apply appearance to an already-shown surface.
    fn apply_appearance(&self, surface: SurfaceId, appearance: &AppearanceConfig);
}
