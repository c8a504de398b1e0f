// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engage SDK — collaborator abstractions around the vendored messaging SDK
// and the host application's presentation shell.
//
// The vendor SDK is opaque: the bridge only ever talks to it through the
// `MessengerSdk` trait.  Platform deployments implement the trait over the
// native SDK binding; desktop and CI builds get the stub, which reports
// itself as not instantiated.

pub mod fake;
pub mod stub;
pub mod traits;

pub use fake::{FakeSdk, RecordingPresenter};
pub use stub::{StubPresenter, StubSdk};
pub use traits::{
    CloseSignal, MessengerSdk, SurfaceHandle, SurfaceId, SurfacePresenter, UnreadReply,
};

/// The SDK binding for the current build.
///
/// Builds that link the vendored native SDK replace this with their own
/// `MessengerSdk` implementation; everything else gets the stub.
pub fn default_sdk() -> std::sync::Arc<dyn MessengerSdk> {
    std::sync::Arc::new(StubSdk)
}
