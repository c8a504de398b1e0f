// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub collaborators for builds without the vendored SDK (desktop, CI).
//
// The stub SDK reports itself as not instantiated, so every dispatcher
// path degrades to its documented `false`/`0` result instead of touching
// native code that is not there.

use std::collections::HashMap;

use engage_core::error::{EngageError, Result};
use engage_core::types::AppearanceConfig;

use crate::traits::*;

/// No-op SDK returned on builds without the native messaging SDK.
pub struct StubSdk;

impl MessengerSdk for StubSdk {
    fn initialize(&self, _api_secret: &str, _domain: &str) -> Result<()> {
        tracing::warn!("MessengerSdk::initialize called on stub SDK");
        Err(EngageError::SdkUnavailable)
    }

    fn is_instantiated(&self) -> bool {
        false
    }

    fn set_user_identifier(&self, _user_id: Option<&str>) {}

    fn set_user_name(&self, _user_name: Option<&str>) {}

    fn authentication_info(&self) -> HashMap<String, String> {
        HashMap::new()
    }

    fn set_authentication_info(&self, _info: Option<HashMap<String, String>>) {}

    fn fetch_unread_count(&self, reply: UnreadReply) {
        reply(Err(EngageError::SdkUnavailable));
    }

    fn set_device_token(&self, _token: &[u8]) -> Result<()> {
        tracing::warn!("MessengerSdk::set_device_token called on stub SDK");
        Err(EngageError::SdkUnavailable)
    }

    fn consume_remote_notification(&self, _payload: &HashMap<String, String>) -> bool {
        false
    }
}

/// No-op presenter for builds without a host UI shell.
pub struct StubPresenter;

impl SurfacePresenter for StubPresenter {
    fn present(
        &self,
        _appearance: &AppearanceConfig,
        _on_closed: CloseSignal,
    ) -> Result<SurfaceHandle> {
        tracing::warn!("SurfacePresenter::present called on stub presenter");
        Err(EngageError::SurfaceUnavailable)
    }

    fn apply_appearance(&self, _surface: SurfaceId, _appearance: &AppearanceConfig) {}
}
