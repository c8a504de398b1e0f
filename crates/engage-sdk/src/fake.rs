// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory collaborators for tests: a scriptable SDK and a presenter that
// records every interaction and can fire close signals on demand.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use engage_core::error::{EngageError, Result};
use engage_core::types::AppearanceConfig;

use crate::traits::*;

/// Scriptable in-memory stand-in for the vendored messaging SDK.
#[derive(Default)]
pub struct FakeSdk {
    state: Mutex<FakeSdkState>,
}

#[derive(Default)]
struct FakeSdkState {
    instantiated: bool,
    fail_init: bool,
    fail_device_token: bool,
    consume_result: bool,
    init_calls: Vec<(String, String)>,
    user_identifier: Option<String>,
    user_name: Option<String>,
    authentication_info: Option<HashMap<String, String>>,
    device_token: Option<Vec<u8>>,
    pushes: Vec<HashMap<String, String>>,
    unread_script: VecDeque<Result<u32>>,
    fetch_calls: usize,
}

impl FakeSdk {
    /// An SDK that does not exist yet (pre-`initialize` state).
    pub fn new() -> Self {
        Self::default()
    }

    /// An SDK whose instance already exists, as after a prior `initialize`.
    pub fn instantiated() -> Self {
        let sdk = Self::default();
        sdk.state.lock().expect("fake sdk lock poisoned").instantiated = true;
        sdk
    }

    /// Make the next (and every later) `initialize` call fail.
    pub fn refuse_init(&self) {
        self.lock().fail_init = true;
    }

    /// Make `set_device_token` fail.
    pub fn refuse_device_token(&self) {
        self.lock().fail_device_token = true;
    }

    /// Queue one unread-count fetch result.  Results are replayed in FIFO
    /// order; a fetch past the end of the script reports a transport error.
    pub fn script_unread(&self, result: Result<u32>) {
        self.lock().unread_script.push_back(result);
    }

    /// What `consume_remote_notification` should report.
    pub fn set_consume_result(&self, consumed: bool) {
        self.lock().consume_result = consumed;
    }

    pub fn init_calls(&self) -> Vec<(String, String)> {
        self.lock().init_calls.clone()
    }

    pub fn user_identifier(&self) -> Option<String> {
        self.lock().user_identifier.clone()
    }

    pub fn user_name(&self) -> Option<String> {
        self.lock().user_name.clone()
    }

    pub fn auth_info(&self) -> Option<HashMap<String, String>> {
        self.lock().authentication_info.clone()
    }

    pub fn device_token(&self) -> Option<Vec<u8>> {
        self.lock().device_token.clone()
    }

    pub fn pushes(&self) -> Vec<HashMap<String, String>> {
        self.lock().pushes.clone()
    }

    /// How many unread-count fetches have been issued.
    pub fn fetch_calls(&self) -> usize {
        self.lock().fetch_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeSdkState> {
        self.state.lock().expect("fake sdk lock poisoned")
    }
}

impl MessengerSdk for FakeSdk {
    fn initialize(&self, api_secret: &str, domain: &str) -> Result<()> {
        let mut state = self.lock();
        state
            .init_calls
            .push((api_secret.to_owned(), domain.to_owned()));
        if state.fail_init {
            return Err(EngageError::Sdk("initialization refused".to_owned()));
        }
        state.instantiated = true;
        Ok(())
    }

    fn is_instantiated(&self) -> bool {
        self.lock().instantiated
    }

    fn set_user_identifier(&self, user_id: Option<&str>) {
        self.lock().user_identifier = user_id.map(str::to_owned);
    }

    fn set_user_name(&self, user_name: Option<&str>) {
        self.lock().user_name = user_name.map(str::to_owned);
    }

    fn authentication_info(&self) -> HashMap<String, String> {
        self.lock().authentication_info.clone().unwrap_or_default()
    }

    fn set_authentication_info(&self, info: Option<HashMap<String, String>>) {
        self.lock().authentication_info = info;
    }

    fn fetch_unread_count(&self, reply: UnreadReply) {
        let result = {
            let mut state = self.lock();
            state.fetch_calls += 1;
            state
                .unread_script
                .pop_front()
                .unwrap_or_else(|| Err(EngageError::Sdk("unread script exhausted".to_owned())))
        };
        reply(result);
    }

    fn set_device_token(&self, token: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if state.fail_device_token {
            return Err(EngageError::Sdk("device token rejected".to_owned()));
        }
        state.device_token = Some(token.to_vec());
        Ok(())
    }

    fn consume_remote_notification(&self, payload: &HashMap<String, String>) -> bool {
        let mut state = self.lock();
        state.pushes.push(payload.clone());
        state.consume_result
    }
}

/// Presenter that records presentations and lets tests dismiss surfaces.
#[derive(Default)]
pub struct RecordingPresenter {
    state: Mutex<PresenterState>,
}

#[derive(Default)]
struct PresenterState {
    fail_present: bool,
    presented: Vec<(SurfaceId, AppearanceConfig)>,
    applied: Vec<(SurfaceId, AppearanceConfig)>,
    pending_close: Vec<(SurfaceId, CloseSignal)>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `present` call fail.
    pub fn refuse_presentation(&self) {
        self.lock().fail_present = true;
    }

    /// Every presentation so far, oldest first.
    pub fn presented(&self) -> Vec<(SurfaceId, AppearanceConfig)> {
        self.lock().presented.clone()
    }

    /// Every appearance re-application so far, oldest first.
    pub fn applied(&self) -> Vec<(SurfaceId, AppearanceConfig)> {
        self.lock().applied.clone()
    }

    /// The most recently presented surface, if any.
    pub fn last_surface(&self) -> Option<SurfaceId> {
        self.lock().presented.last().map(|(id, _)| *id)
    }

    /// Dismiss the given surface by firing its close signal.
    ///
    /// The signal is fired outside the presenter lock: the close path may
    /// legitimately call back into this presenter.
    pub fn close(&self, surface: SurfaceId) {
        let signal = {
            let mut state = self.lock();
            state
                .pending_close
                .iter()
                .position(|(id, _)| *id == surface)
                .map(|index| state.pending_close.remove(index).1)
        };

        if let Some(signal) = signal {
            signal.fire(surface);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PresenterState> {
        self.state.lock().expect("recording presenter lock poisoned")
    }
}

impl SurfacePresenter for RecordingPresenter {
    fn present(
        &self,
        appearance: &AppearanceConfig,
        on_closed: CloseSignal,
    ) -> Result<SurfaceHandle> {
        let mut state = self.lock();
        if state.fail_present {
            return Err(EngageError::Presentation(
                "refused by test presenter".to_owned(),
            ));
        }

        let id = SurfaceId::new();
        state.presented.push((id, appearance.clone()));
        state.pending_close.push((id, on_closed));
        Ok(SurfaceHandle { id })
    }

    fn apply_appearance(&self, surface: SurfaceId, appearance: &AppearanceConfig) {
        self.lock().applied.push((surface, appearance.clone()));
    }
}
