// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge dispatcher: routes named commands from the application layer to
// SDK calls, session-state mutations, and presentation operations.
//
// The command channel never sees an error.  Every failing branch resolves
// to a `false`/`0`/empty-map result value; only an unrecognized command
// name gets the distinct not-implemented reply.  Internally failures are
// typed (`EngageError`) and logged before being flattened, so tests and
// logs can still tell a missing precondition from malformed input.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Map, Value};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use engage_core::color::Color;
use engage_core::error::{EngageError, Result};
use engage_core::types::{AppearanceConfig, DeviceToken, EventName, EventRecord, Session};
use engage_sdk::{CloseSignal, MessengerSdk, SurfaceHandle, SurfaceId, SurfacePresenter};

use crate::emitter::EventEmitter;
use crate::monitor::UnreadMonitor;

/// The one reply shape the command channel knows.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    /// A successful result value: boolean, integer, string, or map.
    Value(Value),
    /// The command name is not part of the contract.
    NotImplemented,
}

impl CommandReply {
    fn ok(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Value(value) => value.as_bool(),
            Self::NotImplemented => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Value(value) => value.as_i64(),
            Self::NotImplemented => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Value(value) => value.as_object(),
            Self::NotImplemented => None,
        }
    }
}

/// The command/event bridge.  Cheaply cloneable; all clones share state.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    sdk: Arc<dyn MessengerSdk>,
    session: Arc<Mutex<Session>>,
    appearance: Mutex<AppearanceConfig>,
    presenter: Mutex<Option<Arc<dyn SurfacePresenter>>>,
    surface: Mutex<Option<SurfaceHandle>>,
    emitter: Arc<EventEmitter>,
    monitor: UnreadMonitor,
}

impl Bridge {
    pub fn new(sdk: Arc<dyn MessengerSdk>) -> Self {
        let session = Arc::new(Mutex::new(Session::default()));
        let emitter = Arc::new(EventEmitter::new());
        let monitor = UnreadMonitor::new(
            Arc::clone(&sdk),
            Arc::clone(&emitter),
            Arc::clone(&session),
        );

        Self {
            inner: Arc::new(BridgeInner {
                sdk,
                session,
                appearance: Mutex::new(AppearanceConfig::default()),
                presenter: Mutex::new(None),
                surface: Mutex::new(None),
                emitter,
                monitor,
            }),
        }
    }

    /// Attach or detach the host shell's presenter.  `None` while no UI is
    /// available to present into.
    pub fn set_presenter(&self, presenter: Option<Arc<dyn SurfacePresenter>>) {
        *self
            .inner
            .presenter
            .lock()
            .expect("presenter lock poisoned") = presenter;
    }

    /// Register the single event listener, replacing any prior one.
    pub fn subscribe_events(&self) -> UnboundedReceiver<EventRecord> {
        self.inner.emitter.subscribe()
    }

    /// Cancel the event listener.  Also stops the unread monitor — with
    /// nobody listening there is nothing to publish to.
    pub fn unsubscribe_events(&self) {
        self.inner.emitter.unsubscribe();
        self.inner.monitor.stop();
    }

    /// Dispatch one named command with its argument map.
    pub async fn handle(&self, command: &str, args: &Map<String, Value>) -> CommandReply {
        debug!(command, "bridge command");
        match command {
            "getPlatformVersion" => CommandReply::ok(platform_version()),
            "initialize" => self.initialize(args),
            "showMessenger" => self.show_messenger(),
            "setUser" => self.set_user(args),
            "setAuthInfo" => self.set_auth_info(args),
            "logout" => self.logout(),
            "isAvailable" => CommandReply::ok(self.inner.session().initialized),
            "getUnreadCount" => self.get_unread_count().await,
            "setDeviceToken" => self.set_device_token(args),
            "handlePush" => self.handle_push(args),
            "setAppBarTitle" => self.set_app_bar_title(args),
            "setAppBarColor" => self.set_color(args, |a, c| a.bar_color = c),
            "setAppBarTitleColor" => self.set_color(args, |a, c| a.title_color = c),
            "setBackArrowColor" => self.set_color(args, |a, c| a.back_arrow_color = c),
            "setAppBarVisibility" => self.set_visibility(args, |a, v| a.bar_visible = v),
            "setBackButtonVisibility" => self.set_visibility(args, |a, v| a.show_back_button = v),
            "getAppBarConfig" => self.get_app_bar_config(),
            "getCurrentUser" => {
                CommandReply::Value(Value::Object(self.inner.session().identity_map()))
            }
            _ => {
                warn!(command, "unrecognized bridge command");
                CommandReply::NotImplemented
            }
        }
    }

    // -- Lifecycle -----------------------------------------------------------

    fn initialize(&self, args: &Map<String, Value>) -> CommandReply {
        if self.inner.session().initialized {
            debug!("already initialized — re-init skipped");
            return CommandReply::ok(true);
        }

        let application_secret = arg_string(args, "applicationSecret");
        let api_key = arg_string(args, "apiKey");
        let api_secret = arg_string(args, "apiSecret");
        let domain = non_blank(arg_string(args, "domain"));
        let user_id = arg_string(args, "userId");

        // apiSecret wins over apiKey when both are usable; blank is absent.
        let credential = non_blank(api_secret).or_else(|| non_blank(api_key));

        let accepted = match (&credential, &domain) {
            (Some(cred), Some(dom)) => match self.inner.sdk.initialize(cred, dom) {
                Ok(()) => {
                    if let Some(id) = &user_id {
                        self.inner.sdk.set_user_identifier(Some(id));
                    }
                    true
                }
                Err(e) => {
                    warn!(error = %e, "SDK initialization failed");
                    false
                }
            },
            _ => {
                debug!("credential or domain missing — not initializing");
                false
            }
        };

        {
            let mut session = self.inner.session();
            session.application_secret = application_secret;
            session.api_credential = credential;
            session.domain = domain;
            session.user_id = user_id;
            session.initialized = accepted;
        }

        if accepted {
            info!("bridge initialized");
        }
        CommandReply::ok(accepted)
    }

    fn show_messenger(&self) -> CommandReply {
        match self.try_show_messenger() {
            Ok(()) => CommandReply::ok(true),
            Err(e) => {
                warn!(error = %e, "showMessenger failed");
                CommandReply::ok(false)
            }
        }
    }

    fn try_show_messenger(&self) -> Result<()> {
        if !self.inner.session().initialized {
            return Err(EngageError::NotInitialized);
        }
        let presenter = self
            .inner
            .presenter()
            .ok_or(EngageError::SurfaceUnavailable)?;

        let appearance = self.inner.appearance().clone();

        // The surface notifies the dispatcher of its dismissal through this
        // signal; a weak reference so the surface never keeps us alive.
        let weak = Arc::downgrade(&self.inner);
        let on_closed = CloseSignal::new(move |id| {
            if let Some(inner) = weak.upgrade() {
                inner.on_surface_closed(id);
            }
        });

        let handle = presenter.present(&appearance, on_closed)?;
        info!(surface = %handle.id, "chat surface presented");
        *self.inner.surface.lock().expect("surface lock poisoned") = Some(handle);

        self.inner.emitter.emit(EventName::ChatOpened, Map::new());

        if self.inner.sdk.is_instantiated() {
            self.inner.monitor.start();
        }
        Ok(())
    }

    // -- User / session ------------------------------------------------------

    fn set_user(&self, args: &Map<String, Value>) -> CommandReply {
        let user_id = arg_string(args, "userId");
        let user_name = arg_string(args, "name");
        let user_email = arg_string(args, "email");
        let user_phone = arg_string(args, "phone");

        {
            let mut session = self.inner.session();
            session.user_id = user_id.clone();
            session.user_name = user_name.clone();
            session.user_email = user_email;
            session.user_phone = user_phone;
        }

        if self.inner.sdk.is_instantiated() {
            if let Some(id) = &user_id {
                self.inner.sdk.set_user_identifier(Some(id));
            }
            if let Some(name) = &user_name {
                self.inner.sdk.set_user_name(Some(name));
            }
            self.inner.push_auth_payload();
        }

        CommandReply::ok(true)
    }

    fn set_auth_info(&self, args: &Map<String, Value>) -> CommandReply {
        // Only string-valued entries participate; everything else is
        // dropped on the floor.
        let entries: Vec<(String, String)> = args
            .iter()
            .filter_map(|(key, value)| value.as_str().map(|s| (key.clone(), s.to_owned())))
            .collect();

        self.inner.session().merge_auth(entries);

        if self.inner.sdk.is_instantiated() {
            self.inner.push_auth_payload();
        }
        CommandReply::ok(true)
    }

    fn logout(&self) -> CommandReply {
        if self.inner.sdk.is_instantiated() {
            self.inner.sdk.set_user_identifier(None);
            self.inner.sdk.set_user_name(None);
            self.inner.sdk.set_authentication_info(None);
        }
        self.inner.session().clear_identity();
        self.inner.monitor.reset();
        info!("user logged out");
        CommandReply::ok(true)
    }

    // -- SDK queries ---------------------------------------------------------

    async fn get_unread_count(&self) -> CommandReply {
        if !self.inner.sdk.is_instantiated() {
            return CommandReply::ok(0);
        }

        let (tx, rx) = oneshot::channel();
        self.inner.sdk.fetch_unread_count(Box::new(move |result| {
            let _ = tx.send(result);
        }));

        match rx.await {
            Ok(Ok(count)) => {
                self.inner.monitor.record_count(count);
                CommandReply::ok(count)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "getUnreadCount failed");
                CommandReply::ok(0)
            }
            Err(_) => {
                warn!("unread-count reply dropped");
                CommandReply::ok(0)
            }
        }
    }

    fn set_device_token(&self, args: &Map<String, Value>) -> CommandReply {
        let outcome = (|| -> Result<()> {
            let raw = non_blank(arg_string(args, "token"))
                .ok_or_else(|| EngageError::InvalidDeviceToken("blank token".to_owned()))?;
            if !self.inner.sdk.is_instantiated() {
                return Err(EngageError::SdkUnavailable);
            }
            let token = DeviceToken::parse_hex(&raw)?;
            self.inner.sdk.set_device_token(token.as_bytes())
        })();

        match outcome {
            Ok(()) => CommandReply::ok(true),
            Err(e) => {
                warn!(error = %e, "setDeviceToken rejected");
                CommandReply::ok(false)
            }
        }
    }

    fn handle_push(&self, args: &Map<String, Value>) -> CommandReply {
        let payload: HashMap<String, String> = args
            .iter()
            .filter_map(|(key, value)| value.as_str().map(|s| (key.clone(), s.to_owned())))
            .collect();

        if !self.inner.sdk.is_instantiated() {
            debug!("handlePush with no SDK instance");
            return CommandReply::ok(false);
        }
        CommandReply::ok(self.inner.sdk.consume_remote_notification(&payload))
    }

    // -- Appearance ----------------------------------------------------------

    fn set_app_bar_title(&self, args: &Map<String, Value>) -> CommandReply {
        if let Some(title) = arg_string(args, "title") {
            self.inner.update_appearance(|a| a.title = title);
        }
        CommandReply::ok(true)
    }

    fn set_color(
        &self,
        args: &Map<String, Value>,
        apply: impl FnOnce(&mut AppearanceConfig, Color),
    ) -> CommandReply {
        let Some(raw) = arg_string(args, "color") else {
            // Absent argument leaves the config untouched but still succeeds.
            return CommandReply::ok(true);
        };

        match Color::parse(&raw) {
            Ok(color) => {
                self.inner.update_appearance(|a| apply(a, color));
                CommandReply::ok(true)
            }
            Err(e) => {
                warn!(error = %e, "color rejected");
                CommandReply::ok(false)
            }
        }
    }

    fn set_visibility(
        &self,
        args: &Map<String, Value>,
        apply: impl FnOnce(&mut AppearanceConfig, bool),
    ) -> CommandReply {
        if let Some(visible) = args.get("visible").and_then(Value::as_bool) {
            self.inner.update_appearance(|a| apply(a, visible));
        }
        CommandReply::ok(true)
    }

    fn get_app_bar_config(&self) -> CommandReply {
        let appearance = self.inner.appearance().clone();
        match serde_json::to_value(&appearance) {
            Ok(value) => CommandReply::Value(value),
            Err(e) => {
                warn!(error = %e, "appearance serialization failed");
                CommandReply::Value(Value::Object(Map::new()))
            }
        }
    }
}

impl BridgeInner {
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().expect("session lock poisoned")
    }

    fn appearance(&self) -> MutexGuard<'_, AppearanceConfig> {
        self.appearance.lock().expect("appearance lock poisoned")
    }

    fn presenter(&self) -> Option<Arc<dyn SurfacePresenter>> {
        self.presenter
            .lock()
            .expect("presenter lock poisoned")
            .clone()
    }

    /// Push the merged auth payload (SDK's current info + session identity
    /// + cached extras) to the SDK.
    fn push_auth_payload(&self) {
        let payload = self
            .session()
            .auth_payload(self.sdk.authentication_info());
        self.sdk.set_authentication_info(Some(payload));
    }

    /// Mutate the appearance config and re-apply it to a shown surface.
    fn update_appearance(&self, mutate: impl FnOnce(&mut AppearanceConfig)) {
        let snapshot = {
            let mut appearance = self.appearance();
            mutate(&mut appearance);
            appearance.clone()
        };

        let surface = self
            .surface
            .lock()
            .expect("surface lock poisoned")
            .clone();
        if let Some(handle) = surface
            && let Some(presenter) = self.presenter()
        {
            presenter.apply_appearance(handle.id, &snapshot);
        }
    }

    /// Close path shared by back navigation and programmatic dismissal.
    /// A signal from a surface that has since been superseded is ignored,
    /// so repeated open/close cycles compose.
    fn on_surface_closed(&self, id: SurfaceId) {
        let is_current = {
            let mut surface = self.surface.lock().expect("surface lock poisoned");
            match surface.as_ref() {
                Some(current) if current.id == id => {
                    surface.take();
                    true
                }
                _ => false,
            }
        };

        if is_current {
            info!(surface = %id, "chat surface closed");
            self.monitor.stop();
            self.emitter.emit(EventName::ChatClosed, Map::new());
        } else {
            debug!(surface = %id, "close signal from a superseded surface ignored");
        }
    }
}

/// Version string for the `getPlatformVersion` command.
fn platform_version() -> String {
    format!("engage-bridge {}", env!("CARGO_PKG_VERSION"))
}

fn arg_string(args: &Map<String, Value>, key: &str) -> Option<String> {
    args.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use engage_sdk::{FakeSdk, RecordingPresenter};
    use serde_json::json;

    /// Route bridge logs into the captured test output.
    fn capture_logs() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().expect("object args").clone()
    }

    fn no_args() -> Map<String, Value> {
        Map::new()
    }

    async fn initialized_bridge(sdk: Arc<FakeSdk>) -> Bridge {
        capture_logs();
        let bridge = Bridge::new(sdk as Arc<dyn MessengerSdk>);
        let reply = bridge
            .handle(
                "initialize",
                &obj(json!({"apiSecret": "s1", "domain": "d1"})),
            )
            .await;
        assert_eq!(reply.as_bool(), Some(true));
        bridge
    }

    #[tokio::test]
    async fn initialize_succeeds_with_secret_and_domain() {
        let sdk = Arc::new(FakeSdk::new());
        let bridge = initialized_bridge(Arc::clone(&sdk)).await;

        assert_eq!(sdk.init_calls(), vec![("s1".to_owned(), "d1".to_owned())]);
        let available = bridge.handle("isAvailable", &no_args()).await;
        assert_eq!(available.as_bool(), Some(true));
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let sdk = Arc::new(FakeSdk::new());
        let bridge = initialized_bridge(Arc::clone(&sdk)).await;

        let reply = bridge
            .handle(
                "initialize",
                &obj(json!({"apiSecret": "other", "domain": "elsewhere"})),
            )
            .await;

        assert_eq!(reply.as_bool(), Some(true));
        // No second SDK init, no state change from the first call.
        assert_eq!(sdk.init_calls().len(), 1);
    }

    #[tokio::test]
    async fn api_secret_is_preferred_over_api_key() {
        let sdk = Arc::new(FakeSdk::new());
        let bridge = Bridge::new(Arc::clone(&sdk) as Arc<dyn MessengerSdk>);

        let reply = bridge
            .handle(
                "initialize",
                &obj(json!({"apiKey": "k1", "apiSecret": "s1", "domain": "d1"})),
            )
            .await;

        assert_eq!(reply.as_bool(), Some(true));
        assert_eq!(sdk.init_calls()[0].0, "s1");
    }

    #[tokio::test]
    async fn blank_api_secret_falls_back_to_api_key() {
        let sdk = Arc::new(FakeSdk::new());
        let bridge = Bridge::new(Arc::clone(&sdk) as Arc<dyn MessengerSdk>);

        let reply = bridge
            .handle(
                "initialize",
                &obj(json!({"apiKey": "k1", "apiSecret": "  ", "domain": "d1"})),
            )
            .await;

        assert_eq!(reply.as_bool(), Some(true));
        assert_eq!(sdk.init_calls()[0].0, "k1");
    }

    #[tokio::test]
    async fn initialize_rejects_blank_credentials() {
        let sdk = Arc::new(FakeSdk::new());
        let bridge = Bridge::new(Arc::clone(&sdk) as Arc<dyn MessengerSdk>);

        let reply = bridge
            .handle("initialize", &obj(json!({"apiSecret": "", "domain": "d1"})))
            .await;
        assert_eq!(reply.as_bool(), Some(false));
        assert!(sdk.init_calls().is_empty());

        let available = bridge.handle("isAvailable", &no_args()).await;
        assert_eq!(available.as_bool(), Some(false));
    }

    #[tokio::test]
    async fn initialize_reports_sdk_refusal() {
        let sdk = Arc::new(FakeSdk::new());
        sdk.refuse_init();
        let bridge = Bridge::new(Arc::clone(&sdk) as Arc<dyn MessengerSdk>);

        let reply = bridge
            .handle(
                "initialize",
                &obj(json!({"apiSecret": "s1", "domain": "d1"})),
            )
            .await;

        assert_eq!(reply.as_bool(), Some(false));
        let available = bridge.handle("isAvailable", &no_args()).await;
        assert_eq!(available.as_bool(), Some(false));
    }

    #[tokio::test]
    async fn set_user_updates_session_and_sdk() {
        let sdk = Arc::new(FakeSdk::new());
        let bridge = initialized_bridge(Arc::clone(&sdk)).await;

        let reply = bridge
            .handle(
                "setUser",
                &obj(json!({"userId": "u1", "email": "e@x.com"})),
            )
            .await;
        assert_eq!(reply.as_bool(), Some(true));

        let user = bridge.handle("getCurrentUser", &no_args()).await;
        let user = user.as_object().expect("user map");
        assert_eq!(user["userId"], json!("u1"));
        assert_eq!(user["userEmail"], json!("e@x.com"));
        assert_eq!(user["userName"], Value::Null);

        assert_eq!(sdk.user_identifier().as_deref(), Some("u1"));
        let auth = sdk.auth_info().expect("auth payload pushed");
        assert_eq!(auth["email"], "e@x.com");
    }

    #[tokio::test]
    async fn auth_info_merges_across_calls_with_last_write_wins() {
        let sdk = Arc::new(FakeSdk::new());
        let bridge = initialized_bridge(Arc::clone(&sdk)).await;

        bridge
            .handle(
                "setAuthInfo",
                &obj(json!({"role": "agent", "team": "support"})),
            )
            .await;
        bridge
            .handle(
                "setAuthInfo",
                &obj(json!({"role": "admin", "badge": "7", "ignored": 42})),
            )
            .await;

        let auth = sdk.auth_info().expect("auth payload pushed");
        assert_eq!(auth["role"], "admin");
        assert_eq!(auth["team"], "support");
        assert_eq!(auth["badge"], "7");
        // Non-string values never make it into the payload.
        assert!(!auth.contains_key("ignored"));
    }

    #[tokio::test]
    async fn logout_clears_identity_but_not_initialization() {
        let sdk = Arc::new(FakeSdk::new());
        let bridge = initialized_bridge(Arc::clone(&sdk)).await;

        bridge
            .handle(
                "setUser",
                &obj(json!({"userId": "u1", "name": "Uma", "email": "e@x.com", "phone": "555"})),
            )
            .await;
        bridge
            .handle("setAuthInfo", &obj(json!({"role": "agent"})))
            .await;
        bridge.inner.monitor.record_count(4);

        let reply = bridge.handle("logout", &no_args()).await;
        assert_eq!(reply.as_bool(), Some(true));

        assert!(sdk.user_identifier().is_none());
        assert!(sdk.user_name().is_none());
        assert!(sdk.auth_info().is_none());
        assert_eq!(bridge.inner.monitor.last_known(), 0);

        let user = bridge.handle("getCurrentUser", &no_args()).await;
        let user = user.as_object().expect("user map");
        assert_eq!(user["userId"], Value::Null);
        assert_eq!(user["userPhone"], Value::Null);

        let available = bridge.handle("isAvailable", &no_args()).await;
        assert_eq!(available.as_bool(), Some(true));
    }

    #[tokio::test]
    async fn show_messenger_requires_initialization_and_presenter() {
        let sdk = Arc::new(FakeSdk::new());
        let bridge = Bridge::new(Arc::clone(&sdk) as Arc<dyn MessengerSdk>);
        bridge.set_presenter(Some(Arc::new(RecordingPresenter::new())));

        // Not initialized yet.
        let reply = bridge.handle("showMessenger", &no_args()).await;
        assert_eq!(reply.as_bool(), Some(false));

        // Initialized, but no presenter.
        let bridge = initialized_bridge(Arc::clone(&sdk)).await;
        let reply = bridge.handle("showMessenger", &no_args()).await;
        assert_eq!(reply.as_bool(), Some(false));
    }

    #[tokio::test]
    async fn show_messenger_presents_emits_and_starts_monitor() {
        let sdk = Arc::new(FakeSdk::new());
        let bridge = initialized_bridge(Arc::clone(&sdk)).await;
        let presenter = Arc::new(RecordingPresenter::new());
        bridge.set_presenter(Some(Arc::clone(&presenter) as Arc<dyn SurfacePresenter>));
        let mut rx = bridge.subscribe_events();

        let reply = bridge.handle("showMessenger", &no_args()).await;
        assert_eq!(reply.as_bool(), Some(true));

        let opened = rx.recv().await.expect("open event");
        assert_eq!(opened.event, EventName::ChatOpened);

        assert_eq!(presenter.presented().len(), 1);
        assert!(bridge.inner.monitor.is_active());
    }

    #[tokio::test]
    async fn presentation_failure_is_reported_as_false() {
        let sdk = Arc::new(FakeSdk::new());
        let bridge = initialized_bridge(Arc::clone(&sdk)).await;
        let presenter = Arc::new(RecordingPresenter::new());
        presenter.refuse_presentation();
        bridge.set_presenter(Some(presenter));

        let reply = bridge.handle("showMessenger", &no_args()).await;
        assert_eq!(reply.as_bool(), Some(false));
        assert!(!bridge.inner.monitor.is_active());
    }

    #[tokio::test]
    async fn surface_close_stops_monitor_and_emits() {
        let sdk = Arc::new(FakeSdk::new());
        let bridge = initialized_bridge(Arc::clone(&sdk)).await;
        let presenter = Arc::new(RecordingPresenter::new());
        bridge.set_presenter(Some(Arc::clone(&presenter) as Arc<dyn SurfacePresenter>));
        let mut rx = bridge.subscribe_events();

        bridge.handle("showMessenger", &no_args()).await;
        let surface = presenter.last_surface().expect("presented surface");

        presenter.close(surface);

        let opened = rx.recv().await.expect("open event");
        assert_eq!(opened.event, EventName::ChatOpened);
        let closed = rx.recv().await.expect("close event");
        assert_eq!(closed.event, EventName::ChatClosed);
        assert!(!bridge.inner.monitor.is_active());
    }

    #[tokio::test]
    async fn close_from_superseded_surface_is_ignored() {
        let sdk = Arc::new(FakeSdk::new());
        let bridge = initialized_bridge(Arc::clone(&sdk)).await;
        let presenter = Arc::new(RecordingPresenter::new());
        bridge.set_presenter(Some(Arc::clone(&presenter) as Arc<dyn SurfacePresenter>));
        let mut rx = bridge.subscribe_events();

        bridge.handle("showMessenger", &no_args()).await;
        let first = presenter.last_surface().expect("first surface");
        bridge.handle("showMessenger", &no_args()).await;
        let second = presenter.last_surface().expect("second surface");
        assert_ne!(first, second);

        presenter.close(first);
        assert!(bridge.inner.monitor.is_active());

        presenter.close(second);
        assert!(!bridge.inner.monitor.is_active());

        let events: Vec<EventName> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|record| record.event)
            .collect();
        assert_eq!(
            events,
            vec![
                EventName::ChatOpened,
                EventName::ChatOpened,
                EventName::ChatClosed
            ]
        );
    }

    #[tokio::test]
    async fn unsubscribe_stops_the_monitor() {
        let sdk = Arc::new(FakeSdk::new());
        let bridge = initialized_bridge(Arc::clone(&sdk)).await;
        bridge.set_presenter(Some(Arc::new(RecordingPresenter::new())));

        bridge.handle("showMessenger", &no_args()).await;
        assert!(bridge.inner.monitor.is_active());

        bridge.unsubscribe_events();
        assert!(!bridge.inner.monitor.is_active());
    }

    #[tokio::test]
    async fn get_unread_count_returns_count_and_publishes_changes() {
        let sdk = Arc::new(FakeSdk::new());
        let bridge = initialized_bridge(Arc::clone(&sdk)).await;
        let mut rx = bridge.subscribe_events();

        sdk.script_unread(Ok(4));
        sdk.script_unread(Ok(9));

        let reply = bridge.handle("getUnreadCount", &no_args()).await;
        assert_eq!(reply.as_i64(), Some(4));
        // First observation is the baseline: no change event.
        assert!(rx.try_recv().is_err());

        let reply = bridge.handle("getUnreadCount", &no_args()).await;
        assert_eq!(reply.as_i64(), Some(9));
        let record = rx.try_recv().expect("change event");
        assert_eq!(record.event, EventName::UnreadCountChanged);
        assert_eq!(record.payload["unreadCount"], json!(9));
    }

    #[tokio::test]
    async fn get_unread_count_is_zero_without_sdk_or_on_error() {
        let sdk = Arc::new(FakeSdk::new());
        let bridge = Bridge::new(Arc::clone(&sdk) as Arc<dyn MessengerSdk>);

        // Not instantiated: no fetch is even attempted.
        let reply = bridge.handle("getUnreadCount", &no_args()).await;
        assert_eq!(reply.as_i64(), Some(0));
        assert_eq!(sdk.fetch_calls(), 0);

        // Instantiated but the transport errors.
        let bridge = initialized_bridge(Arc::clone(&sdk)).await;
        sdk.script_unread(Err(EngageError::Sdk("transport down".to_owned())));
        let reply = bridge.handle("getUnreadCount", &no_args()).await;
        assert_eq!(reply.as_i64(), Some(0));
    }

    #[tokio::test]
    async fn set_device_token_forwards_decoded_bytes() {
        let sdk = Arc::new(FakeSdk::new());
        let bridge = initialized_bridge(Arc::clone(&sdk)).await;

        let reply = bridge
            .handle("setDeviceToken", &obj(json!({"token": "<a1b2 c3d4>"})))
            .await;
        assert_eq!(reply.as_bool(), Some(true));
        assert_eq!(sdk.device_token(), Some(vec![0xA1, 0xB2, 0xC3, 0xD4]));
    }

    #[tokio::test]
    async fn set_device_token_rejects_blank_and_malformed_input() {
        let sdk = Arc::new(FakeSdk::new());
        let bridge = initialized_bridge(Arc::clone(&sdk)).await;

        for bad in [json!({}), json!({"token": "  "}), json!({"token": "xyz"})] {
            let reply = bridge.handle("setDeviceToken", &obj(bad)).await;
            assert_eq!(reply.as_bool(), Some(false));
        }
        assert!(sdk.device_token().is_none());

        // SDK absent: even a well-formed token is refused.
        let detached = Bridge::new(Arc::new(FakeSdk::new()) as Arc<dyn MessengerSdk>);
        let reply = detached
            .handle("setDeviceToken", &obj(json!({"token": "a1b2"})))
            .await;
        assert_eq!(reply.as_bool(), Some(false));
    }

    #[tokio::test]
    async fn handle_push_filters_to_string_entries() {
        let sdk = Arc::new(FakeSdk::new());
        let bridge = initialized_bridge(Arc::clone(&sdk)).await;
        sdk.set_consume_result(true);

        let reply = bridge
            .handle(
                "handlePush",
                &obj(json!({"messageId": "m1", "badge": 3, "origin": "engage"})),
            )
            .await;

        assert_eq!(reply.as_bool(), Some(true));
        let push = &sdk.pushes()[0];
        assert_eq!(push["messageId"], "m1");
        assert_eq!(push["origin"], "engage");
        assert!(!push.contains_key("badge"));
    }

    #[tokio::test]
    async fn handle_push_is_false_without_sdk() {
        let bridge = Bridge::new(Arc::new(FakeSdk::new()) as Arc<dyn MessengerSdk>);
        let reply = bridge
            .handle("handlePush", &obj(json!({"messageId": "m1"})))
            .await;
        assert_eq!(reply.as_bool(), Some(false));
    }

    #[tokio::test]
    async fn app_bar_color_roundtrips_through_config() {
        let bridge = Bridge::new(Arc::new(FakeSdk::new()) as Arc<dyn MessengerSdk>);

        let reply = bridge
            .handle("setAppBarColor", &obj(json!({"color": "#1a2b3c"})))
            .await;
        assert_eq!(reply.as_bool(), Some(true));

        let config = bridge.handle("getAppBarConfig", &no_args()).await;
        let config = config.as_object().expect("config map");
        assert_eq!(config["color"], json!("#1a2b3c"));
    }

    #[tokio::test]
    async fn malformed_color_is_rejected_and_leaves_config_unchanged() {
        let bridge = Bridge::new(Arc::new(FakeSdk::new()) as Arc<dyn MessengerSdk>);

        let reply = bridge
            .handle("setAppBarColor", &obj(json!({"color": "not-a-color"})))
            .await;
        assert_eq!(reply.as_bool(), Some(false));

        let config = bridge.handle("getAppBarConfig", &no_args()).await;
        let config = config.as_object().expect("config map");
        // Still the default blue.
        assert_eq!(config["color"], json!("#0000ff"));
    }

    #[tokio::test]
    async fn appearance_setters_reapply_to_a_shown_surface() {
        let sdk = Arc::new(FakeSdk::new());
        let bridge = initialized_bridge(Arc::clone(&sdk)).await;
        let presenter = Arc::new(RecordingPresenter::new());
        bridge.set_presenter(Some(Arc::clone(&presenter) as Arc<dyn SurfacePresenter>));

        bridge.handle("showMessenger", &no_args()).await;
        bridge
            .handle("setAppBarTitle", &obj(json!({"title": "Help"})))
            .await;

        let applied = presenter.applied();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].1.title, "Help");
    }

    #[tokio::test]
    async fn visibility_setters_update_config_and_tolerate_absent_args() {
        let bridge = Bridge::new(Arc::new(FakeSdk::new()) as Arc<dyn MessengerSdk>);

        let reply = bridge
            .handle("setAppBarVisibility", &obj(json!({"visible": false})))
            .await;
        assert_eq!(reply.as_bool(), Some(true));

        let reply = bridge.handle("setBackButtonVisibility", &no_args()).await;
        assert_eq!(reply.as_bool(), Some(true));

        let config = bridge.handle("getAppBarConfig", &no_args()).await;
        let config = config.as_object().expect("config map");
        assert_eq!(config["visible"], json!(false));
        assert_eq!(config["showBackButton"], json!(true));
    }

    #[tokio::test]
    async fn unknown_commands_are_not_implemented() {
        let bridge = Bridge::new(Arc::new(FakeSdk::new()) as Arc<dyn MessengerSdk>);
        let reply = bridge.handle("selfDestruct", &no_args()).await;
        assert_eq!(reply, CommandReply::NotImplemented);
    }

    #[tokio::test]
    async fn platform_version_is_reported() {
        let bridge = Bridge::new(Arc::new(FakeSdk::new()) as Arc<dyn MessengerSdk>);
        let reply = bridge.handle("getPlatformVersion", &no_args()).await;
        match reply {
            CommandReply::Value(Value::String(version)) => {
                assert!(version.starts_with("engage-bridge "));
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }
}
