// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Engage bridge.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::color::Color;
use crate::error::{EngageError, Result};

/// Process-lifetime session state owned by the bridge dispatcher.
///
/// Created at bridge construction, mutated only by the `initialize`,
/// `setUser`, `setAuthInfo`, and `logout` commands, gone at process end.
/// `initialized` is set true only when a non-blank credential and domain
/// were accepted together, and no command clears it afterwards.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub initialized: bool,
    /// The credential the SDK was (or would be) initialized with — the
    /// `apiSecret` argument when non-blank, else `apiKey`.
    pub api_credential: Option<String>,
    /// Cached but never used as a credential; kept for parity with the
    /// application-level contract.
    pub application_secret: Option<String>,
    pub domain: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub user_phone: Option<String>,
    /// Extra authentication fields accumulated across `setAuthInfo` calls.
    /// Last write wins per key.
    pub extra_auth: HashMap<String, String>,
}

impl Session {
    /// Merge string-valued entries into the cached extra auth fields.
    pub fn merge_auth<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.extra_auth.extend(entries);
    }

    /// Build the merged auth payload pushed to the SDK: the SDK's current
    /// info, overlaid with the session email/phone, overlaid with the
    /// cached extra fields.
    pub fn auth_payload(&self, existing: HashMap<String, String>) -> HashMap<String, String> {
        let mut payload = existing;
        if let Some(email) = &self.user_email {
            payload.insert("email".to_owned(), email.clone());
        }
        if let Some(phone) = &self.user_phone {
            payload.insert("phone".to_owned(), phone.clone());
        }
        for (key, value) in &self.extra_auth {
            payload.insert(key.clone(), value.clone());
        }
        payload
    }

    /// Clear the user identity and cached auth fields (the `logout` path).
    /// Leaves `initialized`, the credential, and the domain untouched.
    pub fn clear_identity(&mut self) {
        self.user_id = None;
        self.user_name = None;
        self.user_email = None;
        self.user_phone = None;
        self.extra_auth.clear();
    }

    /// The identity fields as a wire map (`null` for unset fields).
    pub fn identity_map(&self) -> Map<String, Value> {
        fn field(value: &Option<String>) -> Value {
            value.clone().map(Value::String).unwrap_or(Value::Null)
        }

        let mut map = Map::new();
        map.insert("userId".to_owned(), field(&self.user_id));
        map.insert("userName".to_owned(), field(&self.user_name));
        map.insert("userEmail".to_owned(), field(&self.user_email));
        map.insert("userPhone".to_owned(), field(&self.user_phone));
        map
    }
}

/// App-bar appearance applied to a presented chat surface.
///
/// Serializes to the wire shape the application layer reads back through
/// `getAppBarConfig`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppearanceConfig {
    pub title: String,
    #[serde(rename = "color")]
    pub bar_color: Color,
    #[serde(rename = "titleColor")]
    pub title_color: Color,
    #[serde(rename = "backArrowColor")]
    pub back_arrow_color: Color,
    #[serde(rename = "visible")]
    pub bar_visible: bool,
    #[serde(rename = "showBackButton")]
    pub show_back_button: bool,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            title: "Chat".to_owned(),
            bar_color: Color::BLUE,
            title_color: Color::BLACK,
            back_arrow_color: Color::BLACK,
            bar_visible: true,
            show_back_button: true,
        }
    }
}

/// A push-service device token recovered from its textual form.
///
/// Push services hand tokens to the application as hex strings, often
/// wrapped in angle brackets and spaced in four-byte groups.  Whitespace
/// and brackets are stripped; what remains must be even-length hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceToken(Vec<u8>);

impl DeviceToken {
    pub fn parse_hex(raw: &str) -> Result<Self> {
        let cleaned: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '<' && *c != '>')
            .collect();

        if cleaned.is_empty() {
            return Err(EngageError::InvalidDeviceToken("empty token".to_owned()));
        }

        hex::decode(&cleaned)
            .map(DeviceToken)
            .map_err(|e| EngageError::InvalidDeviceToken(e.to_string()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Names of the events the bridge can stream to the application layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventName {
    #[serde(rename = "onChatActivityOpened")]
    ChatOpened,
    #[serde(rename = "onChatActivityClosed")]
    ChatClosed,
    #[serde(rename = "onUnreadCountChanged")]
    UnreadCountChanged,
}

impl EventName {
    /// The wire name, as the application layer matches on it.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChatOpened => "onChatActivityOpened",
            Self::ChatClosed => "onChatActivityClosed",
            Self::UnreadCountChanged => "onUnreadCountChanged",
        }
    }
}

/// One emitted event: name, epoch-millis timestamp, payload map.
/// Constructed per emission, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub event: EventName,
    pub timestamp: i64,
    pub payload: Map<String, Value>,
}

impl EventRecord {
    /// Build a record stamped with the current time.
    pub fn new(event: EventName, payload: Map<String, Value>) -> Self {
        Self {
            event,
            timestamp: Utc::now().timestamp_millis(),
            payload,
        }
    }
}
