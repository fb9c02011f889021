//! Webhook-event payloads.

use serde::{Deserialize, Serialize};

use crate::User;

/// Webhook-event envelope type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEventType {
    Ping,
    Event,
    Unknown(u8),
}

impl From<u8> for WebhookEventType {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Ping,
            1 => Self::Event,
            other => Self::Unknown(other),
        }
    }
}

/// Outer envelope of a webhook event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub version: Option<u8>,
    #[serde(default)]
    pub application_id: Option<String>,
    /// Raw envelope type code, see [`WebhookEvent::kind`].
    #[serde(rename = "type")]
    pub type_code: u8,
    /// Event body, present when the envelope type is `EVENT`.
    #[serde(default)]
    pub event: Option<EventBody>,
}

impl WebhookEvent {
    /// Event type name sent for application authorizations.
    pub const APPLICATION_AUTHORIZED: &'static str = "APPLICATION_AUTHORIZED";

    /// Returns the envelope type.
    pub fn kind(&self) -> WebhookEventType {
        WebhookEventType::from(self.type_code)
    }

    /// Returns the event type name, if this is an `EVENT` envelope.
    pub fn event_type(&self) -> Option<&str> {
        match self.kind() {
            WebhookEventType::Event => self.event.as_ref().map(|e| e.event_type.as_str()),
            _ => None,
        }
    }
}

/// Body of an `EVENT` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBody {
    /// Event type name, e.g. `APPLICATION_AUTHORIZED`.
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Event-specific data, decoded lazily.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Data of an `APPLICATION_AUTHORIZED` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationAuthorized {
    /// User who authorized the application.
    pub user: User,
    /// `0` for guild installs, `1` for user installs.
    #[serde(default)]
    pub integration_type: Option<u8>,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Guild the application was added to, for guild installs.
    #[serde(default)]
    pub guild: Option<Guild>,
}

/// A guild reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: String,
}
