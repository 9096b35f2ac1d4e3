//! Bayeux wire messages.
//!
//! The streaming endpoint speaks the Bayeux protocol over HTTP
//! long-polling: every request is a JSON array of messages POSTed to the
//! cometd endpoint, and every response is a JSON array of messages. The
//! meta channels drive the session lifecycle:
//!
//! | Channel | Purpose |
//! |---------|---------|
//! | `/meta/handshake` | Negotiate protocol version and transport, obtain a `clientId` |
//! | `/meta/subscribe` | Bind the session to an event channel |
//! | `/meta/connect`   | Long-poll; the server parks the request until events arrive |
//!
//! Event deliveries arrive on the subscribed channel itself, with the
//! payload under `data`. The bridge treats that payload as an opaque
//! [`serde_json::Value`] end to end.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Bayeux protocol version negotiated at handshake.
pub const BAYEUX_VERSION: &str = "1.0";

/// The only transport the bridge negotiates. The platform's streaming
/// endpoint also offers `callback-polling`, which the bridge never uses.
pub const LONG_POLLING: &str = "long-polling";

/// Handshake meta channel.
pub const META_HANDSHAKE: &str = "/meta/handshake";
/// Connect (long-poll) meta channel.
pub const META_CONNECT: &str = "/meta/connect";
/// Subscribe meta channel.
pub const META_SUBSCRIBE: &str = "/meta/subscribe";

// ---------------------------------------------------------------------------
// BayeuxMessage
// ---------------------------------------------------------------------------

/// A single Bayeux message, request or response.
///
/// The Bayeux wire format is one loosely-typed object per message; which
/// fields are present depends on the channel and direction. A single
/// struct with optional fields keeps (de)serialization uniform across
/// handshake, subscribe, connect, and event delivery.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BayeuxMessage {
    /// Channel the message belongs to (`/meta/*` or the event channel).
    pub channel: String,
    /// Protocol version (handshake only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Transports the client supports (handshake request only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_connection_types: Option<Vec<String>>,
    /// Transport in use (connect request only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    /// Server-assigned session identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Channel being subscribed to (subscribe request/response only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,
    /// Per-request message id, echoed back by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Whether a meta operation succeeded (responses only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successful: Option<bool>,
    /// Server-provided failure detail (responses only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Server guidance for the client's next move.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advice: Option<Advice>,
    /// Event delivery body; opaque to the bridge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl BayeuxMessage {
    /// Build a `/meta/handshake` request.
    pub fn handshake(id: u64) -> Self {
        Self {
            channel: META_HANDSHAKE.to_string(),
            version: Some(BAYEUX_VERSION.to_string()),
            supported_connection_types: Some(vec![LONG_POLLING.to_string()]),
            id: Some(id.to_string()),
            ..Self::default()
        }
    }

    /// Build a `/meta/subscribe` request for the given channel.
    pub fn subscribe(client_id: &str, subscription: &str, id: u64) -> Self {
        Self {
            channel: META_SUBSCRIBE.to_string(),
            client_id: Some(client_id.to_string()),
            subscription: Some(subscription.to_string()),
            id: Some(id.to_string()),
            ..Self::default()
        }
    }

    /// Build a `/meta/connect` (long-poll) request.
    pub fn connect(client_id: &str, id: u64) -> Self {
        Self {
            channel: META_CONNECT.to_string(),
            client_id: Some(client_id.to_string()),
            connection_type: Some(LONG_POLLING.to_string()),
            id: Some(id.to_string()),
            ..Self::default()
        }
    }

    /// Whether a meta response reports success.
    pub fn is_successful(&self) -> bool {
        self.successful == Some(true)
    }

    /// Extract the event payload from a delivery message.
    ///
    /// Platform events nest the application payload under
    /// `data.payload` (alongside `data.event.replayId`); push topics put
    /// the record directly under `data`. Either way the result stays
    /// opaque.
    pub fn event_payload(&self) -> Option<Value> {
        let data = self.data.as_ref()?;
        match data.get("payload") {
            Some(payload) => Some(payload.clone()),
            None => Some(data.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Advice
// ---------------------------------------------------------------------------

/// Server advice attached to a Bayeux response.
///
/// Tells the client how to proceed after the current exchange: reconnect
/// with a fresh handshake, retry the connect, or give up.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Advice {
    /// One of `"retry"`, `"handshake"`, `"none"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconnect: Option<String>,
    /// Milliseconds to wait before the next connect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    /// Server-side long-poll timeout in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl Advice {
    /// The session is gone; only a new handshake can recover.
    pub fn wants_handshake(&self) -> bool {
        self.reconnect.as_deref() == Some("handshake")
    }

    /// The server is telling the client to stop reconnecting entirely.
    pub fn is_terminal(&self) -> bool {
        self.reconnect.as_deref() == Some("none")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
