//! In-memory mock of an org endpoint, for tests and local bridge runs.
//!
//! Serves the three surfaces the bridge talks to:
//!
//! - `POST /services/oauth2/token` — bearer-assertion token exchange.
//! - `POST /cometd/{apiVersion}` — Bayeux handshake / subscribe / connect
//!   over an in-memory event queue.
//! - `POST /services/data/{apiVersion}/sobjects/{object}` — record
//!   creation into an in-memory store.
//!
//! [`MockOrg`] carries knobs for the failure paths the bridge has to
//! survive (rejected assertions, expired target sessions, dropped
//! streaming sessions) plus inspection hooks for assertions in tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Form, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;
use orgbridge_models::{Advice, BayeuxMessage, META_CONNECT, META_HANDSHAKE, META_SUBSCRIBE};
use serde_json::{json, Value};

/// How long a mock connect request parks before returning empty-handed.
///
/// Kept short so tests never stall; a real streaming endpoint holds the
/// poll open for tens of seconds.
const LONG_POLL_MS: u64 = 1_500;

/// A queued event waiting for delivery on a channel.
#[derive(Debug, Clone)]
struct PendingEvent {
    channel: String,
    payload: Value,
    replay_id: u64,
}

/// A stored forward record.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    /// sObject API name the record was created under.
    pub object: String,
    /// The request body as received.
    pub body: Value,
    /// Server-assigned record id.
    pub id: String,
}

#[derive(Default)]
struct Inner {
    instance_url: Mutex<String>,
    access_token: Mutex<String>,
    expected_client_id: Mutex<Option<String>>,
    reject_auth: AtomicBool,
    reject_writes: AtomicBool,
    soft_fail_writes: AtomicBool,
    connect_advice: Mutex<Option<Advice>>,
    token_requests: AtomicU64,
    next_replay_id: AtomicU64,
    sessions: Mutex<HashMap<String, HashSet<String>>>,
    pending: Mutex<VecDeque<PendingEvent>>,
    records: Mutex<Vec<StoredRecord>>,
}

/// Shared state behind the mock org router. Cheap to clone.
#[derive(Clone, Default)]
pub struct MockOrg {
    inner: Arc<Inner>,
}

impl MockOrg {
    /// Create a mock org that issues `access_token` and reports
    /// `instance_url` from its token endpoint.
    pub fn new(instance_url: &str, access_token: &str) -> Self {
        let org = Self::default();
        *org.inner.instance_url.lock().unwrap() = instance_url.to_string();
        *org.inner.access_token.lock().unwrap() = access_token.to_string();
        org
    }

    /// Update the advertised instance URL (tests bind an ephemeral port
    /// first and only then know the real address).
    pub fn set_instance_url(&self, url: &str) {
        *self.inner.instance_url.lock().unwrap() = url.to_string();
    }

    /// The currently advertised instance URL.
    pub fn instance_url(&self) -> String {
        self.inner.instance_url.lock().unwrap().clone()
    }

    /// Require token requests to carry this client id in the assertion's
    /// `iss` claim.
    pub fn expect_client_id(&self, client_id: &str) {
        *self.inner.expected_client_id.lock().unwrap() = Some(client_id.to_string());
    }

    /// Make the token endpoint reject every exchange with `invalid_grant`.
    pub fn reject_auth(&self, reject: bool) {
        self.inner.reject_auth.store(reject, Ordering::SeqCst);
    }

    /// Make record creation fail with 401 (expired/invalid session).
    pub fn reject_writes(&self, reject: bool) {
        self.inner.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Make record creation answer 200 with `success: false` and a
    /// field-level error, without storing anything.
    pub fn fail_writes_softly(&self, fail: bool) {
        self.inner.soft_fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Attach `advice` to the next successful connect acknowledgement.
    pub fn advise_on_connect(&self, advice: Advice) {
        *self.inner.connect_advice.lock().unwrap() = Some(advice);
    }

    /// Queue an event for delivery on `channel`.
    pub fn publish(&self, channel: &str, payload: Value) {
        let replay_id = self.inner.next_replay_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.pending.lock().unwrap().push_back(PendingEvent {
            channel: channel.to_string(),
            payload,
            replay_id,
        });
    }

    /// Forget all streaming sessions. The next connect or subscribe gets
    /// an unknown-client error with re-handshake advice.
    pub fn drop_sessions(&self) {
        self.inner.sessions.lock().unwrap().clear();
    }

    /// Records created so far, in creation order.
    pub fn records(&self) -> Vec<StoredRecord> {
        self.inner.records.lock().unwrap().clone()
    }

    /// Number of token-endpoint requests received so far.
    pub fn token_request_count(&self) -> u64 {
        self.inner.token_requests.load(Ordering::SeqCst)
    }

    /// Build the axum router serving this mock org.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/services/oauth2/token", post(token))
            .route("/cometd/{api_version}", post(cometd))
            .route(
                "/services/data/{api_version}/sobjects/{object}",
                post(create_record),
            )
            .with_state(self.clone())
    }
}

// ---------------------------------------------------------------------------
// Token endpoint
// ---------------------------------------------------------------------------

async fn token(
    State(org): State<MockOrg>,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    org.inner.token_requests.fetch_add(1, Ordering::SeqCst);

    if org.inner.reject_auth.load(Ordering::SeqCst) {
        return oauth_error("invalid_grant", "user hasn't approved this consumer");
    }

    if params.get("grant_type").map(String::as_str)
        != Some("urn:ietf:params:oauth:grant-type:jwt-bearer")
    {
        return oauth_error("unsupported_grant_type", "grant type not supported");
    }

    let Some(assertion) = params.get("assertion") else {
        return oauth_error("invalid_request", "missing assertion");
    };
    let parts: Vec<&str> = assertion.split('.').collect();
    if parts.len() != 3 {
        return oauth_error("invalid_grant", "malformed assertion");
    }

    // When configured, check the assertion's iss claim against the
    // expected connected-app client id.
    if let Some(expected) = org.inner.expected_client_id.lock().unwrap().clone() {
        match decode_claim(parts[1], "iss") {
            Some(iss) if iss == expected => {}
            _ => return oauth_error("invalid_client_id", "client identifier invalid"),
        }
    }

    let body = json!({
        "access_token": org.inner.access_token.lock().unwrap().clone(),
        "instance_url": org.inner.instance_url.lock().unwrap().clone(),
        "token_type": "Bearer",
        "issued_at": chrono::Utc::now().timestamp_millis().to_string(),
    });
    Json(body).into_response()
}

fn oauth_error(code: &str, description: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": code, "error_description": description })),
    )
        .into_response()
}

fn decode_claim(body_b64: &str, claim: &str) -> Option<String> {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;

    let bytes = URL_SAFE_NO_PAD.decode(body_b64).ok()?;
    let body: Value = serde_json::from_slice(&bytes).ok()?;
    body.get(claim)?.as_str().map(String::from)
}

// ---------------------------------------------------------------------------
// Streaming (Bayeux) endpoint
// ---------------------------------------------------------------------------

async fn cometd(
    State(org): State<MockOrg>,
    Path(_api_version): Path<String>,
    headers: HeaderMap,
    Json(requests): Json<Vec<BayeuxMessage>>,
) -> Response {
    // The streaming endpoint expects the OAuth scheme, not Bearer.
    let expected = format!("OAuth {}", org.inner.access_token.lock().unwrap());
    if header_value(&headers, "authorization") != Some(expected) {
        return (StatusCode::UNAUTHORIZED, "invalid streaming credentials").into_response();
    }

    let Some(request) = requests.first() else {
        return (StatusCode::BAD_REQUEST, "empty bayeux batch").into_response();
    };

    let responses = match request.channel.as_str() {
        META_HANDSHAKE => vec![handle_handshake(&org, request)],
        META_SUBSCRIBE => vec![handle_subscribe(&org, request)],
        META_CONNECT => handle_connect(&org, request).await,
        other => vec![BayeuxMessage {
            channel: other.to_string(),
            successful: Some(false),
            error: Some(format!("405::unsupported channel {other}")),
            id: request.id.clone(),
            ..BayeuxMessage::default()
        }],
    };

    Json(responses).into_response()
}

fn handle_handshake(org: &MockOrg, request: &BayeuxMessage) -> BayeuxMessage {
    let client_id = uuid::Uuid::new_v4().simple().to_string();
    org.inner
        .sessions
        .lock()
        .unwrap()
        .insert(client_id.clone(), HashSet::new());

    BayeuxMessage {
        channel: META_HANDSHAKE.to_string(),
        version: Some("1.0".to_string()),
        supported_connection_types: Some(vec!["long-polling".to_string()]),
        client_id: Some(client_id),
        successful: Some(true),
        id: request.id.clone(),
        advice: Some(Advice {
            reconnect: Some("retry".to_string()),
            interval: Some(0),
            timeout: Some(110_000),
        }),
        ..BayeuxMessage::default()
    }
}

fn handle_subscribe(org: &MockOrg, request: &BayeuxMessage) -> BayeuxMessage {
    let ack = |successful: bool, error: Option<String>, advice: Option<Advice>| BayeuxMessage {
        channel: META_SUBSCRIBE.to_string(),
        client_id: request.client_id.clone(),
        subscription: request.subscription.clone(),
        successful: Some(successful),
        error,
        advice,
        id: request.id.clone(),
        ..BayeuxMessage::default()
    };

    let (Some(client_id), Some(subscription)) = (&request.client_id, &request.subscription) else {
        return ack(false, Some("403::missing clientId or subscription".into()), None);
    };

    let mut sessions = org.inner.sessions.lock().unwrap();
    match sessions.get_mut(client_id) {
        Some(channels) => {
            channels.insert(subscription.clone());
            ack(true, None, None)
        }
        None => ack(
            false,
            Some(format!("402::Unknown client {client_id}")),
            Some(Advice {
                reconnect: Some("handshake".to_string()),
                ..Advice::default()
            }),
        ),
    }
}

async fn handle_connect(org: &MockOrg, request: &BayeuxMessage) -> Vec<BayeuxMessage> {
    let connect_ack = |successful: bool, error: Option<String>, advice: Option<Advice>| {
        BayeuxMessage {
            channel: META_CONNECT.to_string(),
            client_id: request.client_id.clone(),
            successful: Some(successful),
            error,
            advice,
            id: request.id.clone(),
            ..BayeuxMessage::default()
        }
    };

    let Some(client_id) = request.client_id.clone() else {
        return vec![connect_ack(false, Some("403::missing clientId".into()), None)];
    };

    // Park until events show up for this session's channels, or give up
    // after the mock long-poll window.
    let deadline = tokio::time::Instant::now() + Duration::from_millis(LONG_POLL_MS);
    loop {
        let subscribed = {
            let sessions = org.inner.sessions.lock().unwrap();
            match sessions.get(&client_id) {
                Some(channels) => channels.clone(),
                None => {
                    return vec![connect_ack(
                        false,
                        Some(format!("402::Unknown client {client_id}")),
                        Some(Advice {
                            reconnect: Some("handshake".to_string()),
                            ..Advice::default()
                        }),
                    )]
                }
            }
        };

        let delivered = {
            let mut pending = org.inner.pending.lock().unwrap();
            let mut delivered = Vec::new();
            let mut remaining = VecDeque::new();
            while let Some(event) = pending.pop_front() {
                if subscribed.contains(&event.channel) {
                    delivered.push(event);
                } else {
                    remaining.push_back(event);
                }
            }
            *pending = remaining;
            delivered
        };

        if !delivered.is_empty() || tokio::time::Instant::now() >= deadline {
            let mut responses: Vec<BayeuxMessage> = delivered
                .into_iter()
                .map(|event| BayeuxMessage {
                    channel: event.channel,
                    data: Some(json!({
                        "payload": event.payload,
                        "event": { "replayId": event.replay_id }
                    })),
                    ..BayeuxMessage::default()
                })
                .collect();
            let advice = org.inner.connect_advice.lock().unwrap().take();
            responses.push(connect_ack(true, None, advice));
            return responses;
        }

        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

// ---------------------------------------------------------------------------
// Record-creation endpoint
// ---------------------------------------------------------------------------

async fn create_record(
    State(org): State<MockOrg>,
    Path((_api_version, object)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let expected = format!("Bearer {}", org.inner.access_token.lock().unwrap());
    let authorized = header_value(&headers, "authorization") == Some(expected)
        && !org.inner.reject_writes.load(Ordering::SeqCst);
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!([{
                "message": "Session expired or invalid",
                "errorCode": "INVALID_SESSION_ID"
            }])),
        )
            .into_response();
    }

    if org.inner.soft_fail_writes.load(Ordering::SeqCst) {
        return Json(json!({
            "id": "",
            "success": false,
            "errors": [{
                "message": "custom validation failed",
                "errorCode": "FIELD_CUSTOM_VALIDATION_EXCEPTION"
            }]
        }))
        .into_response();
    }

    let id = format!("a07{}", uuid::Uuid::new_v4().simple());
    org.inner.records.lock().unwrap().push(StoredRecord {
        object,
        body,
        id: id.clone(),
    });

    (
        StatusCode::CREATED,
        Json(json!({ "id": id, "success": true, "errors": [] })),
    )
        .into_response()
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
