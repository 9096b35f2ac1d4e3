//! Event forwarder.
//!
//! One authenticated POST per received event, creating a forward record
//! on the target org. No idempotency key is sent: replaying a payload
//! creates a second record. Failed forwards are routed to a
//! [`FailedForwardSink`] and never retried by the forwarder itself.

use orgbridge_models::{BearerSession, ForwardRecord, RecordAck};
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use tracing::{debug, error};

use crate::error::ForwardError;

/// Persists event payloads as records on the target org.
///
/// Holds the target org's bearer token for the lifetime of the run.
pub struct Forwarder {
    http: reqwest::Client,
    endpoint: String,
    authorization: String,
    payload_field: String,
}

impl Forwarder {
    /// Bind a forwarder to the target org's record-creation endpoint.
    pub fn new(
        session: &BearerSession,
        api_version: &str,
        object_name: &str,
        payload_field: &str,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: session.sobject_endpoint(api_version, object_name),
            authorization: format!("Bearer {}", session.access_token),
            payload_field: payload_field.to_string(),
        }
    }

    /// Create exactly one forward record for `payload`.
    ///
    /// The payload is serialized to its canonical JSON text and stored
    /// under the configured field. A non-success response carries the
    /// target's error body verbatim in [`ForwardError::Rejected`]; so
    /// does a 2xx whose ack reports `success: false`.
    pub async fn forward(&self, payload: &Value) -> Result<RecordAck, ForwardError> {
        let record = ForwardRecord::new(&self.payload_field, payload);
        let res = self
            .http
            .post(&self.endpoint)
            .header(AUTHORIZATION, &self.authorization)
            .json(&record)
            .send()
            .await?;

        let status = res.status().as_u16();
        if !res.status().is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ForwardError::Rejected { status, body });
        }

        let ack: RecordAck = res.json().await?;
        // Some endpoints report field-level failures inside a 2xx.
        if !ack.success {
            return Err(ForwardError::Rejected {
                status,
                body: serde_json::Value::Array(ack.errors).to_string(),
            });
        }
        debug!(record_id = %ack.id, "forward record created");
        Ok(ack)
    }
}

/// Extension point for forwards that failed.
///
/// The bridge drops failed events by default; an integration that needs
/// a retry queue or dead-letter store plugs one in here instead of
/// changing the forwarding semantics.
pub trait FailedForwardSink: Send + Sync {
    /// Called once per failed forward, with the payload that was lost.
    fn failed(&self, payload: &Value, error: &ForwardError);
}

/// Default sink: log the loss, drop the event.
pub struct LogOnly;

impl FailedForwardSink for LogOnly {
    fn failed(&self, payload: &Value, error: &ForwardError) {
        error!(error = %error, payload = %payload, "forward failed; event dropped");
    }
}
