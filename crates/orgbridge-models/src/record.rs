//! Forward records: the persisted representation of a relayed event.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The body of a record-creation request on the target org.
///
/// One field carries the event payload in its canonical serialized form.
/// The payload itself is never inspected; whatever JSON the source
/// channel emitted is what gets persisted, as text.
///
/// No deduplication key is included: forwarding the same payload twice
/// creates two records.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(transparent)]
pub struct ForwardRecord(Map<String, Value>);

impl ForwardRecord {
    /// Build the record body for `payload`, stored under `payload_field`.
    pub fn new(payload_field: &str, payload: &Value) -> Self {
        let mut fields = Map::new();
        fields.insert(payload_field.to_string(), Value::String(payload.to_string()));
        Self(fields)
    }

    /// The serialized payload text, as it will be persisted.
    pub fn payload_text(&self) -> Option<&str> {
        self.0.values().next().and_then(Value::as_str)
    }
}

/// Acknowledgement returned by the record-creation endpoint.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RecordAck {
    /// Identifier of the created record.
    pub id: String,
    /// Whether the creation succeeded.
    pub success: bool,
    /// Field-level errors reported alongside a success flag.
    #[serde(default)]
    pub errors: Vec<Value>,
}
