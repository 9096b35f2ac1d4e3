//! SDK error types.
//!
//! Streaming and forwarding fail differently and are handled differently
//! by the bridge: a [`StreamError`] ends the subscription (after bounded
//! reconnect attempts), while a [`ForwardError`] costs exactly one event
//! and never escalates.

/// Errors raised by the Bayeux streaming session.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The handshake was answered but did not establish a session.
    #[error("handshake failed: {detail}")]
    Handshake {
        /// Server-provided failure detail, verbatim.
        detail: String,
    },

    /// The subscribe request was not acknowledged.
    #[error("subscribe failed: {detail}")]
    Subscribe {
        /// Server-provided failure detail, verbatim.
        detail: String,
    },

    /// A connect exchange returned an unusable envelope.
    #[error("connect failed: {detail}")]
    Connect {
        /// What was wrong with the exchange.
        detail: String,
    },

    /// The streaming endpoint answered with a non-success HTTP status.
    #[error("streaming endpoint returned status {status}: {body}")]
    Endpoint {
        /// HTTP status code.
        status: u16,
        /// Raw response body, verbatim.
        body: String,
    },

    /// The server advised `reconnect: none`; the session cannot continue.
    #[error("server closed the session: {detail}")]
    ServerClosed {
        /// Accompanying error detail, if any.
        detail: String,
    },

    /// Transport-level HTTP failure.
    #[error("streaming transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not a valid Bayeux message array.
    #[error("malformed bayeux envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Reconnection attempts were exhausted without re-establishing the
    /// session.
    #[error("gave up reconnecting after {attempts} attempts")]
    RetriesExhausted {
        /// How many reconnect attempts were made.
        attempts: u32,
    },
}

/// Errors raised when persisting an event on the target org.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// The record-creation endpoint rejected the write (expired token,
    /// validation failure, …).
    #[error("target org rejected the record (status {status}): {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Raw response body, verbatim.
        body: String,
    },

    /// Transport-level HTTP failure, or an undecodable success response.
    #[error("forward transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
