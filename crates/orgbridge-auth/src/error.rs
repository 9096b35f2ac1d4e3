//! Error types for the credential issuer.
//!
//! [`AuthError`] unifies every failure mode of the assertion → bearer
//! token exchange. All variants are fatal: the bridge never retries an
//! issuance, it aborts startup instead.

/// Errors that can occur while issuing a bearer session.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The private key file could not be read.
    #[error("private key unreadable: {0}")]
    KeyUnreadable(#[from] std::io::Error),

    /// The private key could not be parsed or the assertion could not be
    /// signed with it.
    #[error("assertion signing failed: {0}")]
    Assertion(#[from] jsonwebtoken::errors::Error),

    /// The token endpoint rejected the exchange. Carries the endpoint's
    /// raw response body for diagnostics.
    #[error("token endpoint rejected the assertion (status {status}): {body}")]
    TokenEndpoint {
        /// HTTP status code returned by the endpoint.
        status: u16,
        /// Raw response body, verbatim.
        body: String,
    },

    /// The HTTP call to the token endpoint failed at the transport level,
    /// or the success response could not be decoded.
    #[error("failed to reach token endpoint: {0}")]
    Http(#[from] reqwest::Error),
}
