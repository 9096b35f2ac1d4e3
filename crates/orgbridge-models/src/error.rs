//! Error types for the `orgbridge-models` crate.
//!
//! Fallible constructors in this crate return variants of [`ModelError`].

/// Errors produced when constructing or validating model types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A streaming channel name was empty or did not start with `/`.
    #[error("invalid channel name \"{value}\": {reason}")]
    InvalidChannel {
        /// The value that failed validation.
        value: String,
        /// Human-readable explanation.
        reason: String,
    },
}
