//! Identity assertion construction and signing.
//!
//! The bearer-assertion grant (RFC 7523) exchanges a short-lived signed
//! JWT for an access token, without interactive login. The assertion
//! names the connected-app client id as issuer, the principal username
//! as subject, and the org's login URL as audience.

use std::time::SystemTime;

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::Serialize;

use crate::error::AuthError;

/// Validity window of a freshly built assertion, in seconds.
///
/// Assertions are constructed per login attempt and never persisted, so
/// a few minutes is plenty.
pub const ASSERTION_TTL_SECS: u64 = 300;

/// Claims of the identity assertion presented to a token endpoint.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AssertionClaims {
    /// Connected-app client identifier (consumer key).
    pub iss: String,
    /// Username of the principal the token is issued for.
    pub sub: String,
    /// Login URL of the org the assertion targets.
    pub aud: String,
    /// Expiry, seconds since the Unix epoch.
    pub exp: u64,
}

impl AssertionClaims {
    /// Build claims expiring [`ASSERTION_TTL_SECS`] from now.
    pub fn new(client_id: &str, username: &str, login_url: &str) -> Self {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("system clock before epoch")
            .as_secs();

        Self {
            iss: client_id.to_string(),
            sub: username.to_string(),
            aud: login_url.to_string(),
            exp: now + ASSERTION_TTL_SECS,
        }
    }
}

/// Sign the claims with an RS256 key held in PEM form.
pub fn sign_assertion(claims: &AssertionClaims, private_key_pem: &[u8]) -> Result<String, AuthError> {
    let key = EncodingKey::from_rsa_pem(private_key_pem)?;
    let token = encode(&Header::new(Algorithm::RS256), claims, &key)?;
    Ok(token)
}
