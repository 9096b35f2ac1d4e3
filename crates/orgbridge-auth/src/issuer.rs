//! Bearer-session issuance.
//!
//! Exchanges a signed identity assertion for a [`BearerSession`] via a
//! single form-encoded POST to the org's token endpoint. There is no
//! retry and no refresh: a failed issuance aborts the run, and a session
//! that expires mid-run simply starts failing downstream calls.

use orgbridge_models::BearerSession;
use tracing::info;

use crate::assertion::{AssertionClaims, sign_assertion};
use crate::error::AuthError;

/// Grant type of the bearer-assertion exchange (RFC 7523).
pub const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Connection parameters for one org's token endpoint.
///
/// Two independent instances exist at startup (source, target); nothing
/// is shared between them.
#[derive(Debug, Clone)]
pub struct IssuerConfig {
    /// Login URL of the org (e.g. `https://login.salesforce.com`).
    pub login_url: String,
    /// Connected-app client identifier.
    pub client_id: String,
    /// Username of the integration principal.
    pub username: String,
}

impl IssuerConfig {
    /// The full token endpoint URL.
    pub fn token_endpoint(&self) -> String {
        format!(
            "{}/services/oauth2/token",
            self.login_url.trim_end_matches('/')
        )
    }
}

/// Read private key material from disk.
///
/// Separated from [`issue`] so the bridge can fail before any HTTP call
/// when the key file is missing.
pub fn load_private_key(path: &std::path::Path) -> Result<Vec<u8>, AuthError> {
    Ok(std::fs::read(path)?)
}

/// Exchange a freshly signed assertion for a bearer session.
///
/// Builds a new assertion on every call (the assertion window is short),
/// signs it with `private_key_pem`, and POSTs it to the token endpoint.
/// A non-success response propagates the endpoint's error body verbatim
/// inside [`AuthError::TokenEndpoint`].
pub async fn issue(
    http: &reqwest::Client,
    config: &IssuerConfig,
    private_key_pem: &[u8],
) -> Result<BearerSession, AuthError> {
    let claims = AssertionClaims::new(&config.client_id, &config.username, &config.login_url);
    let assertion = sign_assertion(&claims, private_key_pem)?;

    let res = http
        .post(config.token_endpoint())
        .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
        .send()
        .await?;

    if !res.status().is_success() {
        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        return Err(AuthError::TokenEndpoint { status, body });
    }

    let session: BearerSession = res.json().await?;
    info!(
        login_url = %config.login_url,
        instance_url = %session.instance_url,
        username = %config.username,
        "bearer session issued"
    );
    Ok(session)
}
