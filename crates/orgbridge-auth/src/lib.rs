#![deny(missing_docs)]

//! # OrgBridge Auth
//!
//! Credential issuer for the cross-org event bridge.
//!
//! Implements the OAuth 2.0 bearer-assertion grant (RFC 7523): a signed,
//! short-lived identity assertion is exchanged for a bearer access token
//! against an org's token endpoint. The bridge runs this flow twice at
//! startup, once per org, with no shared state between the two.
//!
//! ```rust,no_run
//! use orgbridge_auth::{issue, load_private_key, IssuerConfig};
//!
//! # async fn run() -> Result<(), orgbridge_auth::AuthError> {
//! let key = load_private_key(std::path::Path::new("bridge.key"))?;
//! let http = reqwest::Client::new();
//! let session = issue(
//!     &http,
//!     &IssuerConfig {
//!         login_url: "https://login.example.com".into(),
//!         client_id: "3MVG9…".into(),
//!         username: "bridge@example.com".into(),
//!     },
//!     &key,
//! )
//! .await?;
//! println!("authenticated against {}", session.instance_url);
//! # Ok(())
//! # }
//! ```

pub mod assertion;
pub mod error;
pub mod issuer;

pub use assertion::{ASSERTION_TTL_SECS, AssertionClaims, sign_assertion};
pub use error::AuthError;
pub use issuer::{GRANT_TYPE, IssuerConfig, issue, load_private_key};
