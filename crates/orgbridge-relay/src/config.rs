//! Bridge configuration.
//!
//! All inputs arrive through environment variables; secrets (the private
//! key) are referenced by path and read at startup. A missing required
//! variable is a startup-fatal error: no partial bridge is attempted.

use std::path::PathBuf;

use orgbridge_auth::IssuerConfig;
use orgbridge_models::ChannelName;

/// Errors raised while assembling the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable was absent.
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    /// A variable was present but unusable.
    #[error("invalid value for {name}: {reason}")]
    InvalidVar {
        /// Variable name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Everything the bridge needs to run.
///
/// | Variable            | Required | Default              |
/// |---------------------|----------|----------------------|
/// | `SOURCE_LOGIN_URL`  | yes      |                      |
/// | `SOURCE_CLIENT_ID`  | yes      |                      |
/// | `SOURCE_USERNAME`   | yes      |                      |
/// | `TARGET_LOGIN_URL`  | yes      |                      |
/// | `TARGET_CLIENT_ID`  | yes      |                      |
/// | `TARGET_USERNAME`   | yes      |                      |
/// | `PRIVATE_KEY`       | yes      |                      |
/// | `EVENT_CHANNEL`     | yes      |                      |
/// | `LOG_OBJECT`        | no       | `Integration_Log__c` |
/// | `PAYLOAD_FIELD`     | no       | `Event_Data__c`      |
/// | `API_VERSION`       | no       | `v65.0`              |
/// | `QUEUE_CAPACITY`    | no       | `64`                 |
///
/// `PRIVATE_KEY` is the path to a PEM-encoded RSA key shared by both
/// orgs' connected apps.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Source org token-endpoint parameters.
    pub source: IssuerConfig,
    /// Target org token-endpoint parameters.
    pub target: IssuerConfig,
    /// Path to the PEM private key used for both assertions.
    pub private_key_path: PathBuf,
    /// Channel to subscribe to on the source org.
    pub channel: ChannelName,
    /// Platform API version segment, e.g. `v65.0`.
    pub api_version: String,
    /// sObject the forward records are created under.
    pub log_object: String,
    /// Field of that sObject carrying the serialized payload.
    pub payload_field: String,
    /// Capacity of the subscriber → forwarder queue.
    pub queue_capacity: usize,
}

impl BridgeConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::MissingVar(name));

        let channel_raw = required("EVENT_CHANNEL")?;
        let channel =
            ChannelName::new(&channel_raw).map_err(|e| ConfigError::InvalidVar {
                name: "EVENT_CHANNEL",
                reason: e.to_string(),
            })?;

        let queue_capacity = match lookup("QUEUE_CAPACITY") {
            None => 64,
            Some(raw) => raw.parse::<usize>().ok().filter(|n| *n > 0).ok_or(
                ConfigError::InvalidVar {
                    name: "QUEUE_CAPACITY",
                    reason: format!("expected a positive integer, got \"{raw}\""),
                },
            )?,
        };

        Ok(Self {
            source: IssuerConfig {
                login_url: required("SOURCE_LOGIN_URL")?,
                client_id: required("SOURCE_CLIENT_ID")?,
                username: required("SOURCE_USERNAME")?,
            },
            target: IssuerConfig {
                login_url: required("TARGET_LOGIN_URL")?,
                client_id: required("TARGET_CLIENT_ID")?,
                username: required("TARGET_USERNAME")?,
            },
            private_key_path: PathBuf::from(required("PRIVATE_KEY")?),
            channel,
            api_version: lookup("API_VERSION").unwrap_or_else(|| "v65.0".to_string()),
            log_object: lookup("LOG_OBJECT").unwrap_or_else(|| "Integration_Log__c".to_string()),
            payload_field: lookup("PAYLOAD_FIELD").unwrap_or_else(|| "Event_Data__c".to_string()),
            queue_capacity,
        })
    }
}
