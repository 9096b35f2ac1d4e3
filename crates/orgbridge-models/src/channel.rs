//! Streaming channel names.
//!
//! A [`ChannelName`] identifies the publish/subscribe channel the bridge
//! listens on (e.g. `/event/Order_Event__e` for a platform event, or
//! `/topic/InvoiceUpdates` for a push topic). Bayeux channel names always
//! begin with `/`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// A validated Bayeux channel name.
///
/// # Examples
///
/// ```
/// use orgbridge_models::ChannelName;
///
/// let channel = ChannelName::new("/event/Order_Event__e").unwrap();
/// assert_eq!(channel.as_str(), "/event/Order_Event__e");
///
/// assert!(ChannelName::new("missing-slash").is_err());
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelName(String);

impl ChannelName {
    /// Create a channel name, validating the Bayeux naming rules.
    pub fn new(name: &str) -> Result<Self, ModelError> {
        if name.is_empty() {
            return Err(ModelError::InvalidChannel {
                value: name.to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if !name.starts_with('/') {
            return Err(ModelError::InvalidChannel {
                value: name.to_string(),
                reason: "must start with '/'".to_string(),
            });
        }
        Ok(Self(name.to_string()))
    }

    /// Return the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ChannelName {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
