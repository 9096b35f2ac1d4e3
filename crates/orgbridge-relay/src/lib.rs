#![deny(missing_docs)]

//! # OrgBridge Relay
//!
//! The cross-org event bridge process: authenticates to a source and a
//! target org, subscribes to one streaming channel on the source, and
//! persists every received event as a log record on the target.
//!
//! The binary wraps [`Bridge`]; the pieces live in library form so the
//! whole path can be driven against mock orgs in tests.

pub mod bridge;
pub mod config;

pub use bridge::Bridge;
pub use config::{BridgeConfig, ConfigError};
