#![deny(missing_docs)]

//! # OrgBridge Models
//!
//! Core data types for the cross-org event bridge.
//!
//! ## Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`session`] | Bearer session obtained from an org's token endpoint |
//! | [`channel`] | Validated streaming channel name (`ChannelName`) |
//! | [`wire`] | Bayeux wire messages (`BayeuxMessage`, `Advice`) |
//! | [`record`] | Forward record body and creation acknowledgement |

pub mod channel;
pub mod error;
pub mod record;
pub mod session;
pub mod wire;

// Re-export all public types at crate root for convenience.
// Downstream crates can use `orgbridge_models::BearerSession` directly.
pub use channel::*;
pub use error::*;
pub use record::*;
pub use session::*;
pub use wire::*;
