#![deny(missing_docs)]

//! # OrgBridge SDK
//!
//! Streaming subscriber and event forwarder for the cross-org event
//! bridge.
//!
//! The SDK provides:
//!
//! * [`StreamingClient`] — one Bayeux long-polling session against the
//!   source org, delivering events into a bounded channel.
//! * [`Forwarder`] — one record creation on the target org per event.
//! * [`Backoff`] — bounded exponential backoff driving reconnection.
//! * [`FailedForwardSink`] — extension point for events the target org
//!   rejected.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use orgbridge_models::{BearerSession, ChannelName};
//! use orgbridge_sdk::{Forwarder, StreamingClient};
//!
//! # async fn run(source: BearerSession, target: BearerSession) -> Result<(), Box<dyn std::error::Error>> {
//! let channel = ChannelName::new("/event/Order_Event__e")?;
//! let subscriber = StreamingClient::new(&source, "v65.0", channel);
//! let forwarder = Forwarder::new(&target, "v65.0", "Integration_Log__c", "Event_Data__c");
//!
//! let (tx, mut rx) = tokio::sync::mpsc::channel(64);
//! tokio::spawn(subscriber.run(tx));
//! while let Some(payload) = rx.recv().await {
//!     forwarder.forward(&payload).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod error;
pub mod forwarder;
pub mod streaming;

pub use backoff::Backoff;
pub use error::{ForwardError, StreamError};
pub use forwarder::{FailedForwardSink, Forwarder, LogOnly};
pub use streaming::{ConnectionState, StreamingClient};
