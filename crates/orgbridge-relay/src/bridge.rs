//! Bridge assembly and run loop.
//!
//! Startup is strictly sequenced: read the private key, authenticate to
//! the source org, authenticate to the target org, and only then open
//! the streaming session. Any failure along that path aborts the run
//! before the next step; a live bridge only ever dies from a streaming
//! failure that survives the reconnect budget.
//!
//! The subscriber and the forward worker are separate tasks joined by a
//! bounded queue, so a slow target org delays long-poll renewal through
//! backpressure instead of timing out the source session behind an
//! in-callback write.

use std::sync::Arc;

use anyhow::Context as _;
use orgbridge_auth::{issue, load_private_key};
use orgbridge_models::BearerSession;
use orgbridge_sdk::{Backoff, FailedForwardSink, Forwarder, LogOnly, StreamingClient};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::config::BridgeConfig;

/// The assembled bridge process.
pub struct Bridge {
    config: BridgeConfig,
    backoff: Backoff,
    sink: Arc<dyn FailedForwardSink>,
}

impl Bridge {
    /// Build a bridge from its configuration with default policies:
    /// standard reconnect backoff, failed forwards logged and dropped.
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            backoff: Backoff::default(),
            sink: Arc::new(LogOnly),
        }
    }

    /// Replace the reconnect backoff policy.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Route failed forwards somewhere other than the log (a retry
    /// queue, a dead-letter store). The default drops them.
    #[must_use]
    pub fn with_failed_forward_sink(mut self, sink: Arc<dyn FailedForwardSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Authenticate both orgs, then relay events until a fatal error.
    ///
    /// Returns `Ok(())` only if the event queue closes cleanly, which
    /// does not happen in normal operation; the process is expected to
    /// run until killed.
    pub async fn run(self) -> anyhow::Result<()> {
        let key = load_private_key(&self.config.private_key_path)
            .with_context(|| format!("reading {}", self.config.private_key_path.display()))?;

        let http = reqwest::Client::new();
        let source = issue(&http, &self.config.source, &key)
            .await
            .context("source org authentication")?;
        let target = issue(&http, &self.config.target, &key)
            .await
            .context("target org authentication")?;

        self.relay(&source, &target).await
    }

    /// Relay with already-issued sessions. Split from [`run`](Self::run)
    /// so the streaming half can be exercised without a token exchange.
    pub async fn relay(
        &self,
        source: &BearerSession,
        target: &BearerSession,
    ) -> anyhow::Result<()> {
        let config = &self.config;
        info!(
            channel = %config.channel,
            source = %source.instance_url,
            target = %target.instance_url,
            queue_capacity = config.queue_capacity,
            "bridge live"
        );

        let subscriber = StreamingClient::new(source, &config.api_version, config.channel.clone())
            .with_backoff(self.backoff.clone());
        let forwarder = Forwarder::new(
            target,
            &config.api_version,
            &config.log_object,
            &config.payload_field,
        );

        let (tx, mut rx) = mpsc::channel(config.queue_capacity);

        // Consumer: one forward per event, failures cost that event only.
        let sink = Arc::clone(&self.sink);
        let worker = tokio::spawn(async move {
            let mut forwarded: u64 = 0;
            while let Some(payload) = rx.recv().await {
                match forwarder.forward(&payload).await {
                    Ok(ack) => {
                        forwarded += 1;
                        info!(record_id = %ack.id, forwarded, "event forwarded");
                    }
                    Err(forward_error) => sink.failed(&payload, &forward_error),
                }
            }
            forwarded
        });

        // Producer: owns the only sender, so the worker drains and stops
        // once the streaming session ends.
        let stream_result = subscriber.run(tx).await;

        let forwarded = worker.await.context("forward worker panicked")?;
        match &stream_result {
            Ok(()) => info!(forwarded, "bridge stopped"),
            Err(stream_error) => error!(error = %stream_error, forwarded, "streaming session lost"),
        }
        stream_result.context("streaming session ended")?;
        Ok(())
    }
}
