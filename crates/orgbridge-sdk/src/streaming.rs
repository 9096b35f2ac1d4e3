//! Bayeux streaming subscriber.
//!
//! [`StreamingClient`] owns one long-polling session against the source
//! org's cometd endpoint and delivers every event on the subscribed
//! channel, in arrival order, into a bounded [`mpsc`] channel. The
//! receiving end of that channel is the forward worker; `send().await`
//! is the backpressure point that keeps a slow target org from piling
//! events up in memory.
//!
//! Session lifecycle is an explicit state machine:
//!
//! ```text
//! Disconnected ── handshake ──▶ Handshaking ── clientId ──▶ Connected
//!      ▲                                                        │
//!      │                                       connect loop, one│long-poll
//!      │                                       after another    │
//!      └────── backoff ◀── Reconnecting ◀── failure / advice ───┘
//! ```
//!
//! A dropped session is re-handshaken (and re-subscribed) under a
//! bounded exponential [`Backoff`]; exhausting the budget, or a server
//! `reconnect: none` advice, ends the run with an error. Delivery is
//! at-most-once: nothing received during a failed forward is replayed.

use orgbridge_models::{
    BayeuxMessage, BearerSession, ChannelName, META_CONNECT, META_HANDSHAKE, META_SUBSCRIBE,
};
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::error::StreamError;

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session; nothing attempted yet.
    Disconnected,
    /// Handshake (and initial subscribe) in flight.
    Handshaking,
    /// Live: connect long-polls are being issued back to back.
    Connected,
    /// Session lost; waiting out the backoff before a new handshake.
    Reconnecting,
}

/// What a single connect cycle concluded.
enum PollOutcome {
    /// Stay connected, issue the next long-poll immediately.
    Continue,
    /// The session is gone; a fresh handshake is required.
    Rehandshake,
    /// The event consumer hung up; wind the session down.
    ReceiverGone,
}

/// One active Bayeux client bound to one channel.
///
/// Holds the source org's bearer token for its entire lifetime; tokens
/// are never rotated within a run.
pub struct StreamingClient {
    http: reqwest::Client,
    endpoint: String,
    authorization: String,
    channel: ChannelName,
    client_id: Option<String>,
    next_id: u64,
    state: ConnectionState,
    backoff: Backoff,
}

impl StreamingClient {
    /// Bind a client to the org's streaming endpoint for `channel`.
    ///
    /// The streaming endpoint authenticates with the `OAuth` scheme
    /// rather than `Bearer`.
    pub fn new(session: &BearerSession, api_version: &str, channel: ChannelName) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: session.cometd_endpoint(api_version),
            authorization: format!("OAuth {}", session.access_token),
            channel,
            client_id: None,
            next_id: 0,
            state: ConnectionState::Disconnected,
            backoff: Backoff::default(),
        }
    }

    /// Replace the default reconnect backoff.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Current session state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The channel this client is subscribed to.
    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    /// Run the session until the consumer hangs up (clean exit) or the
    /// session fails beyond recovery.
    ///
    /// Every event payload on the subscribed channel is sent into
    /// `events` in arrival order. The send awaits queue capacity, so a
    /// slow consumer delays the next long-poll rather than growing an
    /// unbounded buffer.
    pub async fn run(mut self, events: mpsc::Sender<Value>) -> Result<(), StreamError> {
        loop {
            if let Err(error) = self.establish().await {
                if matches!(error, StreamError::ServerClosed { .. }) {
                    return Err(error);
                }
                self.state = ConnectionState::Reconnecting;
                let Some(delay) = self.backoff.next_delay() else {
                    warn!(error = %error, "reconnect budget exhausted");
                    return Err(StreamError::RetriesExhausted {
                        attempts: self.backoff.attempts(),
                    });
                };
                warn!(error = %error, ?delay, "session establishment failed; backing off");
                tokio::time::sleep(delay).await;
                continue;
            }
            self.backoff.reset();

            // Connect loop: one long-poll after another while the session
            // holds.
            let client_id = match self.client_id.clone() {
                Some(id) => id,
                None => continue,
            };
            loop {
                match self.poll_once(&client_id, &events).await {
                    Ok(PollOutcome::Continue) => {}
                    Ok(PollOutcome::ReceiverGone) => {
                        info!("event consumer gone; closing streaming session");
                        return Ok(());
                    }
                    Ok(PollOutcome::Rehandshake) => {
                        warn!(channel = %self.channel, "session dropped by server; re-handshaking");
                        break;
                    }
                    Err(error @ StreamError::ServerClosed { .. }) => return Err(error),
                    Err(error) => {
                        warn!(error = %error, "connect cycle failed");
                        break;
                    }
                }
            }

            self.client_id = None;
            self.state = ConnectionState::Reconnecting;
            let Some(delay) = self.backoff.next_delay() else {
                return Err(StreamError::RetriesExhausted {
                    attempts: self.backoff.attempts(),
                });
            };
            tokio::time::sleep(delay).await;
        }
    }

    /// Handshake, then subscribe. Both must succeed before events count
    /// on delivery.
    async fn establish(&mut self) -> Result<(), StreamError> {
        self.state = ConnectionState::Handshaking;

        let id = self.next_id();
        let responses = self.exchange(&[BayeuxMessage::handshake(id)]).await?;
        let reply = responses
            .iter()
            .find(|m| m.channel == META_HANDSHAKE)
            .ok_or_else(|| StreamError::Handshake {
                detail: "no handshake reply in response".to_string(),
            })?;
        if !reply.is_successful() {
            if reply.advice.as_ref().is_some_and(|a| a.is_terminal()) {
                return Err(StreamError::ServerClosed {
                    detail: reply.error.clone().unwrap_or_default(),
                });
            }
            return Err(StreamError::Handshake {
                detail: reply.error.clone().unwrap_or_default(),
            });
        }
        let client_id = reply.client_id.clone().ok_or_else(|| StreamError::Handshake {
            detail: "handshake reply missing clientId".to_string(),
        })?;
        debug!(client_id = %client_id, "handshake acknowledged");

        let id = self.next_id();
        let subscribe = BayeuxMessage::subscribe(&client_id, self.channel.as_str(), id);
        let responses = self.exchange(&[subscribe]).await?;
        let reply = responses
            .iter()
            .find(|m| m.channel == META_SUBSCRIBE)
            .ok_or_else(|| StreamError::Subscribe {
                detail: "no subscribe reply in response".to_string(),
            })?;
        if !reply.is_successful() {
            return Err(StreamError::Subscribe {
                detail: reply.error.clone().unwrap_or_default(),
            });
        }

        self.client_id = Some(client_id);
        self.state = ConnectionState::Connected;
        info!(channel = %self.channel, "subscription live");
        Ok(())
    }

    /// Issue one long-poll and deliver whatever it brought.
    async fn poll_once(
        &mut self,
        client_id: &str,
        events: &mpsc::Sender<Value>,
    ) -> Result<PollOutcome, StreamError> {
        if events.is_closed() {
            return Ok(PollOutcome::ReceiverGone);
        }

        let id = self.next_id();
        let responses = self.exchange(&[BayeuxMessage::connect(client_id, id)]).await?;

        // Deliver queued events first, in the order the server sent them.
        for message in &responses {
            if message.channel != self.channel.as_str() {
                continue;
            }
            let Some(payload) = message.event_payload() else {
                continue;
            };
            debug!(channel = %self.channel, "event received");
            if events.send(payload).await.is_err() {
                return Ok(PollOutcome::ReceiverGone);
            }
        }

        let ack = responses
            .iter()
            .find(|m| m.channel == META_CONNECT)
            .ok_or_else(|| StreamError::Connect {
                detail: "no connect reply in response".to_string(),
            })?;

        if let Some(advice) = &ack.advice {
            if advice.is_terminal() {
                return Err(StreamError::ServerClosed {
                    detail: ack.error.clone().unwrap_or_default(),
                });
            }
            if let Some(interval) = advice.interval.filter(|ms| *ms > 0) {
                tokio::time::sleep(std::time::Duration::from_millis(interval)).await;
            }
            if advice.wants_handshake() {
                return Ok(PollOutcome::Rehandshake);
            }
        }

        if ack.is_successful() {
            Ok(PollOutcome::Continue)
        } else {
            // Unsuccessful connect without usable advice: treat the
            // session as lost.
            Ok(PollOutcome::Rehandshake)
        }
    }

    /// POST a Bayeux batch and decode the response array.
    async fn exchange(&self, batch: &[BayeuxMessage]) -> Result<Vec<BayeuxMessage>, StreamError> {
        let res = self
            .http
            .post(&self.endpoint)
            .header(AUTHORIZATION, &self.authorization)
            .json(batch)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(StreamError::Endpoint { status, body });
        }

        let text = res.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> StreamingClient {
        let session = BearerSession {
            access_token: "tok".into(),
            instance_url: "https://org.example.com".into(),
        };
        StreamingClient::new(&session, "v65.0", ChannelName::new("/event/E__e").unwrap())
    }

    #[test]
    fn starts_disconnected() {
        assert_eq!(client().state(), ConnectionState::Disconnected);
    }

    #[test]
    fn endpoint_and_auth_scheme() {
        let c = client();
        assert_eq!(c.endpoint, "https://org.example.com/cometd/v65.0");
        assert_eq!(c.authorization, "OAuth tok");
    }

    #[test]
    fn message_ids_are_monotonic() {
        let mut c = client();
        assert_eq!(c.next_id(), 1);
        assert_eq!(c.next_id(), 2);
        assert_eq!(c.next_id(), 3);
    }
}
