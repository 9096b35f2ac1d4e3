//! SDK integration tests against an in-process mock org.

use std::time::Duration;

use mock_org::MockOrg;
use orgbridge_models::{Advice, BearerSession, ChannelName};
use orgbridge_sdk::{Backoff, ForwardError, Forwarder, StreamError, StreamingClient};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::timeout;

const CHANNEL: &str = "/event/Order_Event__e";
const TOKEN: &str = "tok-sdk-tests";

/// Serve a mock org on an ephemeral port; returns the handle and its
/// bearer session.
async fn spawn_org() -> (MockOrg, BearerSession) {
    let org = MockOrg::new("", TOKEN);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    org.set_instance_url(&base);

    let router = org.router();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let session = BearerSession {
        access_token: TOKEN.to_string(),
        instance_url: base,
    };
    (org, session)
}

fn fast_backoff() -> Backoff {
    Backoff::new(Duration::from_millis(10), Duration::from_millis(40), 5)
}

async fn recv_one(rx: &mut mpsc::Receiver<Value>) -> Value {
    timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event stream ended")
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

#[tokio::test]
async fn events_arrive_in_emission_order() {
    let (org, session) = spawn_org().await;
    let client = StreamingClient::new(&session, "v65.0", ChannelName::new(CHANNEL).unwrap())
        .with_backoff(fast_backoff());

    let (tx, mut rx) = mpsc::channel(8);
    let run = tokio::spawn(client.run(tx));

    for n in 1..=5 {
        org.publish(CHANNEL, json!({ "seq": n }));
    }

    for n in 1..=5 {
        let payload = recv_one(&mut rx).await;
        assert_eq!(payload["seq"], n, "event {n} out of order");
    }

    // Dropping the receiver ends the session cleanly.
    drop(rx);
    let result = timeout(Duration::from_secs(10), run).await.unwrap().unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn events_on_other_channels_are_ignored() {
    let (org, session) = spawn_org().await;
    let client = StreamingClient::new(&session, "v65.0", ChannelName::new(CHANNEL).unwrap())
        .with_backoff(fast_backoff());

    let (tx, mut rx) = mpsc::channel(8);
    tokio::spawn(client.run(tx));

    org.publish("/event/Other_Event__e", json!({ "seq": "wrong" }));
    org.publish(CHANNEL, json!({ "seq": "right" }));

    let payload = recv_one(&mut rx).await;
    assert_eq!(payload["seq"], "right");
}

#[tokio::test]
async fn session_recovers_after_server_side_drop() {
    let (org, session) = spawn_org().await;
    let client = StreamingClient::new(&session, "v65.0", ChannelName::new(CHANNEL).unwrap())
        .with_backoff(fast_backoff());

    let (tx, mut rx) = mpsc::channel(8);
    tokio::spawn(client.run(tx));

    org.publish(CHANNEL, json!({ "seq": 1 }));
    assert_eq!(recv_one(&mut rx).await["seq"], 1);

    // Server forgets the session; the client must re-handshake,
    // re-subscribe, and keep delivering.
    org.drop_sessions();
    org.publish(CHANNEL, json!({ "seq": 2 }));
    assert_eq!(recv_one(&mut rx).await["seq"], 2);
}

#[tokio::test]
async fn unreachable_endpoint_exhausts_reconnect_budget() {
    // Nothing listens on this port.
    let session = BearerSession {
        access_token: TOKEN.to_string(),
        instance_url: "http://127.0.0.1:9".to_string(),
    };
    let client = StreamingClient::new(&session, "v65.0", ChannelName::new(CHANNEL).unwrap())
        .with_backoff(Backoff::new(Duration::from_millis(5), Duration::from_millis(5), 2));

    let (tx, _rx) = mpsc::channel(8);
    let result = timeout(Duration::from_secs(30), client.run(tx)).await.unwrap();
    assert!(matches!(
        result,
        Err(orgbridge_sdk::StreamError::RetriesExhausted { attempts: 2 })
    ));
}

#[tokio::test]
async fn bad_token_is_an_endpoint_error() {
    let (_org, session) = spawn_org().await;
    let wrong = BearerSession {
        access_token: "not-the-token".to_string(),
        instance_url: session.instance_url.clone(),
    };
    let client = StreamingClient::new(&wrong, "v65.0", ChannelName::new(CHANNEL).unwrap())
        .with_backoff(Backoff::new(Duration::from_millis(5), Duration::from_millis(5), 1));

    let (tx, _rx) = mpsc::channel(8);
    let result = timeout(Duration::from_secs(30), client.run(tx)).await.unwrap();
    // 401 on handshake, then the budget runs out.
    assert!(result.is_err());
}

#[tokio::test]
async fn terminal_advice_ends_the_session_without_reconnecting() {
    let (org, session) = spawn_org().await;
    org.advise_on_connect(Advice {
        reconnect: Some("none".to_string()),
        ..Advice::default()
    });
    let client = StreamingClient::new(&session, "v65.0", ChannelName::new(CHANNEL).unwrap())
        .with_backoff(fast_backoff());

    let (tx, _rx) = mpsc::channel(8);
    let result = timeout(Duration::from_secs(10), client.run(tx)).await.unwrap();
    // `reconnect: none` is final: no handshake retries, no exhausted
    // budget, just the server's closure.
    assert!(matches!(result, Err(StreamError::ServerClosed { .. })));
}

#[tokio::test]
async fn interval_advice_delays_the_next_poll() {
    let (org, session) = spawn_org().await;
    org.advise_on_connect(Advice {
        interval: Some(400),
        ..Advice::default()
    });
    org.publish(CHANNEL, json!({ "seq": 1 }));

    let client = StreamingClient::new(&session, "v65.0", ChannelName::new(CHANNEL).unwrap())
        .with_backoff(fast_backoff());
    let (tx, mut rx) = mpsc::channel(8);
    tokio::spawn(client.run(tx));

    // Event 1 rides the connect cycle that carries the advice.
    assert_eq!(recv_one(&mut rx).await["seq"], 1);
    let delivered_first = std::time::Instant::now();
    org.publish(CHANNEL, json!({ "seq": 2 }));

    // The next long-poll only starts after the advised interval, so
    // event 2 arrives later but is not lost.
    assert_eq!(recv_one(&mut rx).await["seq"], 2);
    assert!(
        delivered_first.elapsed() >= Duration::from_millis(300),
        "next poll started before the advised interval elapsed"
    );
}

// ---------------------------------------------------------------------------
// Forwarding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn forward_creates_one_record_with_serialized_payload() {
    let (org, session) = spawn_org().await;
    let forwarder = Forwarder::new(&session, "v65.0", "Integration_Log__c", "Event_Data__c");

    let payload = json!({ "type": "Test", "id": 123 });
    let ack = forwarder.forward(&payload).await.unwrap();
    assert!(ack.success);

    let records = org.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].object, "Integration_Log__c");

    let stored: Value =
        serde_json::from_str(records[0].body["Event_Data__c"].as_str().unwrap()).unwrap();
    assert_eq!(stored, payload);
}

#[tokio::test]
async fn replaying_a_payload_creates_two_records() {
    // Documented non-property: there is no dedup key.
    let (org, session) = spawn_org().await;
    let forwarder = Forwarder::new(&session, "v65.0", "Integration_Log__c", "Event_Data__c");

    let payload = json!({ "type": "Test", "id": 123 });
    forwarder.forward(&payload).await.unwrap();
    forwarder.forward(&payload).await.unwrap();

    let records = org.records();
    assert_eq!(records.len(), 2);
    assert_ne!(records[0].id, records[1].id);
    assert_eq!(records[0].body, records[1].body);
}

#[tokio::test]
async fn rejected_forward_carries_target_error_body() {
    let (org, session) = spawn_org().await;
    org.reject_writes(true);
    let forwarder = Forwarder::new(&session, "v65.0", "Integration_Log__c", "Event_Data__c");

    let err = forwarder.forward(&json!({ "n": 1 })).await.unwrap_err();
    match err {
        ForwardError::Rejected { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("INVALID_SESSION_ID"));
        }
        other => panic!("expected Rejected, got {other}"),
    }

    // Recovery on the target side is per request, nothing is cached.
    org.reject_writes(false);
    assert!(forwarder.forward(&json!({ "n": 2 })).await.is_ok());
    assert_eq!(org.records().len(), 1);
}

#[tokio::test]
async fn soft_failed_write_is_rejected_despite_the_2xx() {
    let (org, session) = spawn_org().await;
    org.fail_writes_softly(true);
    let forwarder = Forwarder::new(&session, "v65.0", "Integration_Log__c", "Event_Data__c");

    let err = forwarder.forward(&json!({ "n": 1 })).await.unwrap_err();
    match err {
        ForwardError::Rejected { status, body } => {
            assert_eq!(status, 200);
            assert!(body.contains("FIELD_CUSTOM_VALIDATION_EXCEPTION"), "body was: {body}");
        }
        other => panic!("expected Rejected, got {other}"),
    }
    assert!(org.records().is_empty());
}
