//! End-to-end bridge tests: two mock orgs, a real key, the full path.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mock_org::MockOrg;
use orgbridge_auth::IssuerConfig;
use orgbridge_models::ChannelName;
use orgbridge_relay::{Bridge, BridgeConfig};
use orgbridge_sdk::{Backoff, FailedForwardSink, ForwardError};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};

const CHANNEL: &str = "/event/Order_Event__e";

async fn spawn_org(token: &str) -> MockOrg {
    let org = MockOrg::new("", token);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    org.set_instance_url(&base);

    let router = org.router();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    org
}

fn write_key_file(tag: &str) -> PathBuf {
    let mut rng = rand::thread_rng();
    let key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");
    let pem = key.to_pkcs1_pem(rsa::pkcs8::LineEnding::LF).unwrap();

    let path = std::env::temp_dir().join(format!(
        "orgbridge-e2e-{}-{tag}.pem",
        std::process::id()
    ));
    std::fs::write(&path, pem.as_bytes()).unwrap();
    path
}

fn config(source: &MockOrg, target: &MockOrg, key_path: PathBuf) -> BridgeConfig {
    // The mock serves login and instance traffic from one address.
    BridgeConfig {
        source: IssuerConfig {
            login_url: source.instance_url(),
            client_id: "source-client".into(),
            username: "bridge@source.example".into(),
        },
        target: IssuerConfig {
            login_url: target.instance_url(),
            client_id: "target-client".into(),
            username: "bridge@target.example".into(),
        },
        private_key_path: key_path,
        channel: ChannelName::new(CHANNEL).unwrap(),
        api_version: "v65.0".into(),
        log_object: "Integration_Log__c".into(),
        payload_field: "Event_Data__c".into(),
        queue_capacity: 8,
    }
}

async fn wait_until(what: &str, mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

/// Sink that records every dropped payload.
#[derive(Default)]
struct RecordingSink {
    count: AtomicU64,
    payloads: Mutex<Vec<Value>>,
}

impl FailedForwardSink for RecordingSink {
    fn failed(&self, payload: &Value, _error: &ForwardError) {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().unwrap().push(payload.clone());
    }
}

#[tokio::test]
async fn one_event_becomes_one_forward_record() {
    let source = spawn_org("source-token").await;
    let target = spawn_org("target-token").await;
    let key_path = write_key_file("happy");

    let bridge = Bridge::new(config(&source, &target, key_path));
    tokio::spawn(bridge.run());

    // Both issuances gate startup.
    wait_until("both orgs authenticated", || {
        source.token_request_count() == 1 && target.token_request_count() == 1
    })
    .await;

    source.publish(CHANNEL, json!({ "type": "Test", "id": 123 }));

    wait_until("forward record creation", || target.records().len() == 1).await;
    let records = target.records();
    assert_eq!(records[0].object, "Integration_Log__c");
    let stored: Value =
        serde_json::from_str(records[0].body["Event_Data__c"].as_str().unwrap()).unwrap();
    assert_eq!(stored, json!({ "type": "Test", "id": 123 }));
}

#[tokio::test]
async fn forward_failure_is_isolated_per_event() {
    let source = spawn_org("source-token").await;
    let target = spawn_org("target-token").await;
    let key_path = write_key_file("isolated");

    let sink = Arc::new(RecordingSink::default());
    let bridge = Bridge::new(config(&source, &target, key_path))
        .with_failed_forward_sink(Arc::clone(&sink) as Arc<dyn FailedForwardSink>);
    tokio::spawn(bridge.run());

    wait_until("both orgs authenticated", || {
        source.token_request_count() == 1 && target.token_request_count() == 1
    })
    .await;

    // Event 1 hits an expired target session and is dropped.
    target.reject_writes(true);
    source.publish(CHANNEL, json!({ "seq": 1 }));
    wait_until("first event dropped", || {
        sink.count.load(Ordering::SeqCst) == 1
    })
    .await;
    assert!(target.records().is_empty());

    // The subscription is still live: event 2 goes through untouched.
    target.reject_writes(false);
    source.publish(CHANNEL, json!({ "seq": 2 }));
    wait_until("second event forwarded", || target.records().len() == 1).await;

    let stored: Value =
        serde_json::from_str(target.records()[0].body["Event_Data__c"].as_str().unwrap()).unwrap();
    assert_eq!(stored, json!({ "seq": 2 }));
    assert_eq!(sink.payloads.lock().unwrap()[0], json!({ "seq": 1 }));
}

#[tokio::test]
async fn missing_key_file_aborts_before_any_http_call() {
    let source = spawn_org("source-token").await;
    let target = spawn_org("target-token").await;

    let bridge = Bridge::new(config(
        &source,
        &target,
        PathBuf::from("/nonexistent/bridge.pem"),
    ));
    let err = bridge.run().await.unwrap_err();
    assert!(format!("{err:#}").contains("private key unreadable"));

    assert_eq!(source.token_request_count(), 0);
    assert_eq!(target.token_request_count(), 0);
}

#[tokio::test]
async fn rejected_source_auth_stops_startup() {
    let source = spawn_org("source-token").await;
    let target = spawn_org("target-token").await;
    let key_path = write_key_file("rejected");
    source.reject_auth(true);

    let bridge = Bridge::new(config(&source, &target, key_path))
        .with_backoff(Backoff::new(Duration::from_millis(5), Duration::from_millis(5), 1));
    let err = bridge.run().await.unwrap_err();
    assert!(format!("{err:#}").contains("source org authentication"));

    // The target issuance never ran, and no subscription was attempted.
    assert_eq!(source.token_request_count(), 1);
    assert_eq!(target.token_request_count(), 0);
}
