use std::time::Duration;

use mock_org::MockOrg;
use serde_json::json;

/// Standalone mock org for local bridge runs.
///
/// Serves token, cometd, and sobject endpoints on one port and emits a
/// sample event every few seconds so a bridge pointed at it has traffic.
#[tokio::main]
async fn main() {
    let port: u16 = std::env::var("MOCK_ORG_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(4500);
    let channel = std::env::var("MOCK_EVENT_CHANNEL")
        .unwrap_or_else(|_| "/event/Sample_Event__e".to_string());

    let base_url = format!("http://localhost:{port}");
    let org = MockOrg::new(&base_url, "mock-org-token");

    // Keep a sample event flowing for anyone subscribed.
    let publisher = org.clone();
    let publish_channel = channel.clone();
    tokio::spawn(async move {
        let mut n = 0_u64;
        loop {
            tokio::time::sleep(Duration::from_secs(10)).await;
            n += 1;
            publisher.publish(&publish_channel, json!({ "type": "Sample", "n": n }));
            println!("MOCK-ORG: published event {n} on {publish_channel}");
        }
    });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("failed to bind listener");
    println!("MOCK-ORG: listening on {base_url}");
    println!("MOCK-ORG: access token is \"mock-org-token\", channel {channel}");
    axum::serve(listener, org.router()).await.expect("server error");
}
