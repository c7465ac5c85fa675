//! Common test utilities for the gateway's acceptance tests. No NATS
//! connection is required here — these tests exercise the HTTP/WebSocket
//! surface directly against a `GatewayState` populated by hand, not the
//! bus-driven `EventConsumer`.

use std::time::Duration;

use reqwest::Client;
use tokio::sync::oneshot;

use gateway::GatewayState;

#[allow(dead_code)]
pub async fn spawn_app(state: GatewayState) -> String {
    let app = gateway::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind to ephemeral port");
    let addr = listener.local_addr().expect("failed to get local address");
    let base_url = format!("http://{addr}");

    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        tx.send(()).unwrap();
        axum::serve(listener, app).await.expect("server failed to start");
    });

    rx.await.expect("server failed to start");
    tokio::time::sleep(Duration::from_millis(50)).await;

    base_url
}

#[allow(dead_code)]
pub fn create_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(10))
        .connect_timeout(Duration::from_secs(5))
        .build()
        .expect("failed to create HTTP client")
}
