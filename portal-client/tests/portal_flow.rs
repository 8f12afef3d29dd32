//! End-to-end: the terminal controller against a live portal on an
//! ephemeral port, backed by the mock WiFi backend.

use axum::{routing::get, Json, Router};
use portal_client::api::{ClientError, PortalClient};
use portal_client::dispatch;
use portal_core::backends::MockBackend;
use portal_core::config::PortalOptions;
use portal_core::controller::{Intent, PageState, StatusKind};
use portal_core::frontend::EmbedFrontend;
use portal_core::store::CredentialStore;
use portal_core::web_server::{self, AppState, ProvisionOutcome};
use portal_core::Credentials;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

type ServerHandle = JoinHandle<portal_core::Result<Option<ProvisionOutcome>>>;

async fn start_portal(dir: &tempfile::TempDir) -> (PortalClient, Arc<AppState>, ServerHandle) {
    let state = Arc::new(AppState::new(
        Arc::new(MockBackend::new().with_delay(Duration::ZERO)),
        Arc::new(EmbedFrontend::new()),
        CredentialStore::new(dir.path().join("wifi.json")),
        PortalOptions {
            restart_delay: Duration::ZERO,
            ..PortalOptions::default()
        },
    ));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(web_server::serve(listener, state.clone()));
    let client = PortalClient::new(format!("http://{addr}/")).unwrap();
    (client, state, server)
}

#[tokio::test]
async fn scan_then_connect() {
    let dir = tempfile::tempdir().unwrap();
    let (client, state, server) = start_portal(&dir).await;
    let mut page = PageState::new();

    dispatch(&client, &mut page, Intent::Scan).await;
    let view = page.view();
    let rows: Vec<_> = view.rows.iter().map(|r| (r.ssid.as_str(), r.bars)).collect();
    assert_eq!(
        rows,
        vec![
            ("xfinitywifi", 3),
            ("MyHomeWiFi", 2),
            ("CafeGuest", 2),
            ("Neighbor's Network", 1),
            ("HiddenNetwork", 1),
        ]
    );
    assert_eq!(view.status.unwrap().text, "Found 5 networks");

    dispatch(&client, &mut page, Intent::Select("CafeGuest".into())).await;
    dispatch(
        &client,
        &mut page,
        Intent::Submit(Credentials::new("CafeGuest", "")),
    )
    .await;
    assert!(page.is_locked());
    let status = page.status().unwrap();
    assert_eq!(status.kind, StatusKind::Success);
    assert_eq!(
        status.text,
        "Device will restart in a few seconds. You can close this page."
    );

    let outcome = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
    assert_eq!(
        outcome,
        Some(ProvisionOutcome::Applied {
            ssid: "CafeGuest".into()
        })
    );
    assert_eq!(state.store.load().await.unwrap().ssid, "CafeGuest");
}

#[tokio::test]
async fn rejected_submission_surfaces_server_message() {
    let dir = tempfile::tempdir().unwrap();
    let (client, _state, server) = start_portal(&dir).await;

    // bypass local validation to reach the server's check
    let err = client
        .connect(&Credentials::new("x".repeat(40), ""))
        .await
        .unwrap_err();
    match err {
        ClientError::Status { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Network name is too long (max 32 characters)");
        }
        other => panic!("unexpected error: {other}"),
    }
    server.abort();
}

#[tokio::test]
async fn raw_scan_payload_is_ranked_client_side() {
    // a portal that returns the scan unprocessed, readings possibly malformed
    let app = Router::new().route(
        "/api/scan",
        get(|| async {
            Json(serde_json::json!({"networks": [
                {"ssid": "A", "rssi": -80, "encryption": "secured"},
                {"ssid": "B", "rssi": -45, "encryption": "open"},
                {"ssid": "C", "rssi": "n/a", "encryption": "open"},
                {"ssid": "A", "rssi": -55, "encryption": "secured"},
            ]}))
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let client = PortalClient::new(format!("http://{addr}")).unwrap();
    let ranked = client.scan().await.unwrap();
    let got: Vec<_> = ranked
        .iter()
        .map(|n| (n.ssid.as_str(), n.rssi, n.tier.bars()))
        .collect();
    assert_eq!(got, vec![("B", -45, 4), ("A", -55, 3), ("C", -100, 1)]);

    server.abort();
}

#[tokio::test]
async fn unreachable_portal_becomes_error_status() {
    // nothing listens on this port once the listener is dropped
    let addr = {
        let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
        l.local_addr().unwrap()
    };
    let client = PortalClient::new(format!("http://{addr}")).unwrap();
    let mut page = PageState::new();

    dispatch(&client, &mut page, Intent::Scan).await;
    let status = page.status().unwrap();
    assert_eq!(status.kind, StatusKind::Error);
    assert_eq!(status.text, "Failed to scan networks. Please try again.");
    assert!(page.view().can_scan);
}
