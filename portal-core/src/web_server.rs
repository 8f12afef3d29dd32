use crate::config::PortalOptions;
use crate::credentials::Credentials;
use crate::networks::rank;
use crate::store::CredentialStore;
use crate::traits::{UiAssetProvider, WifiBackend};
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Result of the background work started by a successful `/api/connect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Applied { ssid: String },
    Failed { ssid: String, error: String },
}

/// Web 服务器状态
pub struct AppState {
    pub backend: Arc<dyn WifiBackend>,
    pub frontend: Arc<dyn UiAssetProvider>,
    pub store: CredentialStore,
    pub options: PortalOptions,
    /// Set once a submission has been saved; later ones are refused.
    accepted: AtomicBool,
    outcome: watch::Sender<Option<ProvisionOutcome>>,
}

impl AppState {
    pub fn new(
        backend: Arc<dyn WifiBackend>,
        frontend: Arc<dyn UiAssetProvider>,
        store: CredentialStore,
        options: PortalOptions,
    ) -> Self {
        let (outcome, _) = watch::channel(None);
        Self {
            backend,
            frontend,
            store,
            options,
            accepted: AtomicBool::new(false),
            outcome,
        }
    }

    /// Watch for the provisioning outcome; it is set at most once.
    pub fn subscribe(&self) -> watch::Receiver<Option<ProvisionOutcome>> {
        self.outcome.subscribe()
    }
}

/// Build the portal's routes over the shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/scan", get(api_scan))
        .route("/api/connect", get(api_connect_query).post(api_connect_json))
        .route("/generate_204", get(handle_captive_portal))
        .route("/gen_204", get(handle_captive_portal))
        .route("/hotspot-detect.html", get(handle_captive_portal))
        .fallback(get(serve_static_asset))
        .with_state(state)
}

/// Serve on an already bound listener. Returns once a submission has been
/// applied (or failed to apply), after in-flight requests drain.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
) -> crate::Result<Option<ProvisionOutcome>> {
    let mut rx = state.subscribe();
    let app = router(state.clone());

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = rx.wait_for(|o| o.is_some()).await;
        })
        .await?;

    let outcome = state.outcome.borrow().clone();
    tracing::info!(?outcome, "🛑 Web server stopped");
    Ok(outcome)
}

// --- Route Handlers ---

/// 每次请求执行一次实时扫描，并返回去重排序后的列表
async fn api_scan(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::info!("📡 WiFi scan requested");
    match state.backend.scan().await {
        Ok(raw) => {
            let networks = rank(raw, state.options.dedup);
            tracing::info!("✅ Scan complete: {} unique networks", networks.len());
            (StatusCode::OK, Json(serde_json::json!({ "networks": networks }))).into_response()
        }
        Err(e) => {
            tracing::error!("Scan failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    ssid: Option<String>,
    password: Option<String>,
}

/// `GET /api/connect?ssid=..&password=..`, the form the setup page submits.
async fn api_connect_query(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ConnectQuery>,
) -> Response {
    let Some(ssid) = q.ssid else {
        return (StatusCode::BAD_REQUEST, "Missing SSID").into_response();
    };
    accept_credentials(state, Credentials::new(ssid, q.password.unwrap_or_default())).await
}

async fn api_connect_json(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Credentials>,
) -> Response {
    accept_credentials(state, payload).await
}

/// 验证并保存凭据，立即返回 200，然后在后台应用凭据。
/// 先响应再切换网络，否则浏览器会因为 AP 关闭而收不到响应。
async fn accept_credentials(state: Arc<AppState>, creds: Credentials) -> Response {
    tracing::info!(ssid = %creds.ssid, "🔐 Connect request");

    let creds = match creds.validate() {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Rejected credentials: {}", e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    // 只接受第一次提交，避免在等待重启期间覆盖已保存的凭据
    if state.accepted.swap(true, Ordering::SeqCst) {
        tracing::warn!(ssid = %creds.ssid, "Credentials already accepted, ignoring");
        return (StatusCode::CONFLICT, "Credentials already submitted").into_response();
    }

    if let Err(e) = state.store.save(&creds).await {
        tracing::error!("Failed to save config: {}", e);
        state.accepted.store(false, Ordering::SeqCst);
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save config").into_response();
    }

    let delay = state.options.restart_delay;
    tracing::info!("✅ Config saved. Applying in {:?}...", delay);

    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let outcome = match state.backend.connect(&creds).await {
            Ok(()) => ProvisionOutcome::Applied { ssid: creds.ssid },
            Err(e) => {
                tracing::error!("Background connection task failed: {}", e);
                ProvisionOutcome::Failed {
                    ssid: creds.ssid,
                    error: e.to_string(),
                }
            }
        };
        state.outcome.send_replace(Some(outcome));
    });

    (StatusCode::OK, "OK").into_response()
}

/// 处理捕获门户检测请求（Captive Portal Detection），静默返回 204
async fn handle_captive_portal() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

/// 处理静态资产的 Fallback 处理器
async fn serve_static_asset(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    let mut path = uri.path().trim_start_matches('/').to_string();

    // 如果路径为空 (即请求根目录 "/"), 则服务 "index.html"
    if path.is_empty() {
        path = "index.html".to_string();
    }

    match state.frontend.get_asset(&path).await {
        Ok((data, mime)) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, mime)
            .body(Body::from(data))
            .unwrap_or_else(|_| {
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to build response").into_response()
            }),
        Err(e) => {
            tracing::warn!("Failed to get asset: {} (Error: {})", path, e);
            (StatusCode::NOT_FOUND, "Not Found").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::{MockBackend, MOCK_FAILING_SSID};
    use crate::frontend::EmbedFrontend;
    use crate::networks::{DedupPolicy, Encryption, NetworkRecord};
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    struct Harness {
        state: Arc<AppState>,
        backend: Arc<MockBackend>,
        _dir: tempfile::TempDir,
    }

    fn harness(networks: Option<Vec<NetworkRecord>>, dedup: DedupPolicy) -> Harness {
        harness_with_delay(networks, dedup, Duration::ZERO)
    }

    fn harness_with_delay(
        networks: Option<Vec<NetworkRecord>>,
        dedup: DedupPolicy,
        restart_delay: Duration,
    ) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = MockBackend::new().with_delay(Duration::ZERO);
        if let Some(n) = networks {
            backend = backend.with_networks(n);
        }
        let backend = Arc::new(backend);
        let options = PortalOptions {
            restart_delay,
            dedup,
            ..PortalOptions::default()
        };
        let state = Arc::new(AppState::new(
            backend.clone(),
            Arc::new(EmbedFrontend::new()),
            CredentialStore::new(dir.path().join("wifi.json")),
            options,
        ));
        Harness {
            state,
            backend,
            _dir: dir,
        }
    }

    async fn get(state: &Arc<AppState>, uri: &str) -> Response {
        router(state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_text(resp: Response) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    async fn wait_outcome(state: &Arc<AppState>) -> ProvisionOutcome {
        let mut rx = state.subscribe();
        let got = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|o| o.is_some()))
            .await
            .expect("outcome not set in time")
            .unwrap()
            .clone();
        got.unwrap()
    }

    #[tokio::test]
    async fn scan_returns_ranked_unique_networks() {
        let h = harness(
            Some(vec![
                NetworkRecord::new("A", -80, Encryption::Secured),
                NetworkRecord::new("B", -45, Encryption::Open),
                NetworkRecord::new("A", -55, Encryption::Secured),
            ]),
            DedupPolicy::LastSeen,
        );
        let resp = get(&h.state, "/api/scan").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let v: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"networks": [
                {"ssid": "B", "rssi": -45, "encryption": "open", "tier": 4},
                {"ssid": "A", "rssi": -55, "encryption": "secured", "tier": 3},
            ]})
        );
    }

    #[tokio::test]
    async fn scan_honours_strongest_policy() {
        let h = harness(
            Some(vec![
                NetworkRecord::new("A", -40, Encryption::Secured),
                NetworkRecord::new("A", -90, Encryption::Secured),
            ]),
            DedupPolicy::Strongest,
        );
        let v: serde_json::Value =
            serde_json::from_str(&body_text(get(&h.state, "/api/scan").await).await).unwrap();
        assert_eq!(v["networks"][0]["rssi"], -40);
    }

    #[tokio::test]
    async fn connect_saves_then_applies() {
        let h = harness(None, DedupPolicy::LastSeen);
        let resp = get(&h.state, "/api/connect?ssid=My+Home&password=p%40ss").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "OK");

        assert_eq!(
            wait_outcome(&h.state).await,
            ProvisionOutcome::Applied {
                ssid: "My Home".into()
            }
        );
        assert_eq!(h.backend.connected_ssid().as_deref(), Some("My Home"));
        let saved = h.state.store.load().await.unwrap();
        assert_eq!(saved, Credentials::new("My Home", "p@ss"));
    }

    #[tokio::test]
    async fn second_submission_during_restart_delay_is_refused() {
        let h = harness_with_delay(None, DedupPolicy::LastSeen, Duration::from_millis(300));

        let first = get(&h.state, "/api/connect?ssid=First&password=one").await;
        assert_eq!(first.status(), StatusCode::OK);
        let second = get(&h.state, "/api/connect?ssid=Second&password=two").await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(body_text(second).await, "Credentials already submitted");

        assert_eq!(
            wait_outcome(&h.state).await,
            ProvisionOutcome::Applied {
                ssid: "First".into()
            }
        );
        assert_eq!(h.backend.connected_ssid().as_deref(), Some("First"));
        let saved = h.state.store.load().await.unwrap();
        assert_eq!(saved, Credentials::new("First", "one"));
    }

    #[tokio::test]
    async fn connect_accepts_json_body() {
        let h = harness(None, DedupPolicy::LastSeen);
        let req = Request::builder()
            .method("POST")
            .uri("/api/connect")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"ssid":"CafeGuest"}"#))
            .unwrap();
        let resp = router(h.state.clone()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            wait_outcome(&h.state).await,
            ProvisionOutcome::Applied {
                ssid: "CafeGuest".into()
            }
        );
    }

    #[tokio::test]
    async fn connect_validation_errors() {
        let h = harness(None, DedupPolicy::LastSeen);

        let resp = get(&h.state, "/api/connect?password=x").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(resp).await, "Missing SSID");

        let long = "a".repeat(33);
        let resp = get(&h.state, &format!("/api/connect?ssid={long}")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_text(resp).await,
            "Network name is too long (max 32 characters)"
        );

        let pw = "p".repeat(65);
        let resp = get(&h.state, &format!("/api/connect?ssid=home&password={pw}")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // nothing stored, nothing applied
        assert!(h.state.store.load().await.is_none());
        assert!(h.state.subscribe().borrow().is_none());
    }

    #[tokio::test]
    async fn failed_apply_is_reported_once() {
        let h = harness(None, DedupPolicy::LastSeen);
        let resp = get(&h.state, &format!("/api/connect?ssid={MOCK_FAILING_SSID}&password=pw")).await;
        // 响应先于应用发出
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(matches!(
            wait_outcome(&h.state).await,
            ProvisionOutcome::Failed { ssid, .. } if ssid == MOCK_FAILING_SSID
        ));
    }

    #[tokio::test]
    async fn save_failure_is_500() {
        let dir = tempfile::tempdir().unwrap();
        // the store path is a directory, so the rename fails
        let blocked = dir.path().join("wifi.json");
        std::fs::create_dir_all(blocked.join("occupied")).unwrap();
        let state = Arc::new(AppState::new(
            Arc::new(MockBackend::new().with_delay(Duration::ZERO)),
            Arc::new(EmbedFrontend::new()),
            CredentialStore::new(&blocked),
            PortalOptions::default(),
        ));

        let resp = get(&state, "/api/connect?ssid=home&password=pw").await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(resp).await, "Failed to save config");

        // a failed save does not use up the single submission
        let resp = get(&state, "/api/connect?ssid=home&password=pw").await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn captive_checks_and_assets() {
        let h = harness(None, DedupPolicy::LastSeen);
        assert_eq!(get(&h.state, "/generate_204").await.status(), StatusCode::NO_CONTENT);

        let resp = get(&h.state, "/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/html");

        let resp = get(&h.state, "/app.js").await;
        assert_eq!(resp.status(), StatusCode::OK);

        assert_eq!(get(&h.state, "/missing.css").await.status(), StatusCode::NOT_FOUND);
    }
}
