use portal_core::config::AppConfig;
use portal_core::frontend::EmbedFrontend;
use portal_core::store::CredentialStore;
use portal_core::traits::WifiBackend;
use portal_core::web_server::{self, AppState, ProvisionOutcome};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Bring the AP up, serve the setup portal until credentials are applied or
/// the AP times out, then take the AP down again.
pub async fn run_portal(
    cfg: &AppConfig,
    backend: Arc<dyn WifiBackend>,
) -> anyhow::Result<Option<ProvisionOutcome>> {
    tracing::info!(ap_ssid = %cfg.ap.ssid, gateway = %cfg.ap.gateway_cidr, "📶 Starting setup portal");
    if cfg.ap.psk_generated {
        // 随机生成的热点密码需要让用户看到
        tracing::info!("🔑 AP password: {}", cfg.ap.psk);
    }
    backend.start_ap(&cfg.ap).await?;

    // 网关地址在 AP 启动后才存在，所以在这里绑定
    let result = async {
        let listener = TcpListener::bind(cfg.ap.bind_addr).await?;
        tracing::info!("🌐 Web server listening on {}", cfg.ap.bind_addr);
        serve_portal(cfg, backend.clone(), listener).await
    }
    .await;

    if let Err(e) = backend.stop_ap().await {
        tracing::warn!("Failed to stop AP: {}", e);
    }
    result
}

/// Serve on `listener`, honouring `ap_timeout`. A timeout yields `Ok(None)`.
pub async fn serve_portal(
    cfg: &AppConfig,
    backend: Arc<dyn WifiBackend>,
    listener: TcpListener,
) -> anyhow::Result<Option<ProvisionOutcome>> {
    let state = Arc::new(AppState::new(
        backend,
        Arc::new(EmbedFrontend::new()),
        CredentialStore::from_config(&cfg.store),
        cfg.portal.clone(),
    ));

    let server = web_server::serve(listener, state);
    let outcome = match cfg.portal.ap_timeout {
        Some(limit) => {
            tracing::info!("⏱️  Portal will time out after {:?}", limit);
            match tokio::time::timeout(limit, server).await {
                Ok(res) => res?,
                Err(_) => {
                    tracing::warn!("⚠️ Portal timed out without a submission, shutting down");
                    None
                }
            }
        }
        None => server.await?,
    };

    if let Some(ProvisionOutcome::Applied { ssid }) = &outcome {
        tracing::info!(%ssid, "✅ Provisioning complete");
    }
    Ok(outcome)
}
