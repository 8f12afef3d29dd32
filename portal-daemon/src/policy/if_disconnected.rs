use portal_core::config::AppConfig;
use portal_core::store::CredentialStore;
use portal_core::traits::WifiBackend;
use portal_core::web_server::ProvisionOutcome;
use std::sync::Arc;

/// 守护进程策略：已连接则不启动配网；否则先尝试已保存的凭据，失败再进入配网模式
pub async fn run(
    cfg: &AppConfig,
    backend: Arc<dyn WifiBackend>,
) -> anyhow::Result<Option<ProvisionOutcome>> {
    tracing::info!("🚀 Policy: if disconnected.");

    match backend.is_connected().await {
        Ok(true) => {
            tracing::info!("🛡️ WiFi is already connected. Portal will not start.");
            return Ok(None);
        }
        Ok(false) => {}
        Err(e) => tracing::warn!("🛡️ Status check failed ({}). Assuming not connected.", e),
    }

    let store = CredentialStore::from_config(&cfg.store);
    if let Some(stored) = store.load().await {
        tracing::info!(ssid = %stored.ssid, "📡 Trying stored credentials...");
        match backend.connect(&stored).await {
            Ok(()) => {
                tracing::info!(ssid = %stored.ssid, "✅ Connected with stored credentials");
                return Ok(None);
            }
            Err(e) => tracing::warn!("❌ Stored credentials failed: {}", e),
        }
    } else {
        tracing::info!("No stored credentials, skipping connect.");
    }

    crate::runner::run_portal(cfg, backend).await
}
