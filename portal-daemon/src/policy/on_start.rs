use portal_core::config::AppConfig;
use portal_core::traits::WifiBackend;
use portal_core::web_server::ProvisionOutcome;
use std::sync::Arc;

/// 启动时始终进入配网模式
pub async fn run(
    cfg: &AppConfig,
    backend: Arc<dyn WifiBackend>,
) -> anyhow::Result<Option<ProvisionOutcome>> {
    tracing::info!("🚀 Policy: on start.");
    crate::runner::run_portal(cfg, backend).await
}
