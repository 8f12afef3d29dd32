use portal_core::config::{AppConfig, StartPolicy};
use portal_core::traits::WifiBackend;
use portal_core::web_server::ProvisionOutcome;
use std::sync::Arc;

pub mod if_disconnected;
pub mod on_start;

/// 策略调度器：根据配置选择的 policy 调用对应实现。
pub async fn dispatch(
    cfg: &AppConfig,
    backend: Arc<dyn WifiBackend>,
) -> anyhow::Result<Option<ProvisionOutcome>> {
    match cfg.portal.policy {
        StartPolicy::OnStart => on_start::run(cfg, backend).await,
        StartPolicy::IfDisconnected => if_disconnected::run(cfg, backend).await,
    }
}
