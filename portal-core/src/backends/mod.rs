pub mod mock;
pub mod parsing;
pub mod wpa_cli;

use crate::config::{BackendConfig, BackendKind};
use crate::traits::WifiBackend;
use std::sync::Arc;

pub use mock::MockBackend;
pub use wpa_cli::WpaCliBackend;

/// Build the backend named in the config.
pub fn create_backend(cfg: &BackendConfig) -> Arc<dyn WifiBackend> {
    match cfg.kind {
        BackendKind::Mock => {
            tracing::info!("🤖 Backend: mock selected (for local development)");
            Arc::new(MockBackend::new())
        }
        BackendKind::WpaCli => {
            tracing::info!(iface = %cfg.interface_name, "📡 Backend: wpa_cli selected");
            Arc::new(WpaCliBackend::new(cfg.clone()))
        }
    }
}
