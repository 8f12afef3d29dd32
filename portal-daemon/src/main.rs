mod policy;
mod runner;
#[cfg(test)]
mod test_support;

use clap::Parser;
use portal_core::backends::create_backend;
use portal_core::config::{default_config, load_config_from_path};
use portal_core::web_server::ProvisionOutcome;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "portal-daemon", about = "Captive-portal WiFi setup service")]
struct Args {
    /// TOML config file; the built-in defaults are used when omitted
    #[arg(long, env = "PORTAL_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 初始化日志（这是入口点的职责）
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // 2. 调用库的核心逻辑
    let result = run(args).await;
    match &result {
        Ok(Some(ProvisionOutcome::Failed { ssid, error })) => {
            tracing::error!(%ssid, "❌ Credentials saved but could not be applied: {}", error);
        }
        Ok(Some(ProvisionOutcome::Applied { .. })) => tracing::info!("👋 Exiting for restart"),
        Ok(None) => tracing::info!("👋 Portal closed without new credentials"),
        // 3. 处理顶层错误
        Err(e) => tracing::error!("❌ Portal failed: {:#}", e),
    }

    let code = exit_code(&result);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// 0 when the portal finished normally, 1 when it failed or could not apply
/// the submitted credentials.
fn exit_code(result: &anyhow::Result<Option<ProvisionOutcome>>) -> i32 {
    match result {
        Ok(Some(ProvisionOutcome::Failed { .. })) | Err(_) => 1,
        Ok(Some(ProvisionOutcome::Applied { .. })) | Ok(None) => 0,
    }
}

async fn run(args: Args) -> anyhow::Result<Option<ProvisionOutcome>> {
    let cfg = match &args.config {
        Some(path) => load_config_from_path(path).await?,
        None => default_config()?,
    };
    let backend = create_backend(&cfg.backend);
    policy::dispatch(&cfg, backend).await
}
