use clap::{Parser, Subcommand};
use portal_client::api::PortalClient;
use portal_client::dispatch;
use portal_client::render::render_page;
use portal_core::controller::{Intent, PageState, StatusKind};
use portal_core::networks::DedupPolicy;
use portal_core::Credentials;

#[derive(Parser, Debug)]
#[command(name = "wifi-setup", about = "Scan and configure a device's WiFi through its setup portal")]
struct Cli {
    #[arg(long, env = "PORTAL_URL", default_value = "http://192.168.4.1")]
    base_url: String,

    /// Keep the strongest reading for duplicate names instead of the last one
    #[arg(long)]
    strongest: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List nearby networks, strongest first
    Scan,
    /// Submit credentials to the device
    Connect {
        #[arg(long)]
        ssid: String,
        #[arg(long, default_value = "")]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let dedup = if cli.strongest {
        DedupPolicy::Strongest
    } else {
        DedupPolicy::LastSeen
    };
    let client = PortalClient::new(cli.base_url)?.with_dedup(dedup);
    let mut page = PageState::new();

    match cli.command {
        Command::Scan => dispatch(&client, &mut page, Intent::Scan).await,
        Command::Connect { ssid, password } => {
            dispatch(&client, &mut page, Intent::Select(ssid.clone())).await;
            dispatch(&client, &mut page, Intent::Submit(Credentials::new(ssid, password))).await;
        }
    }

    println!("{}", render_page(&page.view()));

    if page.status().is_some_and(|s| s.kind == StatusKind::Error) {
        std::process::exit(1);
    }
    Ok(())
}
