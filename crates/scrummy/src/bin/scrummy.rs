//! Scrummy webhook service.
//!
//! Receives GitHub webhooks and keeps labels, project boards and milestones
//! of the sending repositories consistent.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use scrummy::config::{Config, LogFormat};
use scrummy::remote::Remote;
use scrummy::router::Dispatcher;
use scrummy::server::{self, AppState};

#[derive(Parser)]
#[command(name = "scrummy")]
#[command(about = "Sync GitHub labels, project boards and milestones from webhooks")]
struct Cli {
    /// Listen port (or set `SCRUMMY_PORT`).
    #[arg(long, env = "SCRUMMY_PORT")]
    port: Option<u16>,

    /// GitHub API base URL (or set `GITHUB_API_URL`).
    #[arg(long, env = "GITHUB_API_URL")]
    api_url: Option<String>,

    /// Log format: `pretty` or `json` (or set `SCRUMMY_LOG_FORMAT`).
    #[arg(long, env = "SCRUMMY_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

fn init_tracing(format: LogFormat, verbose: bool) -> Result<()> {
    let default_level = if verbose { "scrummy=debug" } else { "scrummy=info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("Invalid log filter")?;

    let json = format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer()))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::default();
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }

    init_tracing(config.log_format, cli.verbose)?;
    info!("Starting scrummy...");

    config.validate().context("Invalid configuration")?;
    let credentials = config.credentials()?;
    let secret = config.webhook_secret.clone().unwrap_or_default();

    let remote = Remote::new(&config.api_url, credentials).context("Failed to create GitHub client")?;
    info!(api_url = %config.api_url, "GitHub client configured");

    let state = AppState::new(Dispatcher::new(remote), &secret);
    let app = server::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(port = config.port, "scrummy listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
