//! # WebShare Server
//!
//! Single binary serving:
//! - the signaling WebSocket (`/`, `/ws`)
//! - relay credentials (`/turn-credentials`)
//! - health and stats (`/health`, `/stats`)

use clap::Parser;
use std::net::SocketAddr;
use webshare_common::config::Overrides;

#[derive(Debug, Parser)]
#[command(name = "webshare", version, about = "Signaling server for browser-to-browser file transfer")]
struct Cli {
    /// Address to bind.
    #[arg(long, env = "WEBSHARE_HOST")]
    host: Option<String>,

    /// Port to listen on.
    #[arg(long, env = "WEBSHARE_PORT")]
    port: Option<u16>,

    /// Config file (TOML). Defaults to an optional `config.toml`.
    #[arg(long, env = "WEBSHARE_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = webshare_common::config::init(&Overrides {
        config_file: cli.config,
        host: cli.host,
        port: cli.port,
    })?;

    // Initialize tracing (structured logging)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webshare=debug,tower_http=debug".into()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    tracing::info!("Starting WebShare signaling server v{}", env!("CARGO_PKG_VERSION"));

    let app = webshare_server::build_app(&config)?;
    let keepalive = webshare_server::spawn_keepalive(&config, app.hub.clone());

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Signaling listening on ws://{addr}");
    tracing::info!("Credentials at http://{addr}/turn-credentials");

    axum::serve(
        listener,
        app.router
            .into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    keepalive.abort();
    tracing::info!("WebShare server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
