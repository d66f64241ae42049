use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use tollgate_server::api::{self, AppState};
use tollgate_server::config::TollgateConfig;
use tollgate_server::error::ServerError;
use tollgate_server::gateway_factory::build_gateway;
use tollgate_server::store_factory::create_store;
use tollgate_server::telemetry;

/// Tollgate edge API gateway.
#[derive(Parser, Debug)]
#[command(name = "tollgate-server", about = "Edge API gateway for Tollgate")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "tollgate.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let cli = Cli::parse();
    let config = TollgateConfig::load(Path::new(&cli.config))?;

    let telemetry_guard = telemetry::init(&config.telemetry);

    let store = create_store(&config.store).await?;
    let gateway = Arc::new(build_gateway(&config, store)?);

    let state = AppState {
        gateway: Arc::clone(&gateway),
        max_body_bytes: config.server.max_request_body_bytes,
    };
    let app = api::router(state);

    let host = cli.host.unwrap_or(config.server.host);
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, config = %cli.config, "tollgate listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    info!(?shutdown_timeout, "draining pending usage reports");
    if tokio::time::timeout(shutdown_timeout, gateway.shutdown())
        .await
        .is_err()
    {
        warn!(?shutdown_timeout, "usage reports still pending at shutdown");
    }

    telemetry_guard.shutdown();
    info!("tollgate stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
