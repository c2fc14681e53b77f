use anyhow::{Context, Result};
use dlp_gateway::config::{CredentialsSource, GatewayConfig};
use dlp_gateway::server::GatewayServer;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env().context("Failed to load configuration")?;

    init_tracing(&config.log_level);

    info!("dlp-gateway service starting");
    info!(
        endpoint = %config.dlp_endpoint,
        location = ?config.dlp_location,
        timeout_secs = config.dlp_timeout_secs,
        "DLP upstream configured"
    );
    match &config.credentials {
        CredentialsSource::AccessToken(_) => info!("using static DLP access token"),
        CredentialsSource::ServiceAccountFile(path) => {
            info!(path = %path.display(), "using service account key file")
        }
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        return Err(e);
    }

    let server = GatewayServer::new(config).context("Failed to create gateway server")?;

    if let Err(e) = server.run_until(shutdown_signal()).await {
        error!("Server error: {}", e);
        return Err(e);
    }

    info!("dlp-gateway service stopped");
    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .compact()
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
