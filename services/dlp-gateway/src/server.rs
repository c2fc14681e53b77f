use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::api::{create_router, ApiState};
use crate::config::GatewayConfig;
use crate::dlp::{DeidentifyService, DlpClient};

pub struct GatewayServer {
    config: Arc<GatewayConfig>,
    router: Router,
}

impl GatewayServer {
    /// Create a server backed by the DLP REST client
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = DlpClient::from_config(&config).context("Failed to create DLP client")?;
        Ok(Self::with_service(config, Arc::new(client)))
    }

    /// Create a server around any de-identification backend
    pub fn with_service(config: GatewayConfig, service: Arc<dyn DeidentifyService>) -> Self {
        let state = Arc::new(ApiState::new(service, config));
        let router = create_router(Arc::clone(&state));

        Self {
            config: Arc::clone(&state.config),
            router,
        }
    }

    /// Run until the process is stopped
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Run until `shutdown` resolves, then drain in-flight requests
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = self
            .config
            .listen_addr()
            .parse()
            .context("Invalid listen address")?;

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;
        let local_addr = listener
            .local_addr()
            .context("Failed to read bound address")?;

        info!(%local_addr, dlp_endpoint = %self.config.dlp_endpoint, "dlp-gateway listening");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .context("Server encountered an unrecoverable error")?;

        Ok(())
    }
}
