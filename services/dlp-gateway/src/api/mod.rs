use std::sync::Arc;

pub mod error;
pub mod handlers;
pub mod router;
pub mod types;

pub use error::ApiError;
pub use router::create_router;
pub use types::{ErrorResponse, FpeRequest, HealthResponse, MaskRequest};

use crate::config::GatewayConfig;
use crate::dlp::DeidentifyService;

/// Per-request id, set by the router middleware and echoed as `x-request-id`.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

pub struct ApiState {
    pub service: Arc<dyn DeidentifyService>,
    pub config: Arc<GatewayConfig>,
}

impl ApiState {
    pub fn new(service: Arc<dyn DeidentifyService>, config: GatewayConfig) -> Self {
        Self {
            service,
            config: Arc::new(config),
        }
    }
}
