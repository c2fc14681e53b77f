pub mod api;
pub mod config;
pub mod dlp;
pub mod server;

pub use api::{create_router, ApiError, ApiState};
pub use config::{CredentialsSource, GatewayConfig};
pub use dlp::{DeidentifyService, DlpClient, DlpError, TransformRequest};
pub use server::GatewayServer;
