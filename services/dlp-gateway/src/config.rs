use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_DLP_ENDPOINT: &str = "https://dlp.googleapis.com";
pub const DEFAULT_CREDENTIALS_PATH: &str = "./google_application_credentials.json";

pub const DEFAULT_MASK_INFO_TYPES: &[&str] = &["ALL_BASIC"];
pub const DEFAULT_FPE_INFO_TYPES: &[&str] = &[
    "FIRST_NAME",
    "LAST_NAME",
    "GENDER",
    "AUSTRALIA_MEDICARE_NUMBER",
    "AUSTRALIA_TAX_FILE_NUMBER",
    "PHONE_NUMBER",
];

/// Where the gateway gets its bearer tokens for the DLP API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsSource {
    /// Pre-minted OAuth access token, sent as is.
    AccessToken(String),
    /// Service account key file, exchanged for access tokens on demand.
    ServiceAccountFile(PathBuf),
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Listen host address
    pub host: String,

    /// Listen port
    pub port: u16,

    /// DLP API base URL
    pub dlp_endpoint: String,

    /// Optional DLP processing location (e.g. "global", "australia-southeast1")
    pub dlp_location: Option<String>,

    /// Upstream call timeout in seconds
    pub dlp_timeout_secs: u64,

    pub credentials: CredentialsSource,

    /// Info types inspected by the mask route
    pub mask_info_types: Vec<String>,

    /// Info types inspected by the fpe route
    pub fpe_info_types: Vec<String>,

    /// Maximum inbound body size in bytes
    pub max_body_size_bytes: usize,

    /// Log level
    pub log_level: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            dlp_endpoint: DEFAULT_DLP_ENDPOINT.to_string(),
            dlp_location: None,
            dlp_timeout_secs: 30,
            credentials: CredentialsSource::ServiceAccountFile(PathBuf::from(
                DEFAULT_CREDENTIALS_PATH,
            )),
            mask_info_types: to_owned_list(DEFAULT_MASK_INFO_TYPES),
            fpe_info_types: to_owned_list(DEFAULT_FPE_INFO_TYPES),
            max_body_size_bytes: 1024 * 1024,
            log_level: "info".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup, overriding defaults for keys present
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(host) = lookup("GATEWAY_HOST") {
            cfg.host = host;
        }
        if let Some(port) = lookup("GATEWAY_PORT") {
            cfg.port = port.parse().context("GATEWAY_PORT must be a valid u16")?;
        }
        if let Some(endpoint) = lookup("DLP_ENDPOINT") {
            cfg.dlp_endpoint = endpoint;
        }
        if let Some(location) = lookup("DLP_LOCATION") {
            cfg.dlp_location = if location.trim().is_empty() {
                None
            } else {
                Some(location)
            };
        }
        if let Some(timeout) = lookup("DLP_TIMEOUT_SECS") {
            cfg.dlp_timeout_secs = timeout
                .parse()
                .context("DLP_TIMEOUT_SECS must be a positive integer")?;
        }

        // A static token wins over the key file so emulators can run without one.
        cfg.credentials = match lookup("DLP_ACCESS_TOKEN") {
            Some(token) if !token.trim().is_empty() => CredentialsSource::AccessToken(token),
            _ => CredentialsSource::ServiceAccountFile(
                lookup("GOOGLE_APPLICATION_CREDENTIALS")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_PATH)),
            ),
        };

        if let Some(types) = lookup("DLP_MASK_INFO_TYPES") {
            cfg.mask_info_types = parse_info_types(&types);
        }
        if let Some(types) = lookup("DLP_FPE_INFO_TYPES") {
            cfg.fpe_info_types = parse_info_types(&types);
        }
        if let Some(size) = lookup("MAX_BODY_SIZE_BYTES") {
            cfg.max_body_size_bytes = size
                .parse()
                .context("MAX_BODY_SIZE_BYTES must be a positive integer")?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            cfg.log_level = level;
        }

        Ok(cfg)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.dlp_endpoint.trim().is_empty() {
            anyhow::bail!("DLP_ENDPOINT cannot be empty");
        }
        if !self.dlp_endpoint.starts_with("http://") && !self.dlp_endpoint.starts_with("https://")
        {
            anyhow::bail!("DLP_ENDPOINT must be an http(s) URL: {}", self.dlp_endpoint);
        }
        if self.dlp_timeout_secs == 0 {
            anyhow::bail!("DLP_TIMEOUT_SECS must be greater than 0");
        }
        if self.max_body_size_bytes == 0 {
            anyhow::bail!("MAX_BODY_SIZE_BYTES must be greater than 0");
        }
        if self.mask_info_types.is_empty() {
            anyhow::bail!("DLP_MASK_INFO_TYPES must name at least one info type");
        }
        if self.fpe_info_types.is_empty() {
            anyhow::bail!("DLP_FPE_INFO_TYPES must name at least one info type");
        }
        if let CredentialsSource::ServiceAccountFile(ref path) = self.credentials {
            if !path.exists() {
                anyhow::bail!("Service account key file not found: {:?}", path);
            }
        }

        Ok(())
    }

    /// Get the upstream call timeout as Duration
    pub fn dlp_timeout(&self) -> Duration {
        Duration::from_secs(self.dlp_timeout_secs)
    }

    /// Get the listen address
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Splits a comma separated info type list, dropping blanks.
pub fn parse_info_types(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| name.to_ascii_uppercase())
        .collect()
}

fn to_owned_list(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}
