use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::credentials::TokenSource;
use super::model::{ContentResponse, DeidentifyContentRequest, ReidentifyContentRequest};
use super::request::{FpeParams, MaskParams};
use super::{DeidentifyService, DlpError};
use crate::config::GatewayConfig;

const DEIDENTIFY_METHOD: &str = "deidentify";
const REIDENTIFY_METHOD: &str = "reidentify";

/// Client for the DLP v2 REST API.
pub struct DlpClient {
    http_client: Client,
    endpoint: String,
    location: Option<String>,
    tokens: TokenSource,
    /// Bounds a whole call: token wait, exchange and the DLP round trip.
    deadline: Duration,
}

impl DlpClient {
    /// Builds the HTTP client and loads credentials named by the config.
    pub fn from_config(config: &GatewayConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        let http_client = Self::build_http_client(config.dlp_timeout())?;
        let tokens = TokenSource::from_config(&config.credentials, http_client.clone())
            .context("Failed to load DLP credentials")?;

        Ok(Self::new(
            http_client,
            &config.dlp_endpoint,
            config.dlp_location.clone(),
            tokens,
            config.dlp_timeout(),
        ))
    }

    pub fn new(
        http_client: Client,
        endpoint: &str,
        location: Option<String>,
        tokens: TokenSource,
        deadline: Duration,
    ) -> Self {
        Self {
            http_client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            location,
            tokens,
            deadline,
        }
    }

    pub fn build_http_client(timeout: Duration) -> anyhow::Result<Client> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .user_agent(concat!("dlp-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(client)
    }

    /// Resource name the DLP API expects as the request parent.
    pub fn parent(&self, project: &str) -> String {
        match &self.location {
            Some(location) => format!("projects/{}/locations/{}", project, location),
            None => format!("projects/{}", project),
        }
    }

    #[instrument(skip(self, body), fields(project = %project))]
    async fn call_content<B: Serialize + Sync>(
        &self,
        project: &str,
        method: &str,
        body: &B,
    ) -> Result<String, DlpError> {
        let call = self.send_content(project, method, body);
        match tokio::time::timeout(self.deadline, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    method,
                    deadline_ms = self.deadline.as_millis(),
                    "DLP call exceeded its deadline"
                );
                Err(DlpError::Timeout)
            }
        }
    }

    async fn send_content<B: Serialize + Sync>(
        &self,
        project: &str,
        method: &str,
        body: &B,
    ) -> Result<String, DlpError> {
        let url = format!(
            "{}/v2/{}/content:{}",
            self.endpoint,
            self.parent(project),
            method
        );
        let token = self.tokens.access_token().await?;

        debug!(url = %url, "calling DLP service");

        let start = Instant::now();
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let latency = start.elapsed();
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await?;
            let err = DlpError::rejected(status.as_u16(), &body);
            warn!(
                status = status.as_u16(),
                latency_ms = latency.as_millis(),
                error = %err,
                "DLP service returned an error"
            );
            return Err(err);
        }

        let parsed: ContentResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                DlpError::Timeout
            } else {
                DlpError::InvalidResponse(format!("Failed to parse DLP response: {}", e))
            }
        })?;

        info!(
            method,
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            "DLP call completed"
        );

        parsed
            .into_value()
            .ok_or_else(|| DlpError::InvalidResponse("response has no item value".to_string()))
    }
}

#[async_trait]
impl DeidentifyService for DlpClient {
    async fn mask(
        &self,
        project: &str,
        text: &str,
        info_types: &[String],
        masking_character: char,
        number_to_mask: u32,
    ) -> Result<String, DlpError> {
        let params = MaskParams {
            masking_character,
            number_to_mask,
        };
        let body = DeidentifyContentRequest::masking(text, info_types, &params);
        self.call_content(project, DEIDENTIFY_METHOD, &body).await
    }

    async fn encrypt_fpe(
        &self,
        project: &str,
        text: &str,
        info_types: &[String],
        params: &FpeParams,
    ) -> Result<String, DlpError> {
        let body = DeidentifyContentRequest::fpe(text, info_types, params);
        self.call_content(project, DEIDENTIFY_METHOD, &body).await
    }

    async fn decrypt_fpe(
        &self,
        project: &str,
        text: &str,
        params: &FpeParams,
    ) -> Result<String, DlpError> {
        let surrogate = params
            .surrogate_type
            .as_deref()
            .ok_or(DlpError::MissingSurrogate)?;
        let body = ReidentifyContentRequest::fpe(text, surrogate, params);
        self.call_content(project, REIDENTIFY_METHOD, &body).await
    }
}
