use std::path::PathBuf;

use thiserror::Error;

use super::model::GoogleErrorEnvelope;

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("failed to read credentials file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid service account key: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unusable service account private key: {0}")]
    InvalidKey(#[from] jsonwebtoken::errors::Error),

    #[error("access token exchange failed: {0}")]
    Exchange(String),

    #[error("access token exchange timed out")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum DlpError {
    #[error("DLP service rejected the request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("DLP service unreachable: {0}")]
    Unreachable(String),

    #[error("DLP service call timed out")]
    Timeout,

    #[error("Invalid response from DLP service: {0}")]
    InvalidResponse(String),

    #[error("DLP credentials unavailable: {0}")]
    Credentials(#[source] CredentialsError),

    #[error("reidentification requires a surrogate info type")]
    MissingSurrogate,
}

impl From<reqwest::Error> for DlpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DlpError::Timeout
        } else if err.is_decode() {
            DlpError::InvalidResponse(err.to_string())
        } else {
            DlpError::Unreachable(err.to_string())
        }
    }
}

impl From<CredentialsError> for DlpError {
    fn from(err: CredentialsError) -> Self {
        match err {
            CredentialsError::Timeout => DlpError::Timeout,
            other => DlpError::Credentials(other),
        }
    }
}

impl DlpError {
    /// Builds a rejection from a non-2xx response, preferring the message in
    /// the Google error envelope over the raw body.
    pub fn rejected(status: u16, body: &str) -> Self {
        let message = match serde_json::from_str::<GoogleErrorEnvelope>(body) {
            Ok(envelope) => {
                let text = envelope
                    .error
                    .message
                    .unwrap_or_else(|| "no error message".to_string());
                match envelope.error.status {
                    Some(code) => format!("{code}: {text}"),
                    None => text,
                }
            }
            Err(_) if body.trim().is_empty() => "empty response body".to_string(),
            Err(_) => body.trim().to_string(),
        };

        DlpError::Rejected { status, message }
    }
}
