use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use crate::dlp::DlpError;

use super::types::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    Upstream(#[from] DlpError),
}

impl ApiError {
    pub fn invalid_field(field: &'static str, reason: &str) -> Self {
        ApiError::InvalidField {
            field,
            reason: reason.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingField(_)
            | ApiError::InvalidField { .. }
            | ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(DlpError::MissingSurrogate) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(DlpError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingField(_) => "missing_field",
            ApiError::InvalidField { .. } => "invalid_field",
            ApiError::InvalidBody(_) => "invalid_body",
            ApiError::Upstream(err) => match err {
                DlpError::Rejected { .. } => "upstream_rejected",
                DlpError::Unreachable(_) => "upstream_unavailable",
                DlpError::Timeout => "upstream_timeout",
                DlpError::InvalidResponse(_) => "upstream_invalid_response",
                DlpError::Credentials(_) => "upstream_auth",
                DlpError::MissingSurrogate => "invalid_field",
            },
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::MissingField(field) => Some(json!({ "field": field })),
            ApiError::InvalidField { field, .. } => Some(json!({ "field": field })),
            ApiError::Upstream(DlpError::MissingSurrogate) => {
                Some(json!({ "field": "surrogate_type" }))
            }
            ApiError::Upstream(DlpError::Rejected { status, .. }) => {
                Some(json!({ "upstream_status": status }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(
                status = status.as_u16(),
                code = self.code(),
                error = %self,
                "request failed upstream"
            );
        } else {
            debug!(
                status = status.as_u16(),
                code = self.code(),
                error = %self,
                "request rejected"
            );
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
            details: self.details(),
        };

        (status, Json(body)).into_response()
    }
}
