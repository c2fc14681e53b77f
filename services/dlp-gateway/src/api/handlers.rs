use std::sync::Arc;
use std::time::Instant;

use axum::{body::Bytes, extract::State, Extension, Json};
use tracing::{info, warn};

use crate::dlp::TransformRequest;

use super::error::ApiError;
use super::types::{FpeRequest, HealthResponse, MaskRequest};
use super::{ApiState, RequestId};

type ApiResult<T> = Result<T, ApiError>;

pub async fn index() -> &'static str {
    "OK"
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "dlp-gateway".to_string(),
    })
}

pub async fn mask(
    State(state): State<Arc<ApiState>>,
    Extension(request_id): Extension<RequestId>,
    body: Bytes,
) -> ApiResult<String> {
    let request =
        MaskRequest::from_json(&body)?.into_transform(state.config.mask_info_types.clone());
    dispatch(&state, &request_id, request).await
}

pub async fn fpe(
    State(state): State<Arc<ApiState>>,
    Extension(request_id): Extension<RequestId>,
    body: Bytes,
) -> ApiResult<String> {
    let request =
        FpeRequest::from_json(&body)?.into_encrypt(state.config.fpe_info_types.clone())?;
    dispatch(&state, &request_id, request).await
}

pub async fn reid(
    State(state): State<Arc<ApiState>>,
    Extension(request_id): Extension<RequestId>,
    body: Bytes,
) -> ApiResult<String> {
    let request = FpeRequest::from_json(&body)?.into_reidentify()?;
    dispatch(&state, &request_id, request).await
}

/// Exactly one upstream call per request; the result is returned verbatim.
async fn dispatch(
    state: &ApiState,
    request_id: &RequestId,
    request: TransformRequest,
) -> ApiResult<String> {
    let start = Instant::now();
    let result = state.service.transform(&request).await;
    let latency_ms = start.elapsed().as_millis();

    match result {
        Ok(text) => {
            info!(
                request_id = %request_id.0,
                operation = request.operation(),
                project = %request.project(),
                latency_ms,
                "transformation completed"
            );
            Ok(text)
        }
        Err(err) => {
            warn!(
                request_id = %request_id.0,
                operation = request.operation(),
                project = %request.project(),
                latency_ms,
                error = %err,
                "transformation failed"
            );
            Err(ApiError::Upstream(err))
        }
    }
}
