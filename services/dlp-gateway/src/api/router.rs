use std::sync::Arc;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::handlers;
use super::{ApiState, RequestId};

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Prefix the transformation routes were first published under.
pub const LEGACY_PREFIX: &str = "/clouddlp/v1";

pub fn create_router(state: Arc<ApiState>) -> Router {
    let body_limit = state.config.max_body_size_bytes;

    let transforms = Router::new()
        .route("/mask", post(handlers::mask))
        .route("/fpe", post(handlers::fpe))
        .route("/reid", post(handlers::reid));

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check))
        .merge(transforms.clone())
        .nest(LEGACY_PREFIX, transforms)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(set_request_id))
        .layer(TraceLayer::new_for_http())
}

async fn set_request_id(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER.clone(), header_value);
    }

    response
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::http::{HeaderMap, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::{CredentialsSource, GatewayConfig};
    use crate::dlp::{CommonAlphabet, DeidentifyService, DlpError, FpeParams};

    /// Reversible stand-in for the remote service: rotates characters of the
    /// alphabet by an offset derived from the wrapped key.
    #[derive(Default)]
    struct RotatingService {
        calls: AtomicUsize,
    }

    impl RotatingService {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn rotate(text: &str, params: &FpeParams, forward: bool) -> String {
            let alphabet: Vec<char> = params.alphabet.characters().chars().collect();
            let radix = alphabet.len();
            let offset = params
                .wrapped_key
                .as_bytes()
                .iter()
                .map(|b| *b as usize)
                .sum::<usize>()
                % radix;

            text.chars()
                .map(|c| match alphabet.iter().position(|a| *a == c) {
                    Some(index) => {
                        let shifted = if forward {
                            (index + offset) % radix
                        } else {
                            (index + radix - offset) % radix
                        };
                        alphabet[shifted]
                    }
                    None => c,
                })
                .collect()
        }
    }

    #[async_trait]
    impl DeidentifyService for RotatingService {
        async fn mask(
            &self,
            _project: &str,
            text: &str,
            _info_types: &[String],
            masking_character: char,
            _number_to_mask: u32,
        ) -> Result<String, DlpError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(text
                .chars()
                .map(|c| if c.is_whitespace() { c } else { masking_character })
                .collect())
        }

        async fn encrypt_fpe(
            &self,
            _project: &str,
            text: &str,
            _info_types: &[String],
            params: &FpeParams,
        ) -> Result<String, DlpError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let cipher = Self::rotate(text, params, true);
            Ok(match &params.surrogate_type {
                Some(surrogate) => format!("{}({}):{}", surrogate, cipher.chars().count(), cipher),
                None => cipher,
            })
        }

        async fn decrypt_fpe(
            &self,
            _project: &str,
            text: &str,
            params: &FpeParams,
        ) -> Result<String, DlpError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let surrogate = params
                .surrogate_type
                .as_deref()
                .ok_or(DlpError::MissingSurrogate)?;
            let cipher = text
                .strip_prefix(surrogate)
                .and_then(|rest| rest.split_once("):").map(|(_, cipher)| cipher))
                .unwrap_or(text);
            Ok(Self::rotate(cipher, params, false))
        }
    }

    struct FailingService;

    #[async_trait]
    impl DeidentifyService for FailingService {
        async fn mask(
            &self,
            _: &str,
            _: &str,
            _: &[String],
            _: char,
            _: u32,
        ) -> Result<String, DlpError> {
            Err(DlpError::Unreachable("connection refused".to_string()))
        }

        async fn encrypt_fpe(
            &self,
            _: &str,
            _: &str,
            _: &[String],
            _: &FpeParams,
        ) -> Result<String, DlpError> {
            Err(DlpError::Rejected {
                status: 400,
                message: "INVALID_ARGUMENT: Received wrapped key is invalid".to_string(),
            })
        }

        async fn decrypt_fpe(&self, _: &str, _: &str, _: &FpeParams) -> Result<String, DlpError> {
            Err(DlpError::Timeout)
        }
    }

    fn test_config() -> GatewayConfig {
        GatewayConfig {
            credentials: CredentialsSource::AccessToken("unused".to_string()),
            ..GatewayConfig::default()
        }
    }

    fn app_with(service: Arc<dyn DeidentifyService>, config: GatewayConfig) -> Router {
        create_router(Arc::new(ApiState::new(service, config)))
    }

    async fn send(app: Router, uri: &str, body: Option<&str>) -> (StatusCode, HeaderMap, String) {
        let request = match body {
            Some(body) => Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => Request::builder().uri(uri).body(Body::empty()).unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn fpe_body(message: &str, alphabet: CommonAlphabet) -> Value {
        json!({
            "project": "acme-prod",
            "message": message,
            "alphabet": alphabet.as_str(),
            "surrogate_type": "TOKEN",
            "key_name": "projects/acme-prod/locations/global/keyRings/dlp/cryptoKeys/fpe",
            "wrapped_key": "CiQAz0hX4+dd3nWpvRe1vKG1n1o=",
        })
    }

    #[tokio::test]
    async fn test_index_is_ok_without_upstream() {
        let app = app_with(Arc::new(FailingService), test_config());
        let (status, headers, body) = send(app, "/", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
        assert!(headers.contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = app_with(Arc::new(FailingService), test_config());
        let (status, _, body) = send(app, "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        let health: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["service"], "dlp-gateway");
    }

    #[tokio::test]
    async fn test_mask_returns_text_verbatim() {
        let service = Arc::new(RotatingService::default());
        let app = app_with(service.clone(), test_config());
        let (status, headers, body) = send(
            app,
            "/mask",
            Some(r#"{"project":"acme-prod","message":"Jane 0412"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "#### ####");
        assert!(headers["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_legacy_prefix_routes() {
        let service = Arc::new(RotatingService::default());
        let app = app_with(service.clone(), test_config());
        let (status, _, body) = send(
            app,
            "/clouddlp/v1/mask",
            Some(r#"{"project":"acme-prod","message":"abc"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "###");
    }

    #[tokio::test]
    async fn test_mask_missing_fields_never_reach_service() {
        let service = Arc::new(RotatingService::default());
        for body in [
            r#"{"message":"hello"}"#,
            r#"{"project":"acme-prod"}"#,
            r#"{}"#,
            r#"not json"#,
            "",
        ] {
            let app = app_with(service.clone(), test_config());
            let (status, _, response) = send(app, "/mask", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {body:?}");
            let error: Value = serde_json::from_str(&response).unwrap();
            assert!(error["code"].is_string());
        }
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_fpe_and_reid_missing_fields_never_reach_service() {
        let service = Arc::new(RotatingService::default());
        let fields = [
            "project",
            "message",
            "alphabet",
            "surrogate_type",
            "key_name",
            "wrapped_key",
        ];

        for route in ["/fpe", "/reid"] {
            for field in fields {
                let mut body = fpe_body("0412345678", CommonAlphabet::Numeric);
                body.as_object_mut().unwrap().remove(field);

                let app = app_with(service.clone(), test_config());
                let (status, _, response) = send(app, route, Some(&body.to_string())).await;

                assert_eq!(status, StatusCode::BAD_REQUEST, "{route} without {field}");
                let error: Value = serde_json::from_str(&response).unwrap();
                assert_eq!(error["code"], "missing_field");
                assert_eq!(error["details"]["field"], field);
            }
        }
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_wrapped_key_is_client_error() {
        let service = Arc::new(RotatingService::default());
        let mut body = fpe_body("0412345678", CommonAlphabet::Numeric);
        body["wrapped_key"] = json!("not*base64");

        for route in ["/fpe", "/reid"] {
            let app = app_with(service.clone(), test_config());
            let (status, _, response) = send(app, route, Some(&body.to_string())).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            let error: Value = serde_json::from_str(&response).unwrap();
            assert_eq!(error["code"], "invalid_field");
            assert_eq!(error["details"]["field"], "wrapped_key");
        }
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_fpe_round_trip() {
        let service = Arc::new(RotatingService::default());
        let samples = [
            ("0412345678", CommonAlphabet::Numeric),
            ("DEADBEEF0042", CommonAlphabet::Hexadecimal),
            ("AB12CD34", CommonAlphabet::UpperCaseAlphaNumeric),
            ("Jane9Citizen", CommonAlphabet::AlphaNumeric),
            ("", CommonAlphabet::Numeric),
        ];

        for (plaintext, alphabet) in samples {
            let app = app_with(service.clone(), test_config());
            let body = fpe_body(plaintext, alphabet);
            let (status, _, ciphertext) = send(app, "/fpe", Some(&body.to_string())).await;
            assert_eq!(status, StatusCode::OK);
            assert!(ciphertext.starts_with("TOKEN("));

            let mut reid_body = body.clone();
            reid_body["message"] = json!(ciphertext);
            let app = app_with(service.clone(), test_config());
            let (status, _, recovered) = send(app, "/reid", Some(&reid_body.to_string())).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(recovered, plaintext, "round trip over {alphabet}");
        }
    }

    #[tokio::test]
    async fn test_upstream_failures_are_not_ok() {
        let cases = [
            ("/mask", StatusCode::BAD_GATEWAY, "upstream_unavailable"),
            ("/fpe", StatusCode::BAD_GATEWAY, "upstream_rejected"),
            ("/reid", StatusCode::GATEWAY_TIMEOUT, "upstream_timeout"),
        ];

        for (route, expected_status, expected_code) in cases {
            let app = app_with(Arc::new(FailingService), test_config());
            let body = fpe_body("0412345678", CommonAlphabet::Numeric);
            let (status, _, response) = send(app, route, Some(&body.to_string())).await;

            assert_ne!(status, StatusCode::OK);
            assert_eq!(status, expected_status, "{route}");
            let error: Value = serde_json::from_str(&response).unwrap();
            assert_eq!(error["code"], expected_code);
            assert!(error.get("text").is_none());
            assert!(!response.contains("0412345678"));
        }
    }

    #[tokio::test]
    async fn test_body_limit() {
        let config = GatewayConfig {
            max_body_size_bytes: 64,
            ..test_config()
        };
        let service = Arc::new(RotatingService::default());
        let app = app_with(service.clone(), config);
        let body = json!({ "project": "acme-prod", "message": "x".repeat(256) }).to_string();
        let (status, _, _) = send(app, "/mask", Some(&body)).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_configured_info_types_are_forwarded() {
        struct RecordingService {
            seen: std::sync::Mutex<Vec<String>>,
        }

        #[async_trait]
        impl DeidentifyService for RecordingService {
            async fn mask(
                &self,
                _: &str,
                text: &str,
                info_types: &[String],
                _: char,
                _: u32,
            ) -> Result<String, DlpError> {
                self.seen.lock().unwrap().extend_from_slice(info_types);
                Ok(text.to_string())
            }

            async fn encrypt_fpe(
                &self,
                _: &str,
                text: &str,
                info_types: &[String],
                _: &FpeParams,
            ) -> Result<String, DlpError> {
                self.seen.lock().unwrap().extend_from_slice(info_types);
                Ok(text.to_string())
            }

            async fn decrypt_fpe(
                &self,
                _: &str,
                text: &str,
                _: &FpeParams,
            ) -> Result<String, DlpError> {
                Ok(text.to_string())
            }
        }

        let service = Arc::new(RecordingService {
            seen: std::sync::Mutex::new(Vec::new()),
        });
        let config = GatewayConfig {
            mask_info_types: vec!["EMAIL_ADDRESS".to_string()],
            ..test_config()
        };
        let app = app_with(service.clone(), config);
        let (status, _, _) = send(
            app,
            "/mask",
            Some(r#"{"project":"acme-prod","message":"a@b.c"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let app = app_with(service.clone(), test_config());
        let body = fpe_body("0412345678", CommonAlphabet::Numeric);
        let (status, _, _) = send(app, "/fpe", Some(&body.to_string())).await;
        assert_eq!(status, StatusCode::OK);

        let seen = service.seen.lock().unwrap().clone();
        assert_eq!(seen[0], "EMAIL_ADDRESS");
        assert_eq!(
            &seen[1..],
            &[
                "FIRST_NAME",
                "LAST_NAME",
                "GENDER",
                "AUSTRALIA_MEDICARE_NUMBER",
                "AUSTRALIA_TAX_FILE_NUMBER",
                "PHONE_NUMBER",
            ]
        );
    }
}
