use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dlp::{CommonAlphabet, FpeParams, MaskParams, TransformRequest, WrappedKey};

use super::error::ApiError;

/// Body of `POST /mask`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskRequest {
    pub project: String,
    pub message: String,
}

/// Body of `POST /fpe` and `POST /reid`, before validation of the key fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FpeRequest {
    pub project: String,
    pub message: String,
    pub alphabet: String,
    pub surrogate_type: String,
    pub key_name: String,
    pub wrapped_key: String,
}

impl MaskRequest {
    pub fn from_json(body: &[u8]) -> Result<Self, ApiError> {
        let fields = parse_object(body)?;
        Ok(Self {
            project: project_field(&fields)?,
            message: required_str(&fields, "message")?,
        })
    }

    pub fn into_transform(self, info_types: Vec<String>) -> TransformRequest {
        TransformRequest::Mask {
            project: self.project,
            message: self.message,
            info_types,
            params: MaskParams::default(),
        }
    }
}

impl FpeRequest {
    pub fn from_json(body: &[u8]) -> Result<Self, ApiError> {
        let fields = parse_object(body)?;
        Ok(Self {
            project: project_field(&fields)?,
            message: required_str(&fields, "message")?,
            alphabet: required_str(&fields, "alphabet")?,
            surrogate_type: required_str(&fields, "surrogate_type")?,
            key_name: required_str(&fields, "key_name")?,
            wrapped_key: required_str(&fields, "wrapped_key")?,
        })
    }

    /// An empty surrogate type encrypts without a surrogate marker.
    pub fn into_encrypt(self, info_types: Vec<String>) -> Result<TransformRequest, ApiError> {
        let params = self.fpe_params()?;
        Ok(TransformRequest::Encrypt {
            project: self.project,
            message: self.message,
            info_types,
            params,
        })
    }

    pub fn into_reidentify(self) -> Result<TransformRequest, ApiError> {
        let params = self.fpe_params()?;
        if params.surrogate_type.is_none() {
            return Err(ApiError::invalid_field(
                "surrogate_type",
                "must not be empty for reidentification",
            ));
        }
        Ok(TransformRequest::Reidentify {
            project: self.project,
            message: self.message,
            params,
        })
    }

    fn fpe_params(&self) -> Result<FpeParams, ApiError> {
        let alphabet: CommonAlphabet = self
            .alphabet
            .parse()
            .map_err(|reason: String| ApiError::invalid_field("alphabet", &reason))?;

        let key_name = self.key_name.trim();
        if key_name.is_empty() {
            return Err(ApiError::invalid_field("key_name", "must not be empty"));
        }

        if self.wrapped_key.trim().is_empty() {
            return Err(ApiError::invalid_field("wrapped_key", "must not be empty"));
        }
        let wrapped_key = WrappedKey::from_base64(&self.wrapped_key).map_err(|err| {
            ApiError::invalid_field("wrapped_key", &format!("not valid base64: {}", err))
        })?;

        let surrogate = self.surrogate_type.trim();

        Ok(FpeParams {
            alphabet,
            surrogate_type: (!surrogate.is_empty()).then(|| surrogate.to_string()),
            key_name: key_name.to_string(),
            wrapped_key,
        })
    }
}

fn parse_object(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::InvalidBody("request body is empty".to_string()));
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(ApiError::InvalidBody(
            "request body must be a JSON object".to_string(),
        )),
        Err(err) => Err(ApiError::InvalidBody(format!("malformed JSON: {}", err))),
    }
}

fn required_str(fields: &Map<String, Value>, name: &'static str) -> Result<String, ApiError> {
    match fields.get(name) {
        None | Some(Value::Null) => Err(ApiError::MissingField(name)),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(ApiError::invalid_field(name, "must be a string")),
    }
}

/// Project ids double as a URL path segment upstream, so only the characters
/// of project ids (including domain-scoped `example.com:proj`) are allowed.
fn project_field(fields: &Map<String, Value>) -> Result<String, ApiError> {
    let project = required_str(fields, "project")?;
    if project.is_empty() {
        return Err(ApiError::invalid_field("project", "must not be empty"));
    }
    let valid = project
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));
    if !valid {
        return Err(ApiError::invalid_field(
            "project",
            "contains characters not allowed in a project id",
        ));
    }
    Ok(project)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(default)]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}
