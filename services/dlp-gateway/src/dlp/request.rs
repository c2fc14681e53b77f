use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Serialize, Serializer};

/// Character set the FPE transformation draws ciphertext from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommonAlphabet {
    Numeric,
    Hexadecimal,
    UpperCaseAlphaNumeric,
    AlphaNumeric,
}

impl CommonAlphabet {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommonAlphabet::Numeric => "NUMERIC",
            CommonAlphabet::Hexadecimal => "HEXADECIMAL",
            CommonAlphabet::UpperCaseAlphaNumeric => "UPPER_CASE_ALPHA_NUMERIC",
            CommonAlphabet::AlphaNumeric => "ALPHA_NUMERIC",
        }
    }

    /// Characters in the alphabet, in radix order.
    pub fn characters(&self) -> &'static str {
        match self {
            CommonAlphabet::Numeric => "0123456789",
            CommonAlphabet::Hexadecimal => "0123456789ABCDEF",
            CommonAlphabet::UpperCaseAlphaNumeric => "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ",
            CommonAlphabet::AlphaNumeric => {
                "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz"
            }
        }
    }
}

impl fmt::Display for CommonAlphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommonAlphabet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NUMERIC" => Ok(CommonAlphabet::Numeric),
            "HEXADECIMAL" => Ok(CommonAlphabet::Hexadecimal),
            "UPPER_CASE_ALPHA_NUMERIC" => Ok(CommonAlphabet::UpperCaseAlphaNumeric),
            "ALPHA_NUMERIC" => Ok(CommonAlphabet::AlphaNumeric),
            other => Err(format!("unsupported alphabet: {other}")),
        }
    }
}

/// A data key wrapped by Cloud KMS, held as raw bytes.
///
/// Only constructible from standard base64. Serializes back to base64, which
/// is how the REST API carries `bytes` fields.
#[derive(Clone, PartialEq, Eq)]
pub struct WrappedKey(Vec<u8>);

impl WrappedKey {
    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        let bytes = STANDARD.decode(encoded.trim())?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }
}

impl fmt::Debug for WrappedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WrappedKey({} bytes)", self.0.len())
    }
}

impl Serialize for WrappedKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskParams {
    pub masking_character: char,
    /// Zero masks the whole match.
    pub number_to_mask: u32,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self {
            masking_character: '#',
            number_to_mask: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FpeParams {
    pub alphabet: CommonAlphabet,
    pub surrogate_type: Option<String>,
    pub key_name: String,
    pub wrapped_key: WrappedKey,
}

/// One transformation to run against the DLP service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformRequest {
    Mask {
        project: String,
        message: String,
        info_types: Vec<String>,
        params: MaskParams,
    },
    Encrypt {
        project: String,
        message: String,
        info_types: Vec<String>,
        params: FpeParams,
    },
    Reidentify {
        project: String,
        message: String,
        params: FpeParams,
    },
}

impl TransformRequest {
    pub fn operation(&self) -> &'static str {
        match self {
            TransformRequest::Mask { .. } => "mask",
            TransformRequest::Encrypt { .. } => "fpe",
            TransformRequest::Reidentify { .. } => "reid",
        }
    }

    pub fn project(&self) -> &str {
        match self {
            TransformRequest::Mask { project, .. }
            | TransformRequest::Encrypt { project, .. }
            | TransformRequest::Reidentify { project, .. } => project,
        }
    }
}
