//! Request and response bodies of the DLP v2 `content:deidentify` and
//! `content:reidentify` REST methods.

use serde::{Deserialize, Serialize};

use super::request::{CommonAlphabet, FpeParams, MaskParams, WrappedKey};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeidentifyContentRequest {
    pub inspect_config: InspectConfig,
    pub deidentify_config: DeidentifyConfig,
    pub item: ContentItem,
}

impl DeidentifyContentRequest {
    pub fn masking(text: &str, info_types: &[String], params: &MaskParams) -> Self {
        let mask = CharacterMaskConfig {
            masking_character: params.masking_character.to_string(),
            number_to_mask: params.number_to_mask,
        };
        Self {
            inspect_config: InspectConfig::with_info_types(info_types),
            deidentify_config: DeidentifyConfig::single(
                PrimitiveTransformation::CharacterMaskConfig(mask),
            ),
            item: ContentItem::new(text),
        }
    }

    pub fn fpe(text: &str, info_types: &[String], params: &FpeParams) -> Self {
        Self {
            inspect_config: InspectConfig::with_info_types(info_types),
            deidentify_config: DeidentifyConfig::single(
                PrimitiveTransformation::CryptoReplaceFfxFpeConfig(params.into()),
            ),
            item: ContentItem::new(text),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReidentifyContentRequest {
    pub reidentify_config: DeidentifyConfig,
    pub inspect_config: InspectConfig,
    pub item: ContentItem,
}

impl ReidentifyContentRequest {
    /// The surrogate is both the transformation's `surrogateInfoType` and a
    /// custom info type, so the service can find the tokens it emitted.
    pub fn fpe(text: &str, surrogate_type: &str, params: &FpeParams) -> Self {
        let mut config = CryptoReplaceFfxFpeConfig::from(params);
        config.surrogate_info_type = Some(InfoType::new(surrogate_type));

        Self {
            reidentify_config: DeidentifyConfig::single(
                PrimitiveTransformation::CryptoReplaceFfxFpeConfig(config),
            ),
            inspect_config: InspectConfig {
                info_types: Vec::new(),
                custom_info_types: vec![CustomInfoType {
                    info_type: InfoType::new(surrogate_type),
                    surrogate_type: SurrogateType {},
                }],
            },
            item: ContentItem::new(text),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub info_types: Vec<InfoType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_info_types: Vec<CustomInfoType>,
}

impl InspectConfig {
    fn with_info_types(names: &[String]) -> Self {
        Self {
            info_types: names.iter().map(|name| InfoType::new(name)).collect(),
            custom_info_types: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoType {
    pub name: String,
}

impl InfoType {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomInfoType {
    pub info_type: InfoType,
    pub surrogate_type: SurrogateType,
}

/// Marker message; serializes as `{}`.
#[derive(Debug, Clone, Serialize)]
pub struct SurrogateType {}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeidentifyConfig {
    pub info_type_transformations: InfoTypeTransformations,
}

impl DeidentifyConfig {
    fn single(primitive_transformation: PrimitiveTransformation) -> Self {
        Self {
            info_type_transformations: InfoTypeTransformations {
                transformations: vec![InfoTypeTransformation {
                    primitive_transformation,
                }],
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InfoTypeTransformations {
    pub transformations: Vec<InfoTypeTransformation>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoTypeTransformation {
    pub primitive_transformation: PrimitiveTransformation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PrimitiveTransformation {
    CharacterMaskConfig(CharacterMaskConfig),
    CryptoReplaceFfxFpeConfig(CryptoReplaceFfxFpeConfig),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterMaskConfig {
    pub masking_character: String,
    pub number_to_mask: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoReplaceFfxFpeConfig {
    pub crypto_key: CryptoKey,
    pub common_alphabet: CommonAlphabet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surrogate_info_type: Option<InfoType>,
}

impl From<&FpeParams> for CryptoReplaceFfxFpeConfig {
    fn from(params: &FpeParams) -> Self {
        Self {
            crypto_key: CryptoKey {
                kms_wrapped: KmsWrappedCryptoKey {
                    wrapped_key: params.wrapped_key.clone(),
                    crypto_key_name: params.key_name.clone(),
                },
            },
            common_alphabet: params.alphabet,
            surrogate_info_type: params.surrogate_type.as_deref().map(InfoType::new),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoKey {
    pub kms_wrapped: KmsWrappedCryptoKey,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KmsWrappedCryptoKey {
    pub wrapped_key: WrappedKey,
    pub crypto_key_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentItem {
    pub value: String,
}

impl ContentItem {
    fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
        }
    }
}

/// Shared shape of deidentify and reidentify responses; only the item is used.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentResponse {
    #[serde(default)]
    pub item: Option<ResponseItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseItem {
    #[serde(default)]
    pub value: Option<String>,
}

impl ContentResponse {
    pub fn into_value(self) -> Option<String> {
        self.item.and_then(|item| item.value)
    }
}

/// Google API error envelope: `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleErrorEnvelope {
    pub error: GoogleErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}
