use async_trait::async_trait;

use super::error::DlpError;
use super::request::{FpeParams, TransformRequest};

/// The operations the gateway needs from a de-identification backend.
#[async_trait]
pub trait DeidentifyService: Send + Sync {
    async fn mask(
        &self,
        project: &str,
        text: &str,
        info_types: &[String],
        masking_character: char,
        number_to_mask: u32,
    ) -> Result<String, DlpError>;

    async fn encrypt_fpe(
        &self,
        project: &str,
        text: &str,
        info_types: &[String],
        params: &FpeParams,
    ) -> Result<String, DlpError>;

    async fn decrypt_fpe(
        &self,
        project: &str,
        text: &str,
        params: &FpeParams,
    ) -> Result<String, DlpError>;

    async fn transform(&self, request: &TransformRequest) -> Result<String, DlpError> {
        match request {
            TransformRequest::Mask {
                project,
                message,
                info_types,
                params,
            } => {
                self.mask(
                    project,
                    message,
                    info_types,
                    params.masking_character,
                    params.number_to_mask,
                )
                .await
            }
            TransformRequest::Encrypt {
                project,
                message,
                info_types,
                params,
            } => self.encrypt_fpe(project, message, info_types, params).await,
            TransformRequest::Reidentify {
                project,
                message,
                params,
            } => self.decrypt_fpe(project, message, params).await,
        }
    }
}
