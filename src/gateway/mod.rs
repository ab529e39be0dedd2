pub mod failure;

use serde::Serialize;
use std::sync::Arc;

use crate::{
    error::{Result, StudioError},
    logger,
    models::{DataUri, ErrorResponse, GenerationRequest, GenerationResponse, GenerationResult},
    provider::{ImageProvider, ProviderRequest},
    templates::TemplateLibrary,
};

pub use failure::FailureKind;

pub const FACE_SWAP_INSTRUCTION: &str = "Swap the face of the person in the first image onto the person in the second image. \
Keep the pose, outfit, body, background and lighting of the second image exactly as they are, \
and keep the facial identity, skin tone and expression details of the person in the first image. \
Return a single photorealistic image.";
pub const NEGATIVE_QUALIFIER: &str =
    "Avoid: low quality, bad quality, sketches, cartoon, low resolution.";

pub const STATUS_CREATED: u16 = 201;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_SERVER_ERROR: u16 = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReplyBody {
    Success(GenerationResponse),
    Failure(ErrorResponse),
}

/// HTTP-agnostic outcome of one prediction request.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayReply {
    pub status: u16,
    pub body: ReplyBody,
}

impl GatewayReply {
    fn created(output: String, note: Option<String>) -> Self {
        Self {
            status: STATUS_CREATED,
            body: ReplyBody::Success(GenerationResponse { output, note }),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: ReplyBody::Failure(ErrorResponse::new(message)),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.body {
            ReplyBody::Failure(err) => Some(&err.error),
            ReplyBody::Success(_) => None,
        }
    }
}

pub fn build_instruction(prompt: Option<&str>) -> String {
    let mut instruction = FACE_SWAP_INSTRUCTION.to_string();
    if let Some(extra) = prompt.map(str::trim).filter(|p| !p.is_empty()) {
        instruction.push_str("\nAdditional instructions: ");
        instruction.push_str(extra);
    }
    instruction.push('\n');
    instruction.push_str(NEGATIVE_QUALIFIER);
    instruction
}

fn required(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

/// Validates prediction requests and relays them to the image provider.
#[derive(Clone)]
pub struct PredictionService {
    provider: Arc<dyn ImageProvider>,
    templates: TemplateLibrary,
}

impl PredictionService {
    pub fn new(provider: Arc<dyn ImageProvider>, templates: TemplateLibrary) -> Self {
        Self {
            provider,
            templates,
        }
    }

    pub fn provider(&self) -> &Arc<dyn ImageProvider> {
        &self.provider
    }

    pub fn templates(&self) -> &TemplateLibrary {
        &self.templates
    }

    /// Parses an inline image, rejecting non-image types and payloads that
    /// are not valid base64.
    fn inline_image(raw: &str) -> Result<DataUri> {
        let uri = DataUri::parse(raw)?;
        if !uri.mime_type.starts_with("image/") {
            return Err(StudioError::ValidationError(format!(
                "data URI is not an image: {}",
                uri.mime_type
            )));
        }
        uri.decode()?;
        Ok(uri)
    }

    fn resolve_selfie(&self, raw: &str) -> Result<DataUri> {
        if !DataUri::is_data_uri(raw) {
            return Err(StudioError::ValidationError(
                "selfie must be an inline data URI".into(),
            ));
        }
        Self::inline_image(raw)
    }

    /// Templates may also be named by a local reference (`suit.png` or
    /// `/templates/suit.png`), which is read from the library.
    async fn resolve_template(&self, raw: &str) -> Result<DataUri> {
        if DataUri::is_data_uri(raw) {
            return Self::inline_image(raw);
        }
        match TemplateLibrary::name_from_reference(raw) {
            Some(name) => self.templates.to_data_uri(name).await,
            None => Err(StudioError::ValidationError(
                "template is neither a data URI nor a local template".into(),
            )),
        }
    }

    async fn resolve_inputs(&self, image: &str, template: &str) -> Result<(DataUri, DataUri)> {
        let selfie = self.resolve_selfie(image)?;
        let template = self.resolve_template(template).await?;
        Ok((selfie, template))
    }

    pub async fn handle(&self, request: GenerationRequest) -> GatewayReply {
        let req_id = logger::request_id();

        if !self.provider.is_configured() {
            log::error!(
                "[req:{}] ❌ {} provider has no API key configured",
                req_id,
                self.provider.name()
            );
            return GatewayReply::error(STATUS_SERVER_ERROR, failure::MISSING_CREDENTIALS);
        }

        let (image, template) = match (required(&request.image), required(&request.template)) {
            (Some(image), Some(template)) => (image, template),
            _ => {
                log::warn!("[req:{}] ⚠️  Rejected request without image or template", req_id);
                return GatewayReply::error(STATUS_BAD_REQUEST, failure::MISSING_INPUTS);
            }
        };

        let (selfie, template) = match self.resolve_inputs(image, template).await {
            Ok(inputs) => inputs,
            Err(e) => {
                log::warn!("[req:{}] ⚠️  Unusable input: {}", req_id, e);
                return GatewayReply::error(STATUS_BAD_REQUEST, failure::UNSUPPORTED_INPUT);
            }
        };

        let provider_request = ProviderRequest {
            instruction: build_instruction(request.prompt.as_deref()),
            selfie,
            template,
        };

        log::info!(
            "[req:{}] 🎨 Forwarding face swap to {}",
            req_id,
            self.provider.name()
        );
        let outcome = {
            let _timer = logger::timer(&format!("[req:{}] provider call", req_id));
            self.provider.generate(&provider_request).await
        };

        match outcome {
            Ok(GenerationResult::Image { mime_type, data }) => {
                log::info!("[req:{}] ✅ Received {} image", req_id, mime_type);
                let uri = DataUri::new(mime_type, data);
                GatewayReply::created(uri.to_string(), None)
            }
            Ok(GenerationResult::Text(text)) => {
                log::warn!("[req:{}] ⚠️  Provider answered with text only", req_id);
                GatewayReply::created(text, Some(failure::TEXT_ONLY_NOTE.to_string()))
            }
            Ok(GenerationResult::Error(message)) => {
                log::error!("[req:{}] ❌ Provider declined: {}", req_id, message);
                Self::provider_failure(&message)
            }
            Err(e) => {
                log::error!("[req:{}] ❌ Provider call failed: {}", req_id, e);
                Self::provider_failure(&e.to_string())
            }
        }
    }

    fn provider_failure(message: &str) -> GatewayReply {
        let kind = FailureKind::classify(message);
        GatewayReply::error(STATUS_SERVER_ERROR, kind.user_message())
    }
}
