use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ImageProvider, ProviderRequest};
use crate::{
    config::GeminiConfig,
    error::{Result, StudioError},
    models::{DataUri, GenerationResult},
};

const API_KEY_HEADER: &str = "x-goog-api-key";
const DEFAULT_IMAGE_MIME: &str = "image/png";
const SAFETY_FINISH_REASONS: [&str; 5] = [
    "SAFETY",
    "PROHIBITED_CONTENT",
    "IMAGE_SAFETY",
    "BLOCKLIST",
    "SPII",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, alias = "inline_data", skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default, alias = "mime_type")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn image(uri: &DataUri) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: Some(uri.mime_type.clone()),
                data: uri.data.clone(),
            }),
        }
    }
}

impl GenerateContentRequest {
    pub fn from_provider_request(request: &ProviderRequest) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::image(&request.selfie),
                    Part::image(&request.template),
                    Part::text(request.instruction.clone()),
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_string(), "TEXT".to_string()],
            },
        }
    }
}

/// Turns a `generateContent` reply into a tagged result. The first inline
/// image wins; text is only relayed when no image part exists.
pub fn parse_generate_response(response: &GenerateContentResponse) -> GenerationResult {
    let parts = || {
        response
            .candidates
            .iter()
            .filter_map(|candidate| candidate.content.as_ref())
            .flat_map(|content| content.parts.iter())
    };

    if let Some(inline) = parts()
        .filter_map(|part| part.inline_data.as_ref())
        .find(|inline| !inline.data.is_empty())
    {
        let mime_type = inline
            .mime_type
            .as_deref()
            .map(str::trim)
            .filter(|mime| !mime.is_empty())
            .unwrap_or(DEFAULT_IMAGE_MIME);
        return GenerationResult::Image {
            mime_type: mime_type.to_string(),
            data: inline.data.clone(),
        };
    }

    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        return GenerationResult::Error(format!(
            "prompt blocked by safety filters ({})",
            reason
        ));
    }

    let text = parts()
        .filter_map(|part| part.text.as_deref())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if text.is_empty() {
        if let Some(reason) = response
            .candidates
            .iter()
            .filter_map(|candidate| candidate.finish_reason.as_deref())
            .find(|reason| SAFETY_FINISH_REASONS.contains(reason))
        {
            return GenerationResult::Error(format!(
                "generation blocked by safety filters ({})",
                reason
            ));
        }
        return GenerationResult::Error("provider returned no content".to_string());
    }

    GenerationResult::Text(text)
}

#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn endpoint(&self) -> String {
        let model = self.config.model.trim();
        let model_path = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        };
        format!("{}/{}:generateContent", self.config.api_base, model_path)
    }

    fn error_from_body(status: u16, body: &str) -> StudioError {
        let message = match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(parsed) => match parsed.error.status {
                Some(code) => format!("{}: {}", code, parsed.error.message),
                None => parsed.error.message,
            },
            Err(_) if body.trim().is_empty() => "empty error body".to_string(),
            Err(_) => body.trim().to_string(),
        };
        StudioError::provider(Some(status), message)
    }
}

#[async_trait]
impl ImageProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn is_configured(&self) -> bool {
        self.config.has_credentials()
    }

    async fn generate(&self, request: &ProviderRequest) -> Result<GenerationResult> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| StudioError::ConfigError("Gemini API key is not set".into()))?;

        let payload = GenerateContentRequest::from_provider_request(request);
        let endpoint = self.endpoint();
        log::info!("Generating image with model: {}", self.config.model);
        log::debug!(
            "Gemini request: selfie {} ({} b64 chars), template {} ({} b64 chars)",
            request.selfie.mime_type,
            request.selfie.data.len(),
            request.template.mime_type,
            request.template.data.len()
        );

        let response = self
            .client
            .post(&endpoint)
            .header(API_KEY_HEADER, api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| StudioError::RequestError(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StudioError::ResponseError(format!("Gemini body unreadable: {}", e)))?;

        if !status.is_success() {
            log::error!("Gemini API returned {}: {}", status, body);
            return Err(Self::error_from_body(status.as_u16(), &body));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| StudioError::ResponseError(format!("Gemini response invalid: {}", e)))?;

        Ok(parse_generate_response(&parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn first_inline_image_wins_over_text() {
        let parsed = response(json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Here is your photo" },
                        { "inlineData": { "mimeType": "image/jpeg", "data": "AAAA" } },
                        { "inlineData": { "mimeType": "image/png", "data": "BBBB" } }
                    ]
                }
            }]
        }));

        assert_eq!(
            parse_generate_response(&parsed),
            GenerationResult::Image {
                mime_type: "image/jpeg".to_string(),
                data: "AAAA".to_string()
            }
        );
    }

    #[test]
    fn snake_case_inline_data_is_accepted() {
        let parsed = response(json!({
            "candidates": [{
                "content": { "parts": [{ "inline_data": { "mime_type": "image/webp", "data": "CCCC" } }] }
            }]
        }));

        assert_eq!(
            parse_generate_response(&parsed).as_data_uri().unwrap().to_string(),
            "data:image/webp;base64,CCCC"
        );
    }

    #[test]
    fn text_only_reply_is_relayed() {
        let parsed = response(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "I can't generate images." }, { "text": " " }] },
                "finishReason": "STOP"
            }]
        }));

        assert_eq!(
            parse_generate_response(&parsed),
            GenerationResult::Text("I can't generate images.".to_string())
        );
    }

    #[test]
    fn blocked_prompt_is_an_error() {
        let parsed = response(json!({ "promptFeedback": { "blockReason": "SAFETY" } }));
        match parse_generate_response(&parsed) {
            GenerationResult::Error(message) => assert!(message.contains("safety")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn safety_finish_reason_without_content_is_an_error() {
        let parsed = response(json!({
            "candidates": [{ "finishReason": "IMAGE_SAFETY" }]
        }));
        match parse_generate_response(&parsed) {
            GenerationResult::Error(message) => assert!(message.contains("IMAGE_SAFETY")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn empty_reply_is_an_error() {
        assert_eq!(
            parse_generate_response(&response(json!({}))),
            GenerationResult::Error("provider returned no content".to_string())
        );
    }

    #[test]
    fn request_carries_both_images_then_instruction() {
        let request = ProviderRequest {
            instruction: "swap".to_string(),
            selfie: DataUri::new("image/jpeg", "AAAA"),
            template: DataUri::new("image/png", "BBBB"),
        };
        let body = serde_json::to_value(GenerateContentRequest::from_provider_request(&request))
            .unwrap();

        assert_eq!(
            body,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "inlineData": { "mimeType": "image/jpeg", "data": "AAAA" } },
                        { "inlineData": { "mimeType": "image/png", "data": "BBBB" } },
                        { "text": "swap" }
                    ]
                }],
                "generationConfig": { "responseModalities": ["IMAGE", "TEXT"] }
            })
        );
    }

    #[test]
    fn endpoint_and_configuration() {
        let provider = GeminiProvider::new(
            GeminiConfig::new()
                .with_api_base("http://localhost:1/v1beta/")
                .with_model("gemini-test"),
        );
        assert_eq!(
            provider.endpoint(),
            "http://localhost:1/v1beta/models/gemini-test:generateContent"
        );
        assert!(!provider.is_configured());
    }

    #[test]
    fn api_error_body_keeps_status_and_message() {
        let err = GeminiProvider::error_from_body(
            429,
            r#"{"error":{"code":429,"message":"You exceeded your current quota","status":"RESOURCE_EXHAUSTED"}}"#,
        );
        assert_eq!(
            err.to_string(),
            "Provider error (429): RESOURCE_EXHAUSTED: You exceeded your current quota"
        );
    }
}
