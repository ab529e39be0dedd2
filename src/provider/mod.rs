#[cfg(test)]
pub(crate) mod fake;
pub mod gemini;

use crate::{
    error::Result,
    models::{DataUri, GenerationResult},
};
use async_trait::async_trait;

pub use gemini::{parse_generate_response, GeminiProvider};

/// Everything a provider needs for one face-swap call.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub instruction: String,
    pub selfie: DataUri,
    pub template: DataUri,
}

/// The external image model. Constructed once at start-up and shared by
/// all requests; tests swap in a fake.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &str;

    /// False when no credentials are available. The gateway checks this
    /// before any network call.
    fn is_configured(&self) -> bool;

    /// `Err` covers transport and HTTP failures; a reply the provider
    /// sent but that holds no image or text comes back as
    /// `GenerationResult::Error`.
    async fn generate(&self, request: &ProviderRequest) -> Result<GenerationResult>;
}
