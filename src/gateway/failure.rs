pub const MISSING_CREDENTIALS: &str = "The GEMINI_API_KEY environment variable is not set.";
pub const MISSING_INPUTS: &str = "Image and template are required.";
pub const UNSUPPORTED_INPUT: &str =
    "Image and template must be base64 data URIs or the name of an available template.";
pub const MODEL_UNAVAILABLE: &str =
    "The image generation model is not available. Please check the configured model.";
pub const BLOCKED: &str =
    "The request was blocked by safety filters. Please try a different photo or prompt.";
pub const RATE_LIMITED: &str = "API quota exceeded. Please try again later.";
pub const GENERIC_FAILURE: &str = "Failed to generate image.";
pub const TEXT_ONLY_NOTE: &str =
    "The model returned text instead of an image. The configured model may not support image output.";

/// Buckets a provider failure by its message so the user sees a fixed,
/// readable string instead of the raw provider text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    ModelUnavailable,
    Blocked,
    RateLimited,
    Unknown,
}

impl FailureKind {
    pub fn classify(message: &str) -> Self {
        let message = message.to_ascii_lowercase();
        let has = |needle: &str| message.contains(needle);

        if has("404") || has("not found") {
            FailureKind::ModelUnavailable
        } else if has("safety") || has("blocked") {
            FailureKind::Blocked
        } else if has("quota")
            || has("rate limit")
            || has("rate-limit")
            || has("resource_exhausted")
            || has("429")
        {
            FailureKind::RateLimited
        } else {
            FailureKind::Unknown
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            FailureKind::ModelUnavailable => MODEL_UNAVAILABLE,
            FailureKind::Blocked => BLOCKED,
            FailureKind::RateLimited => RATE_LIMITED,
            FailureKind::Unknown => GENERIC_FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_provider_messages() {
        assert_eq!(
            FailureKind::classify("Provider error (404): NOT_FOUND: models/x is not found"),
            FailureKind::ModelUnavailable
        );
        assert_eq!(
            FailureKind::classify("prompt blocked by safety filters (SAFETY)"),
            FailureKind::Blocked
        );
        assert_eq!(
            FailureKind::classify("You exceeded your current QUOTA"),
            FailureKind::RateLimited
        );
        assert_eq!(
            FailureKind::classify("Provider error (429): too many requests"),
            FailureKind::RateLimited
        );
        assert_eq!(
            FailureKind::classify("Request error: connection refused"),
            FailureKind::Unknown
        );
    }

    #[test]
    fn generate_is_not_mistaken_for_rate_limiting() {
        assert_eq!(
            FailureKind::classify("failed to generate content"),
            FailureKind::Unknown
        );
    }

    #[test]
    fn quota_maps_to_fixed_message() {
        assert_eq!(
            FailureKind::classify("quota exceeded for project 123").user_message(),
            RATE_LIMITED
        );
    }
}
