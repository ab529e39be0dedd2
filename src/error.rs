use thiserror::Error;

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Template error: {0}")]
    TemplateError(String),
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("Response error: {0}")]
    ResponseError(String),
    #[error("Provider error{}: {message}", status_suffix(.status))]
    ProviderError {
        status: Option<u16>,
        message: String,
    },
    #[error("A generation is already in progress")]
    Busy,
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl StudioError {
    pub fn provider(status: Option<u16>, message: impl Into<String>) -> Self {
        StudioError::ProviderError {
            status,
            message: message.into(),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" ({})", code)).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, StudioError>;
