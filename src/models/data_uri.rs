use base64::{engine::general_purpose::STANDARD, Engine};
use std::fmt;

use crate::error::{Result, StudioError};

const DEFAULT_MIME: &str = "application/octet-stream";

/// A `data:<mime>;base64,<payload>` string split into its parts.
/// The payload is kept base64-encoded since that is what both the
/// provider API and the browser consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub data: String,
}

impl DataUri {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        Self {
            mime_type: if mime_type.trim().is_empty() {
                DEFAULT_MIME.to_string()
            } else {
                mime_type.trim().to_ascii_lowercase()
            },
            data: data.into(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let rest = raw
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| StudioError::ValidationError("not a data URI".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| StudioError::ValidationError("data URI has no payload".into()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| StudioError::ValidationError("data URI is not base64 encoded".into()))?;
        if payload.is_empty() {
            return Err(StudioError::ValidationError("data URI payload is empty".into()));
        }

        Ok(Self::new(mime_type, payload))
    }

    pub fn is_data_uri(raw: &str) -> bool {
        raw.trim_start().starts_with("data:")
    }

    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(mime_type, STANDARD.encode(bytes))
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.data.as_bytes())
            .map_err(|e| StudioError::ValidationError(format!("invalid base64 payload: {}", e)))
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.data)
    }
}

pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}
