use super::data_uri::DataUri;

/// What the provider produced for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    /// Inline image bytes (base64) with the part's declared mime type.
    Image { mime_type: String, data: String },
    /// The model answered with text only, e.g. when it cannot emit images.
    Text(String),
    /// The provider answered but declined or returned nothing usable.
    Error(String),
}

impl GenerationResult {
    pub fn as_data_uri(&self) -> Option<DataUri> {
        match self {
            GenerationResult::Image { mime_type, data } => {
                Some(DataUri::new(mime_type.clone(), data.clone()))
            }
            _ => None,
        }
    }
}
