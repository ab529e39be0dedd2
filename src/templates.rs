use std::path::{Path, PathBuf};

use crate::{
    error::{Result, StudioError},
    models::{mime_for_extension, DataUri},
};

pub const TEMPLATE_ROUTE_PREFIX: &str = "/templates/";

/// Directory of static template images served under `/templates/`.
#[derive(Debug, Clone)]
pub struct TemplateLibrary {
    dir: PathBuf,
}

fn extension_of(name: &str) -> Option<&str> {
    Path::new(name).extension().and_then(|ext| ext.to_str())
}

pub fn is_image_file(name: &str) -> bool {
    matches!(
        extension_of(name).map(|ext| ext.to_ascii_lowercase()).as_deref(),
        Some("png" | "jpg" | "jpeg" | "webp")
    )
}

impl TemplateLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Sorted image file names. An unreadable directory is logged and
    /// treated as empty so the page can still render.
    pub async fn list(&self) -> Vec<String> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                log::error!(
                    "❌ Error reading templates directory {}: {}",
                    self.dir.display(),
                    e
                );
                return Vec::new();
            }
        };

        let mut templates = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let is_file = entry
                        .file_type()
                        .await
                        .map(|kind| kind.is_file())
                        .unwrap_or(false);
                    if let Some(name) = entry.file_name().to_str() {
                        if is_file && is_image_file(name) {
                            templates.push(name.to_string());
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    log::warn!("⚠️  Skipping unreadable template entry: {}", e);
                    break;
                }
            }
        }

        templates.sort();
        templates
    }

    pub fn validate_name(name: &str) -> Result<()> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
            || name.starts_with('.')
        {
            return Err(StudioError::TemplateError(format!(
                "invalid template name: {}",
                name
            )));
        }
        if !is_image_file(name) {
            return Err(StudioError::TemplateError(format!(
                "not an image template: {}",
                name
            )));
        }
        Ok(())
    }

    pub async fn resolve(&self, name: &str) -> Result<PathBuf> {
        Self::validate_name(name)?;
        let path = self.dir.join(name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            _ => Err(StudioError::TemplateError(format!(
                "template not found: {}",
                name
            ))),
        }
    }

    /// Raw bytes and mime type of a template.
    pub async fn read(&self, name: &str) -> Result<(Vec<u8>, &'static str)> {
        let path = self.resolve(name).await?;
        let mime = extension_of(name)
            .and_then(mime_for_extension)
            .unwrap_or("application/octet-stream");
        let bytes = tokio::fs::read(&path).await?;
        Ok((bytes, mime))
    }

    pub async fn to_data_uri(&self, name: &str) -> Result<DataUri> {
        let (bytes, mime) = self.read(name).await?;
        Ok(DataUri::from_bytes(mime, &bytes))
    }

    /// Extracts a template file name from a reference a client may send
    /// instead of a data URI: `suit.png` or `/templates/suit.png`.
    /// References carrying a scheme or host are never treated as local.
    pub fn name_from_reference(reference: &str) -> Option<&str> {
        let reference = reference.trim();
        if reference.contains(':') || reference.starts_with("//") {
            return None;
        }
        let name = reference
            .strip_prefix(TEMPLATE_ROUTE_PREFIX)
            .unwrap_or(reference)
            .split(['?', '#'])
            .next()
            .unwrap_or_default();

        Self::validate_name(name).ok().map(|_| name)
    }
}
