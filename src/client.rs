use reqwest::{header::CONTENT_TYPE, Client};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    error::{Result, StudioError},
    models::{
        extension_for_mime, mime_for_extension, DataUri, ErrorResponse, GenerationRequest,
        GenerationResponse,
    },
};

/// How a prediction output should be shown.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedResult {
    /// An `http(s)` URL or a `data:` URI.
    Image(String),
    Text { text: String, note: Option<String> },
}

impl RenderedResult {
    pub fn from_output(output: String, note: Option<String>) -> Self {
        if output.starts_with("http") || output.starts_with("data:") {
            RenderedResult::Image(output)
        } else {
            RenderedResult::Text { text: output, note }
        }
    }

    /// Writes a data-URI image next to `stem`, picking the extension from
    /// its mime type. Returns the written path.
    pub async fn save_image(&self, stem: &Path) -> Result<std::path::PathBuf> {
        let source = match self {
            RenderedResult::Image(source) => source,
            RenderedResult::Text { .. } => {
                return Err(StudioError::ValidationError("result is not an image".into()))
            }
        };
        let uri = DataUri::parse(source).map_err(|_| {
            StudioError::ValidationError(format!("only data URI results can be saved: {}", source))
        })?;
        let path = stem.with_extension(extension_for_mime(&uri.mime_type));
        tokio::fs::write(&path, uri.decode()?).await?;
        Ok(path)
    }
}

/// Drives one studio session against a running server: prepares both
/// images as data URIs and submits them, one generation at a time.
pub struct StudioClient {
    http: Client,
    base_url: String,
    generating: AtomicBool,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl StudioClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            generating: AtomicBool::new(false),
        }
    }

    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::SeqCst)
    }

    fn begin(&self) -> Result<InFlight<'_>> {
        self.generating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| StudioError::Busy)?;
        Ok(InFlight(&self.generating))
    }

    pub async fn selfie_data_uri(path: &Path) -> Result<DataUri> {
        let mime = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(mime_for_extension)
            .ok_or_else(|| {
                StudioError::ValidationError(format!("unsupported selfie file: {}", path.display()))
            })?;
        let bytes = tokio::fs::read(path).await?;
        Ok(DataUri::from_bytes(mime, &bytes))
    }

    /// Downloads a served template and re-encodes it as a data URI, since
    /// the provider cannot reach locally served files by URL.
    pub async fn fetch_template_data_uri(&self, name: &str) -> Result<DataUri> {
        let url = format!("{}/templates/{}", self.base_url, name);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| StudioError::RequestError(format!("template download failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(StudioError::TemplateError(format!(
                "template {} unavailable ({})",
                name,
                response.status()
            )));
        }

        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StudioError::ResponseError(format!("template body unreadable: {}", e)))?;

        Ok(DataUri::from_bytes(mime, &bytes))
    }

    pub async fn build_request(
        &self,
        selfie: &Path,
        template: &str,
        prompt: Option<&str>,
    ) -> Result<GenerationRequest> {
        let (selfie, template) = futures::try_join!(
            Self::selfie_data_uri(selfie),
            self.fetch_template_data_uri(template)
        )?;

        let mut request = GenerationRequest::new(selfie.to_string(), template.to_string());
        if let Some(prompt) = prompt {
            request = request.with_prompt(prompt);
        }
        Ok(request)
    }

    pub async fn predict(&self, request: &GenerationRequest) -> Result<RenderedResult> {
        let url = format!("{}/api/predictions", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| StudioError::RequestError(format!("prediction request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| "Failed to generate".to_string());
            return Err(StudioError::provider(Some(status.as_u16()), message));
        }

        let body: GenerationResponse = response
            .json()
            .await
            .map_err(|e| StudioError::ResponseError(format!("prediction body invalid: {}", e)))?;
        Ok(RenderedResult::from_output(body.output, body.note))
    }

    /// Prepares inputs and submits exactly one prediction. Fails with
    /// `Busy` while another submission is outstanding.
    pub async fn submit(
        &self,
        selfie: &Path,
        template: &str,
        prompt: Option<&str>,
    ) -> Result<RenderedResult> {
        let _in_flight = self.begin()?;
        let request = self.build_request(selfie, template, prompt).await?;
        log::info!("🎨 Submitting {} with template {}", selfie.display(), template);
        self.predict(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gateway::failure,
        models::GenerationResult,
        provider::fake::FakeProvider,
        server::{handlers, AppState},
        templates::TemplateLibrary,
    };
    use actix_web::{web, App, HttpResponse, HttpServer};
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    type PostedBodies = Mutex<Vec<String>>;

    struct Fixture {
        _dir: tempfile::TempDir,
        selfie: std::path::PathBuf,
        base_url: String,
        posted: web::Data<PostedBodies>,
        handle: actix_web::dev::ServerHandle,
    }

    impl Fixture {
        fn posted(&self) -> Vec<String> {
            self.posted.lock().unwrap().clone()
        }
    }

    /// Keeps the exact bytes the client sent before handing the request
    /// to the regular prediction handler.
    async fn recording_prediction(
        state: web::Data<AppState>,
        posted: web::Data<PostedBodies>,
        body: web::Bytes,
    ) -> HttpResponse {
        posted
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(&body).into_owned());
        match serde_json::from_slice::<GenerationRequest>(&body) {
            Ok(request) => handlers::create_prediction(state, web::Json(request)).await,
            Err(_) => HttpResponse::BadRequest().json(ErrorResponse::new("Invalid JSON body.")),
        }
    }

    fn spawn_studio(provider: Arc<FakeProvider>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let templates = dir.path().join("templates");
        std::fs::create_dir(&templates).unwrap();
        std::fs::write(templates.join("suit.png"), b"suit-bytes").unwrap();
        let selfie = dir.path().join("me.jpg");
        std::fs::write(&selfie, b"selfie-bytes").unwrap();

        let state = web::Data::new(AppState::new(provider, TemplateLibrary::new(&templates)));
        let posted = web::Data::new(PostedBodies::default());
        let app_posted = posted.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .app_data(app_posted.clone())
                .route("/templates/{name}", web::get().to(handlers::template_file))
                .route("/api/predictions", web::post().to(recording_prediction))
        })
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addrs = server.addrs();
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        Fixture {
            _dir: dir,
            selfie,
            base_url: format!("http://{}", addrs[0]),
            posted,
            handle,
        }
    }

    #[test]
    fn classifies_outputs_for_rendering() {
        assert_eq!(
            RenderedResult::from_output("data:image/png;base64,AAAA".into(), None),
            RenderedResult::Image("data:image/png;base64,AAAA".into())
        );
        assert_eq!(
            RenderedResult::from_output("https://cdn.example.com/out.png".into(), None),
            RenderedResult::Image("https://cdn.example.com/out.png".into())
        );
        assert_eq!(
            RenderedResult::from_output("no image today".into(), Some("note".into())),
            RenderedResult::Text {
                text: "no image today".into(),
                note: Some("note".into())
            }
        );
    }

    #[tokio::test]
    async fn saves_data_uri_images_with_matching_extension() {
        let dir = tempfile::tempdir().unwrap();
        let result = RenderedResult::Image(DataUri::from_bytes("image/jpeg", b"jpeg!").to_string());

        let path = result.save_image(&dir.path().join("out")).await.unwrap();
        assert_eq!(path.extension().unwrap(), "jpg");
        assert_eq!(std::fs::read(path).unwrap(), b"jpeg!");

        let text = RenderedResult::Text { text: "hi".into(), note: None };
        assert!(text.save_image(&dir.path().join("text")).await.is_err());
    }

    #[actix_web::test]
    async fn submit_sends_one_prediction_with_data_uris() {
        let provider = Arc::new(FakeProvider::replying(GenerationResult::Image {
            mime_type: "image/png".into(),
            data: "iVBORw==".into(),
        }));
        let fixture = spawn_studio(provider.clone());
        let client = StudioClient::new(&fixture.base_url);

        let result = client
            .submit(&fixture.selfie, "suit.png", Some("studio lighting"))
            .await
            .unwrap();

        assert_eq!(
            result,
            RenderedResult::Image("data:image/png;base64,iVBORw==".into())
        );
        assert_eq!(provider.calls(), 1);

        let posted = fixture.posted();
        assert_eq!(posted.len(), 1);
        assert!(!posted[0].contains("/templates/"));
        assert!(!posted[0].contains("suit.png"));
        let body: Value = serde_json::from_str(&posted[0]).unwrap();
        assert_eq!(
            body["image"],
            DataUri::from_bytes("image/jpeg", b"selfie-bytes").to_string()
        );
        assert_eq!(
            body["template"],
            DataUri::from_bytes("image/png", b"suit-bytes").to_string()
        );
        assert_eq!(body["prompt"], "studio lighting");
        assert!(!client.is_generating());

        fixture.handle.stop(false).await;
    }

    #[actix_web::test]
    async fn gateway_errors_surface_relayed_message() {
        let provider = Arc::new(FakeProvider::failing(Some(429), "quota exceeded"));
        let fixture = spawn_studio(provider.clone());
        let client = StudioClient::new(&fixture.base_url);

        let err = client
            .submit(&fixture.selfie, "suit.png", None)
            .await
            .unwrap_err();
        match err {
            StudioError::ProviderError { status, message } => {
                assert_eq!(status, Some(500));
                assert_eq!(message, failure::RATE_LIMITED);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err = client.submit(&fixture.selfie, "missing.png", None).await.unwrap_err();
        assert!(matches!(err, StudioError::TemplateError(_)));
        assert_eq!(provider.calls(), 1);
        assert_eq!(fixture.posted().len(), 1);

        fixture.handle.stop(false).await;
    }

    #[test]
    fn second_submission_is_rejected_while_in_flight() {
        let client = StudioClient::new("http://127.0.0.1:1");
        let guard = client.begin().unwrap();
        assert!(client.is_generating());
        assert!(matches!(client.begin(), Err(StudioError::Busy)));

        drop(guard);
        assert!(!client.is_generating());
        assert!(client.begin().is_ok());
    }
}
