use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{ImageProvider, ProviderRequest};
use crate::{
    error::{Result, StudioError},
    models::GenerationResult,
};

#[derive(Clone)]
pub(crate) enum FakeReply {
    Result(GenerationResult),
    Fail { status: Option<u16>, message: String },
}

/// Scripted provider that counts calls and keeps the last request.
pub(crate) struct FakeProvider {
    configured: bool,
    reply: FakeReply,
    calls: AtomicUsize,
    last_request: Mutex<Option<ProviderRequest>>,
}

impl FakeProvider {
    pub(crate) fn replying(result: GenerationResult) -> Self {
        Self::new(true, FakeReply::Result(result))
    }

    pub(crate) fn failing(status: Option<u16>, message: &str) -> Self {
        Self::new(
            true,
            FakeReply::Fail {
                status,
                message: message.to_string(),
            },
        )
    }

    pub(crate) fn unconfigured() -> Self {
        Self::new(false, FakeReply::Result(GenerationResult::Text("unused".into())))
    }

    fn new(configured: bool, reply: FakeReply) -> Self {
        Self {
            configured,
            reply,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<ProviderRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate(&self, request: &ProviderRequest) -> Result<GenerationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        match &self.reply {
            FakeReply::Result(result) => Ok(result.clone()),
            FakeReply::Fail { status, message } => {
                Err(StudioError::provider(*status, message.clone()))
            }
        }
    }
}
