//! A small face-swap photo studio.
//!
//! The server lists template images, serves a one-page studio UI and
//! relays `POST /api/predictions` to a multimodal image model. The
//! [`client`] module drives the same flow from Rust.

pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logger;
pub mod models;
pub mod provider;
pub mod server;
pub mod templates;

pub use client::{RenderedResult, StudioClient};
pub use config::{GeminiConfig, StudioConfig};
pub use error::{Result, StudioError};
pub use gateway::{GatewayReply, PredictionService};
pub use models::*;
pub use provider::{GeminiProvider, ImageProvider, ProviderRequest};
pub use templates::TemplateLibrary;
