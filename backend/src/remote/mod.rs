pub mod client;
pub mod gradio;
pub mod parse;

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum RemoteServiceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("URL parsing failed: {0}")]
    Url(#[from] url::ParseError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unexpected response from space: {0}")]
    Protocol(String),
    #[error("Space reported an error: {0}")]
    Space(String),
    #[error("Invalid percentage {0:?}")]
    Percentage(String),
}

/// Call into the hosted screening model.
///
/// Implementations receive the staged image file and return the endpoint's
/// raw output, either a single string or an array of outputs.
#[async_trait]
pub trait SpaceTransport: Send + Sync {
    async fn predict(&self, image_path: &Path) -> Result<Value, RemoteServiceError>;
}
