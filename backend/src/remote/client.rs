use std::io::Write;
use std::sync::Arc;

use shared::Stage1Result;
use tempfile::NamedTempFile;

use super::parse::{fallback, interpret};
use super::{RemoteServiceError, SpaceTransport};

/// Healthy vs. unhealthy screening through the hosted space.
#[derive(Clone)]
pub struct RemoteClassifier {
    transport: Arc<dyn SpaceTransport>,
    service_id: String,
}

impl RemoteClassifier {
    pub fn new(transport: Arc<dyn SpaceTransport>, service_id: impl Into<String>) -> Self {
        Self {
            transport,
            service_id: service_id.into(),
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Never fails: any error yields the unhealthy fallback so that an
    /// unreachable service can not report a lesion as healthy.
    pub async fn classify_healthy_unhealthy(&self, image_bytes: &[u8]) -> Stage1Result {
        match self.try_classify(image_bytes).await {
            Ok(result) => {
                log::info!(
                    "Stage 1 result: {} ({}%), healthy {:?}%, unhealthy {:?}%",
                    result.classification,
                    result.confidence,
                    result.healthy_confidence,
                    result.unhealthy_confidence
                );
                result
            }
            Err(e) => {
                log::error!("Hugging Face API error ({}): {}", self.service_id, e);
                fallback(format!("API error: {}", e))
            }
        }
    }

    async fn try_classify(&self, image_bytes: &[u8]) -> Result<Stage1Result, RemoteServiceError> {
        // Removed when dropped, on every path out of this function.
        let staged = stage_image(image_bytes)?;

        log::info!("Calling Hugging Face Space: {}", self.service_id);
        let output = self.transport.predict(staged.path()).await?;
        log::debug!("Raw space response: {}", output);

        interpret(&output)
    }
}

fn stage_image(image_bytes: &[u8]) -> Result<NamedTempFile, RemoteServiceError> {
    let mut file = tempfile::Builder::new()
        .prefix("oral-lesion-")
        .suffix(".jpg")
        .tempfile()?;
    file.write_all(image_bytes)?;
    file.flush()?;
    Ok(file)
}
