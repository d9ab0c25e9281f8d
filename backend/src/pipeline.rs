use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use image::DynamicImage;
use shared::{
    ClassificationResponse, ErrorResponse, Level1Summary, Level2Outcome, Level2Summary,
    Stage2Result,
};
use uuid::Uuid;

use crate::inference::InferenceError;
use crate::inference::model::LesionModel;
use crate::remote::client::RemoteClassifier;

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("Invalid image: {0}")]
    Validation(String),
    #[error("Malignant/Benign classification failed: {0}")]
    Inference(#[from] InferenceError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for ClassifyError {
    fn status_code(&self) -> StatusCode {
        match self {
            ClassifyError::Validation(_) => StatusCode::BAD_REQUEST,
            ClassifyError::Inference(_) | ClassifyError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ClassifyError::Validation(_) => "Please provide a valid image file",
            ClassifyError::Inference(_) => "Malignant/Benign classification failed",
            ClassifyError::Internal(_) => "An error occurred during classification",
        };
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            success: false,
            error: self.to_string(),
            message: message.to_string(),
        })
    }
}

/// Healthy/unhealthy screening followed, for unhealthy images, by the local
/// malignant/benign model.
#[derive(Clone)]
pub struct ClassificationPipeline {
    screen: RemoteClassifier,
    model: Arc<LesionModel>,
}

impl ClassificationPipeline {
    pub fn new(screen: RemoteClassifier, model: Arc<LesionModel>) -> Self {
        Self { screen, model }
    }

    pub fn service_id(&self) -> &str {
        self.screen.service_id()
    }

    pub async fn classify(&self, image_bytes: &[u8]) -> Result<ClassificationResponse, ClassifyError> {
        let request_id = Uuid::new_v4();
        let image = decode(image_bytes).await?;
        log::info!(
            "[{}] Classifying {}x{} image ({} bytes)",
            request_id,
            image.width(),
            image.height(),
            image_bytes.len()
        );

        let level1 = self.screen.classify_healthy_unhealthy(image_bytes).await;
        let mut response = ClassificationResponse {
            success: true,
            level1: Level1Summary::from(&level1),
            level2: None,
            final_result: level1.classification.to_string(),
        };

        if level1.is_healthy {
            log::info!("[{}] Healthy, skipping stage 2", request_id);
            return Ok(response);
        }

        match self.run_stage2(image).await {
            Ok(level2) => {
                response.final_result = level2.classification.to_string();
                response.level2 = Some(Level2Outcome::Completed(Level2Summary::from(&level2)));
            }
            Err(e) => {
                log::error!("[{}] Level 2 classification error: {}", request_id, e);
                response.level2 = Some(Level2Outcome::Failed {
                    error: e.to_string(),
                    message: "Malignant/Benign classification failed".to_string(),
                });
            }
        }

        log::info!("[{}] Final result: {}", request_id, response.final_result);
        Ok(response)
    }

    /// Runs only the local model, skipping the remote screening.
    pub async fn classify_level2_only(&self, image_bytes: &[u8]) -> Result<Stage2Result, ClassifyError> {
        let image = decode(image_bytes).await?;
        Ok(self.run_stage2(image).await?)
    }

    async fn run_stage2(&self, image: DynamicImage) -> Result<Stage2Result, InferenceError> {
        let model = self.model.clone();
        tokio::task::spawn_blocking(move || model.predict(&image))
            .await
            .map_err(|e| InferenceError::Worker(e.to_string()))?
    }
}

/// Decodes the upload once, off the async workers.
async fn decode(image_bytes: &[u8]) -> Result<DynamicImage, ClassifyError> {
    if image_bytes.is_empty() {
        return Err(ClassifyError::Validation("empty image".to_string()));
    }
    let bytes = image_bytes.to_vec();
    tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
        .await
        .map_err(|e| ClassifyError::Internal(e.to_string()))?
        .map_err(|e| ClassifyError::Validation(e.to_string()))
}
