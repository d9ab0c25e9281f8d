use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Class labels of the malignancy model, in output index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LesionClass {
    Benign,
    Malignant,
}

impl LesionClass {
    pub const LABELS: [LesionClass; 2] = [LesionClass::Benign, LesionClass::Malignant];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::LABELS.get(index).copied()
    }
}

/// Healthy vs. unhealthy verdict of the remote screening service.
///
/// The per-class confidences are absent when the remote call failed and the
/// result is the fallback; `message` then carries the failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage1Result {
    pub classification: HealthStatus,
    pub confidence: f64,
    pub is_healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthy_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unhealthy_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Malignant vs. benign result of the local model. Percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage2Result {
    pub classification: LesionClass,
    pub confidence: f64,
    pub is_malignant: bool,
    pub benign_probability: f64,
    pub malignant_probability: f64,
    pub raw_output: Vec<f32>,
    pub predicted_class_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level1Summary {
    pub classification: HealthStatus,
    pub confidence: f64,
    pub is_healthy: bool,
}

impl From<&Stage1Result> for Level1Summary {
    fn from(result: &Stage1Result) -> Self {
        Self {
            classification: result.classification,
            confidence: result.confidence,
            is_healthy: result.is_healthy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level2Summary {
    pub classification: LesionClass,
    pub confidence: f64,
    pub is_malignant: bool,
}

impl From<&Stage2Result> for Level2Summary {
    fn from(result: &Stage2Result) -> Self {
        Self {
            classification: result.classification,
            confidence: result.confidence,
            is_malignant: result.is_malignant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Level2Outcome {
    Completed(Level2Summary),
    Failed { error: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResponse {
    pub success: bool,
    pub level1: Level1Summary,
    pub level2: Option<Level2Outcome>,
    pub final_result: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level2Response {
    pub success: bool,
    pub classification: LesionClass,
    pub confidence: f64,
    pub is_malignant: bool,
}

impl From<&Stage2Result> for Level2Response {
    fn from(result: &Stage2Result) -> Self {
        Self {
            success: true,
            classification: result.classification,
            confidence: result.confidence,
            is_malignant: result.is_malignant,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub huggingface_space: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
}
