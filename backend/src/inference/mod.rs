pub mod model;
pub mod preprocess;
pub mod tflite;

use std::path::PathBuf;

use ndarray::Array4;

use preprocess::InputSize;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Model file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Model runtime error: {0}")]
    Runtime(String),
    #[error("Unsupported model input: {0}")]
    UnsupportedInput(String),
    #[error("Unsupported model output: {0}")]
    UnsupportedOutput(String),
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Preprocessing failed: {0}")]
    PreprocessingError(String),
    #[error("Model error: {0}")]
    ModelError(String),
    #[error("Model returned {actual} outputs, expected {expected}")]
    OutputShape { expected: usize, actual: usize },
    #[error("Predicted class index {0} has no label")]
    UnknownClass(usize),
    #[error("Model handle is poisoned")]
    Poisoned,
    #[error("Inference worker failed: {0}")]
    Worker(String),
}

/// A loaded model runtime. Running mutates the runtime's tensor state, hence
/// `&mut self`; callers share a backend through a lock.
pub trait InferenceBackend: Send {
    fn input_size(&self) -> InputSize;

    /// Number of elements in the single output tensor.
    fn output_width(&self) -> usize;

    fn run(&mut self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError>;
}
