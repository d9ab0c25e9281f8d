use std::path::Path;
use std::sync::Mutex;

use image::DynamicImage;
use shared::{LesionClass, Stage2Result};

use super::preprocess::{InputSize, preprocess};
use super::tflite::TfliteBackend;
use super::{InferenceBackend, InferenceError, LoadError};

/// Shape of the model's output, resolved once when the model is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayout {
    /// A single sigmoid unit.
    Binary,
    /// One probability per class.
    Categorical(usize),
}

impl OutputLayout {
    pub fn from_width(width: usize) -> Result<Self, LoadError> {
        match width {
            0 => Err(LoadError::UnsupportedOutput("empty output tensor".to_string())),
            1 => Ok(OutputLayout::Binary),
            n => Ok(OutputLayout::Categorical(n)),
        }
    }

    pub fn width(&self) -> usize {
        match self {
            OutputLayout::Binary => 1,
            OutputLayout::Categorical(n) => *n,
        }
    }
}

/// Malignant vs. benign classifier over a single shared model handle.
///
/// Every `predict` call holds the handle's lock for the whole
/// set-input/invoke/read-output sequence, so concurrent requests are
/// serialised on one runtime instead of racing on its tensor buffers.
pub struct LesionModel {
    backend: Mutex<Box<dyn InferenceBackend>>,
    input_size: InputSize,
    layout: OutputLayout,
}

impl LesionModel {
    pub fn load(model_path: &Path) -> Result<Self, LoadError> {
        let backend = TfliteBackend::load(model_path)?;
        Self::from_backend(Box::new(backend))
    }

    pub fn from_backend(backend: Box<dyn InferenceBackend>) -> Result<Self, LoadError> {
        let input_size = backend.input_size();
        if input_size.height == 0 || input_size.width == 0 {
            return Err(LoadError::UnsupportedInput(format!(
                "zero-sized input {}x{}",
                input_size.width, input_size.height
            )));
        }
        let layout = OutputLayout::from_width(backend.output_width())?;

        Ok(Self {
            backend: Mutex::new(backend),
            input_size,
            layout,
        })
    }

    pub fn predict(&self, image: &DynamicImage) -> Result<Stage2Result, InferenceError> {
        let tensor = preprocess(image, self.input_size)?;

        let output = {
            let mut backend = self.backend.lock().map_err(|_| InferenceError::Poisoned)?;
            backend.run(&tensor)?
        };

        let result = derive_result(self.layout, output)?;
        log::info!(
            "Stage 2 result: {} ({}%), benign {}%, malignant {}%, index {}",
            result.classification,
            result.confidence,
            result.benign_probability,
            result.malignant_probability,
            result.predicted_class_index
        );
        log::debug!("Raw model output: {:?}", result.raw_output);
        Ok(result)
    }
}

/// Index of the first maximum, like numpy's `argmax`.
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

fn percent(probability: f32) -> f64 {
    (f64::from(probability) * 100.0 * 100.0).round() / 100.0
}

pub fn derive_result(layout: OutputLayout, output: Vec<f32>) -> Result<Stage2Result, InferenceError> {
    if output.len() != layout.width() {
        return Err(InferenceError::OutputShape {
            expected: layout.width(),
            actual: output.len(),
        });
    }

    let index = argmax(&output);
    let classification = LesionClass::from_index(index).ok_or(InferenceError::UnknownClass(index))?;

    let (benign, malignant, confidence) = match layout {
        OutputLayout::Categorical(_) => (output[0], output[1], output[index]),
        OutputLayout::Binary => {
            // The unit's probability belongs to whichever class argmax picked;
            // over one element that is always index 0.
            let p = output[0];
            let (benign, malignant) = if index == 1 { (1.0 - p, p) } else { (p, 1.0 - p) };
            (benign, malignant, benign.max(malignant))
        }
    };

    Ok(Stage2Result {
        classification,
        confidence: percent(confidence),
        is_malignant: classification == LesionClass::Malignant,
        benign_probability: percent(benign),
        malignant_probability: percent(malignant),
        raw_output: output,
        predicted_class_index: index,
    })
}
