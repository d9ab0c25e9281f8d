use std::path::Path;

use ndarray::Array4;
use tract_core::prelude::*;

use super::preprocess::InputSize;
use super::{InferenceBackend, InferenceError, LoadError};

/// TensorFlow Lite model executed by tract.
pub struct TfliteBackend {
    plan: TypedRunnableModel<TypedModel>,
    input_shape: [usize; 4],
    input_type: DatumType,
    output_width: usize,
}

impl TfliteBackend {
    pub fn load(model_path: &Path) -> Result<Self, LoadError> {
        if !model_path.is_file() {
            return Err(LoadError::NotFound(model_path.to_path_buf()));
        }

        let model = tract_tflite::tflite()
            .model_for_path(model_path)
            .map_err(|e| LoadError::Runtime(format!("{e:#}")))?;

        let input_fact = model
            .input_fact(0)
            .map_err(|e| LoadError::Runtime(format!("{e:#}")))?
            .clone();
        let input_shape = match input_fact.shape.as_concrete() {
            Some(&[batch, height, width, channels]) if batch == 1 && channels == 3 => {
                [batch, height, width, channels]
            }
            _ => {
                return Err(LoadError::UnsupportedInput(format!(
                    "expected [1, H, W, 3], got {:?}",
                    input_fact.shape
                )));
            }
        };

        let output_fact = model
            .output_fact(0)
            .map_err(|e| LoadError::Runtime(format!("{e:#}")))?
            .clone();
        let output_width = output_fact
            .shape
            .as_concrete()
            .and_then(|dims| dims.last().copied())
            .ok_or_else(|| {
                LoadError::UnsupportedOutput(format!("non-concrete shape {:?}", output_fact.shape))
            })?;

        let plan = model
            .into_optimized()
            .and_then(|m| m.into_runnable())
            .map_err(|e| LoadError::Runtime(format!("{e:#}")))?;

        log::info!(
            "Loaded {}: input {:?} {:?}, output {:?} {:?}",
            model_path.display(),
            input_shape,
            input_fact.datum_type,
            output_fact.shape,
            output_fact.datum_type
        );

        Ok(Self {
            plan,
            input_shape,
            input_type: input_fact.datum_type,
            output_width,
        })
    }
}

impl InferenceBackend for TfliteBackend {
    fn input_size(&self) -> InputSize {
        InputSize {
            height: self.input_shape[1] as u32,
            width: self.input_shape[2] as u32,
        }
    }

    fn output_width(&self) -> usize {
        self.output_width
    }

    fn run(&mut self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let data = input.as_slice().ok_or_else(|| {
            InferenceError::PreprocessingError("input tensor is not contiguous".to_string())
        })?;

        let mut tensor = Tensor::from_shape(input.shape(), data)
            .map_err(|e| InferenceError::PreprocessingError(format!("{e:#}")))?;
        if self.input_type != DatumType::F32 {
            tensor = tensor
                .cast_to_dt(self.input_type)
                .map_err(|e| InferenceError::PreprocessingError(format!("{e:#}")))?
                .into_owned();
        }

        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| InferenceError::ModelError(format!("{e:#}")))?;
        let output = outputs
            .first()
            .ok_or_else(|| InferenceError::ModelError("model produced no output".to_string()))?;

        let output = output
            .cast_to::<f32>()
            .map_err(|e| InferenceError::ModelError(format!("{e:#}")))?;
        let values = output
            .as_slice::<f32>()
            .map_err(|e| InferenceError::ModelError(format!("{e:#}")))?;
        Ok(values.to_vec())
    }
}
