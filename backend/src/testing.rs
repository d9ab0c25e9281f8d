//! Test doubles for the remote space and the model runtime.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::Array4;
use serde_json::Value;

use crate::inference::preprocess::InputSize;
use crate::inference::{InferenceBackend, InferenceError};
use crate::remote::{RemoteServiceError, SpaceTransport};

pub const TEST_INPUT: InputSize = InputSize {
    height: 32,
    width: 32,
};

pub fn solid_image(value: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(48, 40, Rgb([value, value / 2, 255 - value])))
}

pub fn png_bytes(value: u8) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    solid_image(value)
        .write_to(&mut bytes, ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

/// Returns a fixed output and records what it was fed.
pub struct FixedBackend {
    pub output: Vec<f32>,
    width: usize,
    pub seen_shapes: Arc<Mutex<Vec<Vec<usize>>>>,
    pub max_seen: Arc<Mutex<f32>>,
}

impl FixedBackend {
    pub fn new(output: Vec<f32>) -> Self {
        Self {
            width: output.len(),
            output,
            seen_shapes: Arc::default(),
            max_seen: Arc::default(),
        }
    }
}

impl InferenceBackend for FixedBackend {
    fn input_size(&self) -> InputSize {
        TEST_INPUT
    }

    fn output_width(&self) -> usize {
        self.width
    }

    fn run(&mut self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        self.seen_shapes.lock().unwrap().push(input.shape().to_vec());
        let max = input.iter().cloned().fold(f32::MIN, f32::max);
        *self.max_seen.lock().unwrap() = max;
        Ok(self.output.clone())
    }
}

pub struct FailingBackend;

impl InferenceBackend for FailingBackend {
    fn input_size(&self) -> InputSize {
        TEST_INPUT
    }

    fn output_width(&self) -> usize {
        2
    }

    fn run(&mut self, _input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        Err(InferenceError::ModelError("invoke failed".to_string()))
    }
}

/// Counts runs that start while another run is still in progress.
#[derive(Default)]
pub struct SerialCheckBackend {
    in_flight: Arc<AtomicBool>,
    pub overlaps: Arc<AtomicUsize>,
    pub calls: Arc<AtomicUsize>,
}

impl InferenceBackend for SerialCheckBackend {
    fn input_size(&self) -> InputSize {
        TEST_INPUT
    }

    fn output_width(&self) -> usize {
        2
    }

    fn run(&mut self, _input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        thread::sleep(Duration::from_millis(5));
        self.in_flight.store(false, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![0.1, 0.9])
    }
}

pub struct StaticTransport {
    output: Value,
    pub calls: Arc<AtomicUsize>,
}

impl StaticTransport {
    pub fn new(output: Value) -> Self {
        Self {
            output,
            calls: Arc::default(),
        }
    }
}

#[async_trait]
impl SpaceTransport for StaticTransport {
    async fn predict(&self, _image_path: &Path) -> Result<Value, RemoteServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.output.clone())
    }
}

pub struct FailingTransport;

#[async_trait]
impl SpaceTransport for FailingTransport {
    async fn predict(&self, _image_path: &Path) -> Result<Value, RemoteServiceError> {
        Err(RemoteServiceError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }
}

/// Captures the staged file path and its contents at call time.
#[derive(Default)]
pub struct RecordingTransport {
    pub fail: bool,
    pub seen: Mutex<Option<(PathBuf, Vec<u8>)>>,
}

#[async_trait]
impl SpaceTransport for RecordingTransport {
    async fn predict(&self, image_path: &Path) -> Result<Value, RemoteServiceError> {
        let contents = std::fs::read(image_path)?;
        *self.seen.lock().unwrap() = Some((image_path.to_path_buf(), contents));
        if self.fail {
            return Err(RemoteServiceError::Protocol("simulated failure".to_string()));
        }
        Ok(Value::String("10% healthy, 90% unhealthy".to_string()))
    }
}
