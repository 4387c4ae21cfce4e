//! Image Classification Inference
//!
//! Runs a single-input, single-output image classifier:
//! resample the image to the model's input tensor, invoke the engine,
//! select the top-K scores and bind them to labels.

mod config;
mod engine;
mod labels;
pub mod mock;
mod session;

pub use config::SessionConfig;
pub use engine::{InferenceEngine, OrtEngine};
pub use labels::Labels;
pub use mock::MockEngine;
pub use session::{ClassificationResult, InferenceSession, SessionState};

use image_input::ImageError;
use tensor_ops::TensorError;
use thiserror::Error;

/// Errors while loading a session; fatal to session construction
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to load labels {path}: {reason}")]
    LabelFile { path: String, reason: String },
    #[error("Failed to load model {path}: {reason}")]
    ModelLoad { path: String, reason: String },
    #[error("Failed to construct interpreter: {0}")]
    InterpreterBuild(String),
}

/// Errors during a single inference call
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Session is not loaded")]
    NotLoaded,
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to allocate tensors: {0}")]
    Allocation(String),
    #[error("Unsupported tensor datatype: {0}")]
    UnsupportedDtype(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
    #[error("Inference failed: {0}")]
    Invocation(String),
    #[error("No label for class index {index} ({count} labels loaded)")]
    OutOfRangeLabel { index: usize, count: usize },
}

impl From<ImageError> for InferenceError {
    fn from(err: ImageError) -> Self {
        InferenceError::Decode(err.to_string())
    }
}

impl From<TensorError> for InferenceError {
    fn from(err: TensorError) -> Self {
        match err {
            TensorError::UnsupportedDtype(name) => InferenceError::UnsupportedDtype(name),
            TensorError::DtypeMismatch { expected, actual } => {
                InferenceError::UnsupportedDtype(format!("{} (buffer holds {})", expected, actual))
            }
            other => InferenceError::InvalidInputShape {
                expected: "tensor matching the engine slot".to_string(),
                actual: other.to_string(),
            },
        }
    }
}
