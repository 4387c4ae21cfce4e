//! Tensor Operations
//!
//! Pre- and post-processing around a classifier's forward pass:
//! - Bilinear resize operator with TFLite `RESIZE_BILINEAR` semantics
//! - Pixel quantization into f32 / i8 / u8 input tensors
//! - Dequantization and bounded top-K selection over output scores

pub mod dtype;
pub mod resample;
pub mod resize;
pub mod top_k;

pub use dtype::{Element, ElementType, TensorData, TensorLayout, TensorSpec};
pub use resample::resample;
pub use resize::ResizeBilinear;
pub use top_k::{select_top_k, select_top_k_typed, ScoredIndex};

use thiserror::Error;

/// Tensor processing errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TensorError {
    #[error("Unsupported tensor datatype: {0}")]
    UnsupportedDtype(String),

    #[error("Datatype mismatch: expected {expected}, got {actual}")]
    DtypeMismatch { expected: String, actual: String },

    #[error("Channel mismatch: source has {source_channels}, target wants {target}")]
    ChannelMismatch { source_channels: usize, target: usize },

    #[error("Invalid tensor dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Buffer size mismatch: expected {expected} elements, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}
