//! Image Input
//!
//! Decodes image files into the interleaved RGB buffers consumed by the
//! tensor resampler. Supports every container the `image` crate can read;
//! alpha and grayscale sources are converted to three-channel RGB.

pub mod frame;

pub use frame::{RawImage, CHANNELS};

use thiserror::Error;

/// Image input error types
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to read image {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Invalid pixel buffer: expected {expected} bytes, got {actual}")]
    InvalidBuffer { expected: usize, actual: usize },

    #[error("Image has zero extent ({width}x{height})")]
    Empty { width: u32, height: u32 },
}
