//! Decoded RGB image type

use std::path::Path;

use image::DynamicImage;
use tracing::{debug, warn};

use crate::ImageError;

/// Channel count of every [`RawImage`] (interleaved R, G, B)
pub const CHANNELS: usize = 3;

/// Decoded RGB image, immutable once captured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    /// RGB pixel data (width * height * 3)
    data: Vec<u8>,
    /// Image width
    width: u32,
    /// Image height
    height: u32,
}

impl RawImage {
    /// Create an image from raw interleaved RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::Empty { width, height });
        }

        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(ImageError::InvalidBuffer {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self { data, width, height })
    }

    /// Create a uniformly colored image
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self, ImageError> {
        let pixels = width as usize * height as usize;
        let data = rgb.iter().copied().cycle().take(pixels * CHANNELS).collect();
        Self::new(data, width, height)
    }

    /// Decode an image file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let path = path.as_ref();
        debug!("Decoding image {}", path.display());

        let img = image::open(path).map_err(|e| match e {
            image::ImageError::IoError(io) => ImageError::Read {
                path: path.display().to_string(),
                reason: io.to_string(),
            },
            other => ImageError::Decode(other.to_string()),
        })?;

        Self::from_dynamic(&img)
    }

    /// Decode an in-memory encoded image (PNG, JPEG, ...)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        let img = image::load_from_memory(bytes).map_err(|e| ImageError::Decode(e.to_string()))?;
        Self::from_dynamic(&img)
    }

    /// Convert an already decoded image, dropping alpha
    pub fn from_dynamic(img: &DynamicImage) -> Result<Self, ImageError> {
        if img.color().has_alpha() {
            warn!("Dropping alpha channel from {:?} image", img.color());
        }
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        Self::new(rgb.into_raw(), width, height)
    }

    /// Image width
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channel count, always 3
    pub fn channels(&self) -> usize {
        CHANNELS
    }

    /// Interleaved RGB bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }
}
