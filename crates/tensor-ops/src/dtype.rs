//! Tensor element types, descriptors and typed buffers

use std::fmt;
use std::str::FromStr;

use ndarray::{ArrayView3, Axis};
use serde::{Deserialize, Serialize};

use crate::TensorError;

/// Element datatype of an engine tensor slot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    /// 32-bit float
    F32,
    /// Signed 8-bit integer
    I8,
    /// Unsigned 8-bit integer
    U8,
    /// Anything else the engine reports, by name
    Unsupported(String),
}

impl ElementType {
    /// Get string representation
    pub fn as_str(&self) -> &str {
        match self {
            ElementType::F32 => "float32",
            ElementType::I8 => "int8",
            ElementType::U8 => "uint8",
            ElementType::Unsupported(name) => name,
        }
    }

    /// Whether the resampler and selector can handle this type
    pub fn is_supported(&self) -> bool {
        !matches!(self, ElementType::Unsupported(_))
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric kinds the pipeline converts pixels into and scores out of
pub trait Element: Copy + fmt::Debug {
    /// Map a resized pixel intensity in [0, 255] to this encoding
    fn quantize(pixel: f32) -> Self;

    /// Map an output value to a confidence score
    fn dequantize(self) -> f32;
}

impl Element for f32 {
    fn quantize(pixel: f32) -> Self {
        (pixel - 127.5) / 127.5
    }

    fn dequantize(self) -> f32 {
        self
    }
}

impl Element for i8 {
    fn quantize(pixel: f32) -> Self {
        // `as` truncates toward zero and saturates at the i8 bounds
        (pixel - 128.0) as i8
    }

    fn dequantize(self) -> f32 {
        (self as f32 + 128.0) / 256.0
    }
}

impl Element for u8 {
    fn quantize(pixel: f32) -> Self {
        pixel as u8
    }

    fn dequantize(self) -> f32 {
        self as f32 / 255.0
    }
}

/// Memory layout of an image input tensor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// [batch, height, width, channels]
    #[default]
    Nhwc,
    /// [batch, channels, height, width]
    Nchw,
}

impl FromStr for TensorLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nhwc" => Ok(TensorLayout::Nhwc),
            "nchw" => Ok(TensorLayout::Nchw),
            other => Err(format!("unknown tensor layout '{}', expected nhwc or nchw", other)),
        }
    }
}

impl fmt::Display for TensorLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TensorLayout::Nhwc => f.write_str("nhwc"),
            TensorLayout::Nchw => f.write_str("nchw"),
        }
    }
}

/// Shape and datatype contract of one engine tensor slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorSpec {
    /// Per-dimension extents
    pub dims: Vec<usize>,
    /// Element datatype
    pub dtype: ElementType,
}

impl TensorSpec {
    pub fn new(dims: Vec<usize>, dtype: ElementType) -> Self {
        Self { dims, dtype }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Product of all extents
    pub fn element_count(&self) -> usize {
        self.dims.iter().product()
    }

    /// Extent of the innermost dimension (class count for classifier outputs)
    pub fn last_dim(&self) -> Option<usize> {
        self.dims.last().copied()
    }

    /// Read (height, width, channels) of a rank-4 image tensor
    pub fn image_dims(&self, layout: TensorLayout) -> Result<(usize, usize, usize), TensorError> {
        if self.rank() != 4 {
            return Err(TensorError::InvalidDimensions(format!(
                "expected rank-4 image tensor, got {:?}",
                self.dims
            )));
        }
        let d = &self.dims;
        Ok(match layout {
            TensorLayout::Nhwc => (d[1], d[2], d[3]),
            TensorLayout::Nchw => (d[2], d[3], d[1]),
        })
    }
}

/// Flat tensor buffer tagged with its element type
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    F32(Vec<f32>),
    I8(Vec<i8>),
    U8(Vec<u8>),
}

impl TensorData {
    pub fn len(&self) -> usize {
        match self {
            TensorData::F32(v) => v.len(),
            TensorData::I8(v) => v.len(),
            TensorData::U8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            TensorData::F32(_) => ElementType::F32,
            TensorData::I8(_) => ElementType::I8,
            TensorData::U8(_) => ElementType::U8,
        }
    }

    /// Reorder an interleaved HWC buffer into planar CHW
    pub fn hwc_to_chw(&self, height: usize, width: usize, channels: usize) -> Result<Self, TensorError> {
        Ok(match self {
            TensorData::F32(v) => TensorData::F32(to_planar(v, height, width, channels)?),
            TensorData::I8(v) => TensorData::I8(to_planar(v, height, width, channels)?),
            TensorData::U8(v) => TensorData::U8(to_planar(v, height, width, channels)?),
        })
    }
}

fn to_planar<T: Copy>(
    values: &[T],
    height: usize,
    width: usize,
    channels: usize,
) -> Result<Vec<T>, TensorError> {
    let hwc = ArrayView3::from_shape((height, width, channels), values).map_err(|_| {
        TensorError::SizeMismatch {
            expected: height * width * channels,
            actual: values.len(),
        }
    })?;

    let mut planar = Vec::with_capacity(values.len());
    for c in 0..channels {
        planar.extend(hwc.index_axis(Axis(2), c).iter().copied());
    }
    Ok(planar)
}
