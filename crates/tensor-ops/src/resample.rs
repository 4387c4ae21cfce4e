//! Image to input-tensor resampling

use image_input::RawImage;
use ndarray::{arr1, Array4};
use tracing::debug;

use crate::dtype::{Element, ElementType, TensorData};
use crate::resize::ResizeBilinear;
use crate::TensorError;

/// Resize `source` to `target_height` x `target_width` and quantize it into
/// a flat HWC buffer of `target_type` elements.
///
/// The result always holds exactly `target_height * target_width *
/// target_channels` elements. Unsupported datatypes fail before any
/// resizing work is done.
pub fn resample(
    source: &RawImage,
    target_height: usize,
    target_width: usize,
    target_channels: usize,
    target_type: &ElementType,
) -> Result<TensorData, TensorError> {
    if !target_type.is_supported() {
        return Err(TensorError::UnsupportedDtype(target_type.to_string()));
    }
    if target_channels != source.channels() {
        return Err(TensorError::ChannelMismatch {
            source_channels: source.channels(),
            target: target_channels,
        });
    }
    if target_height == 0 || target_width == 0 {
        return Err(TensorError::InvalidDimensions(format!(
            "target size must be positive, got {}x{}",
            target_height, target_width
        )));
    }
    let new_size = [
        i32::try_from(target_height).map_err(|_| too_large(target_height))?,
        i32::try_from(target_width).map_err(|_| too_large(target_width))?,
    ];

    debug!(
        "Resampling {}x{} -> {}x{}x{} ({})",
        source.width(),
        source.height(),
        target_width,
        target_height,
        target_channels,
        target_type
    );

    // Pixels are integers, the resize op works on floats
    let pixels = Array4::from_shape_vec(
        (1, source.height() as usize, source.width() as usize, source.channels()),
        source.data().iter().map(|&p| p as f32).collect(),
    )
    .map_err(|e| TensorError::InvalidDimensions(e.to_string()))?;

    let resized = ResizeBilinear::legacy().eval(pixels.view(), arr1(&new_size).view())?;
    let resized = resized.as_slice().ok_or_else(|| {
        TensorError::InvalidDimensions("resize output is not contiguous".to_string())
    })?;

    Ok(match target_type {
        ElementType::F32 => TensorData::F32(quantize_all(resized)),
        ElementType::I8 => TensorData::I8(quantize_all(resized)),
        ElementType::U8 => TensorData::U8(quantize_all(resized)),
        ElementType::Unsupported(name) => return Err(TensorError::UnsupportedDtype(name.clone())),
    })
}

fn quantize_all<T: Element>(pixels: &[f32]) -> Vec<T> {
    pixels.iter().map(|&p| T::quantize(p)).collect()
}

fn too_large(extent: usize) -> TensorError {
    TensorError::InvalidDimensions(format!("target extent {} exceeds i32 range", extent))
}
