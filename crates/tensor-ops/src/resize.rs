//! Bilinear resize operator
//!
//! Mirrors the reference kernel of TFLite's `RESIZE_BILINEAR` builtin so that
//! resized inputs match what the engine's own resize op would produce.

use ndarray::{Array4, ArrayView1, ArrayView4};

use crate::TensorError;

/// `RESIZE_BILINEAR` operator over NHWC float32 tensors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResizeBilinear {
    /// Map corner pixel centers of input and output onto each other
    pub align_corners: bool,
    /// Sample at pixel centers (x + 0.5) instead of top-left corners
    pub half_pixel_centers: bool,
}

/// Sampling position along one axis
struct Interp {
    lower: usize,
    upper: usize,
    frac: f32,
}

impl ResizeBilinear {
    /// Operator parameters used for classifier input preprocessing
    pub fn legacy() -> Self {
        Self {
            align_corners: false,
            half_pixel_centers: false,
        }
    }

    /// Run the operator on `input` ([batch, height, width, channels]) with
    /// `new_size` = [height, width]
    pub fn eval(&self, input: ArrayView4<f32>, new_size: ArrayView1<i32>) -> Result<Array4<f32>, TensorError> {
        if new_size.len() != 2 {
            return Err(TensorError::InvalidDimensions(format!(
                "new_size must hold 2 elements, got {}",
                new_size.len()
            )));
        }
        if new_size[0] < 1 || new_size[1] < 1 {
            return Err(TensorError::InvalidDimensions(format!(
                "target size must be positive, got {}x{}",
                new_size[0], new_size[1]
            )));
        }

        let (batches, in_h, in_w, channels) = input.dim();
        if in_h == 0 || in_w == 0 {
            return Err(TensorError::InvalidDimensions("empty input image".to_string()));
        }
        let (out_h, out_w) = (new_size[0] as usize, new_size[1] as usize);

        let ys: Vec<Interp> = (0..out_h).map(|y| self.interp(y, in_h, out_h)).collect();
        let xs: Vec<Interp> = (0..out_w).map(|x| self.interp(x, in_w, out_w)).collect();

        let mut output = Array4::<f32>::zeros((batches, out_h, out_w, channels));
        for b in 0..batches {
            for (y, iy) in ys.iter().enumerate() {
                for (x, ix) in xs.iter().enumerate() {
                    for c in 0..channels {
                        let top_left = input[[b, iy.lower, ix.lower, c]];
                        let top_right = input[[b, iy.lower, ix.upper, c]];
                        let bottom_left = input[[b, iy.upper, ix.lower, c]];
                        let bottom_right = input[[b, iy.upper, ix.upper, c]];

                        output[[b, y, x, c]] = top_left * (1.0 - iy.frac) * (1.0 - ix.frac)
                            + bottom_left * iy.frac * (1.0 - ix.frac)
                            + top_right * (1.0 - iy.frac) * ix.frac
                            + bottom_right * iy.frac * ix.frac;
                    }
                }
            }
        }

        Ok(output)
    }

    fn scale(&self, in_size: usize, out_size: usize) -> f32 {
        if self.align_corners && out_size > 1 {
            (in_size - 1) as f32 / (out_size - 1) as f32
        } else {
            in_size as f32 / out_size as f32
        }
    }

    fn interp(&self, pos: usize, in_size: usize, out_size: usize) -> Interp {
        let scale = self.scale(in_size, out_size);
        let scaled = if self.half_pixel_centers {
            (pos as f32 + 0.5) * scale - 0.5
        } else {
            pos as f32 * scale
        };

        let lower = scaled.floor().max(0.0) as usize;
        let upper = (scaled.ceil().max(0.0) as usize).min(in_size - 1);
        Interp {
            lower: lower.min(in_size - 1),
            upper,
            frac: scaled - lower as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, Array};

    fn ramp(h: usize, w: usize) -> Array4<f32> {
        Array::from_shape_fn((1, h, w, 1), |(_, y, x, _)| (y * w + x) as f32)
    }

    #[test]
    fn test_identity_resize() {
        let input = ramp(3, 4);
        let out = ResizeBilinear::legacy()
            .eval(input.view(), arr1(&[3, 4]).view())
            .unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_upscale_interpolates() {
        // 1x2 row [0, 10] -> 1x4: sample points 0, 0.5, 1.0, 1.5
        let input = Array::from_shape_vec((1, 1, 2, 1), vec![0.0, 10.0]).unwrap();
        let out = ResizeBilinear::legacy()
            .eval(input.view(), arr1(&[1, 4]).view())
            .unwrap();
        let values: Vec<f32> = out.iter().copied().collect();
        assert_eq!(values, vec![0.0, 5.0, 10.0, 10.0]);
    }

    #[test]
    fn test_downscale_picks_top_left_grid() {
        // legacy mode samples at x * 2 for a 2x downscale, no averaging
        let input = ramp(4, 4);
        let out = ResizeBilinear::legacy()
            .eval(input.view(), arr1(&[2, 2]).view())
            .unwrap();
        let values: Vec<f32> = out.iter().copied().collect();
        assert_eq!(values, vec![0.0, 2.0, 8.0, 10.0]);
    }

    #[test]
    fn test_align_corners() {
        let input = Array::from_shape_vec((1, 1, 2, 1), vec![0.0, 9.0]).unwrap();
        let op = ResizeBilinear {
            align_corners: true,
            half_pixel_centers: false,
        };
        let out = op.eval(input.view(), arr1(&[1, 4]).view()).unwrap();
        for (got, want) in out.iter().zip([0.0, 3.0, 6.0, 9.0]) {
            assert!((got - want).abs() < 1e-4, "{} != {}", got, want);
        }
    }

    #[test]
    fn test_rejects_bad_size() {
        let input = ramp(2, 2);
        let op = ResizeBilinear::legacy();
        assert!(op.eval(input.view(), arr1(&[0, 2]).view()).is_err());
        assert!(op.eval(input.view(), arr1(&[2]).view()).is_err());
    }
}
