//! Session configuration

use serde::{Deserialize, Serialize};
use tensor_ops::TensorLayout;

/// Inference session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Minimum confidence for a class to be reported
    pub threshold: f32,

    /// Maximum number of classes reported per image
    pub num_results: usize,

    /// Worker threads the engine may use inside one invocation
    pub intra_threads: usize,

    /// Graph optimization level (0 = disabled, 3 = all)
    pub optimization_level: u8,

    /// Input tensor layout
    pub layout: TensorLayout,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            threshold: 0.001,
            num_results: 5,
            intra_threads: 4,
            optimization_level: 3,
            layout: TensorLayout::Nhwc,
        }
    }
}

impl SessionConfig {
    /// Config for NCHW-ordered models (most ONNX exports)
    pub fn nchw() -> Self {
        Self {
            layout: TensorLayout::Nchw,
            ..Default::default()
        }
    }
}
