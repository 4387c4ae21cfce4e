//! Command-line arguments

use std::path::PathBuf;

use clap::Parser;
use tensor_ops::TensorLayout;

use crate::settings::DEFAULT_IMAGE;

/// Classify images with a quantized ONNX model
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "classify", version, about)]
pub struct Cli {
    /// Input images for classification
    pub images: Vec<PathBuf>,

    /// ONNX model [default: /opt/model/mobilenet_v1_1.0_224_quant.onnx]
    #[arg(short, long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Model labels file, one label per line
    /// [default: /opt/model/labels_mobilenet_quant_v1_224.txt]
    #[arg(short, long, value_name = "PATH")]
    pub labels: Option<PathBuf>,

    /// Minimum confidence to report [default: 0.01]
    #[arg(short, long)]
    pub threshold: Option<f32>,

    /// Maximum results per image [default: 5]
    #[arg(short = 'n', long)]
    pub num_results: Option<usize>,

    /// Engine worker threads [default: 4]
    #[arg(long)]
    pub threads: Option<usize>,

    /// Input tensor layout: nhwc or nchw [default: nhwc]
    #[arg(long)]
    pub layout: Option<TensorLayout>,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    /// Positional images, or the bundled example when none were given
    pub fn images_or_default(&self) -> Vec<PathBuf> {
        if self.images.is_empty() {
            vec![PathBuf::from(DEFAULT_IMAGE)]
        } else {
            self.images.clone()
        }
    }
}
