//! Layered configuration: defaults, config file, environment, flags

use std::path::PathBuf;

use anyhow::Context;
use config::{Config, Environment, File};
use inference_engine::SessionConfig;
use serde::Deserialize;
use tensor_ops::TensorLayout;

use crate::cli::Cli;

pub const DEFAULT_MODEL: &str = "/opt/model/mobilenet_v1_1.0_224_quant.onnx";
pub const DEFAULT_LABELS: &str = "/opt/model/labels_mobilenet_quant_v1_224.txt";
pub const DEFAULT_IMAGE: &str = "../grace_hopper.jpg";

/// Prefix of environment overrides, e.g. `CLASSIFY_THRESHOLD`
pub const ENV_PREFIX: &str = "CLASSIFY";

/// Resolved classifier settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub model: PathBuf,
    pub labels: PathBuf,
    pub threshold: f32,
    pub num_results: usize,
    pub intra_threads: usize,
    pub optimization_level: u8,
    pub layout: TensorLayout,
    pub log_json: bool,
}

impl Settings {
    /// Resolve settings from the process environment and `cli`
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        Self::load_with_env(cli, Environment::with_prefix(ENV_PREFIX))
    }

    /// Resolve settings with an explicit environment source
    pub fn load_with_env(cli: &Cli, env: Environment) -> anyhow::Result<Self> {
        let engine = SessionConfig::default();

        let mut builder = Config::builder()
            .set_default("model", DEFAULT_MODEL)?
            .set_default("labels", DEFAULT_LABELS)?
            .set_default("threshold", 0.01)?
            .set_default("num_results", 5_i64)?
            .set_default("intra_threads", engine.intra_threads as i64)?
            .set_default("optimization_level", i64::from(engine.optimization_level))?
            .set_default("layout", engine.layout.to_string())?
            .set_default("log_json", false)?;

        if let Some(path) = &cli.config {
            builder = builder.add_source(File::from(path.as_path()));
        }

        let settings = builder
            .add_source(env.try_parsing(true))
            .set_override_option("model", cli.model.as_ref().map(|p| p.display().to_string()))?
            .set_override_option("labels", cli.labels.as_ref().map(|p| p.display().to_string()))?
            .set_override_option("threshold", cli.threshold.map(f64::from))?
            .set_override_option("num_results", cli.num_results.map(|n| n as i64))?
            .set_override_option("intra_threads", cli.threads.map(|n| n as i64))?
            .set_override_option("layout", cli.layout.map(|l| l.to_string()))?
            .set_override_option("log_json", cli.log_json.then_some(true))?
            .build()
            .context("failed to read configuration")?;

        settings
            .try_deserialize()
            .context("invalid configuration")
    }

    /// Session configuration these settings describe
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            threshold: self.threshold,
            num_results: self.num_results,
            intra_threads: self.intra_threads,
            optimization_level: self.optimization_level,
            layout: self.layout,
        }
    }
}
