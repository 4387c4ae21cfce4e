//! Image Classifier CLI
//!
//! Loads a classification model and label list, then prints the most
//! confident labels for every image given on the command line.

pub mod cli;
pub mod settings;

pub use cli::Cli;
pub use settings::Settings;

use std::io::Write;
use std::path::PathBuf;

use inference_engine::{InferenceEngine, InferenceSession};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize logging on stderr; `RUST_LOG` overrides the default level
pub fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = if json {
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };

    result.expect("Failed to set tracing subscriber");
}

/// Classify each image and print its path, one `confidence index label`
/// line per result, and a blank separator line
pub fn classify_all<E, W>(
    session: &mut InferenceSession<E>,
    images: &[PathBuf],
    out: &mut W,
) -> std::io::Result<()>
where
    E: InferenceEngine,
    W: Write,
{
    for image in images {
        writeln!(out, "{}", image.display())?;
        let results = session.run_inference_path(image);
        info!("{}: {} results", image.display(), results.len());
        for result in &results {
            writeln!(out, "{} {} {}", result.confidence, result.index, result.label)?;
        }
        writeln!(out)?;
    }
    Ok(())
}
