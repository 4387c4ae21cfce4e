//! Image Classifier - Main Entry Point

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use classifier::{classify_all, init_logging, Cli, Settings};
use inference_engine::InferenceSession;
use tracing::{error, info};

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let settings = Settings::load(&cli)?;
    init_logging(settings.log_json);

    info!("=== Image Classifier v{} ===", env!("CARGO_PKG_VERSION"));

    let mut session: InferenceSession = InferenceSession::new(settings.session_config());
    if let Err(e) = session.load(&settings.model, &settings.labels) {
        error!("{}", e);
        Cli::command().print_help()?;
        return Ok(ExitCode::from(1));
    }

    let images = cli.images_or_default();
    let mut stdout = std::io::stdout().lock();
    classify_all(&mut session, &images, &mut stdout)?;

    Ok(ExitCode::SUCCESS)
}
