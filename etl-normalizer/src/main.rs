//! Changelog normalizer binary.
//!
//! Reads a raw JSON-lines changelog, pairs deletes and inserts of the same logical row into
//! update images, drops carry-over rows and writes the normalized changelog.

use std::process::ExitCode;

use clap::Parser;
use etl_config::shared::NormalizerConfig;
use etl_telemetry::tracing::init_tracing;
use tracing::error;

use crate::config::{Args, load_normalizer_config};
use crate::core::start_normalizer_with_config;
use crate::error::{NormalizerError, NormalizerResult};

mod config;
mod core;
mod error;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", err.render_report());
            ExitCode::FAILURE
        }
    }
}

/// Loads configuration, initializes tracing and runs the normalizer on a tokio runtime.
fn run() -> NormalizerResult<()> {
    let args = Args::parse();
    let config = load_normalizer_config(&args)?;

    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME")).map_err(NormalizerError::config)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(config, &args))?;

    Ok(())
}

async fn async_main(config: NormalizerConfig, args: &Args) -> NormalizerResult<()> {
    if let Err(err) =
        start_normalizer_with_config(config, args.input.as_deref(), args.output.as_deref()).await
    {
        error!("{err}");
        return Err(err);
    }

    Ok(())
}
