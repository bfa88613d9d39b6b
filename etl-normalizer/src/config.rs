use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use etl_changelog::procedure::parse_identifier_columns;
use etl_config::shared::{NormalizationMode, NormalizerConfig};
use etl_config::{load_config, load_config_from};

use crate::error::{NormalizerError, NormalizerResult};

/// Normalizes a JSON-lines changelog read from a file or stdin.
#[derive(Debug, Parser)]
#[command(name = "etl-normalizer", version, about)]
pub struct Args {
    /// Directory holding `base.yaml` and environment overrides, defaults to `./configuration`
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Raw changelog to read, defaults to stdin
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Where to write the normalized changelog, defaults to stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Overrides the configured normalization mode
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Overrides the configured identifier columns, comma-separated
    #[arg(long)]
    pub identifier_columns: Option<String>,

    /// Treats streaming input as already sorted and normalizes it without buffering
    #[arg(long)]
    pub presorted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Batch,
    Streaming,
}

impl From<ModeArg> for NormalizationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Batch => NormalizationMode::Batch,
            ModeArg::Streaming => NormalizationMode::Streaming,
        }
    }
}

/// Loads the normalizer configuration, applies command line overrides and validates it.
pub fn load_normalizer_config(args: &Args) -> NormalizerResult<NormalizerConfig> {
    let config = match &args.config_dir {
        Some(directory) => load_config_from::<NormalizerConfig>(directory),
        None => load_config::<NormalizerConfig>(),
    }
    .map_err(NormalizerError::config)?;

    let config = apply_overrides(config, args);
    config.validate().map_err(NormalizerError::config)?;

    Ok(config)
}

fn apply_overrides(mut config: NormalizerConfig, args: &Args) -> NormalizerConfig {
    if let Some(mode) = args.mode {
        config.mode = mode.into();
    }
    if let Some(identifier_columns) = &args.identifier_columns {
        config.identifier_columns = parse_identifier_columns(identifier_columns);
    }
    if args.presorted {
        config.presorted = true;
    }

    config
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["etl-normalizer"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn overrides_replace_loaded_values() {
        let config = NormalizerConfig::new(
            NormalizationMode::Batch,
            vec!["id".to_string(), "data".to_string()],
            vec!["id".to_string()],
        );

        let config = apply_overrides(
            config,
            &args(&["--mode", "streaming", "--identifier-columns", "id, data", "--presorted"]),
        );

        assert_eq!(config.mode, NormalizationMode::Streaming);
        assert_eq!(config.identifier_columns, vec!["id", "data"]);
        assert!(config.presorted);
    }

    #[test]
    fn config_is_loaded_from_directory_and_validated() {
        let directory = tempfile::tempdir().unwrap();
        fs::write(
            directory.path().join("base.yaml"),
            "mode: batch\ncolumns: [id, data]\nidentifier_columns: [id]\n",
        )
        .unwrap();
        let config_dir = directory.path().to_str().unwrap();

        let err = load_normalizer_config(&args(&["--config-dir", config_dir])).unwrap_err();
        assert_eq!(err.category(), "configuration error");

        let config =
            load_normalizer_config(&args(&["--config-dir", config_dir, "--mode", "streaming"]))
                .unwrap();
        assert_eq!(config.mode, NormalizationMode::Streaming);
        assert_eq!(config.columns, vec!["id", "data"]);
    }
}
