use std::path::Path;
use std::pin::pin;

use etl_changelog::conversions::json::{record_from_json, record_to_json};
use etl_changelog::error::{EtlError, EtlResult};
use etl_changelog::normalize::{
    ChangelogNormalizer, ChangelogStream, ConfiguredNormalizer, StreamingNormalizer,
};
use etl_changelog::types::{ChangeRecord, ChangelogSchema};
use etl_config::shared::{NormalizationMode, NormalizerConfig};
use futures::{StreamExt, future, stream};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, info};

use crate::error::NormalizerResult;

type Input = Box<dyn AsyncBufRead + Unpin + Send>;
type Output = Box<dyn AsyncWrite + Unpin + Send>;

/// Normalizes the JSON-lines changelog at `input` into `output`.
///
/// Missing paths fall back to stdin and stdout.
pub async fn start_normalizer_with_config(
    config: NormalizerConfig,
    input: Option<&Path>,
    output: Option<&Path>,
) -> NormalizerResult<()> {
    info!("starting normalizer");

    log_config(&config);

    // Identifier columns must resolve before the output file is created.
    let schema = build_schema(&config)?;

    if config.mode == NormalizationMode::Streaming && config.presorted {
        let normalizer = StreamingNormalizer::from_schema(&schema, &config.identifier_columns)?;
        let reader = open_input(input).await?;
        let writer = open_output(output).await?;

        normalize_presorted(&normalizer, &schema, reader, writer).await
    } else {
        let normalizer =
            ConfiguredNormalizer::from_schema(config.mode, &schema, &config.identifier_columns)?;
        let reader = open_input(input).await?;
        let writer = open_output(output).await?;

        normalize_buffered(&normalizer, &schema, reader, writer).await
    }
}

fn log_config(config: &NormalizerConfig) {
    debug!(
        mode = ?config.mode,
        columns = ?config.columns,
        identifier_columns = ?config.identifier_columns,
        change_type_column = %config.change_type_column,
        change_ordinal_column = %config.change_ordinal_column,
        presorted = config.presorted,
        "normalizer config"
    );
}

/// Builds the changelog schema described by `config`.
///
/// The change ordinal column is optional in streaming mode.
pub fn build_schema(config: &NormalizerConfig) -> EtlResult<ChangelogSchema> {
    let schema = ChangelogSchema::new(config.columns.iter().cloned())
        .with_change_type_column(config.change_type_column.clone());

    if config.mode == NormalizationMode::Streaming
        && schema.column_index(&config.change_ordinal_column).is_none()
    {
        return Ok(schema);
    }

    schema.with_change_ordinal_column(&config.change_ordinal_column)
}

async fn open_input(path: Option<&Path>) -> NormalizerResult<Input> {
    let reader: Input = match path {
        Some(path) => Box::new(BufReader::new(File::open(path).await?)),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    Ok(reader)
}

async fn open_output(path: Option<&Path>) -> NormalizerResult<Output> {
    let writer: Output = match path {
        Some(path) => Box::new(BufWriter::new(File::create(path).await?)),
        None => Box::new(BufWriter::new(tokio::io::stdout())),
    };

    Ok(writer)
}

/// Decodes one input line, returning [`None`] for blank lines.
fn decode_line(schema: &ChangelogSchema, line: &str) -> Option<EtlResult<ChangeRecord>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let record = serde_json::from_str(line)
        .map_err(EtlError::from)
        .and_then(|value| record_from_json(schema, value));

    Some(record)
}

async fn write_record<W>(
    writer: &mut W,
    schema: &ChangelogSchema,
    record: &ChangeRecord,
) -> NormalizerResult<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let line = serde_json::to_string(&record_to_json(schema, record)).map_err(EtlError::from)?;
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;

    Ok(())
}

/// Reads the whole input, normalizes it and writes the result.
async fn normalize_buffered(
    normalizer: &ConfiguredNormalizer,
    schema: &ChangelogSchema,
    reader: Input,
    mut writer: Output,
) -> NormalizerResult<()> {
    let mut records = Vec::new();
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(record) = decode_line(schema, &line) {
            records.push(record?);
        }
    }

    let input = records.len();
    let records = normalizer.normalize(records);

    for record in &records {
        write_record(&mut writer, schema, record).await?;
    }
    writer.flush().await?;

    info!(mode = ?normalizer.mode(), input, output = records.len(), "normalized changelog");

    Ok(())
}

/// Normalizes sorted input line by line without buffering it.
///
/// Decoding stops at the first invalid line. Records emitted before it are already written.
async fn normalize_presorted(
    normalizer: &StreamingNormalizer,
    schema: &ChangelogSchema,
    reader: Input,
    mut writer: Output,
) -> NormalizerResult<()> {
    let lines = stream::unfold(reader.lines(), |mut lines| async move {
        match lines.next_line().await {
            Ok(Some(line)) => Some((Ok(line), lines)),
            Ok(None) => None,
            Err(err) => Some((Err(EtlError::from(err)), lines)),
        }
    });

    let mut failure: Option<EtlError> = None;
    let mut output = 0usize;
    {
        let records = lines
            .filter_map(|line| {
                future::ready(match line {
                    Ok(line) => decode_line(schema, &line),
                    Err(err) => Some(Err(err)),
                })
            })
            .scan(&mut failure, |failure, record| {
                future::ready(match record {
                    Ok(record) => Some(record),
                    Err(err) => {
                        **failure = Some(err);
                        None
                    }
                })
            });

        let mut normalized = pin!(ChangelogStream::wrap(records, normalizer.identifier().clone()));
        while let Some(record) = normalized.next().await {
            write_record(&mut writer, schema, &record).await?;
            output += 1;
        }
    }
    writer.flush().await?;

    if let Some(err) = failure {
        return Err(err.into());
    }

    info!(mode = "streaming", presorted = true, output, "normalized changelog");

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use etl_telemetry::tracing::init_test_tracing;
    use serde_json::{Value, json};

    use super::*;

    fn config(mode: NormalizationMode) -> NormalizerConfig {
        NormalizerConfig::new(
            mode,
            vec!["id".to_string(), "data".to_string(), "_change_ordinal".to_string()],
            vec!["id".to_string()],
        )
    }

    async fn run(config: NormalizerConfig, input: &[Value]) -> NormalizerResult<Vec<Value>> {
        let directory = tempfile::tempdir().unwrap();
        let input_path = directory.path().join("input.jsonl");
        let output_path = directory.path().join("output.jsonl");

        let mut contents = String::new();
        for value in input {
            contents.push_str(&value.to_string());
            contents.push('\n');
        }
        contents.push('\n');
        fs::write(&input_path, contents).unwrap();

        start_normalizer_with_config(config, Some(&input_path), Some(&output_path)).await?;

        let output = fs::read_to_string(&output_path).unwrap();
        Ok(output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect())
    }

    fn row(change_type: &str, id: i64, data: &str) -> Value {
        json!({"_change_type": change_type, "id": id, "data": data, "_change_ordinal": 0})
    }

    #[tokio::test]
    async fn batch_mode_writes_pre_and_post_images() {
        init_test_tracing();

        let output = run(
            config(NormalizationMode::Batch),
            &[
                row("DELETE", 1, "a"),
                row("INSERT", 1, "b"),
                row("DELETE", 2, "c"),
                row("INSERT", 2, "c"),
            ],
        )
        .await
        .unwrap();

        assert_eq!(
            output,
            vec![row("UPDATE_PREIMAGE", 1, "a"), row("UPDATE_POSTIMAGE", 1, "b")]
        );
    }

    #[tokio::test]
    async fn streaming_mode_sorts_buffered_input() {
        init_test_tracing();

        let output = run(
            config(NormalizationMode::Streaming),
            &[row("INSERT", 1, "b"), row("INSERT", 2, "x"), row("DELETE", 1, "a")],
        )
        .await
        .unwrap();

        assert_eq!(
            output,
            vec![
                row("UPDATE_BEFORE", 1, "a"),
                row("UPDATE_AFTER", 1, "b"),
                row("INSERT", 2, "x"),
            ]
        );
    }

    #[tokio::test]
    async fn presorted_streaming_keeps_unsorted_input_as_is() {
        init_test_tracing();

        let mut config = config(NormalizationMode::Streaming);
        config.presorted = true;
        let input = [row("INSERT", 1, "b"), row("INSERT", 2, "x"), row("DELETE", 1, "a")];

        let output = run(config, &input).await.unwrap();

        assert_eq!(output, input);
    }

    #[tokio::test]
    async fn presorted_streaming_stops_at_invalid_line() {
        init_test_tracing();

        let mut config = config(NormalizationMode::Streaming);
        config.presorted = true;

        let err = run(
            config,
            &[row("DELETE", 1, "a"), row("UPDATE_AFTER", 1, "b")],
        )
        .await
        .unwrap_err();

        assert_eq!(err.category(), "changelog error");
    }

    #[tokio::test]
    async fn unknown_identifier_column_leaves_output_untouched() {
        init_test_tracing();

        let directory = tempfile::tempdir().unwrap();
        let input_path = directory.path().join("input.jsonl");
        let output_path = directory.path().join("output.jsonl");
        fs::write(&input_path, format!("{}\n", row("INSERT", 1, "a"))).unwrap();
        fs::write(&output_path, "previous\n").unwrap();

        for presorted in [false, true] {
            let mut config = config(NormalizationMode::Streaming);
            config.identifier_columns = vec!["missing".to_string()];
            config.presorted = presorted;

            let err =
                start_normalizer_with_config(config, Some(&input_path), Some(&output_path))
                    .await
                    .unwrap_err();

            assert_eq!(err.category(), "changelog error");
            assert_eq!(fs::read_to_string(&output_path).unwrap(), "previous\n");
        }
    }

    #[test]
    fn streaming_schema_does_not_need_ordinal_column() {
        let config = NormalizerConfig::new(
            NormalizationMode::Streaming,
            vec!["id".to_string()],
            vec!["id".to_string()],
        );

        let schema = build_schema(&config).unwrap();

        assert_eq!(schema.change_ordinal_index(), None);
    }
}
