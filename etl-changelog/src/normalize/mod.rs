//! Changelog normalizers.
//!
//! Both normalizers consume raw `INSERT`/`DELETE` records and emit a normalized changelog in
//! which update pairs are relabeled and carry-over pairs are removed. They differ in how they
//! find pairs: [`StreamingNormalizer`] looks at adjacent records of sorted input, while
//! [`BatchNormalizer`] groups records by identifier and change ordinal.

mod batch;
mod carry_over;
mod streaming;

pub use batch::*;
pub use carry_over::*;
pub use streaming::*;

use etl_config::shared::NormalizationMode;

use crate::error::EtlResult;
use crate::types::{ChangeRecord, ChangelogSchema};

/// Turns a raw changelog into a normalized one.
pub trait ChangelogNormalizer {
    /// Normalizes `records` and returns the surviving records.
    ///
    /// Each input record yields at most one output record and no record is paired twice.
    fn normalize(&self, records: Vec<ChangeRecord>) -> Vec<ChangeRecord>;
}

/// Normalizer selected by a [`NormalizationMode`].
#[derive(Debug, Clone)]
pub enum ConfiguredNormalizer {
    Batch(BatchNormalizer),
    /// Streaming normalization of input that is sorted first.
    Streaming {
        normalizer: StreamingNormalizer,
        ordinal_index: Option<usize>,
    },
}

impl ConfiguredNormalizer {
    /// Builds the normalizer for `mode` by resolving column names against `schema`.
    ///
    /// Fails when an identifier column is missing, or in batch mode when the schema has no
    /// change ordinal column. Both modes pair records only within one change ordinal.
    pub fn from_schema<S: AsRef<str>>(
        mode: NormalizationMode,
        schema: &ChangelogSchema,
        identifier_columns: &[S],
    ) -> EtlResult<Self> {
        match mode {
            NormalizationMode::Batch => Ok(ConfiguredNormalizer::Batch(
                BatchNormalizer::from_schema(schema, identifier_columns)?,
            )),
            NormalizationMode::Streaming => Ok(ConfiguredNormalizer::Streaming {
                normalizer: StreamingNormalizer::from_schema(schema, identifier_columns)?,
                ordinal_index: schema.change_ordinal_index(),
            }),
        }
    }

    /// Returns the mode this normalizer implements.
    pub fn mode(&self) -> NormalizationMode {
        match self {
            ConfiguredNormalizer::Batch(_) => NormalizationMode::Batch,
            ConfiguredNormalizer::Streaming { .. } => NormalizationMode::Streaming,
        }
    }
}

impl ChangelogNormalizer for ConfiguredNormalizer {
    fn normalize(&self, mut records: Vec<ChangeRecord>) -> Vec<ChangeRecord> {
        match self {
            ConfiguredNormalizer::Batch(normalizer) => normalizer.normalize(records),
            ConfiguredNormalizer::Streaming {
                normalizer,
                ordinal_index,
            } => {
                sort_for_streaming(&mut records, normalizer.identifier(), *ordinal_index);
                normalizer.normalize(records)
            }
        }
    }
}
