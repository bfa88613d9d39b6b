//! Configuration types shared by the changelog library and binaries.

mod base;
mod normalizer;

pub use base::ValidationError;
pub use normalizer::{
    DEFAULT_CHANGE_ORDINAL_COLUMN, DEFAULT_CHANGE_TYPE_COLUMN, NormalizationMode, NormalizerConfig,
};
