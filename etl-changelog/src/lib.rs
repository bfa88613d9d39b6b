//! Changelog normalization for copy-on-write table histories.
//!
//! Raw changelogs describe the difference between two table states as `INSERT` and `DELETE`
//! rows. This crate reclassifies such a changelog into a semantically correct change stream:
//! a `DELETE` and `INSERT` of the same logical row become an update pair, and pairs that only
//! exist because a data file was rewritten without modifying the row are removed.
//!
//! Two normalizers implement the same [`normalize::ChangelogNormalizer`] contract:
//!
//! - [`normalize::StreamingNormalizer`] is a single pass with one row of lookahead over input
//!   sorted by identifier columns, producing `UPDATE_BEFORE`/`UPDATE_AFTER` pairs.
//! - [`normalize::BatchNormalizer`] partitions rows by identifier and change ordinal, producing
//!   `UPDATE_PREIMAGE`/`UPDATE_POSTIMAGE` pairs.
//!
//! The [`procedure::GenerateChanges`] procedure ties everything together: it resolves a
//! snapshot range, reads raw changes from a [`source::ChangeSource`], normalizes them and
//! publishes the result to a [`registry::ViewRegistry`].

pub mod conversions;
pub mod error;
mod macros;
pub mod normalize;
pub mod procedure;
pub mod range;
pub mod registry;
pub mod snapshot;
pub mod source;
pub mod types;
