//! Sources of raw changelog rows.
//!
//! A [`ChangeSource`] knows the schema and snapshot history of its tables and produces the raw
//! `INSERT`/`DELETE` rows committed within a [`crate::range::SnapshotRange`].

mod base;
pub mod memory;

pub use base::ChangeSource;
