//! Registries that publish normalized changelogs under a queryable name.

mod base;
pub mod memory;

pub use base::ViewRegistry;
