//! Common types used throughout the changelog engine.
//!
//! Re-exports the typed cell values, rows, change records and schema definitions that flow
//! through both normalizers.

mod cell;
mod change;
mod identifier;
mod schema;
mod table_row;

pub use cell::*;
pub use change::*;
pub use identifier::*;
pub use schema::*;
pub use table_row::*;
