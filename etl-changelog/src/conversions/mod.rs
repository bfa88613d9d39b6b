//! Conversions between changelog records and external representations.

pub mod json;
