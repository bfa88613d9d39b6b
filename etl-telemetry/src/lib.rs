//! Telemetry setup shared by the changelog binaries and tests.

pub mod tracing;
