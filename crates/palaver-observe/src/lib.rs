//! Observability setup for Palaver: log formatting, filtering, and optional
//! OpenTelemetry span export.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, shutdown_tracing};
