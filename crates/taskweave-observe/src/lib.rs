//! Observability setup for taskweave: structured logging and optional
//! OpenTelemetry span export.

pub mod tracing_setup;
