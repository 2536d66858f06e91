//! Infrastructure layer - adapters and external integrations.

/// Configuration from environment variables.
pub mod config;

/// Metric counters.
pub mod metrics;

/// Tracing bootstrap.
pub mod telemetry;

/// Tradier feed adapters (messages, codec, auth, transport).
pub mod tradier;
