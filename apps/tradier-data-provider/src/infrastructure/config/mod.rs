//! Configuration loading and settings types.

mod settings;

pub use settings::{ConfigError, Credentials, HistorySettings, ProviderConfig, SessionSettings};
