//! Provider Configuration Settings
//!
//! Configuration types for the provider, loaded from environment variables.

use std::time::Duration;

/// Tradier API credentials.
#[derive(Clone)]
pub struct Credentials {
    access_token: String,
}

impl Credentials {
    /// Create credentials from an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty.
    pub fn new(access_token: impl Into<String>) -> Result<Self, ConfigError> {
        let access_token = access_token.into();
        if access_token.is_empty() {
            return Err(ConfigError::EmptyValue("TRADIER_ACCESS_TOKEN".to_string()));
        }
        Ok(Self { access_token })
    }

    /// Get the access token.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Session lifecycle settings.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Deadline for the logon acknowledgment after connecting.
    pub logon_timeout: Duration,
    /// Initial reconnection delay.
    pub reconnect_delay_initial: Duration,
    /// Maximum reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Reconnection delay multiplier for exponential backoff.
    pub reconnect_delay_multiplier: f64,
    /// Jitter fraction applied to each reconnection delay.
    pub reconnect_jitter: f64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            logon_timeout: Duration::from_secs(10),
            reconnect_delay_initial: Duration::from_millis(500),
            reconnect_delay_max: Duration::from_secs(30),
            reconnect_delay_multiplier: 2.0,
            reconnect_jitter: 0.1,
        }
    }
}

/// Historical request settings.
#[derive(Debug, Clone)]
pub struct HistorySettings {
    /// Bounded wait for a historical response before the request times out.
    pub response_timeout: Duration,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(30),
        }
    }
}

/// Complete provider configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API credentials.
    pub credentials: Credentials,
    /// WebSocket endpoint of the market data stream.
    pub stream_url: String,
    /// Session lifecycle settings.
    pub session: SessionSettings,
    /// Historical request settings.
    pub history: HistorySettings,
}

impl ProviderConfig {
    /// Default stream endpoint.
    pub const DEFAULT_STREAM_URL: &'static str = "wss://ws.tradier.com/v1/markets/events";

    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `TRADIER_ACCESS_TOKEN` is missing or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let access_token = std::env::var("TRADIER_ACCESS_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("TRADIER_ACCESS_TOKEN".to_string()))?;
        let credentials = Credentials::new(access_token)?;

        let stream_url = std::env::var("TRADIER_STREAM_URL")
            .unwrap_or_else(|_| Self::DEFAULT_STREAM_URL.to_string());

        let session = SessionSettings {
            logon_timeout: parse_env_duration_secs(
                "TRADIER_LOGON_TIMEOUT_SECS",
                SessionSettings::default().logon_timeout,
            ),
            reconnect_delay_initial: parse_env_duration_millis(
                "TRADIER_RECONNECT_DELAY_INITIAL_MS",
                SessionSettings::default().reconnect_delay_initial,
            ),
            reconnect_delay_max: parse_env_duration_secs(
                "TRADIER_RECONNECT_DELAY_MAX_SECS",
                SessionSettings::default().reconnect_delay_max,
            ),
            reconnect_delay_multiplier: parse_env_f64(
                "TRADIER_RECONNECT_DELAY_MULTIPLIER",
                SessionSettings::default().reconnect_delay_multiplier,
            ),
            reconnect_jitter: parse_env_f64(
                "TRADIER_RECONNECT_JITTER",
                SessionSettings::default().reconnect_jitter,
            ),
        };

        let history = HistorySettings {
            response_timeout: parse_env_duration_secs(
                "TRADIER_HISTORY_TIMEOUT_SECS",
                HistorySettings::default().response_timeout,
            ),
        };

        Ok(Self {
            credentials,
            stream_url,
            session,
            history,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
