//! Tradier Data Provider Binary
//!
//! Starts the streaming market data provider, subscribes the configured
//! symbols and logs everything that arrives until interrupted.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin tradier-data-provider
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `TRADIER_ACCESS_TOKEN`: Account access token
//!
//! ## Optional
//! - `TRADIER_STREAM_URL`: Stream endpoint (default: production feed)
//! - `TRADIER_SYMBOLS`: Comma-separated symbols to subscribe (default: AAPL)
//! - `TRADIER_LOGON_TIMEOUT_SECS`: Logon ack deadline (default: 10)
//! - `TRADIER_RECONNECT_DELAY_INITIAL_MS`: Initial backoff delay (default: 500)
//! - `TRADIER_RECONNECT_DELAY_MAX_SECS`: Backoff delay cap (default: 30)
//! - `TRADIER_RECONNECT_DELAY_MULTIPLIER`: Backoff multiplier (default: 2.0)
//! - `TRADIER_HISTORY_TIMEOUT_SECS`: Historical response timeout (default: 30)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use tokio::signal;
use tradier_data_provider::infrastructure::telemetry;
use tradier_data_provider::{
    MarketDataProvider, ProviderConfig, Subscribe, WebSocketTransport,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    load_dotenv();
    telemetry::init();

    tracing::info!("starting Tradier data provider");

    let config = ProviderConfig::from_env()?;
    tracing::info!(stream_url = %config.stream_url, "configuration loaded");

    let transport = Arc::new(WebSocketTransport::from_config(&config));
    let provider = MarketDataProvider::new(transport, config.session, config.history);

    let symbols = symbols_from_env();

    provider.on_logon({
        let symbols = symbols.clone();
        move |name| tracing::info!(provider = %name, ?symbols, "logged on")
    });
    provider.on_logout(|name| tracing::warn!(provider = %name, "logged out"));
    provider.on_tick(|tick| {
        tracing::info!(
            symbol = %tick.security,
            bid = %tick.bid_price,
            ask = %tick.ask_price,
            "tick"
        );
    });
    provider.on_historic_bar_data(|data| {
        tracing::info!(
            symbol = %data.security,
            bars = data.bars.len(),
            "historical bars"
        );
    });
    provider.on_failure(|failure| tracing::warn!(%failure, "failure"));

    provider.start();
    for symbol in &symbols {
        provider.subscribe_tick_data(&Subscribe::new(symbol.clone()));
    }

    signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    provider.stop();

    Ok(())
}

/// Symbols to subscribe at startup, from `TRADIER_SYMBOLS`.
fn symbols_from_env() -> Vec<String> {
    std::env::var("TRADIER_SYMBOLS")
        .unwrap_or_else(|_| "AAPL".to_string())
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Load .env if present; real environment variables win.
fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env");
    }
}
