#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::default_trait_access
    )
)]

//! Tradier Data Provider - Streaming Market Data Client
//!
//! Maintains one authenticated session to the Tradier market data feed,
//! multiplexes per-symbol tick subscriptions over it and correlates
//! asynchronous historical bar requests with their responses. All outcomes
//! are surfaced through notification channels; nothing blocks awaiting the
//! feed.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core types with no I/O
//!   - `market_data`: Securities, ticks, bars, request objects
//!   - `subscription`: Subscription registry with replay-on-reconnect
//!   - `events`: Multicast notification channels
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Feed transport contract (envelopes in, requests out)
//!   - `services`: Session manager, tick dispatcher, historical
//!     correlator, provider facade
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `tradier`: WebSocket transport, wire messages, codec, auth
//!   - `config`: Configuration from environment variables
//!   - `telemetry`: Tracing bootstrap
//!   - `metrics`: Counter helpers
//!
//! # Data Flow
//!
//! ```text
//! Tradier WS ──► transport ──► session manager ──┬─► tick dispatcher ──► TickArrived
//!                   ▲               │            └─► correlator ──────► HistoricBarDataArrived
//!                   │               └─► LogonArrived / LogoutArrived
//!                   └── subscribe / unsubscribe / history requests
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - core types with no I/O dependencies.
pub mod domain;

/// Application layer - ports and use-case services.
pub mod application;

/// Infrastructure layer - adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::events::{ListenerId, ListenerSet, ProviderEvents};
pub use domain::market_data::{
    Bar, BarType, HistoricBarData, HistoricDataRequest, MarketDataFailure, RequestId, Security,
    Subscribe, Tick, Unsubscribe,
};
pub use domain::subscription::{
    SubscribeDecision, SubscriptionRegistry, SubscriptionState, UnsubscribeDecision,
};

// Ports (for alternate transports and integration tests)
pub use application::ports::{
    FeedConnection, FeedEnvelope, FeedTransport, HistoricBarsPayload, OutboundRequest,
    TransportError,
};

// Services
pub use application::services::history::HistoryError;
pub use application::services::provider::{MarketDataProvider, PROVIDER_NAME};
pub use application::services::session::SessionState;

// Infrastructure config
pub use infrastructure::config::{
    ConfigError, Credentials, HistorySettings, ProviderConfig, SessionSettings,
};

// Tradier transport
pub use infrastructure::tradier::WebSocketTransport;
