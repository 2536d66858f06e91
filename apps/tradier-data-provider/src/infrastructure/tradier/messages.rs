//! Tradier Stream Message Types
//!
//! Wire format types for the Tradier market data stream. Inbound messages
//! carry a `type` discriminator; outbound requests carry an `action`.
//!
//! # Message Types
//!
//! ## Inbound
//! - `session`: Connection/logon acknowledgments
//! - `quote`: Real-time quotes for subscribed symbols
//! - `history`: Historical bar responses, tagged with the request id
//! - `subscription`: Subscription confirmations (informational)
//! - `error`: Error responses with code and message
//!
//! ## Outbound
//! - `auth`: Authentication with the account access token
//! - `subscribe` / `unsubscribe`: Symbol list changes
//! - `history`: Historical bar request, tagged with a client-generated id

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::market_data::{Bar, Security, Tick};

// =============================================================================
// Inbound Messages
// =============================================================================

/// Lifecycle status of the stream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Socket accepted; authentication expected next.
    Connected,
    /// Credentials accepted; streaming is live.
    Authenticated,
}

/// Session acknowledgment.
///
/// # Wire Format (JSON)
/// ```json
/// {"type": "session", "status": "connected"}
/// {"type": "session", "status": "authenticated", "session": "c8638963"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMessage {
    /// Message type (always "session").
    #[serde(rename = "type")]
    pub msg_type: String,

    /// Session status.
    pub status: SessionStatus,

    /// Feed-assigned session identifier, present once authenticated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

/// Real-time quote for one subscribed symbol.
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "type": "quote",
///   "symbol": "AAPL",
///   "bid": 185.25,
///   "bidsz": 3,
///   "ask": 185.27,
///   "asksz": 5,
///   "last": 185.26,
///   "ts": "2024-01-15T14:30:00.123Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteMessage {
    /// Message type (always "quote").
    #[serde(rename = "type")]
    pub msg_type: String,

    /// Ticker symbol.
    pub symbol: String,

    /// Best bid price.
    pub bid: Decimal,

    /// Best bid size.
    pub bidsz: u32,

    /// Best ask price.
    pub ask: Decimal,

    /// Best ask size.
    pub asksz: u32,

    /// Last trade price, if any trade has printed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<Decimal>,

    /// Quote timestamp.
    pub ts: DateTime<Utc>,
}

impl From<QuoteMessage> for Tick {
    fn from(quote: QuoteMessage) -> Self {
        Self {
            security: Security::new(quote.symbol),
            timestamp: quote.ts,
            bid_price: quote.bid,
            bid_size: quote.bidsz,
            ask_price: quote.ask,
            ask_size: quote.asksz,
            last_price: quote.last,
        }
    }
}

/// One OHLCV bar within a history response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarMessage {
    /// Start of the bar period.
    pub ts: DateTime<Utc>,
    /// Open price.
    pub open: Decimal,
    /// High price.
    pub high: Decimal,
    /// Low price.
    pub low: Decimal,
    /// Close price.
    pub close: Decimal,
    /// Volume (shares).
    pub volume: i64,
}

impl From<BarMessage> for Bar {
    fn from(bar: BarMessage) -> Self {
        Self {
            timestamp: bar.ts,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }
}

/// Historical bar response, echoing the request's correlation id.
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "type": "history",
///   "id": "3b4f9a62-...",
///   "symbol": "AAPL",
///   "bars": [{"ts": "2015-02-01T00:00:00Z", "open": 118.05, ...}]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// Message type (always "history").
    #[serde(rename = "type")]
    pub msg_type: String,

    /// Correlation identifier from the originating request.
    pub id: Uuid,

    /// Ticker symbol.
    pub symbol: String,

    /// Bars in ascending time order.
    #[serde(default)]
    pub bars: Vec<BarMessage>,
}

/// Subscription confirmation listing the session's streamed symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionMessage {
    /// Message type (always "subscription").
    #[serde(rename = "type")]
    pub msg_type: String,

    /// Symbols currently streaming on this session.
    #[serde(default)]
    pub symbols: Vec<String>,
}

/// Error response with code and description.
///
/// # Wire Format (JSON)
/// ```json
/// {"type": "error", "code": 401, "msg": "session not authenticated"}
/// ```
///
/// # Error Codes
/// - 400: Invalid payload
/// - 401: Not authenticated
/// - 402: Invalid access token
/// - 404: Authentication timeout
/// - 405: Symbol limit exceeded
/// - 500: Internal feed error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Message type (always "error").
    #[serde(rename = "type")]
    pub msg_type: String,

    /// Error code.
    pub code: i32,

    /// Error message.
    pub msg: String,
}

impl ErrorMessage {
    /// Check if this is an authentication error.
    #[must_use]
    pub const fn is_auth_error(&self) -> bool {
        matches!(self.code, 401..=404)
    }
}

/// Any decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradierMessage {
    /// Session acknowledgment.
    Session(SessionMessage),
    /// Real-time quote.
    Quote(QuoteMessage),
    /// Historical bar response.
    History(HistoryMessage),
    /// Subscription confirmation.
    Subscription(SubscriptionMessage),
    /// Error response.
    Error(ErrorMessage),
}

// =============================================================================
// Outbound Requests
// =============================================================================

/// Authentication request sent right after the connection acknowledgment.
#[derive(Debug, Clone, Serialize)]
pub struct AuthRequest {
    /// Action: "auth".
    pub action: &'static str,

    /// Account access token.
    pub token: String,
}

impl AuthRequest {
    /// Create an authentication request.
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self {
            action: "auth",
            token,
        }
    }
}

/// Subscribe or unsubscribe request for a list of symbols.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionRequest {
    /// Action: "subscribe" or "unsubscribe".
    pub action: &'static str,

    /// Symbols affected.
    pub symbols: Vec<String>,
}

impl SubscriptionRequest {
    /// Create a subscribe request.
    #[must_use]
    pub const fn subscribe(symbols: Vec<String>) -> Self {
        Self {
            action: "subscribe",
            symbols,
        }
    }

    /// Create an unsubscribe request.
    #[must_use]
    pub const fn unsubscribe(symbols: Vec<String>) -> Self {
        Self {
            action: "unsubscribe",
            symbols,
        }
    }
}

/// Historical bar request tagged with its correlation id.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryRequest {
    /// Action: "history".
    pub action: &'static str,

    /// Client-generated correlation identifier.
    pub id: Uuid,

    /// Ticker symbol.
    pub symbol: String,

    /// Bar granularity: "daily", "weekly" or "monthly".
    pub interval: &'static str,

    /// Inclusive start of the range.
    pub start: DateTime<Utc>,

    /// Inclusive end of the range.
    pub end: DateTime<Utc>,
}
