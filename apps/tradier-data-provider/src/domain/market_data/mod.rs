//! Market Data Domain Types
//!
//! Core value types exchanged between the feed session and the provider's
//! callers: securities, ticks, historical bars and the request objects that
//! reference them. None of these types perform I/O.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Correlation identifier linking a historical request to its response.
pub type RequestId = uuid::Uuid;

// =============================================================================
// Securities
// =============================================================================

/// An instrument identified by its ticker symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Security {
    /// Ticker symbol (e.g., "AAPL").
    pub symbol: String,
}

impl Security {
    /// Create a security from a symbol.
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }
}

impl std::fmt::Display for Security {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

// =============================================================================
// Ticks
// =============================================================================

/// A single quote update for one symbol.
///
/// Transient: dispatched to listeners and not retained by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    /// Instrument the quote belongs to.
    pub security: Security,
    /// Quote timestamp from the feed.
    pub timestamp: DateTime<Utc>,
    /// Best bid price.
    pub bid_price: Decimal,
    /// Best bid size.
    pub bid_size: u32,
    /// Best ask price.
    pub ask_price: Decimal,
    /// Best ask size.
    pub ask_size: u32,
    /// Last trade price, when the feed includes one.
    pub last_price: Option<Decimal>,
}

// =============================================================================
// Bars
// =============================================================================

/// Granularity of historical bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarType {
    /// One bar per trading day.
    #[default]
    Daily,
    /// One bar per week.
    Weekly,
    /// One bar per month.
    Monthly,
}

impl BarType {
    /// Parse a bar type from its wire name.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "weekly" => Self::Weekly,
            "monthly" => Self::Monthly,
            _ => Self::Daily,
        }
    }

    /// Get the wire name of this bar type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for BarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One OHLCV bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    /// Start of the bar period.
    pub timestamp: DateTime<Utc>,
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

/// A completed historical bar response delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricBarData {
    /// Correlation identifier of the originating request.
    pub request_id: RequestId,
    /// Instrument the bars belong to.
    pub security: Security,
    /// Bar granularity of the originating request.
    pub bar_type: BarType,
    /// Bars in ascending time order, as delivered by the feed.
    pub bars: Vec<Bar>,
}

// =============================================================================
// Requests
// =============================================================================

/// Request to begin streaming ticks for one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscribe {
    /// Instrument to stream.
    pub security: Security,
}

impl Subscribe {
    /// Create a subscribe request for a symbol.
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            security: Security::new(symbol),
        }
    }
}

/// Request to stop streaming ticks for one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsubscribe {
    /// Instrument to stop streaming.
    pub security: Security,
}

impl Unsubscribe {
    /// Create an unsubscribe request for a symbol.
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            security: Security::new(symbol),
        }
    }
}

/// Request for historical bars over a time range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricDataRequest {
    /// Instrument to fetch bars for.
    pub security: Security,
    /// Bar granularity.
    pub bar_type: BarType,
    /// Inclusive start of the range.
    pub start_time: DateTime<Utc>,
    /// Inclusive end of the range.
    pub end_time: DateTime<Utc>,
}

impl HistoricDataRequest {
    /// Create a historical bar request.
    #[must_use]
    pub fn new(
        symbol: impl Into<String>,
        bar_type: BarType,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            security: Security::new(symbol),
            bar_type,
            start_time,
            end_time,
        }
    }
}

// =============================================================================
// Failures
// =============================================================================

/// Non-fatal failures surfaced on the provider's error notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketDataFailure {
    /// A historical request received no response within its timeout window.
    HistoricalDataTimeout {
        /// Correlation identifier of the request that timed out.
        request_id: RequestId,
        /// Instrument of the request that timed out.
        security: Security,
    },
    /// The feed rejected a request after logon.
    FeedRejection {
        /// Vendor error code.
        code: i32,
        /// Vendor error message.
        message: String,
    },
}

impl std::fmt::Display for MarketDataFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HistoricalDataTimeout {
                request_id,
                security,
            } => {
                write!(f, "historical request {request_id} for {security} timed out")
            }
            Self::FeedRejection { code, message } => {
                write!(f, "feed rejection ({code}): {message}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_display_is_symbol() {
        let security = Security::new("AAPL");
        assert_eq!(security.to_string(), "AAPL");
    }

    #[test]
    fn bar_type_parsing() {
        assert_eq!(BarType::from_str_case_insensitive("daily"), BarType::Daily);
        assert_eq!(
            BarType::from_str_case_insensitive("WEEKLY"),
            BarType::Weekly
        );
        assert_eq!(
            BarType::from_str_case_insensitive("Monthly"),
            BarType::Monthly
        );
        assert_eq!(
            BarType::from_str_case_insensitive("unknown"),
            BarType::Daily
        );
    }

    #[test]
    fn bar_type_round_trips_through_wire_name() {
        for bar_type in [BarType::Daily, BarType::Weekly, BarType::Monthly] {
            assert_eq!(
                BarType::from_str_case_insensitive(bar_type.as_str()),
                bar_type
            );
        }
    }

    #[test]
    fn historic_request_constructor() {
        let start = Utc::now() - chrono::Duration::days(30);
        let end = Utc::now();
        let request = HistoricDataRequest::new("AAPL", BarType::Monthly, start, end);

        assert_eq!(request.security.symbol, "AAPL");
        assert_eq!(request.bar_type, BarType::Monthly);
        assert_eq!(request.start_time, start);
        assert_eq!(request.end_time, end);
    }

    #[test]
    fn failure_display_includes_symbol() {
        let failure = MarketDataFailure::HistoricalDataTimeout {
            request_id: uuid::Uuid::new_v4(),
            security: Security::new("SPY"),
        };
        assert!(failure.to_string().contains("SPY"));
    }
}
