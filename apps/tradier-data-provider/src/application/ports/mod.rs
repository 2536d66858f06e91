//! Port Interfaces
//!
//! Contracts between the session orchestration and the wire transport,
//! following the Hexagonal Architecture pattern: the session manager only
//! ever sees decoded envelopes and typed outbound requests, never sockets
//! or JSON.
//!
//! ## Driven Ports (Outbound)
//!
//! - [`FeedTransport`]: connect/authenticate primitive yielding a
//!   [`FeedConnection`] (outbound request sender + inbound envelope stream)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::domain::market_data::{Bar, BarType, RequestId, Security, Tick};

/// Errors a transport can report while establishing a session.
///
/// Both variants are non-fatal to the provider: the session manager reports
/// them upward and retries per its backoff policy.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The endpoint could not be reached or the socket handshake failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The endpoint rejected the credentials or the logon handshake.
    #[error("authentication failed: {0}")]
    Authentication(String),
}

/// Decoded inbound envelope, tagged by message kind.
#[derive(Debug, Clone)]
pub enum FeedEnvelope {
    /// The feed acknowledged the logon handshake.
    LogonAck {
        /// Feed-assigned session identifier.
        session_id: String,
    },
    /// A streaming quote for one symbol.
    Tick(Tick),
    /// A historical bar response carrying its correlation identifier.
    HistoricBars(HistoricBarsPayload),
    /// The feed rejected a request after logon.
    Rejected {
        /// Vendor error code.
        code: i32,
        /// Vendor error message.
        message: String,
    },
    /// The feed announced it is closing the session.
    Disconnected {
        /// Human-readable reason.
        reason: String,
    },
}

/// Decoded body of a historical bar response.
#[derive(Debug, Clone)]
pub struct HistoricBarsPayload {
    /// Correlation identifier echoed by the feed.
    pub request_id: RequestId,
    /// Instrument the bars belong to.
    pub security: Security,
    /// Bars in the order delivered by the feed.
    pub bars: Vec<Bar>,
}

/// Typed outbound request handed to the transport for encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundRequest {
    /// Begin streaming ticks for the given symbols.
    Subscribe {
        /// Symbols to announce.
        symbols: Vec<String>,
    },
    /// Stop streaming ticks for the given symbols.
    Unsubscribe {
        /// Symbols to cancel.
        symbols: Vec<String>,
    },
    /// Request historical bars, tagged with a correlation identifier.
    HistoricBars {
        /// Correlation identifier the response must echo.
        request_id: RequestId,
        /// Instrument to fetch bars for.
        security: Security,
        /// Bar granularity.
        bar_type: BarType,
        /// Inclusive start of the range.
        start_time: DateTime<Utc>,
        /// Inclusive end of the range.
        end_time: DateTime<Utc>,
    },
}

/// A live, authenticated connection to the feed.
///
/// Dropping the `inbound` receiver or observing it end signals connection
/// loss; the transport closes the `outbound` channel when the socket dies,
/// so sends fail fast instead of blocking.
#[derive(Debug)]
pub struct FeedConnection {
    /// Sender for wire requests.
    pub outbound: mpsc::Sender<OutboundRequest>,
    /// Stream of decoded inbound envelopes. A `LogonAck` is always the
    /// first envelope delivered on a fresh connection.
    pub inbound: mpsc::Receiver<FeedEnvelope>,
}

/// Connect/authenticate primitive to the vendor feed.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Establish a connection and complete the authentication handshake.
    ///
    /// # Errors
    ///
    /// [`TransportError::Connection`] when the endpoint is unreachable,
    /// [`TransportError::Authentication`] when the handshake is rejected.
    async fn connect(&self) -> Result<FeedConnection, TransportError>;
}
