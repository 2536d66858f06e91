//! Shared integration test support: a scripted in-memory feed transport and
//! listener capture helpers.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tokio::time::timeout;

use tradier_data_provider::{
    FeedConnection, FeedEnvelope, FeedTransport, HistoricBarData, HistorySettings,
    MarketDataFailure, MarketDataProvider, OutboundRequest, Security, SessionSettings, Tick,
    TransportError,
};

/// How long event waits may take before a test fails.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settling time when asserting that something does NOT happen.
pub const QUIET_PERIOD: Duration = Duration::from_millis(100);

// =============================================================================
// Scripted Transport
// =============================================================================

/// One feed session as seen from the test: feed envelopes in, observe
/// requests out. Dropping the link closes the session.
pub struct FeedLink {
    /// Push inbound envelopes to the provider.
    pub envelopes: mpsc::Sender<FeedEnvelope>,
    /// Observe the provider's outbound wire requests.
    pub requests: mpsc::Receiver<OutboundRequest>,
}

impl FeedLink {
    /// Receive the next outbound request, failing the test on silence.
    pub async fn expect_request(&mut self) -> OutboundRequest {
        timeout(EVENT_TIMEOUT, self.requests.recv())
            .await
            .expect("timed out waiting for a wire request")
            .expect("feed link closed")
    }

    /// Assert no outbound request arrives within the quiet period.
    pub async fn expect_no_request(&mut self) {
        tokio::time::sleep(QUIET_PERIOD).await;
        assert!(
            self.requests.try_recv().is_err(),
            "unexpected wire request"
        );
    }

    /// Feed a tick envelope for a symbol.
    pub async fn send_tick(&self, symbol: &str) {
        self.envelopes
            .send(FeedEnvelope::Tick(tick(symbol)))
            .await
            .expect("provider hung up");
    }

    /// Announce a feed-initiated disconnect.
    pub async fn send_disconnect(&self, reason: &str) {
        let _ = self
            .envelopes
            .send(FeedEnvelope::Disconnected {
                reason: reason.to_string(),
            })
            .await;
    }
}

/// In-memory [`FeedTransport`] that hands each accepted connection to the
/// test as a [`FeedLink`] and can be scripted to fail attempts.
pub struct ScriptedTransport {
    link_tx: mpsc::UnboundedSender<FeedLink>,
    failures: Mutex<VecDeque<TransportError>>,
    auto_logon: bool,
    sessions: AtomicU64,
}

impl ScriptedTransport {
    /// Transport that acknowledges logon on every accepted connection.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FeedLink>) {
        Self::build(true)
    }

    /// Transport that never acknowledges logon by itself; the test feeds
    /// the ack through the link.
    pub fn without_logon_ack() -> (Arc<Self>, mpsc::UnboundedReceiver<FeedLink>) {
        Self::build(false)
    }

    fn build(auto_logon: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<FeedLink>) {
        let (link_tx, link_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                link_tx,
                failures: Mutex::new(VecDeque::new()),
                auto_logon,
                sessions: AtomicU64::new(0),
            }),
            link_rx,
        )
    }

    /// Fail the next connect attempt with the given error.
    pub fn push_failure(&self, error: TransportError) {
        self.failures.lock().push_back(error);
    }
}

#[async_trait]
impl FeedTransport for ScriptedTransport {
    async fn connect(&self) -> Result<FeedConnection, TransportError> {
        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }

        let (envelope_tx, envelope_rx) = mpsc::channel(64);
        let (request_tx, request_rx) = mpsc::channel(64);

        if self.auto_logon {
            let session = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
            let _ = envelope_tx
                .send(FeedEnvelope::LogonAck {
                    session_id: format!("sess-{session}"),
                })
                .await;
        }

        let _ = self.link_tx.send(FeedLink {
            envelopes: envelope_tx,
            requests: request_rx,
        });

        Ok(FeedConnection {
            outbound: request_tx,
            inbound: envelope_rx,
        })
    }
}

/// Receive the next accepted connection, failing the test on silence.
pub async fn next_link(links: &mut mpsc::UnboundedReceiver<FeedLink>) -> FeedLink {
    timeout(EVENT_TIMEOUT, links.recv())
        .await
        .expect("timed out waiting for a feed connection")
        .expect("transport dropped")
}

// =============================================================================
// Providers & Fixtures
// =============================================================================

/// Session settings tuned for fast test reconnects (no jitter).
pub fn fast_session_settings() -> SessionSettings {
    SessionSettings {
        logon_timeout: Duration::from_secs(2),
        reconnect_delay_initial: Duration::from_millis(10),
        reconnect_delay_max: Duration::from_millis(50),
        reconnect_delay_multiplier: 2.0,
        reconnect_jitter: 0.0,
    }
}

/// Provider over a fresh scripted transport.
pub fn scripted_provider(
    history: HistorySettings,
) -> (MarketDataProvider, mpsc::UnboundedReceiver<FeedLink>) {
    let (transport, links) = ScriptedTransport::new();
    (
        MarketDataProvider::new(transport, fast_session_settings(), history),
        links,
    )
}

/// A tick with plausible quote fields.
pub fn tick(symbol: &str) -> Tick {
    Tick {
        security: Security::new(symbol),
        timestamp: Utc::now(),
        bid_price: Decimal::new(18_525, 2),
        bid_size: 3,
        ask_price: Decimal::new(18_527, 2),
        ask_size: 5,
        last_price: Some(Decimal::new(18_526, 2)),
    }
}

// =============================================================================
// Listener Capture
// =============================================================================

/// Capture logon notifications on a channel.
pub fn watch_logons(provider: &MarketDataProvider) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    provider.on_logon(move |name: &String| {
        let _ = tx.send(name.clone());
    });
    rx
}

/// Capture logout notifications on a channel.
pub fn watch_logouts(provider: &MarketDataProvider) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    provider.on_logout(move |name: &String| {
        let _ = tx.send(name.clone());
    });
    rx
}

/// Capture tick notifications on a channel.
pub fn watch_ticks(provider: &MarketDataProvider) -> mpsc::UnboundedReceiver<Tick> {
    let (tx, rx) = mpsc::unbounded_channel();
    provider.on_tick(move |tick: &Tick| {
        let _ = tx.send(tick.clone());
    });
    rx
}

/// Capture historical bar notifications on a channel.
pub fn watch_historic_bars(
    provider: &MarketDataProvider,
) -> mpsc::UnboundedReceiver<HistoricBarData> {
    let (tx, rx) = mpsc::unbounded_channel();
    provider.on_historic_bar_data(move |data: &HistoricBarData| {
        let _ = tx.send(data.clone());
    });
    rx
}

/// Capture failure notifications on a channel.
pub fn watch_failures(
    provider: &MarketDataProvider,
) -> mpsc::UnboundedReceiver<MarketDataFailure> {
    let (tx, rx) = mpsc::unbounded_channel();
    provider.on_failure(move |failure: &MarketDataFailure| {
        let _ = tx.send(failure.clone());
    });
    rx
}

/// Receive the next captured event, failing the test on silence.
pub async fn expect_event<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

/// Assert no event arrives within the quiet period.
pub async fn expect_no_event<T: std::fmt::Debug>(rx: &mut mpsc::UnboundedReceiver<T>) {
    tokio::time::sleep(QUIET_PERIOD).await;
    if let Ok(event) = rx.try_recv() {
        panic!("unexpected event: {event:?}");
    }
}
