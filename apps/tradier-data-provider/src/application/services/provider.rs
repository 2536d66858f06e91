//! Market Data Provider Facade
//!
//! Public-facing composition of the session manager, subscription registry,
//! tick dispatcher and historical correlator. One facade instance owns one
//! session at a time; `start` is non-blocking and readiness is observed via
//! the logon notification channel, never by polling.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{FeedTransport, OutboundRequest};
use crate::application::services::dispatch::TickDispatcher;
use crate::application::services::history::{HistoricalCorrelator, HistoryError};
use crate::application::services::session::{SessionHandle, SessionManager, SessionState};
use crate::domain::events::{ListenerId, ProviderEvents};
use crate::domain::market_data::{
    HistoricBarData, HistoricDataRequest, MarketDataFailure, RequestId, Subscribe, Tick,
    Unsubscribe,
};
use crate::domain::subscription::{SubscribeDecision, SubscriptionRegistry, UnsubscribeDecision};
use crate::{HistorySettings, SessionSettings};

/// Name carried in logon/logout notifications.
pub const PROVIDER_NAME: &str = "Tradier";

#[derive(Debug, Default)]
struct RunState {
    cancel: Option<CancellationToken>,
    task: Option<tokio::task::JoinHandle<()>>,
}

/// Streaming market data provider for the Tradier feed.
///
/// # Example
///
/// ```ignore
/// let provider = MarketDataProvider::new(transport, session, history);
/// provider.on_logon(|name| println!("logged on to {name}"));
/// provider.on_tick(|tick| println!("{tick:?}"));
/// provider.start();
/// provider.subscribe_tick_data(&Subscribe::new("AAPL"));
/// ```
pub struct MarketDataProvider {
    transport: Arc<dyn FeedTransport>,
    settings: SessionSettings,
    registry: Arc<SubscriptionRegistry>,
    correlator: Arc<HistoricalCorrelator>,
    events: Arc<ProviderEvents>,
    handle: Arc<SessionHandle>,
    run_state: Mutex<RunState>,
}

impl MarketDataProvider {
    /// Create a provider over the given transport.
    #[must_use]
    pub fn new(
        transport: Arc<dyn FeedTransport>,
        session: SessionSettings,
        history: HistorySettings,
    ) -> Self {
        let events = Arc::new(ProviderEvents::new());
        Self {
            transport,
            settings: session,
            registry: Arc::new(SubscriptionRegistry::new()),
            correlator: Arc::new(HistoricalCorrelator::new(
                Arc::clone(&events),
                history.response_timeout,
            )),
            events,
            handle: Arc::new(SessionHandle::new()),
            run_state: Mutex::new(RunState::default()),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start the session task. Non-blocking and idempotent; callers observe
    /// readiness via the logon notification. Must be called from within a
    /// tokio runtime.
    pub fn start(&self) {
        let mut run = self.run_state.lock();
        if run.cancel.is_some() {
            tracing::debug!("provider already started");
            return;
        }

        let cancel = CancellationToken::new();
        let manager = SessionManager::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.handle),
            Arc::clone(&self.registry),
            TickDispatcher::new(Arc::clone(&self.registry), Arc::clone(&self.events)),
            Arc::clone(&self.correlator),
            Arc::clone(&self.events),
            self.settings.clone(),
            PROVIDER_NAME.to_string(),
            cancel.clone(),
        );

        run.task = Some(tokio::spawn(manager.run()));
        run.cancel = Some(cancel);
        tracing::info!(provider = PROVIDER_NAME, "provider started");
    }

    /// Stop the session task and discard subscriptions and in-flight
    /// historical requests. Idempotent.
    pub fn stop(&self) {
        let mut run = self.run_state.lock();
        let Some(cancel) = run.cancel.take() else {
            tracing::debug!("provider already stopped");
            return;
        };

        cancel.cancel();
        run.task.take();
        self.correlator.abort_all();
        self.registry.clear();
        tracing::info!(provider = PROVIDER_NAME, "provider stopped");
    }

    /// Current session state.
    #[must_use]
    pub fn session_state(&self) -> SessionState {
        self.handle.state()
    }

    // =========================================================================
    // Tick Subscriptions
    // =========================================================================

    /// Subscribe to streaming ticks for one symbol.
    ///
    /// A no-op for an already-active symbol. Without a logged-on session
    /// the subscription is queued and announced on the next logon.
    pub fn subscribe_tick_data(&self, request: &Subscribe) {
        let symbol = request.security.symbol.as_str();

        match self.registry.subscribe(symbol, self.handle.is_logged_on()) {
            SubscribeDecision::AlreadyActive => {
                tracing::debug!(symbol, "already subscribed");
            }
            SubscribeDecision::SendSubscribe => self.send_subscribe(symbol),
            SubscribeDecision::Queued => {
                tracing::debug!(symbol, "tick subscription queued until logon");
                // A logon racing the queue insert may already have replayed;
                // claim the entry now if the session just came up.
                if self.handle.is_logged_on()
                    && self.registry.subscribe(symbol, true) == SubscribeDecision::SendSubscribe
                {
                    self.send_subscribe(symbol);
                }
            }
        }
    }

    /// Stop streaming ticks for one symbol. A no-op for unknown symbols.
    pub fn unsubscribe_tick_data(&self, request: &Unsubscribe) {
        let symbol = request.security.symbol.as_str();

        match self.registry.unsubscribe(symbol) {
            UnsubscribeDecision::NotFound => {
                tracing::debug!(symbol, "unsubscribe for unknown symbol ignored");
            }
            UnsubscribeDecision::Dropped => {
                tracing::debug!(symbol, "queued subscription dropped");
            }
            UnsubscribeDecision::SendUnsubscribe => {
                if !self.handle.send(OutboundRequest::Unsubscribe {
                    symbols: vec![symbol.to_string()],
                }) {
                    tracing::debug!(symbol, "connection lost before unsubscribe");
                }
                self.registry.discard(symbol);
                tracing::info!(symbol, "tick subscription cancelled");
            }
        }
    }

    // =========================================================================
    // Historical Data
    // =========================================================================

    /// Request historical bars; the response arrives on the historic-bars
    /// notification channel, correlated by the returned identifier.
    ///
    /// # Errors
    ///
    /// [`HistoryError::InvalidRange`] synchronously for an inverted range,
    /// [`HistoryError::NotLoggedOn`] without a session,
    /// [`HistoryError::ConnectionLost`] when the hand-off fails.
    pub fn historic_bar_data_request(
        &self,
        request: &HistoricDataRequest,
    ) -> Result<RequestId, HistoryError> {
        self.correlator.request(&self.handle, request)
    }

    // =========================================================================
    // Notification Channels
    // =========================================================================

    /// The provider's notification channels.
    #[must_use]
    pub fn events(&self) -> &ProviderEvents {
        &self.events
    }

    /// Attach a logon listener (fires with the provider name).
    pub fn on_logon(&self, listener: impl Fn(&String) + Send + Sync + 'static) -> ListenerId {
        self.events.logon.attach(listener)
    }

    /// Attach a logout listener (fires with the provider name).
    pub fn on_logout(&self, listener: impl Fn(&String) + Send + Sync + 'static) -> ListenerId {
        self.events.logout.attach(listener)
    }

    /// Attach a tick listener.
    pub fn on_tick(&self, listener: impl Fn(&Tick) + Send + Sync + 'static) -> ListenerId {
        self.events.tick.attach(listener)
    }

    /// Attach a historical bar data listener.
    pub fn on_historic_bar_data(
        &self,
        listener: impl Fn(&HistoricBarData) + Send + Sync + 'static,
    ) -> ListenerId {
        self.events.historic_bars.attach(listener)
    }

    /// Attach a failure listener (historical timeouts, feed rejections).
    pub fn on_failure(
        &self,
        listener: impl Fn(&MarketDataFailure) + Send + Sync + 'static,
    ) -> ListenerId {
        self.events.failures.attach(listener)
    }

    fn send_subscribe(&self, symbol: &str) {
        if self.handle.send(OutboundRequest::Subscribe {
            symbols: vec![symbol.to_string()],
        }) {
            tracing::info!(symbol, "tick subscription sent");
        } else {
            self.registry.revert_to_pending(symbol);
            tracing::debug!(symbol, "connection lost before subscribe; queued for replay");
        }
    }
}

impl Drop for MarketDataProvider {
    fn drop(&mut self) {
        if let Some(cancel) = self.run_state.lock().cancel.take() {
            cancel.cancel();
        }
    }
}

impl std::fmt::Debug for MarketDataProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataProvider")
            .field("state", &self.session_state())
            .field("subscriptions", &self.registry.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::application::ports::{FeedConnection, TransportError};
    use crate::domain::subscription::SubscriptionState;

    /// Transport whose endpoint is never reachable.
    struct UnreachableTransport;

    #[async_trait]
    impl FeedTransport for UnreachableTransport {
        async fn connect(&self) -> Result<FeedConnection, TransportError> {
            Err(TransportError::Connection("unreachable".to_string()))
        }
    }

    fn provider() -> MarketDataProvider {
        MarketDataProvider::new(
            Arc::new(UnreachableTransport),
            SessionSettings::default(),
            HistorySettings::default(),
        )
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let provider = provider();

        provider.start();
        provider.start();
        provider.stop();
        provider.stop();
    }

    #[tokio::test]
    async fn subscribe_before_start_queues() {
        let provider = provider();

        provider.subscribe_tick_data(&Subscribe::new("AAPL"));

        assert_eq!(provider.session_state(), SessionState::Disconnected);
        assert_eq!(
            provider.registry.state_of("AAPL"),
            Some(SubscriptionState::Pending)
        );
    }

    #[tokio::test]
    async fn unsubscribe_unknown_symbol_is_noop() {
        let provider = provider();
        provider.unsubscribe_tick_data(&Unsubscribe::new("AAPL"));
        assert!(provider.registry.is_empty());
    }

    #[tokio::test]
    async fn historical_request_without_session_fails_fast() {
        let provider = provider();

        let request = HistoricDataRequest::new(
            "AAPL",
            crate::domain::market_data::BarType::Monthly,
            chrono::Utc::now() - chrono::Duration::days(30),
            chrono::Utc::now(),
        );

        assert!(matches!(
            provider.historic_bar_data_request(&request),
            Err(HistoryError::NotLoggedOn)
        ));
    }

    #[tokio::test]
    async fn stop_discards_queued_subscriptions() {
        let provider = provider();

        provider.subscribe_tick_data(&Subscribe::new("AAPL"));
        provider.start();
        provider.stop();

        assert!(provider.registry.is_empty());
    }
}
