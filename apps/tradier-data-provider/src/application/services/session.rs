//! Session Manager
//!
//! Owns the connection lifecycle to the feed endpoint: connect,
//! authenticate, pump inbound envelopes, detect loss, reconnect with capped
//! exponential backoff until explicitly stopped. Entering `LoggedOn` is the
//! sole trigger for the facade's logon notification and for subscription
//! replay.
//!
//! # State machine
//!
//! ```text
//! Disconnected -> Connecting -> Authenticating -> LoggedOn
//!       ^                                            |
//!       |            (faulted: backoff, retry)       v
//!       +----------------- Disconnecting <-----------+
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::SessionSettings;
use crate::application::ports::{
    FeedConnection, FeedEnvelope, FeedTransport, OutboundRequest, TransportError,
};
use crate::application::services::backoff::ReconnectPolicy;
use crate::application::services::dispatch::TickDispatcher;
use crate::application::services::history::HistoricalCorrelator;
use crate::domain::events::ProviderEvents;
use crate::domain::market_data::MarketDataFailure;
use crate::domain::subscription::SubscriptionRegistry;
use crate::infrastructure::metrics;

// =============================================================================
// Session State
// =============================================================================

/// Authentication state of the provider's single session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No connection.
    #[default]
    Disconnected,
    /// Transport connection in progress.
    Connecting,
    /// Connected, awaiting the logon acknowledgment.
    Authenticating,
    /// Authenticated and streaming.
    LoggedOn,
    /// Caller-initiated teardown in progress.
    Disconnecting,
}

impl SessionState {
    /// Whether the session is ready for wire traffic.
    #[must_use]
    pub const fn is_logged_on(&self) -> bool {
        matches!(self, Self::LoggedOn)
    }
}

// =============================================================================
// Session Handle
// =============================================================================

/// State shared between the session task and the facade: current session
/// state, the outbound sender of the live connection (if any) and the
/// last-activity timestamp.
#[derive(Debug)]
pub struct SessionHandle {
    state: RwLock<SessionState>,
    outbound: RwLock<Option<mpsc::Sender<OutboundRequest>>>,
    last_activity: RwLock<Instant>,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHandle {
    /// Create a handle in the `Disconnected` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SessionState::Disconnected),
            outbound: RwLock::new(None),
            last_activity: RwLock::new(Instant::now()),
        }
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Whether the session is logged on.
    #[must_use]
    pub fn is_logged_on(&self) -> bool {
        self.state().is_logged_on()
    }

    pub(crate) fn set_state(&self, next: SessionState) {
        let mut state = self.state.write();
        if *state != next {
            tracing::debug!(from = ?*state, to = ?next, "session state transition");
            *state = next;
        }
    }

    pub(crate) fn install_outbound(&self, sender: mpsc::Sender<OutboundRequest>) {
        *self.outbound.write() = Some(sender);
    }

    pub(crate) fn clear_outbound(&self) {
        *self.outbound.write() = None;
    }

    /// Hand a request to the live connection.
    ///
    /// Returns `false` when no connection is installed or the transport has
    /// already shut its channel; callers treat that as a lost session.
    pub(crate) fn send(&self, request: OutboundRequest) -> bool {
        let outbound = self.outbound.read();
        outbound
            .as_ref()
            .is_some_and(|sender| sender.try_send(request).is_ok())
    }

    /// Record inbound activity.
    pub(crate) fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    /// Time since the last inbound envelope.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_activity.read().elapsed()
    }
}

// =============================================================================
// Session Errors
// =============================================================================

/// Reasons a session attempt or a live session ended.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Connect or authenticate failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// No logon acknowledgment within the configured deadline.
    #[error("no logon acknowledgment within the deadline")]
    LogonTimeout,

    /// An established connection was lost.
    #[error("connection lost: {0}")]
    ConnectionLost(String),
}

// =============================================================================
// Session Manager
// =============================================================================

/// Drives the session lifecycle on its own task until cancelled.
pub struct SessionManager {
    transport: Arc<dyn FeedTransport>,
    handle: Arc<SessionHandle>,
    registry: Arc<SubscriptionRegistry>,
    dispatcher: TickDispatcher,
    correlator: Arc<HistoricalCorrelator>,
    events: Arc<ProviderEvents>,
    settings: SessionSettings,
    provider_name: String,
    cancel: CancellationToken,
}

impl SessionManager {
    /// Create a session manager over the given collaborators.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transport: Arc<dyn FeedTransport>,
        handle: Arc<SessionHandle>,
        registry: Arc<SubscriptionRegistry>,
        dispatcher: TickDispatcher,
        correlator: Arc<HistoricalCorrelator>,
        events: Arc<ProviderEvents>,
        settings: SessionSettings,
        provider_name: String,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            handle,
            registry,
            dispatcher,
            correlator,
            events,
            settings,
            provider_name,
            cancel,
        }
    }

    /// Run the session loop: connect, authenticate, pump envelopes,
    /// reconnect on loss with backoff, until cancelled.
    pub async fn run(self) {
        let mut policy = ReconnectPolicy::new(
            self.settings.reconnect_delay_initial,
            self.settings.reconnect_delay_max,
            self.settings.reconnect_delay_multiplier,
            self.settings.reconnect_jitter,
        );

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let result = self.connect_and_run(&mut policy).await;

            // Logout fires on every loss of an authenticated session,
            // caller-initiated ones included.
            let was_logged_on = matches!(
                self.handle.state(),
                SessionState::LoggedOn | SessionState::Disconnecting
            );
            self.handle.clear_outbound();
            self.registry.demote_active();
            if was_logged_on {
                metrics::record_session_lost();
                self.events.notify_logout(&self.provider_name);
            }
            self.handle.set_state(SessionState::Disconnected);

            match result {
                Ok(()) => {
                    tracing::info!("session closed");
                    break;
                }
                Err(error) => {
                    tracing::warn!(%error, "feed session ended");

                    if self.cancel.is_cancelled() {
                        break;
                    }

                    let delay = policy.next_delay();
                    metrics::record_reconnect_attempt();
                    tracing::info!(
                        attempt = policy.attempt(),
                        delay_ms = delay.as_millis(),
                        "scheduling reconnect"
                    );

                    tokio::select! {
                        () = self.cancel.cancelled() => break,
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Establish one session and process envelopes until it ends.
    ///
    /// `Ok(())` means a caller-initiated shutdown; any fault comes back as
    /// an error so the run loop can schedule a reconnect.
    async fn connect_and_run(&self, policy: &mut ReconnectPolicy) -> Result<(), SessionError> {
        self.handle.set_state(SessionState::Connecting);

        let FeedConnection {
            outbound,
            mut inbound,
        } = self.transport.connect().await?;

        self.handle.install_outbound(outbound);
        self.handle.set_state(SessionState::Authenticating);

        let session_id = tokio::select! {
            () = self.cancel.cancelled() => return Ok(()),
            logon = self.await_logon(&mut inbound) => logon?,
        };

        self.handle.touch();
        self.handle.set_state(SessionState::LoggedOn);
        policy.reset();
        metrics::record_logon();
        tracing::info!(session_id = %session_id, "feed session logged on");
        self.events.notify_logon(&self.provider_name);

        self.replay_subscriptions()?;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    self.handle.set_state(SessionState::Disconnecting);
                    return Ok(());
                }
                envelope = inbound.recv() => match envelope {
                    Some(FeedEnvelope::Tick(tick)) => {
                        self.handle.touch();
                        self.dispatcher.dispatch(&tick);
                    }
                    Some(FeedEnvelope::HistoricBars(payload)) => {
                        self.handle.touch();
                        self.correlator.on_response(payload);
                    }
                    Some(FeedEnvelope::Rejected { code, message }) => {
                        self.handle.touch();
                        self.events
                            .notify_failure(&MarketDataFailure::FeedRejection { code, message });
                    }
                    Some(FeedEnvelope::LogonAck { session_id }) => {
                        self.handle.touch();
                        tracing::debug!(%session_id, "duplicate logon ack ignored");
                    }
                    Some(FeedEnvelope::Disconnected { reason }) => {
                        return Err(SessionError::ConnectionLost(reason));
                    }
                    None => {
                        return Err(SessionError::ConnectionLost("feed stream ended".to_string()));
                    }
                }
            }
        }
    }

    /// Wait (bounded) for the logon acknowledgment on a fresh connection.
    async fn await_logon(
        &self,
        inbound: &mut mpsc::Receiver<FeedEnvelope>,
    ) -> Result<String, SessionError> {
        let wait = tokio::time::timeout(self.settings.logon_timeout, async {
            while let Some(envelope) = inbound.recv().await {
                match envelope {
                    FeedEnvelope::LogonAck { session_id } => return Ok(session_id),
                    FeedEnvelope::Rejected { code, message } => {
                        return Err(SessionError::Transport(TransportError::Authentication(
                            format!("({code}) {message}"),
                        )));
                    }
                    FeedEnvelope::Disconnected { reason } => {
                        return Err(SessionError::ConnectionLost(reason));
                    }
                    other => {
                        tracing::trace!(?other, "envelope before logon ignored");
                    }
                }
            }
            Err(SessionError::ConnectionLost(
                "feed stream ended before logon".to_string(),
            ))
        })
        .await;

        match wait {
            Ok(result) => result,
            Err(_) => Err(SessionError::LogonTimeout),
        }
    }

    /// Re-announce every pending/active subscription on a fresh logon.
    fn replay_subscriptions(&self) -> Result<(), SessionError> {
        let symbols = self.registry.begin_replay();
        if symbols.is_empty() {
            return Ok(());
        }

        tracing::info!(count = symbols.len(), "replaying tick subscriptions");

        if self.handle.send(OutboundRequest::Subscribe {
            symbols: symbols.clone(),
        }) {
            Ok(())
        } else {
            for symbol in &symbols {
                self.registry.revert_to_pending(symbol);
            }
            Err(SessionError::ConnectionLost(
                "connection lost during subscription replay".to_string(),
            ))
        }
    }
}
