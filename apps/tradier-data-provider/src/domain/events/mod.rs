//! Notification Channels
//!
//! Multicast observer lists backing the provider's notification channels
//! (logon, logout, tick, historical bars, failures). Each channel keeps an
//! ordered list of callbacks; notification invokes them synchronously in
//! registration order on whatever task raised the event.
//!
//! Listeners may be attached or detached at any time, including while the
//! session is live; add/remove is thread-safe and never blocks a concurrent
//! notification (callbacks are cloned out of the lock before invocation).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use super::market_data::{HistoricBarData, MarketDataFailure, Tick};

/// Handle identifying one attached listener, used to detach it.
pub type ListenerId = u64;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// An ordered, thread-safe multicast list of listeners for one event type.
pub struct ListenerSet<T> {
    listeners: RwLock<Vec<(ListenerId, Callback<T>)>>,
    next_id: AtomicU64,
}

impl<T> Default for ListenerSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ListenerSet<T> {
    /// Create an empty listener set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Attach a listener; it is invoked after all previously attached ones.
    pub fn attach(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Detach a previously attached listener.
    ///
    /// Returns `false` if the id is unknown (already detached).
    pub fn detach(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Invoke every listener with `value`, in registration order.
    pub fn notify(&self, value: &T) {
        // Snapshot so a listener can attach/detach without deadlocking.
        let snapshot: Vec<Callback<T>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in snapshot {
            callback(value);
        }
    }

    /// Number of attached listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Whether no listeners are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}

impl<T> std::fmt::Debug for ListenerSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.len())
            .finish()
    }
}

/// The provider's notification channels, one listener set per event kind.
#[derive(Debug, Default)]
pub struct ProviderEvents {
    /// Fires once per successful logon, with the provider name.
    pub logon: ListenerSet<String>,
    /// Fires on every loss of session, with the provider name.
    pub logout: ListenerSet<String>,
    /// Fires for every tick matching an active subscription.
    pub tick: ListenerSet<Tick>,
    /// Fires when a historical bar response is correlated to its request.
    pub historic_bars: ListenerSet<HistoricBarData>,
    /// Fires for non-fatal failures (historical timeouts, feed rejections).
    pub failures: ListenerSet<MarketDataFailure>,
}

impl ProviderEvents {
    /// Create an event hub with no listeners attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify logon listeners.
    pub fn notify_logon(&self, provider_name: &str) {
        tracing::info!(provider = provider_name, "logon arrived");
        self.logon.notify(&provider_name.to_string());
    }

    /// Notify logout listeners.
    pub fn notify_logout(&self, provider_name: &str) {
        tracing::info!(provider = provider_name, "logout arrived");
        self.logout.notify(&provider_name.to_string());
    }

    /// Notify tick listeners.
    pub fn notify_tick(&self, tick: &Tick) {
        self.tick.notify(tick);
    }

    /// Notify historical bar listeners.
    pub fn notify_historic_bars(&self, data: &HistoricBarData) {
        tracing::debug!(
            request_id = %data.request_id,
            symbol = %data.security,
            bars = data.bars.len(),
            "historical bar data arrived"
        );
        self.historic_bars.notify(data);
    }

    /// Notify failure listeners.
    pub fn notify_failure(&self, failure: &MarketDataFailure) {
        tracing::warn!(%failure, "market data failure");
        self.failures.notify(failure);
    }
}
