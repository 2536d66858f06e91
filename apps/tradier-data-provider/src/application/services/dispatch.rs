//! Tick Dispatcher
//!
//! Resolves inbound ticks against the subscription registry and fans
//! matching ones out to tick listeners, synchronously in dispatch order.
//! Ticks for symbols without an active subscription are dropped; a race
//! with an in-flight unsubscribe resolves toward dropping.

use std::sync::Arc;

use crate::domain::events::ProviderEvents;
use crate::domain::market_data::Tick;
use crate::domain::subscription::SubscriptionRegistry;
use crate::infrastructure::metrics;

/// Publishes ticks for actively subscribed symbols.
#[derive(Debug, Clone)]
pub struct TickDispatcher {
    registry: Arc<SubscriptionRegistry>,
    events: Arc<ProviderEvents>,
}

impl TickDispatcher {
    /// Create a dispatcher over the given registry and event hub.
    #[must_use]
    pub const fn new(registry: Arc<SubscriptionRegistry>, events: Arc<ProviderEvents>) -> Self {
        Self { registry, events }
    }

    /// Dispatch one tick: publish if its symbol is actively subscribed,
    /// drop silently otherwise.
    pub fn dispatch(&self, tick: &Tick) {
        let symbol = tick.security.symbol.as_str();

        if self.registry.is_active(symbol) {
            metrics::record_tick_dispatched();
            self.events.notify_tick(tick);
        } else {
            metrics::record_tick_dropped();
            tracing::trace!(symbol, "tick for unsubscribed symbol dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::market_data::Security;

    fn tick(symbol: &str) -> Tick {
        Tick {
            security: Security::new(symbol),
            timestamp: Utc::now(),
            bid_price: Decimal::new(15_000, 2),
            bid_size: 3,
            ask_price: Decimal::new(15_002, 2),
            ask_size: 5,
            last_price: None,
        }
    }

    fn capture(events: &ProviderEvents) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        events.tick.attach(move |tick: &Tick| {
            sink.lock().unwrap().push(tick.security.symbol.clone());
        });
        seen
    }

    #[test]
    fn subscribed_symbol_reaches_listeners() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let events = Arc::new(ProviderEvents::new());
        let seen = capture(&events);

        registry.subscribe("AAPL", true);
        let dispatcher = TickDispatcher::new(registry, events);

        dispatcher.dispatch(&tick("AAPL"));
        assert_eq!(*seen.lock().unwrap(), vec!["AAPL".to_string()]);
    }

    #[test]
    fn unsubscribed_symbol_is_dropped() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let events = Arc::new(ProviderEvents::new());
        let seen = capture(&events);

        registry.subscribe("AAPL", true);
        let dispatcher = TickDispatcher::new(registry, events);

        dispatcher.dispatch(&tick("MSFT"));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn pending_subscription_does_not_receive_ticks() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let events = Arc::new(ProviderEvents::new());
        let seen = capture(&events);

        registry.subscribe("AAPL", false);
        let dispatcher = TickDispatcher::new(registry, events);

        dispatcher.dispatch(&tick("AAPL"));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn per_symbol_order_is_preserved() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let events = Arc::new(ProviderEvents::new());
        let ordered = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&ordered);
        events.tick.attach(move |tick: &Tick| {
            sink.lock().unwrap().push(tick.bid_size);
        });

        registry.subscribe("AAPL", true);
        let dispatcher = TickDispatcher::new(registry, events);

        for size in 1..=5 {
            let mut t = tick("AAPL");
            t.bid_size = size;
            dispatcher.dispatch(&t);
        }

        assert_eq!(*ordered.lock().unwrap(), vec![1, 2, 3, 4, 5]);
    }
}
