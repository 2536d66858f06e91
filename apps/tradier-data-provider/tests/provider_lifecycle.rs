//! Provider Lifecycle Integration Tests
//!
//! Drives the facade over a scripted in-memory transport: logon
//! notification, tick subscription flow, duplicate suppression,
//! reconnect-with-replay and shutdown.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{
    ScriptedTransport, expect_event, expect_no_event, fast_session_settings, next_link,
    scripted_provider, watch_logons, watch_logouts, watch_ticks,
};
use tradier_data_provider::{
    FeedEnvelope, HistorySettings, MarketDataProvider, OutboundRequest, SessionState, Subscribe,
    TransportError, Unsubscribe,
};

#[tokio::test]
async fn start_reaches_logged_on_and_raises_logon() {
    let (provider, mut links) = scripted_provider(HistorySettings::default());
    let mut logons = watch_logons(&provider);

    provider.start();

    let provider_name = expect_event(&mut logons).await;
    assert!(!provider_name.is_empty(), "provider name must be non-empty");
    assert_eq!(provider_name, "Tradier");
    assert_eq!(provider.session_state(), SessionState::LoggedOn);

    let _link = next_link(&mut links).await;
    provider.stop();
}

#[tokio::test]
async fn subscribed_symbol_ticks_arrive_and_others_are_dropped() {
    let (provider, mut links) = scripted_provider(HistorySettings::default());
    let mut logons = watch_logons(&provider);
    let mut ticks = watch_ticks(&provider);

    provider.start();
    expect_event(&mut logons).await;
    let mut link = next_link(&mut links).await;

    provider.subscribe_tick_data(&Subscribe::new("AAPL"));
    assert_eq!(
        link.expect_request().await,
        OutboundRequest::Subscribe {
            symbols: vec!["AAPL".to_string()],
        }
    );

    // The unsubscribed MSFT tick is sent first; receiving the AAPL tick
    // afterwards proves MSFT was dropped, not still in flight.
    link.send_tick("MSFT").await;
    link.send_tick("AAPL").await;

    let tick = expect_event(&mut ticks).await;
    assert_eq!(tick.security.symbol, "AAPL");
    expect_no_event(&mut ticks).await;

    provider.stop();
}

#[tokio::test]
async fn duplicate_subscribe_sends_exactly_one_wire_message() {
    let (provider, mut links) = scripted_provider(HistorySettings::default());
    let mut logons = watch_logons(&provider);

    provider.start();
    expect_event(&mut logons).await;
    let mut link = next_link(&mut links).await;

    provider.subscribe_tick_data(&Subscribe::new("AAPL"));
    provider.subscribe_tick_data(&Subscribe::new("AAPL"));
    provider.subscribe_tick_data(&Subscribe::new("AAPL"));

    assert_eq!(
        link.expect_request().await,
        OutboundRequest::Subscribe {
            symbols: vec!["AAPL".to_string()],
        }
    );
    link.expect_no_request().await;

    provider.stop();
}

#[tokio::test]
async fn subscriptions_queued_before_start_are_flushed_on_logon() {
    let (provider, mut links) = scripted_provider(HistorySettings::default());
    let mut logons = watch_logons(&provider);

    provider.subscribe_tick_data(&Subscribe::new("AAPL"));
    provider.subscribe_tick_data(&Subscribe::new("MSFT"));

    provider.start();
    expect_event(&mut logons).await;
    let mut link = next_link(&mut links).await;

    assert_eq!(
        link.expect_request().await,
        OutboundRequest::Subscribe {
            symbols: vec!["AAPL".to_string(), "MSFT".to_string()],
        }
    );
    link.expect_no_request().await;

    provider.stop();
}

#[tokio::test]
async fn active_symbols_are_replayed_once_after_reconnect() {
    let (provider, mut links) = scripted_provider(HistorySettings::default());
    let mut logons = watch_logons(&provider);
    let mut logouts = watch_logouts(&provider);
    let mut ticks = watch_ticks(&provider);

    provider.start();
    expect_event(&mut logons).await;
    let mut link = next_link(&mut links).await;

    provider.subscribe_tick_data(&Subscribe::new("AAPL"));
    link.expect_request().await;

    // Force an unexpected session loss.
    drop(link);

    expect_event(&mut logouts).await;
    expect_event(&mut logons).await;

    // The fresh session replays the subscription exactly once.
    let mut link = next_link(&mut links).await;
    assert_eq!(
        link.expect_request().await,
        OutboundRequest::Subscribe {
            symbols: vec!["AAPL".to_string()],
        }
    );
    link.expect_no_request().await;

    // And ticks flow again without a new subscribe call.
    link.send_tick("AAPL").await;
    assert_eq!(expect_event(&mut ticks).await.security.symbol, "AAPL");

    provider.stop();
}

#[tokio::test]
async fn feed_announced_disconnect_triggers_reconnect() {
    let (provider, mut links) = scripted_provider(HistorySettings::default());
    let mut logons = watch_logons(&provider);
    let mut logouts = watch_logouts(&provider);

    provider.start();
    expect_event(&mut logons).await;
    let link = next_link(&mut links).await;

    link.send_disconnect("maintenance").await;

    assert_eq!(expect_event(&mut logouts).await, "Tradier");
    expect_event(&mut logons).await;
    let _link = next_link(&mut links).await;

    provider.stop();
}

#[tokio::test]
async fn unsubscribe_sends_wire_cancel_and_stops_dispatch() {
    let (provider, mut links) = scripted_provider(HistorySettings::default());
    let mut logons = watch_logons(&provider);
    let mut ticks = watch_ticks(&provider);

    provider.start();
    expect_event(&mut logons).await;
    let mut link = next_link(&mut links).await;

    provider.subscribe_tick_data(&Subscribe::new("AAPL"));
    link.expect_request().await;

    provider.unsubscribe_tick_data(&Unsubscribe::new("AAPL"));
    assert_eq!(
        link.expect_request().await,
        OutboundRequest::Unsubscribe {
            symbols: vec!["AAPL".to_string()],
        }
    );

    // A tick racing the unsubscribe is resolved toward dropping.
    link.send_tick("AAPL").await;
    expect_no_event(&mut ticks).await;

    // Unsubscribing again is a no-op with no wire traffic.
    provider.unsubscribe_tick_data(&Unsubscribe::new("AAPL"));
    link.expect_no_request().await;

    provider.stop();
}

#[tokio::test]
async fn stop_raises_logout_and_is_idempotent() {
    let (provider, mut links) = scripted_provider(HistorySettings::default());
    let mut logons = watch_logons(&provider);
    let mut logouts = watch_logouts(&provider);

    provider.start();
    expect_event(&mut logons).await;
    let _link = next_link(&mut links).await;

    provider.stop();
    assert_eq!(expect_event(&mut logouts).await, "Tradier");

    provider.stop();
    expect_no_event(&mut logouts).await;
}

#[tokio::test]
async fn connect_failures_are_retried_until_logon() {
    let (transport, mut links) = ScriptedTransport::new();
    transport.push_failure(TransportError::Connection("unreachable".to_string()));
    transport.push_failure(TransportError::Authentication("bad token".to_string()));

    let provider = MarketDataProvider::new(
        transport,
        fast_session_settings(),
        HistorySettings::default(),
    );
    let mut logons = watch_logons(&provider);

    provider.start();

    // Two failed attempts back off and retry; the third logs on.
    expect_event(&mut logons).await;
    assert_eq!(provider.session_state(), SessionState::LoggedOn);
    let _link = next_link(&mut links).await;

    provider.stop();
}

#[tokio::test]
async fn missing_logon_ack_times_out_and_retries() {
    let (transport, mut links) = ScriptedTransport::without_logon_ack();
    let settings = tradier_data_provider::SessionSettings {
        logon_timeout: std::time::Duration::from_millis(200),
        ..fast_session_settings()
    };
    let provider =
        MarketDataProvider::new(transport, settings, HistorySettings::default());
    let mut logons = watch_logons(&provider);

    provider.start();

    // First connection never acknowledges; the session manager gives up
    // after the logon deadline and reconnects.
    let _silent_link = next_link(&mut links).await;
    expect_no_event(&mut logons).await;
    assert_ne!(provider.session_state(), SessionState::LoggedOn);

    // The test acknowledges the second connection by hand.
    let link = next_link(&mut links).await;
    link.envelopes
        .send(FeedEnvelope::LogonAck {
            session_id: "sess-manual".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(expect_event(&mut logons).await, "Tradier");

    provider.stop();
}
