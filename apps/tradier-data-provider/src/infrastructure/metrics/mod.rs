//! Metrics
//!
//! Counter names and record helpers on the `metrics` facade. The host
//! process decides whether a recorder is installed; without one these are
//! no-ops.

/// Successful logons.
pub const LOGONS_TOTAL: &str = "tradier_logons_total";

/// Sessions lost (including caller-initiated stops).
pub const SESSIONS_LOST_TOTAL: &str = "tradier_sessions_lost_total";

/// Reconnect attempts scheduled.
pub const RECONNECT_ATTEMPTS_TOTAL: &str = "tradier_reconnect_attempts_total";

/// Ticks delivered to listeners.
pub const TICKS_DISPATCHED_TOTAL: &str = "tradier_ticks_dispatched_total";

/// Ticks dropped for lack of an active subscription.
pub const TICKS_DROPPED_TOTAL: &str = "tradier_ticks_dropped_total";

/// Historical requests sent.
pub const HISTORY_REQUESTS_TOTAL: &str = "tradier_history_requests_total";

/// Historical requests completed by a matching response.
pub const HISTORY_COMPLETED_TOTAL: &str = "tradier_history_completed_total";

/// Historical requests that timed out.
pub const HISTORY_TIMEOUTS_TOTAL: &str = "tradier_history_timeouts_total";

/// Historical responses dropped as stale/duplicate/unknown.
pub const HISTORY_STALE_RESPONSES_TOTAL: &str = "tradier_history_stale_responses_total";

/// Record a successful logon.
pub fn record_logon() {
    metrics::counter!(LOGONS_TOTAL).increment(1);
}

/// Record a lost session.
pub fn record_session_lost() {
    metrics::counter!(SESSIONS_LOST_TOTAL).increment(1);
}

/// Record a scheduled reconnect attempt.
pub fn record_reconnect_attempt() {
    metrics::counter!(RECONNECT_ATTEMPTS_TOTAL).increment(1);
}

/// Record a tick delivered to listeners.
pub fn record_tick_dispatched() {
    metrics::counter!(TICKS_DISPATCHED_TOTAL).increment(1);
}

/// Record a tick dropped without an active subscription.
pub fn record_tick_dropped() {
    metrics::counter!(TICKS_DROPPED_TOTAL).increment(1);
}

/// Record a historical request hand-off.
pub fn record_history_request() {
    metrics::counter!(HISTORY_REQUESTS_TOTAL).increment(1);
}

/// Record a correlated historical completion.
pub fn record_history_completed() {
    metrics::counter!(HISTORY_COMPLETED_TOTAL).increment(1);
}

/// Record a historical request timeout.
pub fn record_history_timeout() {
    metrics::counter!(HISTORY_TIMEOUTS_TOTAL).increment(1);
}

/// Record a dropped stale/duplicate historical response.
pub fn record_history_stale_response() {
    metrics::counter!(HISTORY_STALE_RESPONSES_TOTAL).increment(1);
}
