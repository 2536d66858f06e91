//! Historical Request Correlator
//!
//! Issues historical bar requests tagged with client-generated correlation
//! identifiers and matches asynchronous responses back to them,
//! independently of in-flight tick traffic. Every pending request carries a
//! cancellable timeout; the timer is cancelled the instant its response
//! arrives so a late expiry can never fire after success.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::ports::{HistoricBarsPayload, OutboundRequest};
use crate::application::services::session::SessionHandle;
use crate::domain::events::ProviderEvents;
use crate::domain::market_data::{
    BarType, HistoricBarData, HistoricDataRequest, MarketDataFailure, RequestId, Security,
};
use crate::infrastructure::metrics;

/// Errors returned synchronously by [`HistoricalCorrelator::request`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum HistoryError {
    /// The requested range has `start_time` after `end_time`.
    #[error("invalid time range: start {start} is after end {end}")]
    InvalidRange {
        /// Requested start of the range.
        start: DateTime<Utc>,
        /// Requested end of the range.
        end: DateTime<Utc>,
    },

    /// Historical requests need a logged-on session; they are not queued.
    #[error("no logged-on session")]
    NotLoggedOn,

    /// The connection went away before the request could be handed off.
    #[error("connection lost before the request was sent")]
    ConnectionLost,
}

struct PendingRequest {
    security: Security,
    bar_type: BarType,
    cancel: CancellationToken,
}

/// State shared with the per-request timeout tasks.
struct CorrelatorShared {
    pending: Mutex<HashMap<RequestId, PendingRequest>>,
    events: Arc<ProviderEvents>,
}

impl CorrelatorShared {
    /// Time out one request: report it as a terminal per-request failure.
    fn expire(&self, request_id: RequestId) {
        let entry = self.pending.lock().remove(&request_id);

        let Some(entry) = entry else {
            // Completed in the window between timer expiry and this call.
            return;
        };

        metrics::record_history_timeout();
        self.events
            .notify_failure(&MarketDataFailure::HistoricalDataTimeout {
                request_id,
                security: entry.security,
            });
    }
}

/// Correlates historical bar requests with their asynchronous responses.
pub struct HistoricalCorrelator {
    shared: Arc<CorrelatorShared>,
    response_timeout: Duration,
}

impl HistoricalCorrelator {
    /// Create a correlator publishing to the given event hub.
    #[must_use]
    pub fn new(events: Arc<ProviderEvents>, response_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(CorrelatorShared {
                pending: Mutex::new(HashMap::new()),
                events,
            }),
            response_timeout,
        }
    }

    /// Issue a historical bar request.
    ///
    /// Validates the range, stores a pending entry under a fresh correlation
    /// identifier, hands the wire request to the session and arms the
    /// response timer. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`HistoryError::InvalidRange`] for an inverted time range (checked
    /// before any wire traffic), [`HistoryError::NotLoggedOn`] without an
    /// authenticated session, [`HistoryError::ConnectionLost`] when the
    /// hand-off to the transport fails.
    pub fn request(
        &self,
        handle: &SessionHandle,
        request: &HistoricDataRequest,
    ) -> Result<RequestId, HistoryError> {
        if request.start_time > request.end_time {
            return Err(HistoryError::InvalidRange {
                start: request.start_time,
                end: request.end_time,
            });
        }

        if !handle.is_logged_on() {
            return Err(HistoryError::NotLoggedOn);
        }

        let cancel = CancellationToken::new();
        let request_id = {
            let mut pending = self.shared.pending.lock();
            // v4 collisions are vanishingly rare; the loop keeps the
            // no-reuse-while-pending invariant unconditional anyway.
            let request_id = loop {
                let candidate = Uuid::new_v4();
                if !pending.contains_key(&candidate) {
                    break candidate;
                }
            };
            pending.insert(
                request_id,
                PendingRequest {
                    security: request.security.clone(),
                    bar_type: request.bar_type,
                    cancel: cancel.clone(),
                },
            );
            request_id
        };

        let sent = handle.send(OutboundRequest::HistoricBars {
            request_id,
            security: request.security.clone(),
            bar_type: request.bar_type,
            start_time: request.start_time,
            end_time: request.end_time,
        });

        if !sent {
            self.shared.pending.lock().remove(&request_id);
            return Err(HistoryError::ConnectionLost);
        }

        metrics::record_history_request();
        tracing::debug!(
            %request_id,
            symbol = %request.security,
            bar_type = %request.bar_type,
            "historical bar request sent"
        );

        let shared = Arc::clone(&self.shared);
        let timeout = self.response_timeout;
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(timeout) => shared.expire(request_id),
            }
        });

        Ok(request_id)
    }

    /// Match an inbound historical response to its pending request.
    ///
    /// Stale, duplicate and unknown correlation identifiers are dropped.
    pub fn on_response(&self, payload: HistoricBarsPayload) {
        let entry = self.shared.pending.lock().remove(&payload.request_id);

        let Some(entry) = entry else {
            metrics::record_history_stale_response();
            tracing::debug!(
                request_id = %payload.request_id,
                "historical response without pending request dropped"
            );
            return;
        };

        entry.cancel.cancel();
        metrics::record_history_completed();

        self.shared.events.notify_historic_bars(&HistoricBarData {
            request_id: payload.request_id,
            security: entry.security,
            bar_type: entry.bar_type,
            bars: payload.bars,
        });
    }

    /// Number of requests still awaiting a response.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.pending.lock().len()
    }

    /// Drop every pending request without reporting timeouts (provider stop).
    pub fn abort_all(&self) {
        let mut pending = self.shared.pending.lock();
        for (_, entry) in pending.drain() {
            entry.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for HistoricalCorrelator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoricalCorrelator")
            .field("pending", &self.pending_count())
            .field("response_timeout", &self.response_timeout)
            .finish()
    }
}
