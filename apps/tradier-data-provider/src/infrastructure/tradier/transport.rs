//! WebSocket Feed Transport
//!
//! [`FeedTransport`] implementation over the Tradier WebSocket stream.
//! `connect` establishes the socket, completes the authentication handshake
//! in-line (bounded by [`AUTH_TIMEOUT`]) and then bridges the socket to the
//! typed envelope/request channels on two background tasks.

use futures_util::{SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::application::ports::{
    FeedConnection, FeedEnvelope, FeedTransport, HistoricBarsPayload, OutboundRequest,
    TransportError,
};
use crate::domain::market_data::{Bar, Security};
use crate::infrastructure::config::{Credentials, ProviderConfig};
use crate::infrastructure::tradier::auth::{AUTH_TIMEOUT, AuthHandler, AuthState};
use crate::infrastructure::tradier::codec::{CodecError, JsonCodec};
use crate::infrastructure::tradier::messages::{
    HistoryRequest, SessionStatus, SubscriptionRequest, TradierMessage,
};

/// Capacity of the inbound envelope channel.
const ENVELOPE_CAPACITY: usize = 1024;

/// Capacity of the outbound request channel.
const REQUEST_CAPACITY: usize = 256;

/// Interval between keepalive pings.
const PING_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);

/// WebSocket client for the Tradier market data stream.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: String,
    credentials: Credentials,
}

impl WebSocketTransport {
    /// Create a transport for the given endpoint and credentials.
    #[must_use]
    pub const fn new(url: String, credentials: Credentials) -> Self {
        Self { url, credentials }
    }

    /// Create a transport from the provider configuration.
    #[must_use]
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(config.stream_url.clone(), config.credentials.clone())
    }

    /// Complete the handshake: wait for the connection ack, answer with the
    /// access token, wait for the authenticated ack.
    async fn handshake<W, R>(
        codec: &JsonCodec,
        auth: &mut AuthHandler,
        write: &mut W,
        read: &mut R,
    ) -> Result<String, TransportError>
    where
        W: SinkExt<Message> + Unpin,
        W::Error: std::fmt::Display,
        R: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            let frame = read
                .next()
                .await
                .ok_or_else(|| {
                    TransportError::Connection("socket closed during handshake".to_string())
                })?
                .map_err(|e| TransportError::Connection(e.to_string()))?;

            let Message::Text(text) = frame else {
                continue;
            };

            let messages = codec
                .decode(&text)
                .map_err(|e| TransportError::Connection(format!("handshake decode: {e}")))?;

            for message in messages {
                match message {
                    TradierMessage::Session(session) => {
                        if let Some(session_id) = auth.on_session(&session) {
                            return Ok(session_id);
                        }
                        if auth.state() == AuthState::Connected {
                            let request = auth.auth_request();
                            let json = codec.encode(&request).map_err(|e| {
                                TransportError::Connection(format!(
                                    "failed to serialize auth: {e}"
                                ))
                            })?;
                            write.send(Message::Text(json.into())).await.map_err(|e| {
                                TransportError::Connection(format!("failed to send auth: {e}"))
                            })?;
                        }
                    }
                    TradierMessage::Error(error) => {
                        return Err(TransportError::Authentication(
                            auth.on_error(&error).to_string(),
                        ));
                    }
                    other => {
                        tracing::trace!(?other, "message before logon ignored");
                    }
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl FeedTransport for WebSocketTransport {
    async fn connect(&self) -> Result<FeedConnection, TransportError> {
        tracing::info!(url = %self.url, "connecting to feed");

        let (ws_stream, _response) = tokio_tungstenite::connect_async(&self.url)
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let (mut write, mut read) = ws_stream.split();
        let codec = JsonCodec::new();
        let mut auth = AuthHandler::new(self.credentials.clone());

        let session_id = tokio::time::timeout(
            AUTH_TIMEOUT,
            Self::handshake(&codec, &mut auth, &mut write, &mut read),
        )
        .await
        .map_err(|_| TransportError::Authentication("handshake deadline exceeded".to_string()))??;

        let (envelope_tx, envelope_rx) = mpsc::channel(ENVELOPE_CAPACITY);
        let (request_tx, request_rx) = mpsc::channel(REQUEST_CAPACITY);
        let (frame_tx, frame_rx) = mpsc::channel(16);

        // The session manager observes the logon ack as the first envelope.
        let _ = envelope_tx.try_send(FeedEnvelope::LogonAck { session_id });

        tokio::spawn(write_loop(write, request_rx, frame_rx, codec.clone()));
        tokio::spawn(read_loop(read, envelope_tx, frame_tx, codec));

        Ok(FeedConnection {
            outbound: request_tx,
            inbound: envelope_rx,
        })
    }
}

/// Forward typed requests (and raw control frames from the reader) to the
/// socket, with periodic keepalive pings.
async fn write_loop<W>(
    mut write: W,
    mut requests: mpsc::Receiver<OutboundRequest>,
    mut frames: mpsc::Receiver<Message>,
    codec: JsonCodec,
) where
    W: SinkExt<Message> + Unpin,
    W::Error: std::fmt::Display,
{
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            request = requests.recv() => {
                let Some(request) = request else { break };
                match encode_request(&codec, request) {
                    Ok(json) => {
                        if let Err(error) = write.send(Message::Text(json.into())).await {
                            tracing::warn!(%error, "socket write failed");
                            break;
                        }
                    }
                    Err(error) => {
                        tracing::error!(%error, "failed to encode outbound request");
                    }
                }
            }
            frame = frames.recv() => {
                let Some(frame) = frame else { break };
                if let Err(error) = write.send(frame).await {
                    tracing::warn!(%error, "socket write failed");
                    break;
                }
            }
            _ = ping_interval.tick() => {
                if let Err(error) = write.send(Message::Ping(vec![].into())).await {
                    tracing::warn!(%error, "keepalive ping failed");
                    break;
                }
            }
        }
    }

    let _ = write.send(Message::Close(None)).await;
    tracing::debug!("feed writer stopped");
}

/// Decode socket frames into envelopes until the socket or the session ends.
async fn read_loop<R>(
    mut read: R,
    envelopes: mpsc::Sender<FeedEnvelope>,
    frames: mpsc::Sender<Message>,
    codec: JsonCodec,
) where
    R: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => match codec.decode(&text) {
                Ok(messages) => {
                    for message in messages {
                        if let Some(envelope) = envelope_for(message)
                            && envelopes.send(envelope).await.is_err()
                        {
                            // Session side hung up.
                            return;
                        }
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, "undecodable frame skipped");
                }
            },
            Some(Ok(Message::Ping(data))) => {
                let _ = frames.send(Message::Pong(data)).await;
            }
            Some(Ok(Message::Close(_))) => {
                let _ = envelopes
                    .send(FeedEnvelope::Disconnected {
                        reason: "server sent close frame".to_string(),
                    })
                    .await;
                break;
            }
            Some(Ok(_)) => {
                // Pong and binary frames carry nothing for us.
            }
            Some(Err(error)) => {
                let _ = envelopes
                    .send(FeedEnvelope::Disconnected {
                        reason: error.to_string(),
                    })
                    .await;
                break;
            }
            None => {
                let _ = envelopes
                    .send(FeedEnvelope::Disconnected {
                        reason: "socket stream ended".to_string(),
                    })
                    .await;
                break;
            }
        }
    }

    tracing::debug!("feed reader stopped");
}

/// Encode a typed request to its wire form.
fn encode_request(codec: &JsonCodec, request: OutboundRequest) -> Result<String, CodecError> {
    match request {
        OutboundRequest::Subscribe { symbols } => {
            codec.encode(&SubscriptionRequest::subscribe(symbols))
        }
        OutboundRequest::Unsubscribe { symbols } => {
            codec.encode(&SubscriptionRequest::unsubscribe(symbols))
        }
        OutboundRequest::HistoricBars {
            request_id,
            security,
            bar_type,
            start_time,
            end_time,
        } => codec.encode(&HistoryRequest {
            action: "history",
            id: request_id,
            symbol: security.symbol,
            interval: bar_type.as_str(),
            start: start_time,
            end: end_time,
        }),
    }
}

/// Map a decoded message to its envelope, if it carries one.
fn envelope_for(message: TradierMessage) -> Option<FeedEnvelope> {
    match message {
        TradierMessage::Quote(quote) => Some(FeedEnvelope::Tick(quote.into())),
        TradierMessage::History(history) => Some(FeedEnvelope::HistoricBars(HistoricBarsPayload {
            request_id: history.id,
            security: Security::new(history.symbol),
            bars: history.bars.into_iter().map(Bar::from).collect(),
        })),
        TradierMessage::Error(error) => Some(FeedEnvelope::Rejected {
            code: error.code,
            message: error.msg,
        }),
        TradierMessage::Session(session) => match session.status {
            SessionStatus::Authenticated => Some(FeedEnvelope::LogonAck {
                session_id: session.session.unwrap_or_default(),
            }),
            SessionStatus::Connected => None,
        },
        TradierMessage::Subscription(subscription) => {
            tracing::debug!(symbols = ?subscription.symbols, "subscription confirmed");
            None
        }
    }
}
