//! Stream Codec
//!
//! JSON codec for the Tradier stream. The feed delivers either a single
//! JSON object per frame or several newline-delimited objects; both shapes
//! decode to the same typed messages.

use crate::infrastructure::tradier::messages::{
    ErrorMessage, HistoryMessage, QuoteMessage, SessionMessage, SubscriptionMessage,
    TradierMessage,
};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unknown message type discriminator.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// Message without a type discriminator.
    #[error("invalid message format: {0}")]
    InvalidFormat(String),
}

/// JSON codec for the market data stream.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one text frame into typed messages.
    ///
    /// Frames carry either a single JSON object or several objects
    /// separated by newlines.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON parsing fails or a message carries an
    /// unknown `type`.
    pub fn decode(&self, text: &str) -> Result<Vec<TradierMessage>, CodecError> {
        let mut messages = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            messages.push(Self::decode_object(line)?);
        }

        Ok(messages)
    }

    /// Encode a request to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode<T: serde::Serialize>(&self, value: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }

    fn decode_object(text: &str) -> Result<TradierMessage, CodecError> {
        let value: serde_json::Value = serde_json::from_str(text)?;

        let msg_type = value.get("type").and_then(|v| v.as_str());

        match msg_type {
            Some("session") => {
                let m: SessionMessage = serde_json::from_value(value)?;
                Ok(TradierMessage::Session(m))
            }
            Some("quote") => {
                let m: QuoteMessage = serde_json::from_value(value)?;
                Ok(TradierMessage::Quote(m))
            }
            Some("history") => {
                let m: HistoryMessage = serde_json::from_value(value)?;
                Ok(TradierMessage::History(m))
            }
            Some("subscription") => {
                let m: SubscriptionMessage = serde_json::from_value(value)?;
                Ok(TradierMessage::Subscription(m))
            }
            Some("error") => {
                let m: ErrorMessage = serde_json::from_value(value)?;
                Ok(TradierMessage::Error(m))
            }
            Some(other) => Err(CodecError::UnknownMessageType(other.to_string())),
            None => Err(CodecError::InvalidFormat(format!(
                "message without a type field: {}...",
                &text[..text.len().min(50)]
            ))),
        }
    }
}
