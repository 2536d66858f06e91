//! Tradier feed adapters: wire messages, codec, authentication handshake
//! and the WebSocket transport.

/// Authentication handshake state machine.
pub mod auth;

/// JSON stream codec.
pub mod codec;

/// Wire message types.
pub mod messages;

/// WebSocket feed transport.
pub mod transport;

pub use auth::{AUTH_TIMEOUT, AuthError, AuthHandler, AuthState};
pub use codec::{CodecError, JsonCodec};
pub use transport::WebSocketTransport;
