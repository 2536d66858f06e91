//! Stream Authentication
//!
//! Handshake state machine for the Tradier stream. The feed sends a
//! `connected` acknowledgment on socket establishment; the client answers
//! with its access token and waits for the `authenticated` acknowledgment.
//! The whole exchange must finish within [`AUTH_TIMEOUT`].

use std::time::Duration;

use thiserror::Error;

use crate::infrastructure::config::Credentials;
use crate::infrastructure::tradier::messages::{
    AuthRequest, ErrorMessage, SessionMessage, SessionStatus,
};

/// Deadline for completing the handshake after the socket opens.
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur during authentication.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Session not authenticated (request sent before the handshake).
    #[error("not authenticated: must authenticate before making requests")]
    NotAuthenticated,

    /// The feed rejected the access token.
    #[error("authentication failed: invalid access token")]
    InvalidToken,

    /// Handshake took longer than the feed allows.
    #[error("authentication timeout")]
    Timeout,

    /// Unexpected error from the feed.
    #[error("server error ({code}): {message}")]
    ServerError {
        /// Error code from the feed.
        code: i32,
        /// Error message from the feed.
        message: String,
    },
}

impl From<&ErrorMessage> for AuthError {
    fn from(err: &ErrorMessage) -> Self {
        match err.code {
            401 => Self::NotAuthenticated,
            402 => Self::InvalidToken,
            404 => Self::Timeout,
            code => Self::ServerError {
                code,
                message: err.msg.clone(),
            },
        }
    }
}

/// Current state of the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    /// Socket not yet acknowledged.
    #[default]
    Disconnected,
    /// Connection acknowledged; token not yet sent.
    Connected,
    /// Token sent, awaiting the authenticated acknowledgment.
    Authenticating,
    /// Handshake complete.
    Authenticated,
    /// Handshake rejected.
    Failed,
}

/// Drives the handshake against inbound session/error messages.
#[derive(Debug)]
pub struct AuthHandler {
    credentials: Credentials,
    state: AuthState,
}

impl AuthHandler {
    /// Create a handler for the given credentials.
    #[must_use]
    pub const fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            state: AuthState::Disconnected,
        }
    }

    /// Current handshake state.
    #[must_use]
    pub const fn state(&self) -> AuthState {
        self.state
    }

    /// Whether the handshake completed.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated)
    }

    /// Build the token message to answer the connection acknowledgment.
    #[must_use]
    pub fn auth_request(&mut self) -> AuthRequest {
        self.state = AuthState::Authenticating;
        AuthRequest::new(self.credentials.access_token().to_string())
    }

    /// Process a session acknowledgment.
    ///
    /// Returns the session identifier once authenticated, `None` while the
    /// handshake is still in progress (the caller should send
    /// [`auth_request`](Self::auth_request) on the `connected` ack).
    pub fn on_session(&mut self, msg: &SessionMessage) -> Option<String> {
        match msg.status {
            SessionStatus::Connected => {
                self.state = AuthState::Connected;
                None
            }
            SessionStatus::Authenticated => {
                self.state = AuthState::Authenticated;
                Some(msg.session.clone().unwrap_or_default())
            }
        }
    }

    /// Process an error message during the handshake.
    pub fn on_error(&mut self, msg: &ErrorMessage) -> AuthError {
        self.state = AuthState::Failed;
        AuthError::from(msg)
    }

    /// Reset after a connection close.
    pub const fn reset(&mut self) {
        self.state = AuthState::Disconnected;
    }
}
