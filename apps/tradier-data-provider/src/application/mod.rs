//! Application layer - ports and use-case services.

/// Port interfaces for the feed transport.
pub mod ports;

/// Session, dispatch, history and facade services.
pub mod services;
