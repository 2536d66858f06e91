//! Subscription Registry
//!
//! Tracks the set of symbols subscribed for tick streaming, decoupled from
//! the wire-level session: entries survive disconnects and are replayed on
//! the next logon, while the registry decides when a wire message is
//! actually needed so no duplicate subscribe is ever sent for an
//! already-active symbol.
//!
//! # Design
//!
//! The registry never talks to the transport. Every mutating call returns a
//! decision telling the caller what (if anything) to put on the wire; the
//! decision and the state transition happen atomically under one lock, so
//! two racing `subscribe` calls for the same symbol yield exactly one
//! `SendSubscribe`.

use std::collections::HashMap;

use parking_lot::RwLock;

/// Desired state of one symbol's subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Wanted, but not yet announced on the current session.
    Pending,
    /// Announced on the current session.
    Active,
    /// Unsubscribed; awaiting wire cancel and removal.
    Cancelled,
}

/// What the caller must do after a `subscribe` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeDecision {
    /// Symbol already active; nothing to send.
    AlreadyActive,
    /// No live session; the symbol is queued for the next logon.
    Queued,
    /// Caller must send a wire subscribe now (the entry is already marked
    /// active; revert with [`SubscriptionRegistry::revert_to_pending`] if
    /// the send fails).
    SendSubscribe,
}

/// What the caller must do after an `unsubscribe` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsubscribeDecision {
    /// Symbol unknown; nothing to do.
    NotFound,
    /// Symbol was only queued; it has been dropped without wire traffic.
    Dropped,
    /// Caller must send a wire unsubscribe, then call
    /// [`SubscriptionRegistry::discard`].
    SendUnsubscribe,
}

/// Thread-safe registry of tick subscriptions.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: RwLock<HashMap<String, SubscriptionState>>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in a symbol.
    ///
    /// `session_ready` tells the registry whether a logged-on session is
    /// available: with one, the entry is claimed active and the caller is
    /// told to send the wire subscribe; without one, the entry is queued.
    pub fn subscribe(&self, symbol: &str, session_ready: bool) -> SubscribeDecision {
        let mut entries = self.entries.write();
        match entries.get(symbol) {
            Some(SubscriptionState::Active) => SubscribeDecision::AlreadyActive,
            Some(SubscriptionState::Pending | SubscriptionState::Cancelled) | None => {
                if session_ready {
                    entries.insert(symbol.to_string(), SubscriptionState::Active);
                    SubscribeDecision::SendSubscribe
                } else {
                    entries.insert(symbol.to_string(), SubscriptionState::Pending);
                    SubscribeDecision::Queued
                }
            }
        }
    }

    /// Undo a claim made by [`subscribe`](Self::subscribe) after a failed
    /// wire send; the symbol is replayed on the next logon instead.
    pub fn revert_to_pending(&self, symbol: &str) {
        let mut entries = self.entries.write();
        if let Some(state) = entries.get_mut(symbol) {
            *state = SubscriptionState::Pending;
        }
    }

    /// Withdraw interest in a symbol.
    pub fn unsubscribe(&self, symbol: &str) -> UnsubscribeDecision {
        let mut entries = self.entries.write();
        match entries.get(symbol) {
            None | Some(SubscriptionState::Cancelled) => UnsubscribeDecision::NotFound,
            Some(SubscriptionState::Pending) => {
                entries.remove(symbol);
                UnsubscribeDecision::Dropped
            }
            Some(SubscriptionState::Active) => {
                entries.insert(symbol.to_string(), SubscriptionState::Cancelled);
                UnsubscribeDecision::SendUnsubscribe
            }
        }
    }

    /// Remove a cancelled entry once its wire unsubscribe has been handled.
    pub fn discard(&self, symbol: &str) {
        let mut entries = self.entries.write();
        if entries.get(symbol) == Some(&SubscriptionState::Cancelled) {
            entries.remove(symbol);
        }
    }

    /// Claim every pending and active symbol for replay on a fresh logon.
    ///
    /// All claimed entries are marked active; the caller sends one wire
    /// subscribe covering the returned symbols. Returns them sorted so
    /// replay traffic is deterministic.
    pub fn begin_replay(&self) -> Vec<String> {
        let mut entries = self.entries.write();
        let mut symbols: Vec<String> = entries
            .iter()
            .filter(|(_, state)| {
                matches!(
                    state,
                    SubscriptionState::Pending | SubscriptionState::Active
                )
            })
            .map(|(symbol, _)| symbol.clone())
            .collect();
        symbols.sort_unstable();

        for symbol in &symbols {
            entries.insert(symbol.clone(), SubscriptionState::Active);
        }

        symbols
    }

    /// Demote every active entry to pending after a lost session.
    ///
    /// Cancelled entries are removed outright: the session that knew about
    /// them is gone, so there is no wire unsubscribe left to send.
    pub fn demote_active(&self) {
        let mut entries = self.entries.write();
        entries.retain(|_, state| *state != SubscriptionState::Cancelled);
        for state in entries.values_mut() {
            *state = SubscriptionState::Pending;
        }
    }

    /// Whether a symbol currently has an active subscription.
    #[must_use]
    pub fn is_active(&self, symbol: &str) -> bool {
        self.entries.read().get(symbol) == Some(&SubscriptionState::Active)
    }

    /// Current state of a symbol, if registered.
    #[must_use]
    pub fn state_of(&self, symbol: &str) -> Option<SubscriptionState> {
        self.entries.read().get(symbol).copied()
    }

    /// All currently active symbols, sorted.
    #[must_use]
    pub fn active_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .entries
            .read()
            .iter()
            .filter(|(_, state)| **state == SubscriptionState::Active)
            .map(|(symbol, _)| symbol.clone())
            .collect();
        symbols.sort_unstable();
        symbols
    }

    /// Number of registered symbols (any state).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry (provider stop).
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
