//! Domain events emitted by the vault.
//!
//! Exactly one event per successful `stake` or `withdraw`, carrying the
//! literal amount processed. Failed operations emit nothing. Events are
//! sequenced in emission order and buffered until the hosting layer drains
//! them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stakevault_protocol::types::{Address, Amount};

/// A state change observers care about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VaultEvent {
    /// `user` staked `amount`.
    Staked { user: Address, amount: Amount },
    /// `user` withdrew `amount`.
    Withdrawn { user: Address, amount: Amount },
}

impl VaultEvent {
    /// The depositor the event concerns.
    pub fn user(&self) -> Address {
        match self {
            VaultEvent::Staked { user, .. } | VaultEvent::Withdrawn { user, .. } => *user,
        }
    }

    /// The amount carried by the event.
    pub fn amount(&self) -> Amount {
        match self {
            VaultEvent::Staked { amount, .. } | VaultEvent::Withdrawn { amount, .. } => *amount,
        }
    }

    /// Short event name, as used in logs and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            VaultEvent::Staked { .. } => "staked",
            VaultEvent::Withdrawn { .. } => "withdrawn",
        }
    }
}

/// An event with its position in the vault's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic, starting at 1.
    pub sequence: u64,
    pub emitted_at: DateTime<Utc>,
    pub event: VaultEvent,
}

/// Pending events awaiting delivery.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    next_sequence: u64,
    pending: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `event` and returns its record.
    ///
    /// The record stays pending until [`drain`](Self::drain) takes it.
    pub fn emit(&mut self, event: VaultEvent) -> EventRecord {
        self.next_sequence += 1;
        let record = EventRecord {
            sequence: self.next_sequence,
            emitted_at: Utc::now(),
            event,
        };
        self.pending.push(record.clone());
        record
    }

    /// Events emitted since the last drain, oldest first.
    pub fn pending(&self) -> &[EventRecord] {
        &self.pending
    }

    /// Takes all pending events, oldest first.
    pub fn drain(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.pending)
    }

    /// Number of events ever emitted.
    pub fn emitted_count(&self) -> u64 {
        self.next_sequence
    }
}
