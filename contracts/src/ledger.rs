//! # Balance Ledger
//!
//! Maps each depositor to the principal they have staked and not yet
//! withdrawn. A depositor's record is created on first deposit and never
//! removed: a record at zero means "fully withdrawn", while no record at all
//! means "never staked". The two look identical numerically, so presence in
//! the map is the existence flag.
//!
//! Every mutation returns a [`LedgerUndo`] token capturing the prior state
//! of the touched record. The vault holds on to it while it calls out to the
//! delegate pool and hands it back to [`BalanceLedger::rollback`] if that
//! call fails, so a failed operation leaves no trace in the ledger.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stakevault_protocol::types::{Address, Amount};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while mutating the ledger.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Zero-amount deposits and withdrawals are not recorded.
    #[error("amount must be greater than zero")]
    InvalidAmount,

    /// The owner has never deposited.
    #[error("no ledger record for {0}")]
    UnknownDepositor(Address),

    /// The withdrawal exceeds the owner's recorded balance.
    #[error("insufficient recorded balance for {owner}: available {available}, requested {requested}")]
    InsufficientBalance {
        /// Owner being debited.
        owner: Address,
        /// Recorded balance before the debit.
        available: Amount,
        /// Amount the caller tried to debit.
        requested: Amount,
    },

    /// A balance, counter or the ledger total would overflow.
    #[error("ledger arithmetic overflow")]
    Overflow,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Lifecycle state of a depositor as seen by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Never deposited.
    Uninitialized,
    /// Holds a positive recorded balance.
    Active,
    /// Deposited before, fully withdrawn since.
    Drained,
}

/// Ledger entry for a single depositor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositorRecord {
    /// The depositor.
    pub owner: Address,
    /// Principal currently attributed to the owner.
    pub recorded_balance: Amount,
    /// Lifetime principal deposited.
    pub total_deposited: Amount,
    /// Lifetime principal withdrawn.
    pub total_withdrawn: Amount,
    /// When the record was created.
    pub first_deposit_at: DateTime<Utc>,
    /// Most recent deposit or withdrawal.
    pub last_activity_at: DateTime<Utc>,
}

impl DepositorRecord {
    fn open(owner: Address, now: DateTime<Utc>) -> Self {
        Self {
            owner,
            recorded_balance: 0,
            total_deposited: 0,
            total_withdrawn: 0,
            first_deposit_at: now,
            last_activity_at: now,
        }
    }

    /// `Active` while the balance is positive, `Drained` at zero.
    pub fn status(&self) -> RecordStatus {
        if self.recorded_balance > 0 {
            RecordStatus::Active
        } else {
            RecordStatus::Drained
        }
    }
}

/// Prior state of a record touched by a ledger mutation.
///
/// Pass it to [`BalanceLedger::rollback`] to undo that mutation. Undo tokens
/// must be applied in reverse order of creation and only before any other
/// mutation of the same ledger.
#[derive(Debug)]
#[must_use = "dropping an undo token makes the mutation irreversible"]
pub struct LedgerUndo {
    owner: Address,
    previous: Option<DepositorRecord>,
    previous_total: Amount,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Per-depositor principal, plus the running total across all depositors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceLedger {
    records: HashMap<Address, DepositorRecord>,
    total_recorded: Amount,
}

impl BalanceLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `amount` to `owner`, creating the record on first deposit.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidAmount`] if `amount` is zero,
    /// [`LedgerError::Overflow`] if the balance, lifetime counter or ledger
    /// total would overflow. The ledger is unchanged on error.
    pub fn record_deposit(
        &mut self,
        owner: Address,
        amount: Amount,
    ) -> Result<LedgerUndo, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let total_recorded = self
            .total_recorded
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        let now = Utc::now();
        let previous = self.records.get(&owner).cloned();
        let mut record = previous
            .clone()
            .unwrap_or_else(|| DepositorRecord::open(owner, now));

        record.recorded_balance = record
            .recorded_balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        record.total_deposited = record
            .total_deposited
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        record.last_activity_at = now;

        let undo = LedgerUndo {
            owner,
            previous,
            previous_total: self.total_recorded,
        };
        self.records.insert(owner, record);
        self.total_recorded = total_recorded;
        Ok(undo)
    }

    /// Debits `amount` from `owner`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UnknownDepositor`] if `owner` never deposited (checked
    /// first), [`LedgerError::InvalidAmount`] if `amount` is zero,
    /// [`LedgerError::InsufficientBalance`] if `amount` exceeds the
    /// recorded balance.
    pub fn record_withdrawal(
        &mut self,
        owner: Address,
        amount: Amount,
    ) -> Result<LedgerUndo, LedgerError> {
        let record = self
            .records
            .get_mut(&owner)
            .ok_or(LedgerError::UnknownDepositor(owner))?;

        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        if amount > record.recorded_balance {
            return Err(LedgerError::InsufficientBalance {
                owner,
                available: record.recorded_balance,
                requested: amount,
            });
        }
        let total_withdrawn = record
            .total_withdrawn
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        let undo = LedgerUndo {
            owner,
            previous: Some(record.clone()),
            previous_total: self.total_recorded,
        };

        record.recorded_balance -= amount;
        record.total_withdrawn = total_withdrawn;
        record.last_activity_at = Utc::now();
        // The total is the sum of all balances, so it covers this debit.
        self.total_recorded -= amount;
        Ok(undo)
    }

    /// Restores the state captured by `undo`.
    pub fn rollback(&mut self, undo: LedgerUndo) {
        match undo.previous {
            Some(record) => {
                self.records.insert(undo.owner, record);
            }
            None => {
                self.records.remove(&undo.owner);
            }
        }
        self.total_recorded = undo.previous_total;
    }

    /// Recorded balance of `owner`; zero for unknown owners.
    pub fn balance_of(&self, owner: &Address) -> Amount {
        self.records
            .get(owner)
            .map(|r| r.recorded_balance)
            .unwrap_or(0)
    }

    /// Whether `owner` has ever deposited.
    pub fn contains(&self, owner: &Address) -> bool {
        self.records.contains_key(owner)
    }

    /// Full record for `owner`, if any.
    pub fn record(&self, owner: &Address) -> Option<&DepositorRecord> {
        self.records.get(owner)
    }

    /// Lifecycle state of `owner`.
    pub fn status(&self, owner: &Address) -> RecordStatus {
        self.records
            .get(owner)
            .map(DepositorRecord::status)
            .unwrap_or(RecordStatus::Uninitialized)
    }

    /// Sum of every recorded balance.
    pub fn total_recorded(&self) -> Amount {
        self.total_recorded
    }

    /// Number of depositors with a record, drained ones included.
    pub fn depositor_count(&self) -> usize {
        self.records.len()
    }

    /// Number of depositors with a positive balance.
    pub fn active_depositor_count(&self) -> usize {
        self.records
            .values()
            .filter(|r| r.recorded_balance > 0)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
