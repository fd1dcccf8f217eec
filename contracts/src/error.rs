//! Errors surfaced by the stake vault.
//!
//! Every variant aborts the whole operation: the ledger is rolled back and
//! no event is emitted. Nothing is retried internally.

use thiserror::Error;

use stakevault_protocol::setup::SetupError;
use stakevault_protocol::types::{Address, Amount};

use crate::ledger::LedgerError;
use crate::pool::PoolError;

/// Errors returned by [`StakeVault`](crate::vault::StakeVault) operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// Stake attempted with nothing attached.
    #[error("you must send more than 0 to stake")]
    ZeroStakeAmount,

    /// Stake too small to be worth a single claim unit at the current pool
    /// value.
    #[error("stake of {0} is too small to record a claim")]
    StakeTooSmall(Amount),

    /// A known depositor asked for more than is currently available.
    #[error("amount given is more than withdrawable amount from vault (requested {requested}, available {available})")]
    InsufficientBalance { requested: Amount, available: Amount },

    /// Withdrawal by an identity that never staked.
    #[error("no verifiable balance for this wallet yet ({0})")]
    UnknownDepositor(Address),

    /// The delegate pool could not honour a forward or release.
    #[error("pool transfer failed: {0}")]
    PoolTransferFailed(#[from] PoolError),

    /// `stake`/`withdraw` called before `initialize`.
    #[error("vault has not been initialized")]
    NotInitialized,

    /// `initialize` called a second time.
    #[error("vault is already initialized")]
    AlreadyInitialized,

    /// Setup addresses failed validation.
    #[error("invalid setup: {0}")]
    InvalidSetup(#[from] SetupError),

    /// A withdrawal message carried value; withdrawals never accept funds.
    #[error("withdraw does not accept value (sent {0})")]
    UnexpectedValue(Amount),

    /// Ledger arithmetic would overflow.
    #[error("amount overflow")]
    Overflow,
}

impl VaultError {
    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::ZeroStakeAmount => "zero_stake_amount",
            VaultError::StakeTooSmall(_) => "stake_too_small",
            VaultError::InsufficientBalance { .. } => "insufficient_balance",
            VaultError::UnknownDepositor(_) => "unknown_depositor",
            VaultError::PoolTransferFailed(_) => "pool_transfer_failed",
            VaultError::NotInitialized => "not_initialized",
            VaultError::AlreadyInitialized => "already_initialized",
            VaultError::InvalidSetup(_) => "invalid_setup",
            VaultError::UnexpectedValue(_) => "unexpected_value",
            VaultError::Overflow => "overflow",
        }
    }

    /// Whether the caller can fix the failure by changing their input.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            VaultError::ZeroStakeAmount
                | VaultError::StakeTooSmall(_)
                | VaultError::InsufficientBalance { .. }
                | VaultError::UnknownDepositor(_)
                | VaultError::UnexpectedValue(_)
                | VaultError::InvalidSetup(_)
        )
    }
}

impl From<LedgerError> for VaultError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidAmount => VaultError::ZeroStakeAmount,
            LedgerError::UnknownDepositor(owner) => VaultError::UnknownDepositor(owner),
            LedgerError::InsufficientBalance {
                available,
                requested,
                ..
            } => VaultError::InsufficientBalance {
                requested,
                available,
            },
            LedgerError::Overflow => VaultError::Overflow,
        }
    }
}
