//! # Pool Accessor
//!
//! The vault's only handle on the delegate staking pool. It deposits on the
//! vault's behalf (so minted claims land in the vault's own holding), moves
//! value back out to withdrawing users, and reports how much of the pool
//! the vault currently holds.
//!
//! Any delegate failure surfaces as [`PoolError::TransferFailed`]; the
//! orchestrating vault treats that as grounds to roll the whole operation
//! back.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use stakevault_protocol::delegate::{DelegateError, DelegateVault};
use stakevault_protocol::types::{Address, Amount};

/// Which pool call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolOperation {
    /// Depositing into the delegate pool.
    Forward,
    /// Moving value out of the delegate pool.
    Release,
}

impl fmt::Display for PoolOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolOperation::Forward => write!(f, "forward"),
            PoolOperation::Release => write!(f, "release"),
        }
    }
}

/// Errors raised by the pool accessor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The delegate pool could not honour the call.
    #[error("{operation} of {amount} failed: {source}")]
    TransferFailed {
        /// The call that failed.
        operation: PoolOperation,
        /// Amount the call carried.
        amount: Amount,
        /// What the delegate reported.
        #[source]
        source: DelegateError,
    },
}

/// Adapter over the delegate pool, bound to the vault's own address.
#[derive(Clone)]
pub struct PoolAccessor {
    delegate: Arc<dyn DelegateVault>,
    holder: Address,
}

impl fmt::Debug for PoolAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolAccessor")
            .field("holder", &self.holder)
            .finish_non_exhaustive()
    }
}

impl PoolAccessor {
    /// Binds `delegate` to the vault address `holder`.
    pub fn new(delegate: Arc<dyn DelegateVault>, holder: Address) -> Self {
        Self { delegate, holder }
    }

    /// The address whose holding this accessor manages.
    pub fn holder(&self) -> Address {
        self.holder
    }

    /// Shared handle on the delegate pool.
    pub fn delegate(&self) -> Arc<dyn DelegateVault> {
        Arc::clone(&self.delegate)
    }

    /// Deposits `amount` into the delegate pool, crediting the vault's
    /// holding. Returns the shares minted.
    pub fn forward(&self, amount: Amount) -> Result<Amount, PoolError> {
        self.delegate
            .deposit(&self.holder, amount)
            .map_err(|source| PoolError::TransferFailed {
                operation: PoolOperation::Forward,
                amount,
                source,
            })
    }

    /// Moves `amount` of the vault's holding to `recipient`.
    pub fn release(&self, recipient: &Address, amount: Amount) -> Result<(), PoolError> {
        self.delegate
            .withdraw(&self.holder, recipient, amount)
            .map_err(|source| PoolError::TransferFailed {
                operation: PoolOperation::Release,
                amount,
                source,
            })
    }

    /// Value of the vault's holding in the delegate pool.
    pub fn query_pool_holding(&self) -> Amount {
        self.delegate.balance_of(&self.holder)
    }
}
