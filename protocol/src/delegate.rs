//! # Delegate Staking Pool
//!
//! The vault never stakes anything itself. It hands pooled deposits to a
//! delegate staking pool and receives a claim token in return, exactly the
//! way a liquid-staking protocol mints `stETH` against submitted ether. This
//! module defines that boundary:
//!
//! - [`DelegateVault`]: the three calls the vault makes against the pool
//!   (`balance_of`, `deposit`, `withdraw`) plus the pool-wide total.
//! - [`InMemoryStakingPool`]: a share-based pool used by the node and by
//!   tests. Shares are minted 1:1 on the first deposit and pro-rata after
//!   that, so rewards and losses move every holder's balance together.
//!
//! Validator deposits, operator selection and reward distribution happen on
//! the far side of this trait and are not modelled.

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

use crate::types::{mul_div_ceil, mul_div_floor, Address, Amount};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures reported by a delegate staking pool.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DelegateError {
    /// The pool has been stopped and accepts neither deposits nor transfers.
    #[error("delegate pool is paused")]
    Paused,

    /// Zero-value deposits and transfers are rejected, as are deposits so
    /// small they would mint zero shares.
    #[error("delegate pool rejects zero-value operations")]
    ZeroAmount,

    /// Accepting the deposit would push the pool above its staking cap.
    #[error("deposit cap exceeded: cap {cap}, pooled after deposit {attempted}")]
    DepositCapExceeded {
        /// Maximum pooled value the delegate accepts.
        cap: Amount,
        /// Pooled value the deposit would have produced.
        attempted: u128,
    },

    /// The holder does not own enough of the pool to cover the transfer.
    #[error("insufficient holding for {holder}: available {available}, requested {requested}")]
    InsufficientHolding {
        /// The holder whose claim was being moved.
        holder: Address,
        /// The holder's current balance.
        available: Amount,
        /// The amount that was requested.
        requested: Amount,
    },

    /// Share or value arithmetic would overflow.
    #[error("delegate pool arithmetic overflow")]
    Overflow,

    /// Catch-all for remote pools that could not be reached.
    #[error("delegate pool unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The staking pool the vault forwards deposits into.
///
/// Implementations use interior mutability: one pool is shared between the
/// vault's pool accessor, oracles reading it, and whatever is hosting it.
pub trait DelegateVault: Send + Sync {
    /// Value of the pool claim held by `holder`.
    fn balance_of(&self, holder: &Address) -> Amount;

    /// Value held by the pool across every holder.
    fn total_pooled(&self) -> Amount;

    /// Accepts `amount` of base asset from `depositor` and credits the
    /// minted claim to `depositor`. Returns the number of shares minted.
    fn deposit(&self, depositor: &Address, amount: Amount) -> Result<Amount, DelegateError>;

    /// Moves `amount` of value held by `holder` to `recipient`.
    fn withdraw(
        &self,
        holder: &Address,
        recipient: &Address,
        amount: Amount,
    ) -> Result<(), DelegateError>;
}

// ---------------------------------------------------------------------------
// In-memory pool
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct PoolState {
    total_pooled: Amount,
    total_shares: Amount,
    shares: HashMap<Address, Amount>,
    paused: bool,
    deposit_cap: Option<Amount>,
}

impl PoolState {
    fn value_of_shares(&self, shares: Amount) -> Amount {
        if self.total_shares == 0 {
            return 0;
        }
        mul_div_floor(shares, self.total_pooled, self.total_shares).unwrap_or(Amount::MAX)
    }
}

/// Share-based staking pool kept entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryStakingPool {
    state: RwLock<PoolState>,
}

impl InMemoryStakingPool {
    /// Creates an empty, unpaused pool with no deposit cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty pool that refuses deposits past `cap` pooled value.
    pub fn with_deposit_cap(cap: Amount) -> Self {
        let pool = Self::default();
        pool.state.write().deposit_cap = Some(cap);
        pool
    }

    /// Replaces the deposit cap. `None` removes it.
    pub fn set_deposit_cap(&self, cap: Option<Amount>) {
        self.state.write().deposit_cap = cap;
    }

    /// Stops the pool. Deposits and transfers fail with
    /// [`DelegateError::Paused`] until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.state.write().paused = true;
        tracing::warn!("delegate pool paused");
    }

    /// Restarts a paused pool.
    pub fn resume(&self) {
        self.state.write().paused = false;
        tracing::info!("delegate pool resumed");
    }

    /// Whether the pool is currently paused.
    pub fn is_paused(&self) -> bool {
        self.state.read().paused
    }

    /// Adds staking rewards to the pool without minting shares, raising the
    /// value of every holder's claim.
    pub fn accrue_rewards(&self, amount: Amount) -> Result<(), DelegateError> {
        let mut state = self.state.write();
        state.total_pooled = state
            .total_pooled
            .checked_add(amount)
            .ok_or(DelegateError::Overflow)?;
        tracing::debug!(amount, total_pooled = state.total_pooled, "rewards accrued");
        Ok(())
    }

    /// Removes value from the pool (e.g. a penalty), lowering every claim.
    /// Saturates at zero.
    pub fn apply_loss(&self, amount: Amount) {
        let mut state = self.state.write();
        state.total_pooled = state.total_pooled.saturating_sub(amount);
        tracing::debug!(amount, total_pooled = state.total_pooled, "loss applied");
    }

    /// Raw shares held by `holder`.
    pub fn shares_of(&self, holder: &Address) -> Amount {
        self.state.read().shares.get(holder).copied().unwrap_or(0)
    }

    /// Total shares outstanding.
    pub fn total_shares(&self) -> Amount {
        self.state.read().total_shares
    }
}

impl DelegateVault for InMemoryStakingPool {
    fn balance_of(&self, holder: &Address) -> Amount {
        let state = self.state.read();
        let shares = state.shares.get(holder).copied().unwrap_or(0);
        state.value_of_shares(shares)
    }

    fn total_pooled(&self) -> Amount {
        self.state.read().total_pooled
    }

    fn deposit(&self, depositor: &Address, amount: Amount) -> Result<Amount, DelegateError> {
        let mut state = self.state.write();
        if state.paused {
            return Err(DelegateError::Paused);
        }
        if amount == 0 {
            return Err(DelegateError::ZeroAmount);
        }

        if let Some(cap) = state.deposit_cap {
            let attempted = state.total_pooled as u128 + amount as u128;
            if attempted > cap as u128 {
                return Err(DelegateError::DepositCapExceeded { cap, attempted });
            }
        }

        // Shares left over after the pool was wiped out are worth nothing;
        // they are burned so they cannot claim part of this deposit.
        let stale = state.total_pooled == 0 && state.total_shares > 0;
        let shares = if state.total_shares == 0 || stale {
            amount
        } else {
            mul_div_floor(amount, state.total_shares, state.total_pooled)
                .ok_or(DelegateError::Overflow)?
        };
        if shares == 0 {
            return Err(DelegateError::ZeroAmount);
        }

        let total_pooled = state
            .total_pooled
            .checked_add(amount)
            .ok_or(DelegateError::Overflow)?;
        let total_shares = if stale {
            shares
        } else {
            state
                .total_shares
                .checked_add(shares)
                .ok_or(DelegateError::Overflow)?
        };

        if stale {
            tracing::warn!(
                burned = state.total_shares,
                holders = state.shares.len(),
                "burning worthless shares before deposit"
            );
            state.shares.clear();
        }
        state.total_pooled = total_pooled;
        state.total_shares = total_shares;
        *state.shares.entry(*depositor).or_insert(0) += shares;

        tracing::debug!(%depositor, amount, shares, "delegate deposit");
        Ok(shares)
    }

    fn withdraw(
        &self,
        holder: &Address,
        recipient: &Address,
        amount: Amount,
    ) -> Result<(), DelegateError> {
        let mut state = self.state.write();
        if state.paused {
            return Err(DelegateError::Paused);
        }
        if amount == 0 {
            return Err(DelegateError::ZeroAmount);
        }

        let held = state.shares.get(holder).copied().unwrap_or(0);
        let available = state.value_of_shares(held);
        if amount > available {
            return Err(DelegateError::InsufficientHolding {
                holder: *holder,
                available,
                requested: amount,
            });
        }

        // Round the share count up so the pool never pays out more value
        // than it debits.
        let shares = mul_div_ceil(amount, state.total_shares, state.total_pooled)
            .ok_or(DelegateError::Overflow)?
            .min(held);

        if let Some(entry) = state.shares.get_mut(holder) {
            *entry -= shares;
        }
        *state.shares.entry(*recipient).or_insert(0) += shares;

        tracing::debug!(%holder, %recipient, amount, shares, "delegate transfer");
        Ok(())
    }
}
