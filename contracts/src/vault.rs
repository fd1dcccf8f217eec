//! # Stake Vault
//!
//! Orchestrates deposits and withdrawals. The vault owns the
//! [`BalanceLedger`] outright and only ever touches the delegate pool
//! through its [`PoolAccessor`].
//!
//! ## Operation lifecycle
//!
//! ```text
//!   validate ──► stage ledger change ──► pool call ──ok──► emit event
//!                       ▲                    │
//!                       └──── rollback ◄─err─┘
//! ```
//!
//! Either every effect of an operation lands or none does. A failed pool
//! call rolls the staged ledger change back before the error is returned,
//! and no event is emitted.
//!
//! The vault itself is `&mut self` throughout; hosts that serve it from
//! several threads wrap it in a [`SharedVault`], whose mutex gives the
//! one-call-at-a-time ordering the accounting relies on.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use stakevault_protocol::delegate::DelegateVault;
use stakevault_protocol::setup::VaultSetup;
use stakevault_protocol::types::{format_ether, Address, Amount};

use crate::availability::{AvailabilityCalculator, AvailabilityPolicy, PoolSnapshot};
use crate::error::VaultError;
use crate::events::{EventLog, EventRecord, VaultEvent};
use crate::ledger::BalanceLedger;
use crate::pool::PoolAccessor;

/// A vault shared between request handlers.
pub type SharedVault = Arc<Mutex<StakeVault>>;

/// Pool-versus-ledger health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolvencyReport {
    /// Sum of all recorded principal.
    pub total_recorded: Amount,
    /// Vault holding recognised by the delegate pool.
    pub pool_holding: Amount,
    /// Oracle report, when an oracle is configured and answering.
    pub reported_value: Option<Amount>,
    /// Whether the value backing the vault covers every recorded claim.
    pub solvent: bool,
}

/// Point-in-time overview of the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSummary {
    pub address: Address,
    pub initialized: bool,
    pub policy: AvailabilityPolicy,
    pub total_recorded: Amount,
    pub pool_holding: Amount,
    pub depositors: usize,
    pub active_depositors: usize,
    pub events_emitted: u64,
}

/// The custodial staking vault.
///
/// Committed events queue up inside the vault until the host takes them
/// with [`drain_events`](Self::drain_events); a host that never drains keeps
/// every event in memory.
#[derive(Debug)]
pub struct StakeVault {
    address: Address,
    setup: Option<VaultSetup>,
    ledger: BalanceLedger,
    pool: PoolAccessor,
    calculator: AvailabilityCalculator,
    events: EventLog,
}

impl StakeVault {
    /// Creates an uninitialised vault at `address` over `delegate`.
    pub fn new(
        address: Address,
        delegate: Arc<dyn DelegateVault>,
        calculator: AvailabilityCalculator,
    ) -> Self {
        Self {
            address,
            setup: None,
            ledger: BalanceLedger::new(),
            pool: PoolAccessor::new(delegate, address),
            calculator,
            events: EventLog::new(),
        }
    }

    /// Wraps the vault for sharing across threads.
    pub fn into_shared(self) -> SharedVault {
        Arc::new(Mutex::new(self))
    }

    // -----------------------------------------------------------------------
    // Setup
    // -----------------------------------------------------------------------

    /// Records the collaborator addresses. Callable exactly once.
    pub fn initialize(&mut self, setup: VaultSetup) -> Result<(), VaultError> {
        if self.setup.is_some() {
            return Err(VaultError::AlreadyInitialized);
        }
        setup.validate()?;
        self.setup = Some(setup);
        info!(
            vault = %self.address,
            admin = %setup.admin,
            oracle = %setup.oracle,
            policy = %self.calculator.policy(),
            "vault initialized"
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.setup.is_some()
    }

    pub fn setup(&self) -> Option<&VaultSetup> {
        self.setup.as_ref()
    }

    fn ensure_initialized(&self) -> Result<(), VaultError> {
        if self.setup.is_none() {
            return Err(VaultError::NotInitialized);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Stakes `amount` on behalf of `caller` and forwards it to the pool.
    ///
    /// Under a yield-scaled policy the ledger is credited claim units priced
    /// against the pool before the stake, not `amount` itself.
    pub fn stake(&mut self, caller: Address, amount: Amount) -> Result<EventRecord, VaultError> {
        self.ensure_initialized()?;
        if amount == 0 {
            return Err(VaultError::ZeroStakeAmount);
        }

        let claim = self
            .calculator
            .claim_for(amount, &self.snapshot())
            .ok_or(VaultError::Overflow)?;
        if claim == 0 {
            return Err(VaultError::StakeTooSmall(amount));
        }

        let undo = self.ledger.record_deposit(caller, claim)?;
        if let Err(e) = self.pool.forward(amount) {
            self.ledger.rollback(undo);
            warn!(user = %caller, amount, error = %e, "stake rolled back");
            return Err(e.into());
        }

        let record = self.events.emit(VaultEvent::Staked {
            user: caller,
            amount,
        });
        info!(
            user = %caller,
            amount = %format_ether(amount),
            claim,
            balance = self.ledger.balance_of(&caller),
            "staked"
        );
        Ok(record)
    }

    /// Withdraws `amount` of `caller`'s available balance to `caller`.
    ///
    /// Under a yield-scaled policy the ledger is debited the principal
    /// equivalent of `amount`, not `amount` itself.
    pub fn withdraw(&mut self, caller: Address, amount: Amount) -> Result<EventRecord, VaultError> {
        self.ensure_initialized()?;
        if !self.ledger.contains(&caller) {
            return Err(VaultError::UnknownDepositor(caller));
        }

        let snapshot = self.snapshot();
        let recorded = self.ledger.balance_of(&caller);
        let available = self.calculator.available_amount(recorded, &snapshot);
        if amount == 0 || amount > available {
            return Err(VaultError::InsufficientBalance {
                requested: amount,
                available,
            });
        }

        let principal = self.calculator.principal_for(amount, recorded, &snapshot);
        let undo = self.ledger.record_withdrawal(caller, principal)?;
        if let Err(e) = self.pool.release(&caller, amount) {
            self.ledger.rollback(undo);
            warn!(user = %caller, amount, error = %e, "withdrawal rolled back");
            return Err(e.into());
        }

        let record = self.events.emit(VaultEvent::Withdrawn {
            user: caller,
            amount,
        });
        info!(
            user = %caller,
            amount = %format_ether(amount),
            principal,
            balance = self.ledger.balance_of(&caller),
            "withdrawn"
        );
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Recorded principal of `owner`; zero for unknown owners.
    pub fn balance_of(&self, owner: &Address) -> Amount {
        self.ledger.balance_of(owner)
    }

    /// What `owner` could withdraw right now.
    pub fn available_amount(&self, owner: &Address) -> Amount {
        let recorded = self.ledger.balance_of(owner);
        let available = self
            .calculator
            .available_amount(recorded, &self.snapshot());
        debug!(owner = %owner, recorded, available, "available amount");
        available
    }

    pub fn total_recorded(&self) -> Amount {
        self.ledger.total_recorded()
    }

    /// The vault's holding in the delegate pool.
    pub fn pool_holding(&self) -> Amount {
        self.pool.query_pool_holding()
    }

    /// Delegate pool balance of an arbitrary address, e.g. a withdrawer's
    /// claim tokens.
    pub fn delegate_balance_of(&self, holder: &Address) -> Amount {
        self.pool.delegate().balance_of(holder)
    }

    /// Compares the value backing the vault against recorded claims.
    pub fn solvency(&self) -> SolvencyReport {
        let snapshot = self.snapshot();
        let reported_value = self.calculator.reported_value();
        let backing = match reported_value {
            Some(reported) => reported.min(snapshot.pool_holding),
            None => snapshot.pool_holding,
        };
        let solvent = backing >= snapshot.total_recorded;
        if !solvent {
            warn!(
                total_recorded = snapshot.total_recorded,
                pool_holding = snapshot.pool_holding,
                ?reported_value,
                "vault is under-collateralised"
            );
        }
        SolvencyReport {
            total_recorded: snapshot.total_recorded,
            pool_holding: snapshot.pool_holding,
            reported_value,
            solvent,
        }
    }

    pub fn summary(&self) -> VaultSummary {
        VaultSummary {
            address: self.address,
            initialized: self.is_initialized(),
            policy: self.calculator.policy(),
            total_recorded: self.ledger.total_recorded(),
            pool_holding: self.pool_holding(),
            depositors: self.ledger.depositor_count(),
            active_depositors: self.ledger.active_depositor_count(),
            events_emitted: self.events.emitted_count(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn policy(&self) -> AvailabilityPolicy {
        self.calculator.policy()
    }

    /// Read-only view of the ledger.
    pub fn ledger(&self) -> &BalanceLedger {
        &self.ledger
    }

    /// Events not yet drained.
    pub fn events(&self) -> &[EventRecord] {
        self.events.pending()
    }

    /// Hands pending events to the caller, oldest first.
    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        self.events.drain()
    }

    fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            total_recorded: self.ledger.total_recorded(),
            pool_holding: self.pool.query_pool_holding(),
        }
    }
}
