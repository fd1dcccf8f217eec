//! # Stake Vault Contracts
//!
//! The accounting core of a custodial staking vault. Users stake a base
//! asset; the vault forwards it into a delegate staking pool, records each
//! depositor's principal, and lets depositors withdraw up to what is
//! currently available to them.
//!
//! - **ledger**: Per-depositor principal with stage-and-undo mutations.
//! - **pool**: Accessor over the delegate pool, bound to the vault address.
//! - **availability**: Withdrawable amounts under the principal or
//!   yield-scaled policy.
//! - **vault**: The orchestrator: validate, stage, call the pool, commit or
//!   roll back, emit.
//! - **entry**: Rewrites bare value transfers into explicit stakes.
//! - **events**: `Staked`/`Withdrawn` with emission sequence numbers.
//!
//! ## Design Principles
//!
//! 1. All arithmetic on amounts is checked. Ratios widen to `u128`.
//! 2. An operation either lands completely or leaves no trace.
//! 3. "Never staked" and "fully withdrawn" are different states even though
//!    both read as a zero balance.
//! 4. Nothing an external collaborator reports can raise payouts above what
//!    the vault actually holds.

pub mod availability;
pub mod entry;
pub mod error;
pub mod events;
pub mod ledger;
pub mod pool;
pub mod vault;

pub use availability::{AvailabilityCalculator, AvailabilityPolicy, PoolSnapshot};
pub use entry::{dispatch, Call, Message};
pub use error::VaultError;
pub use events::{EventLog, EventRecord, VaultEvent};
pub use ledger::{BalanceLedger, DepositorRecord, LedgerError, LedgerUndo, RecordStatus};
pub use pool::{PoolAccessor, PoolError, PoolOperation};
pub use vault::{SharedVault, SolvencyReport, StakeVault, VaultSummary};
