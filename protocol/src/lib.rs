// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Stake Vault Protocol: Shared Types & Collaborators
//!
//! Everything the vault contracts need to know about the outside world and
//! nothing about their own bookkeeping. The accounting core lives in
//! `stakevault-contracts`; this crate defines the vocabulary it speaks and
//! the interfaces it calls.
//!
//! ## Modules
//!
//! - **types**: [`Address`](types::Address) identities and gwei
//!   [`Amount`](types::Amount)s with overflow-free ratio helpers.
//! - **config**: Protocol constants and node defaults.
//! - **delegate**: The [`DelegateVault`](delegate::DelegateVault) staking
//!   pool interface and an in-memory share-based pool.
//! - **oracle**: The [`Oracle`](oracle::Oracle) that reports pooled value.
//! - **setup**: Collaborator addresses supplied once at initialisation.
//!
//! ## Design Philosophy
//!
//! 1. Amounts are integers. Ratios go through `u128`, never floats.
//! 2. Collaborators are traits; the vault never depends on a concrete pool.
//! 3. Collaborators are untrusted. Anything they report gets clamped.

pub mod config;
pub mod delegate;
pub mod oracle;
pub mod setup;
pub mod types;

pub use delegate::{DelegateError, DelegateVault, InMemoryStakingPool};
pub use oracle::{DelegateOracle, FixedOracle, ManualOracle, Oracle, OracleError};
pub use setup::{SetupError, VaultSetup};
pub use types::{ether, Address, Amount};
