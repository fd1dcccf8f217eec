//! # Pool Value Oracle
//!
//! The oracle reports the total value the delegate pool holds on behalf of
//! the vault. It is consumed read-only, and only by the yield-scaled
//! availability policy; the principal policy never asks it anything.
//!
//! Oracles are untrusted. A stale or manipulated report must never let the
//! vault pay out more than the delegate pool actually recognises, so
//! consumers clamp reports against the pool holding.

use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::delegate::DelegateVault;
use crate::types::{Address, Amount};

/// Failures reported by an oracle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// No report has been published yet.
    #[error("oracle has not reported a pool value yet")]
    NoReport,

    /// The oracle could not be reached.
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

/// Source of the reported pool value.
pub trait Oracle: Send + Sync {
    /// Total value held by the delegate pool on behalf of the vault.
    fn reported_pool_value(&self) -> Result<Amount, OracleError>;
}

/// Oracle that always reports the same value.
#[derive(Debug, Clone, Copy)]
pub struct FixedOracle(pub Amount);

impl Oracle for FixedOracle {
    fn reported_pool_value(&self) -> Result<Amount, OracleError> {
        Ok(self.0)
    }
}

/// Oracle whose report is pushed in by an operator (or a test).
#[derive(Debug, Default)]
pub struct ManualOracle {
    report: RwLock<Option<Amount>>,
}

impl ManualOracle {
    /// Creates an oracle with no report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a new report, replacing the previous one.
    pub fn publish(&self, value: Amount) {
        *self.report.write() = Some(value);
        tracing::debug!(value, "oracle report published");
    }

    /// Withdraws the current report.
    pub fn clear(&self) {
        *self.report.write() = None;
    }
}

impl Oracle for ManualOracle {
    fn reported_pool_value(&self) -> Result<Amount, OracleError> {
        (*self.report.read()).ok_or(OracleError::NoReport)
    }
}

/// Oracle that reads the holder's balance straight from the delegate pool.
pub struct DelegateOracle {
    delegate: Arc<dyn DelegateVault>,
    holder: Address,
}

impl DelegateOracle {
    /// Reports `holder`'s balance in `delegate`.
    pub fn new(delegate: Arc<dyn DelegateVault>, holder: Address) -> Self {
        Self { delegate, holder }
    }
}

impl Oracle for DelegateOracle {
    fn reported_pool_value(&self) -> Result<Amount, OracleError> {
        Ok(self.delegate.balance_of(&self.holder))
    }
}
