//! # Availability Calculator
//!
//! Decides how much of a depositor's claim can be withdrawn right now.
//!
//! Two policies:
//!
//! - [`AvailabilityPolicy::Principal`]: a depositor may withdraw exactly
//!   the principal they have recorded, independent of pool yield or loss.
//!   After a pool loss the delegate may refuse to release the full amount;
//!   the vault then rolls the withdrawal back.
//! - [`AvailabilityPolicy::YieldScaled`]: principal is scaled by
//!   `pooled / total_recorded`, where `pooled` is the oracle report clamped
//!   to the pool holding. Every individual result is floor-rounded, so the
//!   sum over all depositors never exceeds the holding no matter what the
//!   oracle says.
//!
//! Under the yield-scaled policy the ledger holds claim units rather than
//! raw principal. A stake of `a` records `floor(a * total_recorded / pooled)`
//! units (1:1 while nothing is recorded or the pool is worth nothing), so
//! value that accrued before the stake stays with the earlier depositors.
//! A withdrawal of `a` available units debits
//! `ceil(a * total_recorded / pooled)` units, capped at the depositor's
//! recorded balance.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use stakevault_protocol::oracle::Oracle;
use stakevault_protocol::types::{mul_div_ceil, mul_div_floor, Amount};

/// Rule used to turn recorded principal into a withdrawable amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityPolicy {
    /// Withdrawable equals recorded principal.
    #[default]
    Principal,
    /// Withdrawable tracks the reported pool value.
    YieldScaled,
}

impl fmt::Display for AvailabilityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvailabilityPolicy::Principal => write!(f, "principal"),
            AvailabilityPolicy::YieldScaled => write!(f, "yield_scaled"),
        }
    }
}

/// Pool-wide figures the calculator needs, captured once per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSnapshot {
    /// Sum of every recorded balance in the ledger.
    pub total_recorded: Amount,
    /// Vault holding as recognised by the delegate pool.
    pub pool_holding: Amount,
}

/// Computes available amounts under a configured policy.
#[derive(Clone, Default)]
pub struct AvailabilityCalculator {
    policy: AvailabilityPolicy,
    oracle: Option<Arc<dyn Oracle>>,
}

impl fmt::Debug for AvailabilityCalculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvailabilityCalculator")
            .field("policy", &self.policy)
            .field("has_oracle", &self.oracle.is_some())
            .finish()
    }
}

impl AvailabilityCalculator {
    /// 1:1 principal tracking.
    pub fn principal() -> Self {
        Self::default()
    }

    /// Yield scaling driven by `oracle`.
    pub fn yield_scaled(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            policy: AvailabilityPolicy::YieldScaled,
            oracle: Some(oracle),
        }
    }

    /// The active policy.
    pub fn policy(&self) -> AvailabilityPolicy {
        self.policy
    }

    /// Latest oracle report, if an oracle is configured and answering.
    pub fn reported_value(&self) -> Option<Amount> {
        let oracle = self.oracle.as_ref()?;
        match oracle.reported_pool_value() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, "oracle report unavailable, using pool holding");
                None
            }
        }
    }

    /// Pool value the calculator is willing to distribute: the oracle
    /// report clamped to the holding, or the holding alone when there is no
    /// usable report.
    pub fn effective_pool_value(&self, snapshot: &PoolSnapshot) -> Amount {
        match self.reported_value() {
            Some(reported) => reported.min(snapshot.pool_holding),
            None => snapshot.pool_holding,
        }
    }

    /// Withdrawable amount for a depositor with `recorded` principal.
    pub fn available_amount(&self, recorded: Amount, snapshot: &PoolSnapshot) -> Amount {
        match self.policy {
            AvailabilityPolicy::Principal => recorded,
            AvailabilityPolicy::YieldScaled => {
                if recorded == 0 || snapshot.total_recorded == 0 {
                    return 0;
                }
                let pooled = self.effective_pool_value(snapshot);
                mul_div_floor(recorded, pooled, snapshot.total_recorded)
                    .unwrap_or(pooled)
                    .min(pooled)
            }
        }
    }

    /// Claim units to record for a stake of `amount`, priced against the
    /// pool before the stake lands. `None` on overflow.
    pub fn claim_for(&self, amount: Amount, snapshot: &PoolSnapshot) -> Option<Amount> {
        match self.policy {
            AvailabilityPolicy::Principal => Some(amount),
            AvailabilityPolicy::YieldScaled => {
                if snapshot.total_recorded == 0 {
                    return Some(amount);
                }
                let pooled = self.effective_pool_value(snapshot);
                if pooled == 0 {
                    return Some(amount);
                }
                mul_div_floor(amount, snapshot.total_recorded, pooled)
            }
        }
    }

    /// Principal to debit from the ledger when `amount` available units are
    /// withdrawn by a depositor holding `recorded` principal.
    pub fn principal_for(&self, amount: Amount, recorded: Amount, snapshot: &PoolSnapshot) -> Amount {
        match self.policy {
            AvailabilityPolicy::Principal => amount,
            AvailabilityPolicy::YieldScaled => {
                let pooled = self.effective_pool_value(snapshot);
                if pooled == 0 {
                    return recorded;
                }
                mul_div_ceil(amount, snapshot.total_recorded, pooled)
                    .unwrap_or(recorded)
                    .min(recorded)
            }
        }
    }
}
