//! # One-Time Vault Setup
//!
//! The vault is wired to its collaborators exactly once. The deposit
//! contract and operator registry are consumed transitively by the delegate
//! pool, so the vault only needs to remember their addresses; the oracle
//! address identifies which report feed the vault trusts, and the admin is
//! the identity that performed setup.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Address;

/// Validation failures for a [`VaultSetup`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// A collaborator address was left as the zero address.
    #[error("setup field `{0}` must not be the zero address")]
    ZeroAddress(&'static str),
}

/// Addresses supplied at initialisation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSetup {
    /// Consensus-layer deposit contract the delegate pool deposits into.
    pub deposit_contract: Address,
    /// Oracle publishing the pool value.
    pub oracle: Address,
    /// Registry of staking node operators.
    pub operator_registry: Address,
    /// Designated owner of the vault.
    pub admin: Address,
}

impl VaultSetup {
    /// Checks that every address is set.
    pub fn validate(&self) -> Result<(), SetupError> {
        let fields = [
            ("deposit_contract", self.deposit_contract),
            ("oracle", self.oracle),
            ("operator_registry", self.operator_registry),
            ("admin", self.admin),
        ];
        for (name, address) in fields {
            if address.is_zero() {
                return Err(SetupError::ZeroAddress(name));
            }
        }
        Ok(())
    }
}
