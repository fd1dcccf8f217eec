//! Node configuration file.
//!
//! JSON, written by `stakevault-node init` and read by `run --config`.
//! Everything except the addresses has a default, so a minimal file only
//! names the vault and its collaborators.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use stakevault_contracts::AvailabilityPolicy;
use stakevault_protocol::setup::VaultSetup;
use stakevault_protocol::types::{Address, Amount};

/// Settings for one hosted vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Address the vault holds its pool claim under.
    pub vault_address: Address,
    /// Collaborator addresses passed to `initialize`.
    pub setup: VaultSetup,
    #[serde(default)]
    pub policy: AvailabilityPolicy,
    /// Maximum value the in-memory delegate pool accepts, in gwei.
    #[serde(default)]
    pub deposit_cap: Option<Amount>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            vault_address: Address::repeat_byte(0x5a),
            setup: VaultSetup {
                deposit_contract: Address::repeat_byte(0xdc),
                oracle: Address::repeat_byte(0x0c),
                operator_registry: Address::repeat_byte(0x06),
                admin: Address::repeat_byte(0xad),
            },
            policy: AvailabilityPolicy::Principal,
            deposit_cap: None,
        }
    }
}

impl NodeConfig {
    /// Reads a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Writes the config as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to encode config")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write config file {}", path.display()))
    }
}
