//! # Protocol Configuration & Constants
//!
//! Every magic number the vault depends on lives here. Amount units, default
//! ports, channel sizes. If you're hardcoding one of these somewhere else,
//! move it here instead.

// ---------------------------------------------------------------------------
// Versioning
// ---------------------------------------------------------------------------

/// Version of the vault accounting rules. Bumped whenever the meaning of a
/// recorded balance or an emitted event changes.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Symbol of the base asset users deposit.
pub const BASE_ASSET_SYMBOL: &str = "ETH";

/// Symbol of the claim token minted by the delegate staking pool.
pub const POOL_TOKEN_SYMBOL: &str = "stETH";

/// Decimal places of an [`Amount`](crate::types::Amount). Amounts are gwei.
pub const AMOUNT_DECIMALS: u8 = 9;

/// Gwei per ether. Matches [`AMOUNT_DECIMALS`].
pub const GWEI_PER_ETHER: u64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

/// Default HTTP API port for the vault node.
pub const DEFAULT_RPC_PORT: u16 = 9751;

/// Default Prometheus metrics port.
pub const DEFAULT_METRICS_PORT: u16 = 9752;

/// Capacity of the broadcast channel that fans vault events out to
/// WebSocket subscribers. Slow subscribers past this lag and lose events.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default name of the node configuration file inside the data directory.
pub const DEFAULT_CONFIG_FILE: &str = "vault.json";
