//! # CLI Interface
//!
//! Defines the command-line argument structure for `stakevault-node` using
//! `clap` derive. Supports four subcommands: `run`, `init`, `status`,
//! and `version`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use stakevault_contracts::AvailabilityPolicy;
use stakevault_protocol::config::{DEFAULT_CONFIG_FILE, DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT};

use crate::logging::LogFormat;

/// Stake vault node.
///
/// Hosts a single custodial staking vault over an in-memory delegate pool,
/// serves its HTTP/WebSocket API, and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "stakevault-node",
    about = "Custodial staking vault node",
    version,
    propagate_version = true
)]
pub struct StakeVaultCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Write a default node configuration file.
    Init(InitArgs),
    /// Query the status of a running node via its API.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// `--policy` values. Mirrors [`AvailabilityPolicy`].
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyArg {
    /// Withdrawable equals recorded principal.
    Principal,
    /// Withdrawable follows the pool's reported value.
    YieldScaled,
}

impl From<PolicyArg> for AvailabilityPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Principal => AvailabilityPolicy::Principal,
            PolicyArg::YieldScaled => AvailabilityPolicy::YieldScaled,
        }
    }
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the node configuration file (JSON).
    ///
    /// When omitted, built-in defaults are used.
    #[arg(long, short = 'c', env = "STAKEVAULT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port for the REST and WebSocket API.
    #[arg(long, env = "STAKEVAULT_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "STAKEVAULT_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Log output format.
    #[arg(long, env = "STAKEVAULT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Availability policy. Overrides the config file.
    #[arg(long, env = "STAKEVAULT_POLICY", value_enum)]
    pub policy: Option<PolicyArg>,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Where to write the configuration file.
    #[arg(long, short = 'o', default_value = DEFAULT_CONFIG_FILE)]
    pub output: PathBuf,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// API endpoint of the running node.
    #[arg(long, default_value = "http://127.0.0.1:9751")]
    pub rpc_url: String,
}
