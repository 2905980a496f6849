use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::output::Format;

/// Point-in-time snapshots of the Carmine options AMM: pools, listed
/// options, pool capital, positions and volatilities.
#[derive(Parser)]
#[command(name = "amm-snapshot", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Where to read the AMM from.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Network (mainnet or testnet); picks the default AMM address
    #[arg(long, default_value = "mainnet")]
    pub network: String,

    /// Starknet JSON-RPC endpoint (falls back to AMM_SNAPSHOT_RPC_URL)
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Override the AMM contract address
    #[arg(long)]
    pub amm_address: Option<String>,

    /// Block to read at: latest, pending or a block number
    #[arg(long, default_value = "latest")]
    pub block: String,

    /// Maximum concurrent calls per stage (default: unlimited)
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// HTTP timeout per call, in seconds
    #[arg(long, default_value = "30")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputTarget {
    Stdout,
    File,
}

#[derive(Subcommand)]
pub enum Command {
    /// Capture the full AMM state
    Snapshot {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Representation of the snapshot
        #[arg(long, value_enum, default_value = "debug")]
        format: Format,

        /// Print to stdout or write to a file
        #[arg(long, value_enum, default_value = "file")]
        output: OutputTarget,

        /// Output file path (default: amm_state.json / amm_state.txt)
        #[arg(long, short = 'o')]
        path: Option<PathBuf>,
    },

    /// Call one AMM view function and print the raw felts
    Call {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Function name, e.g. get_all_lptoken_addresses
        entrypoint: String,

        /// Calldata felts (hex or decimal)
        args: Vec<String>,
    },

    /// Print the Starknet selector of a function name
    Selector {
        /// Function name
        name: String,
    },
}
