use std::time::Duration;

use anyhow::{Result, anyhow, bail};

use crate::cli::ConnectionArgs;
use crate::model::Felt;
use crate::rpc::{BlockId, RpcError, StarknetRpc};

pub const RPC_URL_ENV: &str = "AMM_SNAPSHOT_RPC_URL";

const MAINNET_AMM_ADDRESS: &str =
    "0x076dbabc4293db346b0a56b29b6ea9fe18e93742c73f12348c8747ecfc1050aa";
const TESTNET_AMM_ADDRESS: &str =
    "0x042a7d485171a01b8c38b6b37e0092f0f096e9d3f945c50c77799171916f5a54";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn amm_address(self) -> Felt {
        let raw = match self {
            Network::Mainnet => MAINNET_AMM_ADDRESS,
            Network::Testnet => TESTNET_AMM_ADDRESS,
        };
        raw.parse().unwrap_or_default()
    }
}

/// Connection settings for one snapshot run.
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    pub network: Network,
    pub rpc_url: String,
    pub amm_address: Felt,
    pub block: BlockId,
    pub max_in_flight: Option<usize>,
    pub timeout: Duration,
}

impl SnapshotConfig {
    pub fn from_cli(args: &ConnectionArgs) -> Result<Self> {
        Self::resolve(args, std::env::var(RPC_URL_ENV).ok())
    }

    fn resolve(args: &ConnectionArgs, env_rpc_url: Option<String>) -> Result<Self> {
        let network = match args.network.to_lowercase().as_str() {
            "mainnet" => Network::Mainnet,
            "testnet" => Network::Testnet,
            other => bail!("Invalid network '{other}'. Use 'mainnet' or 'testnet'."),
        };

        let rpc_url = args
            .rpc_url
            .clone()
            .or(env_rpc_url)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| anyhow!("No RPC endpoint. Pass --rpc-url or set {RPC_URL_ENV}."))?;

        let amm_address = match &args.amm_address {
            Some(raw) => raw
                .parse::<Felt>()
                .map_err(|e| anyhow!("Invalid --amm-address: {e}"))?,
            None => network.amm_address(),
        };

        let block = args.block.parse::<BlockId>().map_err(|e| anyhow!(e))?;

        Ok(SnapshotConfig {
            network,
            rpc_url,
            amm_address,
            block,
            max_in_flight: args.max_concurrency,
            timeout: Duration::from_secs(args.timeout_secs),
        })
    }

    pub fn client(&self) -> Result<StarknetRpc, RpcError> {
        StarknetRpc::new(&self.rpc_url, self.amm_address, self.block, self.timeout)
    }
}
