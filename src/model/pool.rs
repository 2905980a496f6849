use serde::{Deserialize, Serialize};

use super::felt::Felt;
use super::option::{OptionType, PoolOption};

/// A liquidity pool with all figures in decimal units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiqPool {
    pub address: Felt,
    pub option_type: OptionType,
    pub unlocked_capital: f64,
    pub locked_capital: f64,
    pub lpool_bal: f64,
    pub value_pool_position: f64,
    pub options: Vec<PoolOption>,
}

/// Point-in-time snapshot of the whole AMM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmmState {
    pub pools: Vec<LiqPool>,
    /// Capture time, unix seconds.
    pub time: i64,
}

impl AmmState {
    pub fn pool(&self, address: &Felt) -> Option<&LiqPool> {
        self.pools.iter().find(|p| &p.address == address)
    }
}
