use std::fmt;
use std::str::FromStr;

use alloy::primitives::{U256, keccak256};

use crate::model::Felt;

/// AMM view functions read by the snapshot pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entrypoint {
    GetAllLptokenAddresses,
    GetAllOptions,
    GetPoolLockedCapital,
    GetUnlockedCapital,
    GetLpoolBalance,
    GetValueOfPoolPosition,
    GetOptionPosition,
    GetPoolVolatilityAuto,
}

impl Entrypoint {
    pub const ALL: [Entrypoint; 8] = [
        Entrypoint::GetAllLptokenAddresses,
        Entrypoint::GetAllOptions,
        Entrypoint::GetPoolLockedCapital,
        Entrypoint::GetUnlockedCapital,
        Entrypoint::GetLpoolBalance,
        Entrypoint::GetValueOfPoolPosition,
        Entrypoint::GetOptionPosition,
        Entrypoint::GetPoolVolatilityAuto,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Entrypoint::GetAllLptokenAddresses => "get_all_lptoken_addresses",
            Entrypoint::GetAllOptions => "get_all_options",
            Entrypoint::GetPoolLockedCapital => "get_pool_locked_capital",
            Entrypoint::GetUnlockedCapital => "get_unlocked_capital",
            Entrypoint::GetLpoolBalance => "get_lpool_balance",
            Entrypoint::GetValueOfPoolPosition => "get_value_of_pool_position",
            Entrypoint::GetOptionPosition => "get_option_position",
            Entrypoint::GetPoolVolatilityAuto => "get_pool_volatility_auto",
        }
    }

    pub fn selector(self) -> Felt {
        selector(self.name())
    }
}

impl fmt::Display for Entrypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Entrypoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Entrypoint::ALL
            .into_iter()
            .find(|e| e.name() == s)
            .ok_or_else(|| format!("unknown AMM entrypoint `{s}`"))
    }
}

/// Starknet function selector: keccak256 of the name, truncated to 250 bits.
pub fn selector(name: &str) -> Felt {
    let hash = U256::from_be_bytes(keccak256(name.as_bytes()).0);
    let mask = (U256::from(1u8) << 250usize) - U256::from(1u8);
    Felt::new(hash & mask)
}
