use std::fmt;
use std::str::FromStr;

use alloy::primitives::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Starknet field prime, 2^251 + 17 * 2^192 + 1.
const PRIME: U256 = U256::from_limbs([1, 0, 0, 0x0800_0000_0000_0011]);

const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

#[derive(Debug, Error)]
#[error("invalid felt `{0}`")]
pub struct FeltParseError(String);

/// A raw field element as returned by the AMM contract.
///
/// Felts are opaque magnitudes: they are compared, hashed and echoed back
/// as call arguments, and only turned into numbers by the normalizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Felt(U256);

impl Felt {
    pub const ZERO: Felt = Felt(U256::ZERO);

    pub fn new(value: U256) -> Self {
        Felt(value)
    }

    pub fn as_u256(&self) -> &U256 {
        &self.0
    }

    /// The value if it fits in 64 bits.
    pub fn to_u64(&self) -> Option<u64> {
        let limbs = self.0.as_limbs();
        if limbs[1..].iter().all(|&l| l == 0) {
            Some(limbs[0])
        } else {
            None
        }
    }

    /// Unsigned magnitude as a float.
    pub fn to_f64(&self) -> f64 {
        u256_to_f64(&self.0)
    }

    /// Signed interpretation: felts above P/2 encode `value - P`.
    pub fn to_signed_f64(&self) -> f64 {
        if self.0 > PRIME >> 1usize {
            if let Some(magnitude) = PRIME.checked_sub(self.0) {
                return -u256_to_f64(&magnitude);
            }
        }
        self.to_f64()
    }

    /// Field encoding of a negative integer, `P - magnitude`.
    pub fn negative(magnitude: u128) -> Self {
        Felt(PRIME - U256::from(magnitude))
    }
}

fn u256_to_f64(value: &U256) -> f64 {
    value
        .as_limbs()
        .iter()
        .rev()
        .fold(0.0, |acc, &limb| acc * TWO_POW_64 + limb as f64)
}

impl From<u64> for Felt {
    fn from(v: u64) -> Self {
        Felt(U256::from(v))
    }
}

impl From<u128> for Felt {
    fn from(v: u128) -> Self {
        Felt(U256::from(v))
    }
}

impl From<U256> for Felt {
    fn from(v: U256) -> Self {
        Felt(v)
    }
}

impl FromStr for Felt {
    type Err = FeltParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some("") => return Err(FeltParseError(s.to_string())),
            Some(hex) => U256::from_str_radix(hex, 16),
            None => U256::from_str_radix(trimmed, 10),
        };
        parsed
            .map(Felt)
            .map_err(|_| FeltParseError(s.to_string()))
    }
}

impl fmt::Display for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl Serialize for Felt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Felt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
