use serde::{Deserialize, Serialize};

use super::felt::Felt;

/// Number of felts per option record in a `get_all_options` response.
pub const OPTION_RECORD_LEN: usize = 6;

/// Which side of the trade the pool holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionSide {
    Long,
    Short,
}

impl OptionSide {
    pub fn from_felt(raw: &Felt) -> Option<Self> {
        match raw.to_u64()? {
            0 => Some(OptionSide::Long),
            1 => Some(OptionSide::Short),
            _ => None,
        }
    }

    pub fn to_felt(self) -> Felt {
        match self {
            OptionSide::Long => Felt::from(0u64),
            OptionSide::Short => Felt::from(1u64),
        }
    }
}

/// Option family. Decides the token the pool's capital is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    /// Capital held in the base token (18 decimals).
    Call,
    /// Capital held in the quote stable-coin (6 decimals).
    Put,
}

impl OptionType {
    pub fn from_felt(raw: &Felt) -> Option<Self> {
        match raw.to_u64()? {
            0 => Some(OptionType::Call),
            1 => Some(OptionType::Put),
            _ => None,
        }
    }
}

/// Full identity of an option within a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionKey {
    pub side: OptionSide,
    pub maturity: u64,
    pub strike: Felt,
}

/// The subset of [`OptionKey`] that `get_pool_volatility_auto` is keyed on.
/// Long and short options at the same maturity/strike share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VolatilityKey {
    pub maturity: u64,
    pub strike: Felt,
}

impl std::fmt::Display for OptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}/{}/{}", self.side, self.maturity, self.strike)
    }
}

impl std::fmt::Display for VolatilityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.maturity, self.strike)
    }
}

// ── Raw (pre-normalization) record ───────────────────────────────────

/// An option as discovered on chain, before any scaling.
#[derive(Debug, Clone, PartialEq)]
pub struct RawOption {
    pub option_side: OptionSide,
    pub maturity: u64,
    pub strike_price: Felt,
    pub quote_token_address: Felt,
    pub base_token_address: Felt,
    pub option_type: OptionType,
    /// Filled by the position query.
    pub pool_position: Option<Felt>,
    /// Filled by the volatility query.
    pub volatility: Option<Felt>,
}

impl RawOption {
    /// Decode one six-felt record:
    /// `option_side, maturity, strike_price, quote_token_address, base_token_address, option_type`.
    pub fn from_record(record: &[Felt]) -> Result<Self, String> {
        let [side, maturity, strike, quote, base, option_type] = record else {
            return Err(format!(
                "option record has {} fields, expected {OPTION_RECORD_LEN}",
                record.len()
            ));
        };
        Ok(RawOption {
            option_side: OptionSide::from_felt(side)
                .ok_or_else(|| format!("unknown option side {side}"))?,
            maturity: maturity
                .to_u64()
                .ok_or_else(|| format!("maturity {maturity} is not a timestamp"))?,
            strike_price: *strike,
            quote_token_address: *quote,
            base_token_address: *base,
            option_type: OptionType::from_felt(option_type)
                .ok_or_else(|| format!("unknown option type {option_type}"))?,
            pool_position: None,
            volatility: None,
        })
    }

    pub fn key(&self) -> OptionKey {
        OptionKey {
            side: self.option_side,
            maturity: self.maturity,
            strike: self.strike_price,
        }
    }

    pub fn volatility_key(&self) -> VolatilityKey {
        VolatilityKey {
            maturity: self.maturity,
            strike: self.strike_price,
        }
    }
}

// ── Normalized output ────────────────────────────────────────────────

/// An option with every raw figure scaled to decimal units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolOption {
    pub option_side: OptionSide,
    pub maturity: u64,
    pub strike_price: f64,
    pub quote_token_address: Felt,
    pub base_token_address: Felt,
    pub option_type: OptionType,
    pub pool_position: f64,
    pub volatility: f64,
}
