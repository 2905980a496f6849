use std::collections::HashMap;

use crate::error::SnapshotError;
use crate::model::{AmmState, Felt, LiqPool, OptionType, PoolOption};
use crate::snapshot::{Accumulator, RawPool};

/// Divisors that turn raw on-chain integers into decimal units.
///
/// Pool capital is denominated in the token of the pool's option type, so its
/// divisor is looked up per [`OptionType`]. Fixed-point figures (strikes,
/// volatilities, the pool position value) and option positions use fixed
/// divisors regardless of type.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleTable {
    capital: HashMap<OptionType, f64>,
    fixed_point: f64,
    position: f64,
}

impl Default for ScaleTable {
    fn default() -> Self {
        ScaleTable {
            capital: HashMap::from([(OptionType::Call, 1e18), (OptionType::Put, 1e6)]),
            fixed_point: 2f64.powi(61),
            position: 1e18,
        }
    }
}

impl ScaleTable {
    /// A table with no capital entries; register them with [`Self::with_capital`].
    pub fn empty() -> Self {
        ScaleTable {
            capital: HashMap::new(),
            ..Default::default()
        }
    }

    pub fn with_capital(mut self, option_type: OptionType, divisor: f64) -> Self {
        self.capital.insert(option_type, divisor);
        self
    }

    pub fn capital_divisor(&self, option_type: OptionType) -> Option<f64> {
        self.capital.get(&option_type).copied()
    }

    pub fn fixed_point_divisor(&self) -> f64 {
        self.fixed_point
    }

    pub fn position_divisor(&self) -> f64 {
        self.position
    }
}

/// Turn a fully populated accumulator into the final snapshot.
///
/// Pure: the same accumulator, table and time always give the same state.
pub fn normalize(
    acc: &Accumulator,
    scales: &ScaleTable,
    time: i64,
) -> Result<AmmState, SnapshotError> {
    let pools = acc
        .pools()
        .iter()
        .map(|pool| normalize_pool(pool, scales))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(AmmState { pools, time })
}

fn normalize_pool(pool: &RawPool, scales: &ScaleTable) -> Result<LiqPool, SnapshotError> {
    let address = pool.address;
    let option_type = pool
        .options()
        .first()
        .map(|o| o.option_type)
        .ok_or(SnapshotError::EmptyPool { pool: address })?;
    if pool.options().iter().any(|o| o.option_type != option_type) {
        return Err(SnapshotError::MixedOptionTypes { pool: address });
    }
    let capital = scales
        .capital_divisor(option_type)
        .ok_or(SnapshotError::UnknownOptionType {
            pool: address,
            option_type,
        })?;

    let require = |value: Option<Felt>, field: &'static str| {
        value.ok_or(SnapshotError::Incomplete {
            pool: address,
            field,
        })
    };

    let options = pool
        .options()
        .iter()
        .map(|o| -> Result<PoolOption, SnapshotError> {
            Ok(PoolOption {
                option_side: o.option_side,
                maturity: o.maturity,
                strike_price: o.strike_price.to_f64() / scales.fixed_point,
                quote_token_address: o.quote_token_address,
                base_token_address: o.base_token_address,
                option_type: o.option_type,
                pool_position: require(o.pool_position, "pool_position")?.to_signed_f64()
                    / scales.position,
                volatility: require(o.volatility, "volatility")?.to_f64() / scales.fixed_point,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LiqPool {
        address,
        option_type,
        unlocked_capital: require(pool.unlocked_capital, "unlocked_capital")?.to_f64() / capital,
        locked_capital: require(pool.locked_capital, "locked_capital")?.to_f64() / capital,
        lpool_bal: require(pool.lpool_bal, "lpool_bal")?.to_f64() / capital,
        value_pool_position: require(pool.value_pool_position, "value_pool_position")?
            .to_signed_f64()
            / scales.fixed_point,
        options,
    })
}
