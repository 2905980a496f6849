use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::error::SnapshotError;
use crate::model::{Felt, OptionKey, RawOption, VolatilityKey};

/// Raw, in-progress figures for one pool.
#[derive(Debug, Clone, Default)]
pub struct RawPool {
    pub address: Felt,
    pub locked_capital: Option<Felt>,
    pub unlocked_capital: Option<Felt>,
    pub lpool_bal: Option<Felt>,
    pub value_pool_position: Option<Felt>,
    options: Vec<RawOption>,
    by_key: HashMap<OptionKey, usize>,
    by_volatility_key: HashMap<VolatilityKey, Vec<usize>>,
}

impl RawPool {
    pub fn new(address: Felt) -> Self {
        RawPool {
            address,
            ..Default::default()
        }
    }

    /// Options in discovery order.
    pub fn options(&self) -> &[RawOption] {
        &self.options
    }

    /// Add a freshly discovered option. Keys must be unique within the pool.
    pub fn insert_option(&mut self, option: RawOption) -> Result<(), SnapshotError> {
        let idx = self.options.len();
        match self.by_key.entry(option.key()) {
            Entry::Occupied(e) => {
                return Err(SnapshotError::DuplicateOption {
                    pool: self.address,
                    key: *e.key(),
                });
            }
            Entry::Vacant(e) => {
                e.insert(idx);
            }
        }
        self.by_volatility_key
            .entry(option.volatility_key())
            .or_default()
            .push(idx);
        self.options.push(option);
        Ok(())
    }

    /// Store a position figure on the option with exactly this key.
    pub fn set_position(&mut self, key: &OptionKey, value: Felt) -> Result<(), SnapshotError> {
        let idx = *self
            .by_key
            .get(key)
            .ok_or(SnapshotError::UnmatchedPosition {
                pool: self.address,
                key: *key,
            })?;
        self.options[idx].pool_position = Some(value);
        Ok(())
    }

    /// Store a volatility figure on every option sharing maturity and strike,
    /// whatever its side.
    pub fn set_volatility(&mut self, key: &VolatilityKey, value: Felt) -> Result<(), SnapshotError> {
        let indices = self
            .by_volatility_key
            .get(key)
            .ok_or(SnapshotError::UnmatchedVolatility {
                pool: self.address,
                key: *key,
            })?;
        for &idx in indices {
            self.options[idx].volatility = Some(value);
        }
        Ok(())
    }
}

/// Pool address → raw pool state, in discovery order.
///
/// Owned by the aggregator; fan-out tasks never touch it, their answers are
/// merged in after each stage's batch has resolved.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    pools: Vec<RawPool>,
    index: HashMap<Felt, usize>,
}

impl Accumulator {
    /// One empty entry per address. Addresses must be unique.
    pub fn with_pools(addresses: impl IntoIterator<Item = Felt>) -> Result<Self, SnapshotError> {
        let mut acc = Accumulator::default();
        for address in addresses {
            if acc.index.insert(address, acc.pools.len()).is_some() {
                return Err(SnapshotError::DuplicatePool { pool: address });
            }
            acc.pools.push(RawPool::new(address));
        }
        Ok(acc)
    }

    pub fn pools(&self) -> &[RawPool] {
        &self.pools
    }

    pub fn addresses(&self) -> impl Iterator<Item = Felt> + '_ {
        self.pools.iter().map(|p| p.address)
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn option_count(&self) -> usize {
        self.pools.iter().map(|p| p.options.len()).sum()
    }

    pub fn pool(&self, address: &Felt) -> Option<&RawPool> {
        self.index.get(address).map(|&i| &self.pools[i])
    }

    pub fn pool_mut(&mut self, address: &Felt) -> Option<&mut RawPool> {
        self.index.get(address).map(|&i| &mut self.pools[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OptionSide, OptionType};

    fn option(side: OptionSide, maturity: u64, strike: u64) -> RawOption {
        RawOption {
            option_side: side,
            maturity,
            strike_price: Felt::from(strike),
            quote_token_address: Felt::from(1u64),
            base_token_address: Felt::from(2u64),
            option_type: OptionType::Call,
            pool_position: None,
            volatility: None,
        }
    }

    #[test]
    fn duplicate_pools_are_rejected() {
        let a = Felt::from(0xa1u64);
        assert!(matches!(
            Accumulator::with_pools([a, Felt::from(0xb2u64), a]),
            Err(SnapshotError::DuplicatePool { .. })
        ));
    }

    #[test]
    fn duplicate_option_keys_are_rejected() {
        let mut pool = RawPool::new(Felt::from(9u64));
        pool.insert_option(option(OptionSide::Long, 100, 500)).unwrap();
        pool.insert_option(option(OptionSide::Short, 100, 500)).unwrap();
        let err = pool
            .insert_option(option(OptionSide::Long, 100, 500))
            .unwrap_err();
        assert!(matches!(err, SnapshotError::DuplicateOption { .. }));
        assert_eq!(pool.options().len(), 2);
    }

    #[test]
    fn position_needs_the_full_key() {
        let mut pool = RawPool::new(Felt::from(9u64));
        pool.insert_option(option(OptionSide::Long, 100, 500)).unwrap();
        pool.insert_option(option(OptionSide::Short, 100, 500)).unwrap();

        let key = option(OptionSide::Short, 100, 500).key();
        pool.set_position(&key, Felt::from(3u64)).unwrap();
        assert_eq!(pool.options()[0].pool_position, None);
        assert_eq!(pool.options()[1].pool_position, Some(Felt::from(3u64)));

        let missing = option(OptionSide::Long, 100, 501).key();
        assert!(matches!(
            pool.set_position(&missing, Felt::from(1u64)),
            Err(SnapshotError::UnmatchedPosition { .. })
        ));
    }

    #[test]
    fn volatility_lands_on_both_sides() {
        let mut pool = RawPool::new(Felt::from(9u64));
        pool.insert_option(option(OptionSide::Long, 100, 500)).unwrap();
        pool.insert_option(option(OptionSide::Short, 100, 500)).unwrap();
        pool.insert_option(option(OptionSide::Long, 200, 500)).unwrap();

        let key = option(OptionSide::Long, 100, 500).volatility_key();
        pool.set_volatility(&key, Felt::from(8u64)).unwrap();
        let vols: Vec<_> = pool.options().iter().map(|o| o.volatility).collect();
        assert_eq!(vols, vec![Some(Felt::from(8u64)), Some(Felt::from(8u64)), None]);

        let missing = option(OptionSide::Long, 300, 500).volatility_key();
        assert!(matches!(
            pool.set_volatility(&missing, Felt::from(1u64)),
            Err(SnapshotError::UnmatchedVolatility { .. })
        ));
    }
}
