pub mod felt;
pub mod option;
pub mod pool;

pub use felt::Felt;
pub use option::{OptionKey, OptionSide, OptionType, PoolOption, RawOption, VolatilityKey};
pub use pool::{AmmState, LiqPool};
