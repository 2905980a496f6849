use thiserror::Error;

use crate::model::{Felt, OptionKey, VolatilityKey};
use crate::rpc::{Entrypoint, RpcError};

/// Why a snapshot run was aborted. Every variant is fatal: a run either
/// produces a complete state or nothing.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("{entrypoint}({}) failed: {source}", fmt_args(.args))]
    Transport {
        entrypoint: Entrypoint,
        args: Vec<Felt>,
        #[source]
        source: RpcError,
    },

    #[error("malformed {entrypoint} response: {reason}")]
    Malformed {
        entrypoint: Entrypoint,
        reason: String,
    },

    #[error("pool {pool} was returned twice by get_all_lptoken_addresses")]
    DuplicatePool { pool: Felt },

    #[error("{entrypoint} answered for unknown pool {pool}")]
    UnknownPool { entrypoint: Entrypoint, pool: Felt },

    #[error("pool {pool} lists option {key} more than once")]
    DuplicateOption { pool: Felt, key: OptionKey },

    #[error("position result for {key} matched no option in pool {pool}")]
    UnmatchedPosition { pool: Felt, key: OptionKey },

    #[error("volatility result for {key} matched no option in pool {pool}")]
    UnmatchedVolatility { pool: Felt, key: VolatilityKey },

    #[error("pool {pool} has no options, cannot derive its option type")]
    EmptyPool { pool: Felt },

    #[error("pool {pool} mixes option types")]
    MixedOptionTypes { pool: Felt },

    #[error("no capital scale configured for option type {option_type:?} (pool {pool})")]
    UnknownOptionType {
        pool: Felt,
        option_type: crate::model::OptionType,
    },

    #[error("pool {pool} is missing `{field}` at normalization")]
    Incomplete { pool: Felt, field: &'static str },
}

fn fmt_args(args: &[Felt]) -> String {
    args.iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
