pub mod entrypoint;
pub mod starknet;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::Felt;

pub use entrypoint::{Entrypoint, selector};
pub use starknet::{BlockId, StarknetRpc};

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("contract error {code}: {message}")]
    Contract { code: i64, message: String },

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("response carried neither result nor error")]
    MissingResult,
}

/// Read-only access to the AMM contract.
///
/// Implementations must be callable concurrently: the snapshot pipeline
/// issues many calls at once through a shared reference.
#[async_trait]
pub trait RemoteQueryClient: Send + Sync {
    /// Call a view function by name and return its raw felts.
    async fn call(&self, entrypoint: &str, args: &[Felt]) -> Result<Vec<Felt>, RpcError>;
}

