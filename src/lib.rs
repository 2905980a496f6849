pub mod batch;
pub mod call;
pub mod capture;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod normalize;
pub mod output;
pub mod rpc;
pub mod snapshot;

pub use error::SnapshotError;
pub use snapshot::SnapshotAggregator;
