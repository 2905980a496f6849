use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::{ConnectionArgs, OutputTarget};
use crate::config::SnapshotConfig;
use crate::output::{self, Format, Sink};
use crate::snapshot::SnapshotAggregator;

/// Entry point for the `snapshot` command.
/// Resolves the connection, runs the staged aggregation once and hands the
/// normalized state to the chosen format and sink. Nothing is written if
/// any stage fails.
pub fn run(
    connection: &ConnectionArgs,
    format: Format,
    target: OutputTarget,
    path: Option<PathBuf>,
) -> Result<()> {
    let config = SnapshotConfig::from_cli(connection)?;
    let sink = match target {
        OutputTarget::Stdout => Sink::Stdout,
        OutputTarget::File => Sink::File(path.unwrap_or_else(|| format.default_path())),
    };

    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    rt.block_on(capture_async(&config, format, &sink))
}

async fn capture_async(config: &SnapshotConfig, format: Format, sink: &Sink) -> Result<()> {
    info!(
        network = ?config.network,
        amm = %config.amm_address,
        block = ?config.block,
        "capturing AMM state"
    );

    let client = config.client().context("building RPC client")?;
    let state = SnapshotAggregator::new(&client)
        .with_max_in_flight(config.max_in_flight)
        .snapshot()
        .await
        .context("AMM snapshot failed")?;

    info!(pools = state.pools.len(), time = state.time, "snapshot complete");
    output::emit(&state, format, sink)
}
