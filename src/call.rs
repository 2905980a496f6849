use anyhow::{Context, Result, anyhow};
use tracing::warn;

use crate::cli::ConnectionArgs;
use crate::config::SnapshotConfig;
use crate::model::Felt;
use crate::rpc::{Entrypoint, RemoteQueryClient, selector};

/// Entry point for the `call` command: one raw view call, felts printed one per line.
pub fn run(connection: &ConnectionArgs, entrypoint: &str, args: &[String]) -> Result<()> {
    let config = SnapshotConfig::from_cli(connection)?;
    let calldata = parse_calldata(args)?;

    if entrypoint.parse::<Entrypoint>().is_err() {
        warn!("`{entrypoint}` is not one of the AMM views read by the snapshot");
    }

    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    let result = rt.block_on(async {
        let client = config.client().context("building RPC client")?;
        eprintln!(
            "{} {}({}) = selector {}",
            client.contract(),
            entrypoint,
            args.join(", "),
            selector(entrypoint)
        );
        let values = client
            .call(entrypoint, &calldata)
            .await
            .with_context(|| format!("calling {entrypoint}"))?;
        Ok::<_, anyhow::Error>(values)
    })?;

    for felt in result {
        println!("{felt}");
    }
    Ok(())
}

fn parse_calldata(args: &[String]) -> Result<Vec<Felt>> {
    args.iter()
        .map(|a| a.parse::<Felt>().map_err(|e| anyhow!(e)))
        .collect()
}
