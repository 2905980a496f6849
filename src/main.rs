use clap::Parser;
use tracing_subscriber::EnvFilter;

use amm_snapshot::cli::{Cli, Command};
use amm_snapshot::{call, capture, rpc};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Snapshot {
            connection,
            format,
            output,
            path,
        } => capture::run(&connection, format, output, path),
        Command::Call {
            connection,
            entrypoint,
            args,
        } => call::run(&connection, &entrypoint, &args),
        Command::Selector { name } => {
            println!("{}", rpc::selector(&name));
            Ok(())
        }
    }
}
