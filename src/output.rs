use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::model::AmmState;

/// How the snapshot is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Pretty-printed Rust structure
    Debug,
    /// Pretty-printed JSON
    Json,
}

impl Format {
    pub fn default_path(self) -> PathBuf {
        match self {
            Format::Debug => PathBuf::from("amm_state.txt"),
            Format::Json => PathBuf::from("amm_state.json"),
        }
    }
}

/// Where the rendered snapshot goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    Stdout,
    File(PathBuf),
}

pub fn render(state: &AmmState, format: Format) -> Result<String> {
    match format {
        Format::Debug => Ok(format!("{state:#?}")),
        Format::Json => serde_json::to_string_pretty(state).context("serializing AMM state"),
    }
}

pub fn emit(state: &AmmState, format: Format, sink: &Sink) -> Result<()> {
    let rendered = render(state, format)?;
    match sink {
        Sink::Stdout => println!("{rendered}"),
        Sink::File(path) => write_file(path, &rendered)?,
    }
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
    eprintln!("Written to {}", path.display());
    Ok(())
}
