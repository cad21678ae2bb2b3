//! The command-line front end: a thin wrapper over [`crate::engine::scan`]
//! that builds a [`crate::config::ScanConfig`] from flags, runs the engine,
//! and renders the result. Grounded in `deepbrainspace-guardy/src/cli/mod.rs`'s
//! `clap`-derive structure — this crate ships only the one `scan` subcommand
//! the engine needs, dropping `init`/`status`/`mcp`/`hooks`.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Credential and secret scanning engine.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (TOML, JSON, or YAML).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,

    /// Enable debug logging.
    #[arg(short, long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a directory tree for credentials and secrets.
    Scan(commands::scan::ScanArgs),
}

impl Cli {
    pub fn run(self) -> anyhow::Result<i32> {
        match self.command {
            Commands::Scan(args) => commands::scan::execute(args, self.config.as_deref()),
        }
    }
}
