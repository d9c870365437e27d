//! Command line interface.

use std::path::PathBuf;

use clap::Parser;

/// Mumble moderator: runs moderation modules against a voice server.
#[derive(Debug, Parser)]
#[command(name = "mumo", version, about)]
pub struct Cli {
    /// Load configuration from this file (TOML or INI).
    #[arg(short, long, default_value = "mumo.toml")]
    pub ini: PathBuf,

    /// Verbose output, at the configured log level [default].
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only error output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Run against an in-memory voice server with this many virtual servers.
    #[arg(long, value_name = "N")]
    pub mock: Option<i32>,
}
