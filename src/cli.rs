//! Command-line interface.

use clap::{Parser, Subcommand};

/// Hierarchical voice-channel control plane for virtual-world regions.
#[derive(Debug, Parser)]
#[command(name = "voicegate", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP control service in front of the voice server (default).
    Serve,
    /// Run the world-side agent that mirrors the desired-channel attribute.
    Sync,
}
