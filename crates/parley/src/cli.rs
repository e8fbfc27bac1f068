//! CLI argument parsing.
//!
//! Exactly the two control-surface entry points: `allocate` books a fresh
//! slot and prints the code a peer can join with; `join` consumes a code a
//! peer already has. Everything else (file transfer, TUI, contacts, relay
//! discovery) is a collaborator concern and is not wired up here.

use clap::{Parser, Subcommand};

const DEFAULT_RELAY: &str = "ws://127.0.0.1:4433";

#[derive(Parser)]
#[command(name = "parley")]
#[command(author, version, about = "Bootstrap an authenticated peer-to-peer channel from a short code", long_about = None)]
pub struct Cli {
    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Allocate a slot on the rendezvous server and wait for a peer to join
    Allocate(AllocateArgs),

    /// Join a slot using a code a peer has already shared
    Join(JoinArgs),
}

#[derive(clap::Args)]
pub struct AllocateArgs {
    /// Rendezvous server WebSocket URL
    #[arg(long, default_value = DEFAULT_RELAY)]
    pub relay: String,

    /// Number of random password bytes (each becomes one code word)
    #[arg(long, default_value_t = 2)]
    pub words: usize,
}

#[derive(clap::Args)]
pub struct JoinArgs {
    /// The code a peer shared, e.g. "5-affix-acre"
    pub code: String,

    /// Rendezvous server WebSocket URL
    #[arg(long, default_value = DEFAULT_RELAY)]
    pub relay: String,
}
