//! `parley` — the two control-surface entry points as CLI subcommands.

#![forbid(unsafe_code)]

mod cli;
mod exit_codes;
mod logging;
mod ws;

use clap::Parser;
use rand::RngCore;

use cli::{AllocateArgs, Cli, Commands, JoinArgs};
use parley_proto::codec;
use parley_proto::session::{client_allocate, client_join};
use parley_proto::transport::LoopbackTransport;
use parley_proto::ProtocolError;
use ws::WsSignaling;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet);

    let code = match cli.command {
        Commands::Allocate(args) => run_allocate(args).await,
        Commands::Join(args) => run_join(args).await,
    };
    std::process::exit(code);
}

async fn run_allocate(args: AllocateArgs) -> i32 {
    let mut pass = vec![0u8; args.words.max(1)];
    rand::thread_rng().fill_bytes(&mut pass);

    let mut signaling = match WsSignaling::connect(&args.relay).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("could not reach relay at {}: {e}", args.relay);
            return exit_codes::NETWORK_ERROR;
        }
    };

    // This binary's transport collaborator is a loopback stand-in; the real
    // datagram transport is out of scope here.
    let transport = LoopbackTransport::new();

    let result = client_allocate(&pass, &mut signaling, &transport, |code| {
        println!("On the other computer, run:\n\n    parley join {code}\n");
    })
    .await;

    match result {
        Ok(wormhole) => {
            println!("connected (relay: {})", wormhole.is_relay());
            println!("fingerprint: {}", hex_fingerprint(&wormhole.fingerprint()));
            exit_codes::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

async fn run_join(args: JoinArgs) -> i32 {
    let (slot_number, pass) = match codec::decode(&args.code) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("invalid code: {e}");
            return exit_codes::ERROR;
        }
    };
    let slot = slot_number.to_string();

    let mut signaling = match WsSignaling::connect(&format!("{}/{slot}", args.relay)).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("could not reach relay at {}: {e}", args.relay);
            return exit_codes::NETWORK_ERROR;
        }
    };

    let transport = LoopbackTransport::new();

    match client_join(&slot, &pass, &mut signaling, &transport).await {
        Ok(wormhole) => {
            println!("connected (relay: {})", wormhole.is_relay());
            println!("fingerprint: {}", hex_fingerprint(&wormhole.fingerprint()));
            exit_codes::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

fn report_error(err: &ProtocolError) -> i32 {
    eprintln!("{err}");
    match err {
        ProtocolError::BadKey => exit_codes::AUTH_FAILURE,
        ProtocolError::Timeout | ProtocolError::SlotTimedOut | ProtocolError::Cancelled => {
            exit_codes::CANCELLED
        }
        ProtocolError::NoSuchSlot
        | ProtocolError::NoMoreSlots
        | ProtocolError::TransportFailure(_)
        | ProtocolError::Io(_)
        | ProtocolError::BadVersion => exit_codes::NETWORK_ERROR,
        ProtocolError::InvalidCode(_) | ProtocolError::ProtocolViolation(_) => exit_codes::ERROR,
    }
}

fn hex_fingerprint(bytes: &[u8; 8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
