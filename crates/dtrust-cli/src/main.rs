//! # dtrust CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dtrust_cli::credential::{run_inspect, run_verify, TokenArgs};
use dtrust_cli::keys::{run_did, run_keygen, DidArgs, KeygenArgs};

/// DecenTrust operator CLI.
///
/// Generates issuer keys, derives their DIDs, and inspects or verifies
/// credential JWTs without contacting the API.
#[derive(Parser, Debug)]
#[command(name = "dtrust", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an issuer seed (hex) and print its DID.
    Keygen(KeygenArgs),

    /// Print the DID for an issuer seed.
    Did(DidArgs),

    /// Decode a credential JWT without verifying it.
    Inspect(TokenArgs),

    /// Verify a credential JWT against the key in its issuer DID.
    Verify(TokenArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Keygen(args) => run_keygen(args),
        Commands::Did(args) => run_did(args),
        Commands::Inspect(args) => run_inspect(args),
        Commands::Verify(args) => run_verify(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
