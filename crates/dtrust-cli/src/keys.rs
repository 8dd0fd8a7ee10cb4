//! # Key Subcommands
//!
//! Issuer seed generation and DID derivation. The seed format is the one
//! the API reads from `ISSUER_SIGNING_KEY_HEX` or `ISSUER_KEY_FILE`: 64 hex
//! characters.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use zeroize::Zeroizing;

use dtrust_core::Did;
use dtrust_crypto::Ed25519KeyPair;
use dtrust_vc::did::did_for_key;

/// Arguments for `dtrust keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Write the seed to this file instead of printing it.
    #[arg(long, short)]
    pub out: Option<PathBuf>,
    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for `dtrust did`.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct DidArgs {
    /// Hex-encoded 32-byte seed.
    #[arg(long)]
    pub key_hex: Option<String>,
    /// File holding a hex-encoded seed.
    #[arg(long)]
    pub key_file: Option<PathBuf>,
}

/// DID of the key pair derived from `seed_hex`.
pub fn did_for_seed(seed_hex: &str) -> Result<Did> {
    let key = Ed25519KeyPair::from_seed_hex(seed_hex.trim()).context("invalid seed")?;
    Ok(did_for_key(&key.public_key())?)
}

/// Read a seed file, trimming whitespace.
pub fn read_seed_file(path: &Path) -> Result<Zeroizing<String>> {
    let contents = Zeroizing::new(
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read key file: {}", path.display()))?,
    );
    Ok(Zeroizing::new(contents.trim().to_string()))
}

/// Execute `dtrust keygen`.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let key = Ed25519KeyPair::generate();
    let seed = key.seed_hex();
    let did = did_for_key(&key.public_key())?;

    match &args.out {
        Some(path) => {
            if path.exists() && !args.force {
                bail!(
                    "{} already exists; pass --force to overwrite",
                    path.display()
                );
            }
            write_secret(path, seed.as_str())?;
            println!("OK: wrote issuer seed to {}", path.display());
            println!("  DID: {did}");
        }
        None => {
            println!("seed: {}", seed.as_str());
            println!("did:  {did}");
        }
    }
    Ok(0)
}

/// Execute `dtrust did`.
pub fn run_did(args: &DidArgs) -> Result<u8> {
    let seed = match (&args.key_hex, &args.key_file) {
        (Some(hex), _) => Zeroizing::new(hex.clone()),
        (None, Some(path)) => read_seed_file(path)?,
        (None, None) => bail!("one of --key-hex or --key-file is required"),
    };
    println!("{}", did_for_seed(&seed)?);
    Ok(0)
}

#[cfg(unix)]
fn write_secret(path: &Path, contents: &str) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .with_context(|| format!("failed to create key file: {}", path.display()))?;
    writeln!(file, "{contents}")
        .with_context(|| format!("failed to write key file: {}", path.display()))?;
    Ok(())
}

#[cfg(not(unix))]
fn write_secret(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, format!("{contents}\n"))
        .with_context(|| format!("failed to write key file: {}", path.display()))
}
