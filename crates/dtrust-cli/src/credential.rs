//! # Credential Subcommands
//!
//! Offline inspection and verification of compact credential JWTs. The
//! verification key is recovered from the issuer DID itself, so neither
//! command needs the API or a registry.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use dtrust_core::Timestamp;
use dtrust_vc::did::public_key_from_did;
use dtrust_vc::jwt::{self, JwsHeader};
use dtrust_vc::{DecodedCredential, VerifiableCredential};

/// Arguments for `dtrust inspect` and `dtrust verify`.
#[derive(Args, Debug)]
pub struct TokenArgs {
    /// Compact JWS form of the credential.
    #[arg(value_name = "JWT")]
    pub token: String,
}

#[derive(Serialize)]
struct Inspection<'a> {
    header: &'a JwsHeader,
    credential: &'a VerifiableCredential,
}

/// Result of an offline verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    /// The signature verifies under the issuer DID key.
    pub signature_valid: bool,
    /// Now falls inside the validity window.
    pub currently_valid: bool,
    /// Issuer DID as claimed.
    pub issuer: String,
    /// Why verification failed, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Verdict {
    /// Signature checks out and `now` is inside the validity window.
    pub fn verified(&self) -> bool {
        self.signature_valid && self.currently_valid
    }
}

/// Verify `decoded` against the key embedded in its issuer DID.
pub fn verify_decoded(decoded: &DecodedCredential, now: &Timestamp) -> Verdict {
    let issuer = decoded.claims.iss.clone();
    let signature = public_key_from_did(&issuer)
        .and_then(|key| decoded.verify_signature(&key))
        .map_err(|e| e.to_string());
    let issuer_consistent = decoded.credential().issuer == issuer;

    let reason = match (&signature, issuer_consistent) {
        (Err(e), _) => Some(e.clone()),
        (Ok(()), false) => Some("credential issuer differs from token issuer".to_string()),
        (Ok(()), true) if !decoded.is_current_at(now) => {
            Some("outside the validity window".to_string())
        }
        _ => None,
    };

    Verdict {
        signature_valid: signature.is_ok() && issuer_consistent,
        currently_valid: decoded.is_current_at(now),
        issuer,
        reason,
    }
}

/// Execute `dtrust inspect`.
pub fn run_inspect(args: &TokenArgs) -> Result<u8> {
    let decoded = jwt::decode(args.token.trim()).context("cannot decode credential")?;
    let view = Inspection {
        header: &decoded.header,
        credential: decoded.credential(),
    };
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(0)
}

/// Execute `dtrust verify`. Exit status 0 when verified, 1 otherwise.
pub fn run_verify(args: &TokenArgs) -> Result<u8> {
    let decoded = jwt::decode(args.token.trim()).context("cannot decode credential")?;
    let verdict = verify_decoded(&decoded, &Timestamp::now());
    tracing::debug!(issuer = %verdict.issuer, verified = verdict.verified(), "verified credential");
    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(if verdict.verified() { 0 } else { 1 })
}
