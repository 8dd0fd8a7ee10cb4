//! # Compact JWS Credentials
//!
//! VC-JWT encoding: `base64url(header) "." base64url(claims) "." base64url(sig)`
//! with no padding. Header and claims are JCS-canonical JSON so the same
//! credential always encodes to the same token for a given key.
//!
//! Claims: `iss`, `sub`, `jti`, `nbf`, `exp` (Unix seconds) and `vc`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use dtrust_core::{CanonicalBytes, Timestamp};
use dtrust_crypto::ed25519::{verify_jws, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
use dtrust_crypto::JwsSigningInput;
use serde::{Deserialize, Serialize};

use crate::credential::{VcError, VerifiableCredential};

/// The only supported signature algorithm.
pub const ALG_EDDSA: &str = "EdDSA";

/// JOSE header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsHeader {
    /// Signature algorithm.
    pub alg: String,
    /// Token type.
    pub typ: String,
    /// Verification method of the signer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

/// VC-JWT claim set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VcJwtClaims {
    /// Issuer DID.
    pub iss: String,
    /// Subject DID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Credential id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Not-before, Unix seconds.
    pub nbf: i64,
    /// Expiry, Unix seconds.
    pub exp: i64,
    /// The credential.
    pub vc: VerifiableCredential,
}

/// A decoded (not necessarily verified) compact credential.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCredential {
    /// JOSE header.
    pub header: JwsHeader,
    /// Claim set.
    pub claims: VcJwtClaims,
    signing_input: JwsSigningInput,
    signature: Ed25519Signature,
}

impl DecodedCredential {
    /// The embedded credential.
    pub fn credential(&self) -> &VerifiableCredential {
        &self.claims.vc
    }

    /// Verify the signature with `public_key`.
    pub fn verify_signature(&self, public_key: &Ed25519PublicKey) -> Result<(), VcError> {
        if self.header.alg != ALG_EDDSA {
            return Err(VcError::UnsupportedAlgorithm(self.header.alg.clone()));
        }
        verify_jws(&self.signing_input, &self.signature, public_key)?;
        Ok(())
    }

    /// Whether `now` lies within `nbf..=exp`.
    pub fn is_current_at(&self, now: &Timestamp) -> bool {
        let t = now.epoch_secs();
        self.claims.nbf <= t && t <= self.claims.exp
    }
}

fn b64(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn unb64(segment: &str, what: &str) -> Result<Vec<u8>, VcError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| VcError::MalformedToken(format!("{what} is not base64url: {e}")))
}

/// Encode and sign a credential as a compact JWS.
pub fn encode(
    credential: &VerifiableCredential,
    key: &Ed25519KeyPair,
    kid: Option<String>,
) -> Result<String, VcError> {
    let header = JwsHeader {
        alg: ALG_EDDSA.to_string(),
        typ: "JWT".to_string(),
        kid,
    };
    let claims = VcJwtClaims {
        iss: credential.issuer.clone(),
        sub: credential.subject_id().map(str::to_string),
        jti: credential.id.clone(),
        nbf: credential.issuance_date.epoch_secs(),
        exp: credential.expiration_date.epoch_secs(),
        vc: credential.clone(),
    };

    let header_b64 = b64(CanonicalBytes::new(&header)?.as_bytes());
    let claims_b64 = b64(CanonicalBytes::new(&claims)?.as_bytes());
    let input = JwsSigningInput::new(&header_b64, &claims_b64);
    let signature = key.sign_jws(&input);
    Ok(format!("{}.{}", input.as_str(), b64(signature.as_bytes())))
}

/// Decode a compact JWS without verifying it.
pub fn decode(token: &str) -> Result<DecodedCredential, VcError> {
    let mut parts = token.trim().split('.');
    let (Some(h), Some(p), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(VcError::MalformedToken(
            "expected three dot-separated segments".to_string(),
        ));
    };

    let header: JwsHeader = serde_json::from_slice(&unb64(h, "header")?)?;
    let claims: VcJwtClaims = serde_json::from_slice(&unb64(p, "payload")?)?;
    let signature = Ed25519Signature::from_slice(&unb64(s, "signature")?)?;

    Ok(DecodedCredential {
        header,
        claims,
        signing_input: JwsSigningInput::new(h, p),
        signature,
    })
}
