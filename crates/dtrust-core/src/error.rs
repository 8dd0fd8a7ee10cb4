//! # Error Hierarchy
//!
//! Structured error types shared across the workspace, built with `thiserror`.
//!
//! Each variant carries the offending input or the state at the time of
//! failure so that operators can diagnose a rejected request from the log
//! line alone.

use thiserror::Error;

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in signed payloads.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Errors raised by lifecycle state machines.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateTransitionError {
    /// The attempted transition is not valid from the current state.
    #[error("invalid {machine} transition from {from} to {to}")]
    InvalidTransition {
        /// Which state machine rejected the transition.
        machine: &'static str,
        /// The current state name.
        from: String,
        /// The attempted target state name.
        to: String,
    },

    /// The machine is in a terminal state and accepts no further transitions.
    #[error("{machine} is in terminal state {state}")]
    Terminal {
        /// Which state machine rejected the transition.
        machine: &'static str,
        /// The terminal state.
        state: String,
    },
}

/// Validation errors for domain primitives and inbound requests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Email address is malformed.
    #[error("invalid email address: \"{0}\"")]
    InvalidEmail(String),

    /// DID does not match `did:<method>:<id>(/<path>)*(#<fragment>)?`.
    #[error("invalid DID format: \"{0}\" (expected did:<method>:<identifier>)")]
    InvalidDid(String),

    /// Credential identifier is empty or contains whitespace.
    #[error("invalid credential id: \"{0}\"")]
    InvalidCredentialId(String),

    /// Developer identifier is not a UUID.
    #[error("invalid developer id: \"{0}\"")]
    InvalidDeveloperId(String),

    /// A required field was missing or blank.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A field failed a format or range rule.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// The offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Timestamp string is not valid UTC ISO 8601.
    #[error("invalid timestamp: \"{value}\" ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Errors in cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key generation or parsing failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// An encoded value (hex, base64url, compact token) was malformed.
    #[error("encoding error: {0}")]
    Encoding(String),
}
