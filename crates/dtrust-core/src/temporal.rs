//! # Temporal Types: UTC-Only Timestamps
//!
//! Defines `Timestamp`, a UTC timestamp truncated to seconds precision.
//!
//! Every instant recorded by the onboarding flow (code issuance, credential
//! validity windows, lifecycle transitions) is a `Timestamp`, so signed
//! credential payloads always render dates as `YYYY-MM-DDTHH:MM:SSZ`.
//!
//! Non-UTC inputs are rejected by [`Timestamp::parse`]. Payment provider
//! data arrives as epoch seconds and goes through
//! [`Timestamp::from_epoch_secs`].

use chrono::{DateTime, Duration, Months, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A UTC-only timestamp, truncated to seconds precision.
///
/// # Construction
///
/// - [`Timestamp::now()`]: current UTC time, truncated.
/// - [`Timestamp::from_utc()`]: from a `DateTime<Utc>`, truncating sub-seconds.
/// - [`Timestamp::parse()`]: from an ISO8601 string, rejecting non-UTC offsets.
/// - [`Timestamp::from_epoch_secs()`]: from Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from the current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse a timestamp from an RFC 3339 string with a `Z` suffix.
    ///
    /// Explicit offsets, including `+00:00`, are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTimestamp`] if the string is not
    /// RFC 3339 or does not end in `Z`.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if !s.ends_with('Z') {
            return Err(ValidationError::InvalidTimestamp {
                value: s.to_string(),
                reason: "must use Z suffix (UTC only)".to_string(),
            });
        }
        Self::parse_lenient(s)
    }

    /// Parse a timestamp from an RFC 3339 string, accepting any offset
    /// and converting to UTC.
    pub fn parse_lenient(s: &str) -> Result<Self, ValidationError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| ValidationError::InvalidTimestamp {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Create a timestamp from a Unix epoch timestamp (seconds).
    pub fn from_epoch_secs(secs: i64) -> Result<Self, ValidationError> {
        let dt = DateTime::from_timestamp(secs, 0).ok_or_else(|| {
            ValidationError::InvalidTimestamp {
                value: secs.to_string(),
                reason: "out of range Unix timestamp".to_string(),
            }
        })?;
        Ok(Self(dt))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the Unix epoch timestamp in seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Add calendar months, clamping the day to the end of shorter months
    /// (January 31 + 1 month = February 28/29).
    ///
    /// Saturates at the maximum representable date.
    pub fn add_months(&self, months: u32) -> Self {
        Self(
            self.0
                .checked_add_months(Months::new(months))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        )
    }

    /// Add a number of seconds. Negative values move backwards.
    pub fn plus_secs(&self, secs: i64) -> Self {
        Self(
            self.0
                .checked_add_signed(Duration::seconds(secs))
                .unwrap_or(self.0),
        )
    }

    /// Whole seconds elapsed from `earlier` to `self`. Negative when
    /// `earlier` is in the future.
    pub fn seconds_since(&self, earlier: &Timestamp) -> i64 {
        self.0.timestamp() - earlier.0.timestamp()
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}
