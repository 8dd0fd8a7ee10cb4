//! Adapter configuration.
//!
//! Both configs redact their secrets in `Debug`. `from_env()` reads the
//! process environment; `from_lookup()` takes any key lookup so tests do not
//! have to mutate process-global state.

use url::Url;
use zeroize::Zeroizing;

/// Stripe adapter configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// API base URL. Default: <https://api.stripe.com>
    pub api_url: Url,
    /// Secret API key.
    pub secret_key: Zeroizing<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_url", &self.api_url)
            .field("secret_key", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl StripeConfig {
    /// Load from the process environment.
    ///
    /// Variables:
    /// - `STRIPE_SECRET_KEY` (required)
    /// - `STRIPE_API_URL` (default: `https://api.stripe.com`)
    /// - `STRIPE_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let secret_key = non_empty(lookup("STRIPE_SECRET_KEY"))
            .ok_or(ConfigError::Missing("STRIPE_SECRET_KEY"))?;
        Ok(Self {
            api_url: url_or(&lookup, "STRIPE_API_URL", "https://api.stripe.com")?,
            secret_key: Zeroizing::new(secret_key),
            timeout_secs: lookup("STRIPE_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        })
    }

    /// Configuration pointing at a local mock server.
    pub fn local_mock(base_url: &str, secret_key: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_url("STRIPE_API_URL", base_url)?,
            secret_key: Zeroizing::new(secret_key.to_string()),
            timeout_secs: 5,
        })
    }
}

/// Mail relay configuration.
#[derive(Clone)]
pub struct MailRelayConfig {
    /// Relay base URL; mail is posted to `<relay_url>/send`.
    pub relay_url: Url,
    /// Bearer token for the relay.
    pub token: Zeroizing<String>,
    /// Sender address.
    pub from_address: String,
    /// Sender display name.
    pub from_name: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for MailRelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailRelayConfig")
            .field("relay_url", &self.relay_url)
            .field("token", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field("from_name", &self.from_name)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl MailRelayConfig {
    /// Load from the process environment. Returns `Ok(None)` when
    /// `MAIL_RELAY_URL` is unset.
    ///
    /// Variables:
    /// - `MAIL_RELAY_URL`
    /// - `MAIL_RELAY_TOKEN` (required when the URL is set)
    /// - `MAIL_FROM` (required when the URL is set)
    /// - `MAIL_FROM_NAME` (default: `DecenTrust`)
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, ConfigError> {
        let Some(raw_url) = non_empty(lookup("MAIL_RELAY_URL")) else {
            return Ok(None);
        };
        Ok(Some(Self {
            relay_url: parse_url("MAIL_RELAY_URL", &raw_url)?,
            token: Zeroizing::new(
                non_empty(lookup("MAIL_RELAY_TOKEN")).ok_or(ConfigError::Missing("MAIL_RELAY_TOKEN"))?,
            ),
            from_address: non_empty(lookup("MAIL_FROM")).ok_or(ConfigError::Missing("MAIL_FROM"))?,
            from_name: non_empty(lookup("MAIL_FROM_NAME")).unwrap_or_else(|| "DecenTrust".to_string()),
            timeout_secs: 30,
        }))
    }

    /// Configuration pointing at a local mock relay.
    pub fn local_mock(base_url: &str, token: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            relay_url: parse_url("MAIL_RELAY_URL", base_url)?,
            token: Zeroizing::new(token.to_string()),
            from_address: "noreply@decentrust.test".to_string(),
            from_name: "DecenTrust".to_string(),
            timeout_secs: 5,
        })
    }

    /// RFC 5322 `From` header value.
    pub fn from_header(&self) -> String {
        format!("\"{}\" <{}>", self.from_name, self.from_address)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    /// A URL variable failed to parse.
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(&'static str, String),
    /// A header value contains characters HTTP forbids.
    #[error("invalid header value for {0}")]
    InvalidHeader(&'static str),
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(var, e.to_string()))
}

fn url_or(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: &str,
) -> Result<Url, ConfigError> {
    let raw = non_empty(lookup(var)).unwrap_or_else(|| default.to_string());
    parse_url(var, &raw)
}

/// A URL's string form without a trailing slash.
pub(crate) fn trimmed(url: &Url) -> &str {
    url.as_str().trim_end_matches('/')
}
