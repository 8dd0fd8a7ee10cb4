//! # Bootstrap
//!
//! Wires the onboarding saga from the environment at startup.
//!
//! ## Sequence
//!
//! 1. **Onboarding config**: TTLs, replay window, plan catalog.
//! 2. **Issuer key**: `ISSUER_SIGNING_KEY_HEX`, else `ISSUER_KEY_FILE`,
//!    else an ephemeral key.
//! 3. **Payment provider**: Stripe when `STRIPE_SECRET_KEY` is set,
//!    otherwise the in-memory provider.
//! 4. **Mail**: the relay when `MAIL_RELAY_URL` is set, otherwise a
//!    dispatcher that only logs.
//! 5. **Registries and store**: local Ed25519 registries, in-memory store.

use std::path::Path;
use std::sync::Arc;

use dtrust_crypto::Ed25519KeyPair;
use dtrust_gateway::{
    ConfigError as GatewayConfigError, GatewayError, HttpMailDispatcher, HttpStripeAdapter,
    MailRelayConfig, MockPaymentProvider, NotificationDispatcher, PaymentProvider,
    RecordingNotificationDispatcher, StripeConfig, TracingNotificationDispatcher,
};
use dtrust_onboarding::config::ConfigError as OnboardingConfigError;
use dtrust_onboarding::{Collaborators, MemoryStore, OnboardingConfig, OnboardingSaga, PlanCatalog};
use dtrust_vc::{IssuerIdentity, LocalCredentialRegistry, LocalIdentityRegistry, VcError};

use crate::state::{AppConfig, AppState};

/// Errors during bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Signing key could not be loaded.
    #[error("signing key error: {0}")]
    SigningKey(String),

    /// The issuer identity could not be derived from the key.
    #[error("issuer identity: {0}")]
    Issuer(#[from] VcError),

    /// Onboarding configuration is invalid.
    #[error("onboarding configuration: {0}")]
    Onboarding(#[from] OnboardingConfigError),

    /// Gateway configuration is invalid.
    #[error("gateway configuration: {0}")]
    GatewayConfig(#[from] GatewayConfigError),

    /// A gateway adapter could not be built.
    #[error("gateway: {0}")]
    Gateway(#[from] GatewayError),
}

/// A loaded issuer key.
pub struct SigningConfig {
    /// The issuer signing key.
    pub key: Ed25519KeyPair,
    /// Generated at startup; credentials will not survive a restart.
    pub ephemeral: bool,
    /// Where the key came from, for the startup log.
    pub source: &'static str,
}

/// Load the issuer signing key.
///
/// A key source that is present but unreadable or malformed is an error;
/// only a fully absent configuration falls back to an ephemeral key.
pub fn load_signing_key(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<SigningConfig, BootstrapError> {
    if let Some(hex) = lookup("ISSUER_SIGNING_KEY_HEX").filter(|v| !v.trim().is_empty()) {
        let key = Ed25519KeyPair::from_seed_hex(hex.trim()).map_err(|e| {
            BootstrapError::SigningKey(format!("invalid ISSUER_SIGNING_KEY_HEX: {e}"))
        })?;
        return Ok(SigningConfig {
            key,
            ephemeral: false,
            source: "ISSUER_SIGNING_KEY_HEX",
        });
    }

    if let Some(path) = lookup("ISSUER_KEY_FILE").filter(|v| !v.trim().is_empty()) {
        let path = Path::new(path.trim());
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BootstrapError::SigningKey(format!("cannot read {}: {e}", path.display()))
        })?;
        let key = Ed25519KeyPair::from_seed_hex(contents.trim()).map_err(|e| {
            BootstrapError::SigningKey(format!("invalid key in {}: {e}", path.display()))
        })?;
        tracing::info!(path = %path.display(), "loaded issuer signing key from file");
        return Ok(SigningConfig {
            key,
            ephemeral: false,
            source: "ISSUER_KEY_FILE",
        });
    }

    tracing::warn!(
        "no issuer signing key configured; generating an ephemeral key. \
         Credentials signed with it cannot be verified after restart."
    );
    Ok(SigningConfig {
        key: Ed25519KeyPair::generate(),
        ephemeral: true,
        source: "ephemeral",
    })
}

/// The in-memory provider, priced from the plan catalog.
fn mock_payments(plans: &PlanCatalog) -> MockPaymentProvider {
    plans
        .entries()
        .iter()
        .fold(MockPaymentProvider::new(), |provider, entry| {
            provider.with_price(&entry.price_id, entry.unit_amount.unwrap_or(0))
        })
}

fn payment_provider(
    lookup: &impl Fn(&str) -> Option<String>,
    plans: &PlanCatalog,
) -> Result<Arc<dyn PaymentProvider>, BootstrapError> {
    match StripeConfig::from_lookup(lookup) {
        Ok(config) => Ok(Arc::new(HttpStripeAdapter::new(&config)?)),
        Err(GatewayConfigError::Missing(var)) => {
            tracing::warn!(
                missing = var,
                "payment provider not configured; using the in-memory provider"
            );
            Ok(Arc::new(mock_payments(plans)))
        }
        Err(e) => Err(e.into()),
    }
}

fn notification_dispatcher(
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<Arc<dyn NotificationDispatcher>, BootstrapError> {
    match MailRelayConfig::from_lookup(lookup)? {
        Some(config) => Ok(Arc::new(HttpMailDispatcher::new(&config)?)),
        None => {
            tracing::warn!("MAIL_RELAY_URL not set; notifications are logged, not sent");
            Ok(Arc::new(TracingNotificationDispatcher))
        }
    }
}

/// Build the application state from the process environment.
pub fn bootstrap(config: AppConfig) -> Result<AppState, BootstrapError> {
    bootstrap_with(config, |key| std::env::var(key).ok())
}

/// Build the application state from an arbitrary variable source.
pub fn bootstrap_with(
    config: AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<AppState, BootstrapError> {
    let onboarding = OnboardingConfig::from_lookup(&lookup)?;
    let signing = load_signing_key(&lookup)?;
    let issuer = Arc::new(IssuerIdentity::new(signing.key)?);
    let payments = payment_provider(&lookup, &onboarding.plans)?;
    let notifier = notification_dispatcher(&lookup)?;

    tracing::info!(
        port = config.port,
        issuer = %issuer.did(),
        key_source = signing.source,
        payments = payments.provider_name(),
        notifications = notifier.dispatcher_name(),
        plans = onboarding.plans.entries().len(),
        "onboarding service configured"
    );

    let saga = OnboardingSaga::new(
        Collaborators {
            store: Arc::new(MemoryStore::new()),
            payments,
            identity_registry: Arc::new(LocalIdentityRegistry::new()),
            credential_registry: Arc::new(LocalCredentialRegistry::new()),
            notifier,
            issuer,
        },
        onboarding,
    );
    Ok(AppState::new(saga, config, signing.ephemeral))
}

/// Handles to the in-memory collaborators of a [`local_state`].
pub struct LocalCollaborators {
    /// Record store.
    pub store: Arc<MemoryStore>,
    /// In-memory payment provider.
    pub payments: Arc<MockPaymentProvider>,
    /// Captured outbound mail.
    pub mail: Arc<RecordingNotificationDispatcher>,
}

/// State wired entirely to in-memory collaborators, with handles kept so
/// callers can settle payments and read sent mail.
pub fn local_state(
    onboarding: OnboardingConfig,
    key: Ed25519KeyPair,
) -> Result<(AppState, LocalCollaborators), BootstrapError> {
    let store = Arc::new(MemoryStore::new());
    let payments = Arc::new(mock_payments(&onboarding.plans));
    let mail = Arc::new(RecordingNotificationDispatcher::new());
    let saga = OnboardingSaga::new(
        Collaborators {
            store: store.clone(),
            payments: payments.clone(),
            identity_registry: Arc::new(LocalIdentityRegistry::new()),
            credential_registry: Arc::new(LocalCredentialRegistry::new()),
            notifier: mail.clone(),
            issuer: Arc::new(IssuerIdentity::new(key)?),
        },
        onboarding,
    );
    Ok((
        AppState::new(saga, AppConfig::default(), false),
        LocalCollaborators {
            store,
            payments,
            mail,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn signing_key_from_hex() {
        let seed = Ed25519KeyPair::generate().seed_hex();
        let signing = load_signing_key(lookup(&[("ISSUER_SIGNING_KEY_HEX", seed.as_str())])).unwrap();
        assert!(!signing.ephemeral);
        assert_eq!(signing.key.seed_hex().as_str(), seed.as_str());
    }

    #[test]
    fn signing_key_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issuer.key");
        let seed = Ed25519KeyPair::generate().seed_hex();
        std::fs::write(&path, format!("{}\n", seed.as_str())).unwrap();

        let path_str = path.display().to_string();
        let signing = load_signing_key(lookup(&[("ISSUER_KEY_FILE", path_str.as_str())])).unwrap();
        assert_eq!(signing.source, "ISSUER_KEY_FILE");
        assert_eq!(signing.key.public_key(), Ed25519KeyPair::from_seed_hex(seed.as_str()).unwrap().public_key());
    }

    #[test]
    fn missing_key_file_is_an_error() {
        let result = load_signing_key(lookup(&[("ISSUER_KEY_FILE", "/nonexistent/issuer.key")]));
        assert!(matches!(result, Err(BootstrapError::SigningKey(_))));
    }

    #[test]
    fn malformed_hex_is_an_error() {
        let result = load_signing_key(lookup(&[("ISSUER_SIGNING_KEY_HEX", "zz")]));
        assert!(matches!(result, Err(BootstrapError::SigningKey(_))));
    }

    #[test]
    fn ephemeral_when_unconfigured() {
        let signing = load_signing_key(lookup(&[])).unwrap();
        assert!(signing.ephemeral);
    }

    #[test]
    fn bootstrap_without_collaborators_uses_local_fallbacks() {
        let state = bootstrap_with(AppConfig::default(), lookup(&[])).unwrap();
        assert!(state.key_ephemeral);
        assert!(state.saga.issuer_did().as_str().starts_with("did:dtrust:"));
    }
}
