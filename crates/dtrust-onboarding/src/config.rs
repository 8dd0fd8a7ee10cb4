//! # Onboarding Configuration
//!
//! Code and replay windows, credential validity policies, checkout
//! redirects, and the plan catalog that maps billed prices to plan types.
//!
//! ## Environment
//!
//! | Variable | Default |
//! |---|---|
//! | `VERIFICATION_CODE_TTL_SECS` | 3600 |
//! | `CREDENTIAL_REPLAY_WINDOW_SECS` | 30 |
//! | `CLIENT_URL` | `http://localhost:3000` |
//! | `PROFILE_BASE_URL` | value of `CLIENT_URL` |
//! | `STRIPE_COUPON_ID` | unset |
//! | `DTRUST_PLANS_FILE` | unset |
//! | `STRIPE_BASIC_PRICE_ID` | unset |
//! | `STRIPE_PREMIUM_PRICE_ID` | unset |

use std::path::Path;

use dtrust_core::Timestamp;
use serde::{Deserialize, Serialize};

use crate::model::PlanType;

/// How long an issued credential stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityPolicy {
    /// Validity in calendar months.
    pub months: u32,
}

impl ValidityPolicy {
    /// Twelve months; subscription-triggered issuance.
    pub const SUBSCRIPTION: Self = Self { months: 12 };
    /// One month; ad-hoc issuance.
    pub const AD_HOC: Self = Self { months: 1 };

    /// The window starting at `issued`.
    pub fn window_from(&self, issued: Timestamp) -> ValidityWindow {
        ValidityWindow {
            issuance: issued,
            expiration: issued.add_months(self.months),
        }
    }
}

/// Issuance and expiration instants of one credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    /// Start of validity.
    pub issuance: Timestamp,
    /// End of validity.
    pub expiration: Timestamp,
}

/// One offered plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    /// Key clients select the plan by (`basic`, `premium`, ...).
    pub key: String,
    /// Payment provider price id.
    pub price_id: String,
    /// Tier granted on payment.
    pub plan_type: PlanType,
    /// Price in the smallest currency unit, informational.
    #[serde(default)]
    pub unit_amount: Option<i64>,
}

#[derive(Deserialize)]
struct PlanFile {
    plans: Vec<PlanEntry>,
}

/// Fixed set of offered plans. Plan types are looked up here by the billed
/// price id; they are never taken from client input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanCatalog {
    entries: Vec<PlanEntry>,
}

impl PlanCatalog {
    /// Build from entries. Keys and price ids must each be unique.
    pub fn new(entries: Vec<PlanEntry>) -> Result<Self, ConfigError> {
        for (i, entry) in entries.iter().enumerate() {
            if entry.key.trim().is_empty() || entry.price_id.trim().is_empty() {
                return Err(ConfigError::InvalidPlan(format!(
                    "plan #{i} has an empty key or price id"
                )));
            }
            let duplicate = entries[..i]
                .iter()
                .any(|e| e.key == entry.key || e.price_id == entry.price_id);
            if duplicate {
                return Err(ConfigError::InvalidPlan(format!(
                    "duplicate plan key or price id: {}",
                    entry.key
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Parse a YAML document of the form `plans: [{key, price_id, plan_type, unit_amount}]`.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let file: PlanFile =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::InvalidPlan(e.to_string()))?;
        Self::new(file.plans)
    }

    /// Load a YAML plan file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|e| ConfigError::PlanFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// All entries.
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Whether no plans are offered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a client-supplied plan selector: a plan key or a price id.
    pub fn resolve(&self, selector: &str) -> Option<&PlanEntry> {
        let selector = selector.trim();
        self.entries
            .iter()
            .find(|e| e.key == selector || e.price_id == selector)
    }

    /// Plan type billed at `price_id`.
    pub fn plan_type_for_price(&self, price_id: &str) -> Option<PlanType> {
        self.entries
            .iter()
            .find(|e| e.price_id == price_id)
            .map(|e| e.plan_type)
    }
}

/// Checkout redirects and discount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSettings {
    /// Redirect after a completed checkout.
    pub success_url: String,
    /// Redirect after an abandoned checkout.
    pub cancel_url: String,
    /// Discount applied to every session.
    pub coupon_id: Option<String>,
}

impl CheckoutSettings {
    /// Redirects under `client_url`.
    pub fn for_client(client_url: &str, coupon_id: Option<String>) -> Self {
        let base = client_url.trim_end_matches('/');
        Self {
            success_url: format!("{base}/payment-success"),
            cancel_url: format!("{base}?cancel=true"),
            coupon_id,
        }
    }
}

/// Saga configuration.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    /// Lifetime of a verification code.
    pub code_ttl_secs: i64,
    /// Maximum age of a credential verification link timestamp.
    pub replay_window_secs: i64,
    /// Validity of subscription-triggered credentials.
    pub subscription_validity: ValidityPolicy,
    /// Validity of ad-hoc credentials.
    pub ad_hoc_validity: ValidityPolicy,
    /// Base of profile links in notification mail.
    pub profile_base_url: String,
    /// Checkout redirects.
    pub checkout: CheckoutSettings,
    /// Offered plans.
    pub plans: PlanCatalog,
}

impl OnboardingConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let seconds = |key: &'static str, default: i64| -> Result<i64, ConfigError> {
            match get(key) {
                None => Ok(default),
                Some(raw) => raw
                    .parse::<i64>()
                    .ok()
                    .filter(|v| *v > 0)
                    .ok_or(ConfigError::InvalidNumber { var: key, value: raw }),
            }
        };

        let client_url = get("CLIENT_URL").unwrap_or_else(|| "http://localhost:3000".to_string());
        let plans = match get("DTRUST_PLANS_FILE") {
            Some(path) => PlanCatalog::load(Path::new(&path))?,
            None => {
                let mut entries = Vec::new();
                if let Some(price_id) = get("STRIPE_BASIC_PRICE_ID") {
                    entries.push(PlanEntry {
                        key: "basic".to_string(),
                        price_id,
                        plan_type: PlanType::Basic,
                        unit_amount: None,
                    });
                }
                if let Some(price_id) = get("STRIPE_PREMIUM_PRICE_ID") {
                    entries.push(PlanEntry {
                        key: "premium".to_string(),
                        price_id,
                        plan_type: PlanType::Premium,
                        unit_amount: None,
                    });
                }
                PlanCatalog::new(entries)?
            }
        };
        if plans.is_empty() {
            tracing::warn!("no plans configured; checkout and payment confirmation will be rejected");
        }

        Ok(Self {
            code_ttl_secs: seconds("VERIFICATION_CODE_TTL_SECS", 3600)?,
            replay_window_secs: seconds("CREDENTIAL_REPLAY_WINDOW_SECS", 30)?,
            subscription_validity: ValidityPolicy::SUBSCRIPTION,
            ad_hoc_validity: ValidityPolicy::AD_HOC,
            profile_base_url: get("PROFILE_BASE_URL")
                .unwrap_or_else(|| client_url.clone())
                .trim_end_matches('/')
                .to_string(),
            checkout: CheckoutSettings::for_client(&client_url, get("STRIPE_COUPON_ID")),
            plans,
        })
    }

    /// Defaults with a two-plan catalog (`price_basic`, `price_premium`).
    pub fn for_tests() -> Self {
        Self {
            code_ttl_secs: 3600,
            replay_window_secs: 30,
            subscription_validity: ValidityPolicy::SUBSCRIPTION,
            ad_hoc_validity: ValidityPolicy::AD_HOC,
            profile_base_url: "http://localhost:3000".to_string(),
            checkout: CheckoutSettings::for_client("http://localhost:3000", None),
            plans: PlanCatalog {
                entries: vec![
                    PlanEntry {
                        key: "basic".to_string(),
                        price_id: "price_basic".to_string(),
                        plan_type: PlanType::Basic,
                        unit_amount: Some(9_900),
                    },
                    PlanEntry {
                        key: "premium".to_string(),
                        price_id: "price_premium".to_string(),
                        plan_type: PlanType::Premium,
                        unit_amount: Some(19_900),
                    },
                ],
            },
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A numeric variable is not a positive integer.
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
    /// The plan file could not be read.
    #[error("cannot read plan file {path}: {reason}")]
    PlanFile {
        /// File path.
        path: String,
        /// Why.
        reason: String,
    },
    /// A plan entry is malformed or duplicated.
    #[error("invalid plan catalog: {0}")]
    InvalidPlan(String),
}
