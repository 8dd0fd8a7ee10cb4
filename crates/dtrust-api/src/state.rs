//! # Application State
//!
//! Shared state for the axum application: the onboarding saga and the
//! server configuration.

use std::sync::Arc;

use dtrust_onboarding::OnboardingSaga;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listen port (`PORT`, default 8080).
    pub port: u16,
    /// Browser origins allowed by CORS (`ALLOWED_ORIGINS`, comma
    /// separated). Empty allows any origin.
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    /// Read `PORT` and `ALLOWED_ORIGINS` from the environment.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(8080);
        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .map(|v| parse_origins(&v))
            .unwrap_or_default();
        Self {
            port,
            allowed_origins,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            allowed_origins: Vec::new(),
        }
    }
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// The onboarding saga.
    pub saga: Arc<OnboardingSaga>,
    /// Server configuration.
    pub config: AppConfig,
    /// Whether the issuer key was generated at startup.
    pub key_ephemeral: bool,
}

impl AppState {
    /// State around an already wired saga.
    pub fn new(saga: OnboardingSaga, config: AppConfig, key_ephemeral: bool) -> Self {
        Self {
            saga: Arc::new(saga),
            config,
            key_ephemeral,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("issuer", &self.saga.issuer_did().as_str())
            .field("config", &self.config)
            .field("key_ephemeral", &self.key_ephemeral)
            .finish()
    }
}
