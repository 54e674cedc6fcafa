//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Nested configuration for the external risk-scoring oracle.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct EvaluatorConfig {
    /// HTTP endpoint of the scoring oracle.
    pub endpoint_url: String,
    /// Per-request timeout. Short enough to absorb oracle cold starts
    /// without stalling interception.
    #[serde(default = "default_evaluator_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_evaluator_timeout_seconds() -> u64 {
    10
}

fn default_risk_threshold() -> u8 {
    70
}

fn default_decision_timeout_seconds() -> u64 {
    86_400
}

fn default_sweep_interval_seconds() -> u64 {
    60
}

fn default_http_port() -> u16 {
    8080
}

/// Global configuration parsed from `config.toml`.
///
/// The API token is loaded at runtime via OS keychain or environment
/// variable, never from the TOML file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Directory holding the workflow store and audit logs.
    pub data_dir: PathBuf,
    /// HTTP port for the gateway surface.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Scores below this value are auto-approved; at or above it, the
    /// workflow parks for human review.
    #[serde(default = "default_risk_threshold")]
    pub risk_threshold: u8,
    /// How long a parked workflow waits for a decision before expiring.
    #[serde(default = "default_decision_timeout_seconds")]
    pub decision_timeout_seconds: u64,
    /// Interval between expiry sweeps over parked workflows.
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
    /// Reviewer identities allowed to resolve decisions. Empty means any
    /// authenticated reviewer is accepted.
    #[serde(default)]
    pub authorized_reviewer_ids: Vec<String>,
    /// Risk oracle connectivity.
    pub evaluator: EvaluatorConfig,
    /// Bearer token protecting the gateway endpoints (populated at runtime).
    #[serde(skip)]
    pub api_token: String,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the API token from OS keychain with env-var fallback.
    ///
    /// Tries the `atlas-gateway` keyring service first, then falls back to
    /// the `ATLAS_GATEWAY_TOKEN` environment variable. A missing token is
    /// not fatal at startup; authenticated endpoints reject all requests
    /// until one is provisioned.
    pub async fn load_credentials(&mut self) {
        match load_credential("api_token", "ATLAS_GATEWAY_TOKEN").await {
            Ok(token) => self.api_token = token,
            Err(err) => {
                warn!(%err, "api token not provisioned; authenticated endpoints will reject all requests");
            }
        }
    }

    /// Path of the SQLite workflow store.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("governance.db")
    }

    /// Directory holding the JSONL audit logs.
    #[must_use]
    pub fn audit_dir(&self) -> PathBuf {
        self.data_dir.join("audit")
    }

    /// Decision deadline duration for parked workflows.
    #[must_use]
    pub fn decision_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.decision_timeout_seconds).unwrap_or(i64::MAX))
    }

    /// Interval between expiry sweeps.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    /// Oracle request timeout.
    #[must_use]
    pub fn evaluator_timeout(&self) -> Duration {
        Duration::from_secs(self.evaluator.timeout_seconds)
    }

    /// Validate that a reviewer is allowed to resolve decisions.
    ///
    /// An empty allow-list accepts any reviewer identity.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` if an allow-list is configured and
    /// the reviewer is not in it.
    pub fn ensure_reviewer_authorized(&self, reviewer_id: &str) -> Result<()> {
        if self.authorized_reviewer_ids.is_empty()
            || self.authorized_reviewer_ids.iter().any(|id| id == reviewer_id)
        {
            Ok(())
        } else {
            Err(AppError::Unauthorized(
                "reviewer is not authorized to resolve decisions".into(),
            ))
        }
    }

    fn validate(&self) -> Result<()> {
        if self.risk_threshold == 0 || self.risk_threshold > 100 {
            return Err(AppError::Config(
                "risk_threshold must be in 1..=100".into(),
            ));
        }

        if self.decision_timeout_seconds == 0 {
            return Err(AppError::Config(
                "decision_timeout_seconds must be greater than zero".into(),
            ));
        }

        if self.sweep_interval_seconds == 0 {
            return Err(AppError::Config(
                "sweep_interval_seconds must be greater than zero".into(),
            ));
        }

        if self.evaluator.endpoint_url.is_empty() {
            return Err(AppError::Config(
                "evaluator.endpoint_url must not be empty".into(),
            ));
        }

        if self.evaluator.timeout_seconds == 0 {
            return Err(AppError::Config(
                "evaluator.timeout_seconds must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // Try OS keychain first via spawn_blocking (keyring is synchronous I/O).
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new("atlas-gateway", &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    // Fallback to environment variable.
    env::var(env_key).map_err(|_| {
        AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))
    })
}
