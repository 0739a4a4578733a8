//! Configuration loading for the prdash dashboard.
//!
//! Unknown keys are rejected. Retry settings fall back to the defaults of
//! [`RetryPolicy`]; everything else must be stated.

use crate::retry::RetryPolicy;
use prdash_core::{ProviderError, ProviderInstance, ProviderKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the config path when `--config` is absent.
pub const CONFIG_ENV: &str = "PRDASH_CONFIG";

/// Feature flag: run the legacy-syntax check before parsing filters.
pub const FF_DSL_VALIDATE: &str = "PRDASH_FF_DSL_VALIDATE";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DashConfig {
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryConfig,
    pub providers: Vec<ProviderConfig>,
    pub sections: Vec<SectionConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub host: String,
    pub token: Option<String>,
    pub token_env: Option<String>,
    pub user: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("token_env", &self.token_env)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Prs,
    Issues,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionConfig {
    pub title: String,
    pub kind: SectionKind,
    pub filter: String,
    pub limit: Option<u32>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or PRDASH_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("Invalid provider: {0}")]
    Provider(#[from] ProviderError),
}

impl DashConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            providers = config.providers.len(),
            sections = config.sections.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: DashConfig = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts",
                reason: "must be >= 1".to_string(),
            });
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_delay_ms",
                reason: "must be >= base_delay_ms".to_string(),
            });
        }
        if self.providers.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "providers",
                reason: "at least one provider is required".to_string(),
            });
        }
        for provider in &self.providers {
            if provider.host.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "providers.host",
                    reason: "must not be empty".to_string(),
                });
            }
            if provider.token.is_some() && provider.token_env.is_some() {
                return Err(ConfigError::InvalidValue {
                    field: "providers.token",
                    reason: "token and token_env are mutually exclusive".to_string(),
                });
            }
        }
        if self.sections.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sections",
                reason: "at least one section is required".to_string(),
            });
        }
        if self.sections.iter().any(|s| s.title.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "sections.title",
                reason: "must not be empty".to_string(),
            });
        }
        if self.sections.iter().any(|s| s.limit == Some(0)) {
            return Err(ConfigError::InvalidValue {
                field: "sections.limit",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    /// Build provider instances, reading `token_env` variables now.
    pub fn provider_instances(&self) -> Result<Vec<ProviderInstance>, ConfigError> {
        self.providers
            .iter()
            .map(|provider| {
                let mut instance = ProviderInstance::try_new(provider.kind, &provider.host)?;
                let token = match (&provider.token, &provider.token_env) {
                    (Some(token), _) => Some(token.clone()),
                    (None, Some(var)) => std::env::var(var).ok(),
                    (None, None) => None,
                };
                if let Some(token) = token {
                    instance = instance.with_token(token);
                }
                if let Some(user) = &provider.user {
                    instance = instance.with_user(user.clone());
                }
                Ok(instance)
            })
            .collect()
    }
}

/// Settings every provider client is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    /// Run the legacy-syntax check before parsing section filters.
    pub validate_filters: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            validate_filters: false,
        }
    }
}

impl ClientSettings {
    pub fn from_config(config: &DashConfig) -> Self {
        Self {
            request_timeout: config.request_timeout(),
            retry: config.retry_policy(),
            validate_filters: dsl_validate_enabled(),
        }
    }
}

/// Presence check for the legacy-syntax validation flag.
pub fn dsl_validate_enabled() -> bool {
    std::env::var_os(FF_DSL_VALIDATE).is_some()
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV).ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
