//! Configuration management for the rate limiter.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{RateLimitError, Result};
use crate::ratelimit::{MethodSet, Policy, StoreFailurePolicy};

/// Prefix for environment variables that override file settings,
/// e.g. `ACTION_RATELIMIT__RATE_LIMITING__ENABLED=false`.
pub const ENV_PREFIX: &str = "ACTION_RATELIMIT";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Rate limiting configuration
    pub rate_limiting: RateLimitingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// When false every request passes unmetered
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Behavior when the counter store cannot be reached. Must be set explicitly.
    pub on_store_failure: StoreFailurePolicy,

    /// Limits applied by request path, checked in order
    #[serde(default)]
    pub path_limits: Vec<PathLimitConfig>,

    /// Limits declared per controller action
    #[serde(default)]
    pub action_limits: Vec<ActionLimitConfig>,
}

fn default_enabled() -> bool {
    true
}

/// A limit applied to every request under a path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathLimitConfig {
    /// Path pattern; `*` matches one segment
    pub path: String,
    /// Methods the limit applies to; empty or `*` means any
    #[serde(default)]
    pub methods: MethodSet,
    pub limit: u64,
    /// Window length in seconds
    pub period: u64,
}

/// Policies declared on one controller action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLimitConfig {
    pub controller: String,
    pub action: String,
    #[serde(default)]
    pub limits: Vec<Policy>,
}

impl PathLimitConfig {
    /// The policy this path limit enforces.
    pub fn policy(&self) -> Policy {
        Policy {
            limit: self.limit,
            period: self.period,
            methods: self.methods.clone(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ServiceConfig = serde_yaml::from_str(yaml)
            .map_err(|e| RateLimitError::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file and apply `ACTION_RATELIMIT__*` environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        info!(path = %path, "Loading configuration with environment overrides");

        let settings = config::Config::builder()
            .add_source(config::File::new(path, config::FileFormat::Yaml))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .map_err(|e| RateLimitError::Config(e.to_string()))?;

        let config: ServiceConfig = settings
            .try_deserialize()
            .map_err(|e| RateLimitError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject limits that can never be enforced.
    pub fn validate(&self) -> Result<()> {
        for limit in &self.rate_limiting.path_limits {
            limit
                .policy()
                .validate(&limit.path)
                .map_err(|e| RateLimitError::Config(e.to_string()))?;
        }

        for entry in &self.rate_limiting.action_limits {
            let owner = format!("{}:{}", entry.controller, entry.action);
            for policy in &entry.limits {
                policy
                    .validate(&owner)
                    .map_err(|e| RateLimitError::Config(e.to_string()))?;
            }
        }

        Ok(())
    }
}
