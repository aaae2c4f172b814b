//! Container configuration.
//!
//! Values come from code, from environment variables sharing a prefix, or,
//! with the `config` feature, from a JSON document.

use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};

/// Tunables for a built container.
///
/// # Examples
///
/// ```rust
/// use ferrous_volatile::{ContainerConfig, ServiceCollection};
///
/// let config = ContainerConfig::default()
///     .with_max_depth(64)
///     .with_warn_undisposed(false);
///
/// let mut services = ServiceCollection::new();
/// services.with_config(config);
/// let container = services.build().unwrap();
/// assert_eq!(container.config().max_depth, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerConfig {
    /// Deepest dependency chain a single resolution may walk.
    pub max_depth: usize,
    /// Reject singletons with direct volatile dependencies during `build()`.
    pub validate_on_build: bool,
    /// Log a warning when a scope is dropped with disposal hooks still pending.
    pub warn_undisposed: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_depth: 1024,
            validate_on_build: true,
            warn_undisposed: true,
        }
    }
}

impl ContainerConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_validate_on_build(mut self, validate: bool) -> Self {
        self.validate_on_build = validate;
        self
    }

    pub fn with_warn_undisposed(mut self, warn: bool) -> Self {
        self.warn_undisposed = warn;
        self
    }

    /// Reads `<PREFIX>_MAX_DEPTH`, `<PREFIX>_VALIDATE_ON_BUILD` and
    /// `<PREFIX>_WARN_UNDISPOSED`; unset variables keep their defaults.
    pub fn from_env(prefix: &str) -> DiResult<Self> {
        Self::from_lookup(prefix, |name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> DiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(&format!("{}_{}", prefix.to_uppercase(), key));
        let mut config = Self::default();

        if let Some(raw) = var("MAX_DEPTH") {
            config.max_depth = raw
                .trim()
                .parse()
                .map_err(|_| DiError::InvalidConfig(format!("MAX_DEPTH is not a number: {raw}")))?;
        }
        if let Some(raw) = var("VALIDATE_ON_BUILD") {
            config.validate_on_build = parse_flag("VALIDATE_ON_BUILD", &raw)?;
        }
        if let Some(raw) = var("WARN_UNDISPOSED") {
            config.warn_undisposed = parse_flag("WARN_UNDISPOSED", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parses a JSON document; missing fields keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> DiResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| DiError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> DiResult<()> {
        if self.max_depth == 0 {
            return Err(DiError::InvalidConfig("max_depth must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn parse_flag(name: &str, raw: &str) -> DiResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(DiError::InvalidConfig(format!("{name} is not a boolean: {raw}"))),
    }
}
