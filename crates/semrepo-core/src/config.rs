//! Engine configuration.
//!
//! Defaults live in [`defaults`], environment variable names in [`env_vars`].
//! [`EngineConfig::from_env`] layers the environment over the defaults; a JSON
//! config file (see the CLI) can override both.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How selectable queries walk the aspect hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionMode {
    /// Only the exact aspect of the criterion.
    Exact,
    /// The criterion aspect and everything below it.
    #[default]
    Descendants,
    /// The criterion aspect and everything above it.
    Ancestors,
}

impl ExpansionMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Some(Self::Exact),
            "descendants" => Some(Self::Descendants),
            "ancestors" => Some(Self::Ancestors),
            _ => None,
        }
    }
}

/// Default values.
pub mod defaults {
    pub const STRICT_REFERENCES: bool = false;
    pub const MAX_CRITERIA: usize = 256;
}

/// Environment variable names.
pub mod env_vars {
    pub const STRICT_REFERENCES: &str = "SEMREPO_STRICT_REFERENCES";
    pub const MAX_CRITERIA: &str = "SEMREPO_MAX_CRITERIA";
    pub const SELECTABLE_EXPANSION: &str = "SEMREPO_SELECTABLE_EXPANSION";
    pub const LOG_JSON: &str = "SEMREPO_LOG_JSON";
}

/// Configuration of the selection engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Reject criteria that reference unknown functions instead of treating
    /// them as never matching.
    pub strict_references: bool,
    /// Upper bound on the number of criteria in one query.
    pub max_criteria: usize,
    /// Hierarchy expansion used by selectable queries.
    pub selectable_expansion: ExpansionMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict_references: defaults::STRICT_REFERENCES,
            max_criteria: defaults::MAX_CRITERIA,
            selectable_expansion: ExpansionMode::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by any environment variables that are set.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(env_vars::STRICT_REFERENCES) {
            match v.trim().parse() {
                Ok(b) => self.strict_references = b,
                Err(_) => tracing::warn!("Ignoring {}={}", env_vars::STRICT_REFERENCES, v),
            }
        }
        if let Some(v) = lookup(env_vars::MAX_CRITERIA) {
            match v.trim().parse() {
                Ok(n) => self.max_criteria = n,
                Err(_) => tracing::warn!("Ignoring {}={}", env_vars::MAX_CRITERIA, v),
            }
        }
        if let Some(v) = lookup(env_vars::SELECTABLE_EXPANSION) {
            match ExpansionMode::parse(&v) {
                Some(mode) => self.selectable_expansion = mode,
                None => tracing::warn!("Ignoring {}={}", env_vars::SELECTABLE_EXPANSION, v),
            }
        }
        self
    }

    /// Parse a JSON config document. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("invalid engine config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_criteria == 0 {
            return Err(Error::config("max_criteria must be greater than zero"));
        }
        Ok(())
    }
}
