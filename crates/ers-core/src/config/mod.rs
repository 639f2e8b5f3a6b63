//! Verifier configuration.
//!
//! Configuration is loaded from TOML:
//!
//! ```toml
//! sibling_order = "binary-ascending"
//!
//! [limits]
//! max_chains = 256
//! max_timestamps_per_chain = 4096
//! max_tree_depth = 64
//! max_group_size = 65536
//!
//! [canonicalization.aliases]
//! "urn:example:der" = "urn:oid:2.1.2.1"
//! ```
//!
//! Every field is optional; omitted fields take the defaults shown above.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::SiblingOrder;

/// Default maximum number of chains in a sequence.
pub const DEFAULT_MAX_CHAINS: usize = 256;

/// Default maximum number of archive timestamps per chain.
pub const DEFAULT_MAX_TIMESTAMPS_PER_CHAIN: usize = 4096;

/// Default maximum number of groups in one reduced hash tree.
pub const DEFAULT_MAX_TREE_DEPTH: usize = 64;

/// Default maximum number of digests in one hash tree group.
pub const DEFAULT_MAX_GROUP_SIZE: usize = 65536;

/// Top-level verifier configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifierConfig {
    /// Ordering of digests within a hash tree level.
    #[serde(default)]
    pub sibling_order: SiblingOrder,

    /// Size bounds on the parsed sequence.
    #[serde(default)]
    pub limits: Limits,

    /// Canonicalization settings.
    #[serde(default)]
    pub canonicalization: CanonicalizationConfig,
}

impl VerifierConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a value fails validation.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Checks that every limit is non-zero and aliases are well-formed.
    ///
    /// # Errors
    ///
    /// Returns `Validation` describing the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = [
            ("max_chains", self.limits.max_chains),
            (
                "max_timestamps_per_chain",
                self.limits.max_timestamps_per_chain,
            ),
            ("max_tree_depth", self.limits.max_tree_depth),
            ("max_group_size", self.limits.max_group_size),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(ConfigError::Validation(format!(
                    "limits.{name} must be greater than zero"
                )));
            }
        }

        for (alias, target) in &self.canonicalization.aliases {
            if alias.trim().is_empty() || target.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "canonicalization aliases must not be empty".to_string(),
                ));
            }
            if alias == target {
                return Err(ConfigError::Validation(format!(
                    "canonicalization alias '{alias}' refers to itself"
                )));
            }
        }
        Ok(())
    }
}

/// Size bounds applied during structural validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Limits {
    /// Maximum number of chains.
    #[serde(default = "default_max_chains")]
    pub max_chains: usize,

    /// Maximum number of archive timestamps per chain.
    #[serde(default = "default_max_timestamps_per_chain")]
    pub max_timestamps_per_chain: usize,

    /// Maximum number of groups per reduced hash tree.
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,

    /// Maximum number of digests per group.
    #[serde(default = "default_max_group_size")]
    pub max_group_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_chains: DEFAULT_MAX_CHAINS,
            max_timestamps_per_chain: DEFAULT_MAX_TIMESTAMPS_PER_CHAIN,
            max_tree_depth: DEFAULT_MAX_TREE_DEPTH,
            max_group_size: DEFAULT_MAX_GROUP_SIZE,
        }
    }
}

const fn default_max_chains() -> usize {
    DEFAULT_MAX_CHAINS
}

const fn default_max_timestamps_per_chain() -> usize {
    DEFAULT_MAX_TIMESTAMPS_PER_CHAIN
}

const fn default_max_tree_depth() -> usize {
    DEFAULT_MAX_TREE_DEPTH
}

const fn default_max_group_size() -> usize {
    DEFAULT_MAX_GROUP_SIZE
}

/// Canonicalization settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CanonicalizationConfig {
    /// Additional method identifiers bound to a registered method.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}
