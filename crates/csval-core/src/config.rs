//! Heuristic search configuration
//!
//! Loaded with two layers of precedence (highest wins):
//! 1. Environment variable: `CSVAL_HEURISTIC_SEED`
//! 2. The `[heuristic]` table of a TOML file
//!
//! Every key is optional; missing keys take the defaults below.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{CsvalError, Result};

/// Environment variable fixing the search seed
pub const ENV_HEURISTIC_SEED: &str = "CSVAL_HEURISTIC_SEED";

/// Tunables of the quantity distribution search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicConfig {
    /// Tries granted per competing node before adding value volume
    #[serde(default = "default_base_tries")]
    pub base_tries: usize,
    #[serde(default = "default_no_improvement_divisor")]
    pub no_improvement_divisor: usize,
    #[serde(default = "default_no_improvement_floor")]
    pub no_improvement_floor: usize,
    /// Fraction of a deficit repaired per step, in `(0, 1]`
    #[serde(default = "default_damping")]
    pub damping: f64,
    /// Most splits the exact fallback pass may visit; `0` disables it
    #[serde(default = "default_exhaustive_limit")]
    pub exhaustive_limit: usize,
    /// Fixed seed for every call; derived from the validated object when unset
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_base_tries() -> usize {
    10
}
fn default_no_improvement_divisor() -> usize {
    10
}
fn default_no_improvement_floor() -> usize {
    10
}
fn default_damping() -> f64 {
    0.5
}
fn default_exhaustive_limit() -> usize {
    10_000
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            base_tries: default_base_tries(),
            no_improvement_divisor: default_no_improvement_divisor(),
            no_improvement_floor: default_no_improvement_floor(),
            damping: default_damping(),
            exhaustive_limit: default_exhaustive_limit(),
            seed: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    heuristic: HeuristicConfig,
}

impl HeuristicConfig {
    /// Default configuration with a fixed seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Parse the `[heuristic]` table of a TOML document
    ///
    /// # Errors
    ///
    /// `ConfigParse` for malformed TOML, `InvalidConfig` for out-of-range values.
    ///
    /// # Example
    ///
    /// ```
    /// use csval_core::config::HeuristicConfig;
    ///
    /// let config = HeuristicConfig::from_toml_str("[heuristic]\nseed = 7\n").unwrap();
    /// assert_eq!(config.seed, Some(7));
    /// assert_eq!(config.base_tries, 10);
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        file.heuristic.validate()?;
        Ok(file.heuristic)
    }

    /// Read and parse a TOML file, then apply environment overrides
    ///
    /// # Errors
    ///
    /// `ConfigIo` if the file cannot be read, otherwise as [`Self::from_toml_str`].
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)?.with_env_overrides()
    }

    /// Apply `CSVAL_HEURISTIC_SEED` from the process environment
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the variable is set but not an unsigned integer.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the seed variable is not an unsigned integer.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_HEURISTIC_SEED) {
            let seed = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| CsvalError::InvalidConfig {
                    reason: format!("{} must be an unsigned integer: {}", ENV_HEURISTIC_SEED, e),
                })?;
            self.seed = Some(seed);
        }
        Ok(self)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for a damping outside `(0, 1]` or a zero divisor.
    pub fn validate(&self) -> Result<()> {
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(CsvalError::InvalidConfig {
                reason: format!("damping must be in (0, 1], got {}", self.damping),
            });
        }
        if self.no_improvement_divisor == 0 {
            return Err(CsvalError::InvalidConfig {
                reason: "no_improvement_divisor must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Search budget for `competing` nodes and the object's set-value volume
    pub fn max_tries(&self, value_volume: usize, competing: usize) -> usize {
        self.base_tries
            .saturating_add(value_volume)
            .saturating_mul(competing)
    }

    /// Consecutive non-improving steps tolerated before the search stops
    pub fn max_no_improvement(&self, max_tries: usize) -> usize {
        (max_tries / self.no_improvement_divisor.max(1)).saturating_add(self.no_improvement_floor)
    }
}
