use serde::{Deserialize, Serialize};

use crate::error::AnalystError;
use crate::AnalystResult;

/// Engine-wide settings shared by every engine constructed from it.
///
/// Every section falls back to its default when absent, so a config file
/// only needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Significance level for hypothesis test decisions.
    pub significance_level: f64,
    pub cache: CacheConfig,
    pub monte_carlo: MonteCarloConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            significance_level: 0.05,
            cache: CacheConfig::default(),
            monte_carlo: MonteCarloConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 300,
            max_entries: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    /// Trials per batch. Cancellation is checked between batches.
    pub batch_size: usize,
    /// Dedicated worker count; `None` runs on the global rayon pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Default confidence level when the input does not carry one.
    pub confidence_level: f64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            batch_size: 1_000,
            workers: None,
            confidence_level: 0.95,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> AnalystResult<()> {
        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(AnalystError::invalid(
                "significance_level",
                "must be strictly between 0 and 1",
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(AnalystError::invalid(
                "cache.max_entries",
                "must be at least 1",
            ));
        }
        if self.monte_carlo.batch_size == 0 {
            return Err(AnalystError::invalid(
                "monte_carlo.batch_size",
                "must be at least 1",
            ));
        }
        if self.monte_carlo.workers == Some(0) {
            return Err(AnalystError::invalid(
                "monte_carlo.workers",
                "must be at least 1 when set",
            ));
        }
        let level = self.monte_carlo.confidence_level;
        if !(level > 0.0 && level < 1.0) {
            return Err(AnalystError::invalid(
                "monte_carlo.confidence_level",
                "must be strictly between 0 and 1",
            ));
        }
        Ok(())
    }
}
