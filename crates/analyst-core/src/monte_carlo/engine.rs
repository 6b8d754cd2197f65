use std::sync::Arc;

use crate::cache::{cache_key, CacheStats, ComputationCache};
use crate::config::{EngineConfig, MonteCarloConfig};
use crate::types::ComputationOutput;
use crate::AnalystResult;

#[cfg(feature = "valuation")]
use super::evaluators::{run_dcf_simulation, DcfSimulationResult, McDcfInput};
#[cfg(feature = "valuation")]
use super::simulation::CancellationToken;
use super::simulation::{run_monte_carlo_simulation, MonteCarloInput, SimulationResult};

/// Monte Carlo engine. Only seeded runs are memoised; an unseeded run is
/// different every time and always recomputes.
pub struct MonteCarloEngine {
    config: MonteCarloConfig,
    cache: ComputationCache<ComputationOutput<SimulationResult>>,
    #[cfg(feature = "valuation")]
    dcf_cache: ComputationCache<ComputationOutput<DcfSimulationResult>>,
}

impl MonteCarloEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.monte_carlo.clone(),
            cache: ComputationCache::new(&config.cache),
            #[cfg(feature = "valuation")]
            dcf_cache: ComputationCache::new(&config.cache),
        }
    }

    pub fn simulate(
        &self,
        input: &MonteCarloInput,
    ) -> AnalystResult<Arc<ComputationOutput<SimulationResult>>> {
        if input.seed.is_none() {
            return run_monte_carlo_simulation(input, &self.config).map(Arc::new);
        }
        let key = cache_key("monte_carlo", input)?;
        self.cache
            .get_or_try_insert_with(key, || run_monte_carlo_simulation(input, &self.config))
    }

    /// A cancelled run is not cached.
    #[cfg(feature = "valuation")]
    pub fn simulate_dcf(
        &self,
        input: &McDcfInput,
        cancel: Option<&CancellationToken>,
    ) -> AnalystResult<Arc<ComputationOutput<DcfSimulationResult>>> {
        if input.simulation.seed.is_none() {
            return run_dcf_simulation(input, &self.config, cancel).map(Arc::new);
        }
        let key = cache_key("monte_carlo_dcf", input)?;
        self.dcf_cache
            .get_or_try_insert_with(key, || run_dcf_simulation(input, &self.config, cancel))
    }

    pub fn cache_stats(&self) -> CacheStats {
        let stats = self.cache.stats();
        #[cfg(feature = "valuation")]
        let stats = {
            let dcf = self.dcf_cache.stats();
            CacheStats {
                hits: stats.hits + dcf.hits,
                misses: stats.misses + dcf.misses,
                entries: stats.entries + dcf.entries,
            }
        };
        stats
    }
}
