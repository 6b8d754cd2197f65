use clap::Args;
use serde_json::Value;

use analyst_core::config::EngineConfig;
use analyst_core::statistics::{StatTestRequest, StatisticalEngine};

use crate::input;

/// Arguments for a hypothesis test
#[derive(Args)]
pub struct StatsArgs {
    /// Path to JSON input file, tagged by "test" (e.g. "adf", "granger")
    #[arg(long)]
    pub input: Option<String>,

    /// Significance level, overriding the configured one
    #[arg(long)]
    pub alpha: Option<f64>,
}

pub fn run_stats(args: StatsArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let request: StatTestRequest = input::require_model_input(args.input.as_deref(), "stats")?;

    let mut config = config.clone();
    if let Some(alpha) = args.alpha {
        config.significance_level = alpha;
        config.validate()?;
    }
    let engine = StatisticalEngine::new(&config);
    let result = engine.run(&request)?;
    Ok(serde_json::to_value(&*result)?)
}
