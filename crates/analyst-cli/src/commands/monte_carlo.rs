use clap::Args;
use serde_json::Value;

use analyst_core::config::EngineConfig;
use analyst_core::monte_carlo::evaluators::{run_dcf_stress_test, DcfStressInput, McDcfInput};
use analyst_core::monte_carlo::{CancellationToken, MonteCarloEngine, MonteCarloInput};

use crate::input;

/// Arguments for a generic Monte Carlo simulation
#[derive(Args)]
pub struct MonteCarloArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Override the seed from the input
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the trial count from the input
    #[arg(long)]
    pub trials: Option<usize>,

    /// Keep per-trial records in the output
    #[arg(long)]
    pub include_trials: bool,
}

/// Arguments for a Monte Carlo DCF valuation
#[derive(Args)]
pub struct McDcfArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub trials: Option<usize>,

    #[arg(long)]
    pub include_trials: bool,
}

/// Arguments for a deterministic DCF stress test
#[derive(Args)]
pub struct StressTestArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

fn apply_overrides(simulation: &mut MonteCarloInput, seed: Option<u64>, trials: Option<usize>) {
    if seed.is_some() {
        simulation.seed = seed;
    }
    if let Some(trials) = trials {
        simulation.trial_count = trials;
    }
}

pub fn run_monte_carlo(
    args: MonteCarloArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut mc_input: MonteCarloInput = input::require_model_input(args.input.as_deref(), "monte-carlo")?;
    apply_overrides(&mut mc_input, args.seed, args.trials);

    let engine = MonteCarloEngine::new(config);
    let result = engine.simulate(&mc_input)?;
    let mut output = (*result).clone();
    if !args.include_trials {
        output.result.records.clear();
    }
    Ok(serde_json::to_value(output)?)
}

pub fn run_mc_dcf(args: McDcfArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let mut mc_input: McDcfInput = input::require_model_input(args.input.as_deref(), "mc-dcf")?;
    apply_overrides(&mut mc_input.simulation, args.seed, args.trials);

    let cancel = CancellationToken::new();
    let engine = MonteCarloEngine::new(config);
    let result = engine.simulate_dcf(&mc_input, Some(&cancel))?;
    let mut output = (*result).clone();
    if !args.include_trials {
        output.result.simulation.records.clear();
    }
    Ok(serde_json::to_value(output)?)
}

pub fn run_stress_test(args: StressTestArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let stress_input: DcfStressInput = input::require_model_input(args.input.as_deref(), "stress-test")?;
    let result = run_dcf_stress_test(&stress_input)?;
    Ok(serde_json::to_value(result)?)
}
