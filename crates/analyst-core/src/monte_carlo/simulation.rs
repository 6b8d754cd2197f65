use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rand::distributions::Open01;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::MonteCarloConfig;
use crate::error::AnalystError;
use crate::numeric::descriptive::correlation;
use crate::numeric::inverse_normal_cdf;
use crate::numeric::linalg::{lower_mul_vec, Matrix};
use crate::types::{with_metadata_f64, ComputationOutput};
use crate::AnalystResult;

use super::analysis::{analyze_results, MetricSummary, DEFAULT_QUANTILES};
use super::correlation::correlation_factor;
use super::distribution::McDistribution;

pub const MIN_TRIALS: usize = 100;

/// Golden-ratio increment used to spread batch seeds apart.
const BATCH_SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// One named value per variable or output metric.
pub type Sample = BTreeMap<String, f64>;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McVariable {
    pub name: String,
    pub distribution: McDistribution,
}

/// Top-level input for a Monte Carlo run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloInput {
    /// Ordered; correlation matrix rows follow this order.
    pub variables: Vec<McVariable>,
    /// Number of trials (minimum 100)
    #[serde(default = "default_trial_count")]
    pub trial_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_matrix: Option<Matrix>,
    /// Fixed seed for a reproducible run. Drawn from entropy when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Two-sided interval level, defaults to the engine configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<f64>,
    /// Reported quantiles, defaults to p5/p25/p50/p75/p95
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantiles: Option<Vec<f64>>,
}

fn default_trial_count() -> usize {
    10_000
}

/// Sampled inputs and evaluator outputs of one accepted trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial: usize,
    pub inputs: Sample,
    pub outputs: Sample,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub trial_count: usize,
    pub valid_trials: usize,
    pub skipped_trials: usize,
    /// Seed actually used, so an entropy-seeded run can be replayed
    pub seed: u64,
    pub confidence_level: f64,
    pub outputs: BTreeMap<String, MetricSummary>,
    pub inputs: BTreeMap<String, MetricSummary>,
    /// Pearson correlation of the sampled inputs, in variable order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realized_correlation: Option<Matrix>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<TrialRecord>,
}

/// Cooperative stop signal, checked between trial batches.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct BatchOutcome {
    records: Vec<TrialRecord>,
    skipped: usize,
    first_skip_reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run `input.trial_count` trials, passing each sampled assumption vector to
/// `evaluator`.
///
/// Trials are split into batches of `config.batch_size`. Each batch owns an
/// RNG seeded from (seed, batch index), so a seeded run produces the same
/// records whatever the thread count. A trial whose evaluation fails with a
/// domain error is skipped and counted; any other error aborts the run.
/// Cancellation is observed between batches and yields
/// [`AnalystError::Cancelled`] with no partial result.
pub fn run_simulation<F>(
    input: &MonteCarloInput,
    config: &MonteCarloConfig,
    evaluator: F,
    cancel: Option<&CancellationToken>,
) -> AnalystResult<ComputationOutput<SimulationResult>>
where
    F: Fn(&Sample) -> AnalystResult<Sample> + Sync,
{
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;
    let confidence_level = input.confidence_level.unwrap_or(config.confidence_level);
    let quantiles = input
        .quantiles
        .clone()
        .unwrap_or_else(|| DEFAULT_QUANTILES.to_vec());
    if quantiles.iter().any(|q| !(0.0..=1.0).contains(q)) {
        return Err(AnalystError::invalid("quantiles", "Each quantile must lie in [0, 1]"));
    }
    if config.batch_size == 0 {
        return Err(AnalystError::invalid("monte_carlo.batch_size", "Must be at least 1"));
    }

    let factor = match &input.correlation_matrix {
        Some(m) => Some(correlation_factor(m, input.variables.len())?),
        None => None,
    };
    let seed = input.seed.unwrap_or_else(rand::random::<u64>);

    let batch_size = config.batch_size;
    let batches = input.trial_count.div_ceil(batch_size);
    tracing::debug!(
        trials = input.trial_count,
        variables = input.variables.len(),
        batches,
        seed,
        correlated = factor.is_some(),
        "running monte carlo simulation"
    );

    let run_batch = |batch: usize| -> AnalystResult<BatchOutcome> {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(AnalystError::Cancelled);
        }
        let mut rng = StdRng::seed_from_u64(
            seed.wrapping_add((batch as u64).wrapping_mul(BATCH_SEED_STRIDE)),
        );
        let first = batch * batch_size;
        let last = (first + batch_size).min(input.trial_count);

        let mut outcome = BatchOutcome {
            records: Vec::with_capacity(last - first),
            skipped: 0,
            first_skip_reason: None,
        };
        for trial in first..last {
            let inputs = draw_sample(&input.variables, factor.as_ref(), &mut rng)?;
            match evaluator(&inputs) {
                Ok(outputs) => outcome.records.push(TrialRecord {
                    trial,
                    inputs,
                    outputs,
                }),
                Err(e) if e.is_domain() => {
                    outcome.skipped += 1;
                    outcome.first_skip_reason.get_or_insert_with(|| e.to_string());
                }
                Err(e) => return Err(e),
            }
        }
        if outcome.skipped > 0 {
            tracing::warn!(batch, skipped = outcome.skipped, "skipped monte carlo trials");
        }
        Ok(outcome)
    };

    let outcomes: Vec<BatchOutcome> = match config.workers {
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| AnalystError::invalid("monte_carlo.workers", e.to_string()))?;
            pool.install(|| {
                (0..batches)
                    .into_par_iter()
                    .map(run_batch)
                    .collect::<AnalystResult<Vec<_>>>()
            })
        }
        None => (0..batches)
            .into_par_iter()
            .map(run_batch)
            .collect::<AnalystResult<Vec<_>>>(),
    }?;

    let mut records = Vec::with_capacity(input.trial_count);
    let mut skipped_trials = 0;
    let mut skip_reason: Option<String> = None;
    for outcome in outcomes {
        records.extend(outcome.records);
        skipped_trials += outcome.skipped;
        if skip_reason.is_none() {
            skip_reason = outcome.first_skip_reason;
        }
    }

    if skipped_trials > 0 {
        warnings.push(format!(
            "{skipped_trials} of {} trials skipped on domain errors (first: {})",
            input.trial_count,
            skip_reason.unwrap_or_default()
        ));
    }
    if records.len() < 2 {
        return Err(AnalystError::insufficient(
            "monte carlo valid trials",
            2,
            records.len(),
        ));
    }
    if input.seed.is_none() {
        warnings.push(format!("No seed supplied; drew {seed} from entropy"));
    }

    let summary = analyze_results(&records, confidence_level, &quantiles)?;
    let realized_correlation = realized_correlation(&input.variables, &records);

    let result = SimulationResult {
        trial_count: input.trial_count,
        valid_trials: records.len(),
        skipped_trials,
        seed,
        confidence_level,
        outputs: summary.outputs,
        inputs: summary.inputs,
        realized_correlation,
        records,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Monte Carlo simulation (inverse-CDF sampling, Gaussian copula, rayon batches)",
        input,
        warnings,
        elapsed,
        result,
    ))
}

/// Sample the input distributions with no model attached. Only the input
/// summaries are populated.
pub fn run_monte_carlo_simulation(
    input: &MonteCarloInput,
    config: &MonteCarloConfig,
) -> AnalystResult<ComputationOutput<SimulationResult>> {
    run_simulation(input, config, |_| Ok(Sample::new()), None)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_input(input: &MonteCarloInput) -> AnalystResult<()> {
    if input.variables.is_empty() {
        return Err(AnalystError::invalid("variables", "At least one variable is required"));
    }
    let mut seen = BTreeSet::new();
    for v in &input.variables {
        if !seen.insert(v.name.as_str()) {
            return Err(AnalystError::invalid(
                "variables",
                format!("Duplicate variable name '{}'", v.name),
            ));
        }
        v.distribution.validate(&v.name)?;
    }
    if input.trial_count < MIN_TRIALS {
        return Err(AnalystError::invalid(
            "trial_count",
            format!("Must be at least {MIN_TRIALS}, got {}", input.trial_count),
        ));
    }
    if let Some(level) = input.confidence_level {
        if !(level > 0.0 && level < 1.0) {
            return Err(AnalystError::invalid(
                "confidence_level",
                "Must lie strictly between 0 and 1",
            ));
        }
    }
    Ok(())
}

fn draw_sample(
    variables: &[McVariable],
    factor: Option<&Matrix>,
    rng: &mut StdRng,
) -> AnalystResult<Sample> {
    let mut sample = Sample::new();
    match factor {
        None => {
            for v in variables {
                let u: f64 = rng.sample(Open01);
                sample.insert(v.name.clone(), v.distribution.quantile(u)?);
            }
        }
        Some(l) => {
            let mut z = Vec::with_capacity(variables.len());
            for _ in variables {
                let u: f64 = rng.sample(Open01);
                z.push(inverse_normal_cdf(u)?);
            }
            let correlated = lower_mul_vec(l, &z);
            for (v, zc) in variables.iter().zip(correlated) {
                sample.insert(v.name.clone(), v.distribution.from_standard_normal(zc)?);
            }
        }
    }
    Ok(sample)
}

fn realized_correlation(variables: &[McVariable], records: &[TrialRecord]) -> Option<Matrix> {
    if variables.len() < 2 {
        return None;
    }
    let columns: Vec<Vec<f64>> = variables
        .iter()
        .map(|v| {
            records
                .iter()
                .map(|r| r.inputs.get(&v.name).copied().unwrap_or(f64::NAN))
                .collect()
        })
        .collect();
    let n = columns.len();
    let mut matrix = vec![vec![1.0; n]; n];
    for i in 0..n {
        for j in 0..i {
            let rho = correlation(&columns[i], &columns[j]);
            matrix[i][j] = rho;
            matrix[j][i] = rho;
        }
    }
    Some(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normal_input(trials: usize, seed: u64) -> MonteCarloInput {
        MonteCarloInput {
            variables: vec![McVariable {
                name: "growth".into(),
                distribution: McDistribution::Normal {
                    mean: 0.1,
                    std_dev: 0.03,
                },
            }],
            trial_count: trials,
            correlation_matrix: None,
            seed: Some(seed),
            confidence_level: None,
            quantiles: None,
        }
    }

    #[test]
    fn test_normal_sample_moments() {
        let out = run_monte_carlo_simulation(&normal_input(1000, 42), &MonteCarloConfig::default())
            .unwrap();
        let stats = &out.result.inputs["growth"].statistics;
        assert_eq!(stats.count, 1000);
        assert!((stats.mean - 0.1).abs() < 0.01, "mean = {}", stats.mean);
        assert!((stats.std_dev - 0.03).abs() < 0.01, "std = {}", stats.std_dev);
        assert!(out.result.outputs.is_empty());
        assert_eq!(out.metadata.precision, "ieee754_f64");
    }

    #[test]
    fn test_seeded_runs_ignore_thread_count() {
        let input = normal_input(500, 7);
        let one = MonteCarloConfig {
            batch_size: 64,
            workers: Some(1),
            ..Default::default()
        };
        let four = MonteCarloConfig {
            workers: Some(4),
            ..one.clone()
        };
        let a = run_monte_carlo_simulation(&input, &one).unwrap().result;
        let b = run_monte_carlo_simulation(&input, &four).unwrap().result;
        assert_eq!(a.records, b.records);
        assert_eq!(a.records.len(), 500);
        assert_eq!(a.records[499].trial, 499);
    }

    #[test]
    fn test_evaluator_outputs_are_summarised() {
        let input = normal_input(200, 1);
        let out = run_simulation(
            &input,
            &MonteCarloConfig::default(),
            |s| Ok(Sample::from([("double".to_string(), 2.0 * s["growth"])])),
            None,
        )
        .unwrap();
        let doubled = out.result.outputs["double"].statistics.mean;
        let base = out.result.inputs["growth"].statistics.mean;
        assert!((doubled - 2.0 * base).abs() < 1e-12);
    }

    #[test]
    fn test_domain_errors_skip_trials() {
        let mut input = normal_input(400, 3);
        input.variables[0].distribution = McDistribution::Normal {
            mean: 0.0,
            std_dev: 1.0,
        };
        let out = run_simulation(
            &input,
            &MonteCarloConfig::default(),
            |s| {
                if s["growth"] < 0.0 {
                    Err(AnalystError::Domain("negative draw".into()))
                } else {
                    Ok(s.clone())
                }
            },
            None,
        )
        .unwrap();
        let r = &out.result;
        assert_eq!(r.valid_trials + r.skipped_trials, 400);
        assert!(r.skipped_trials > 100 && r.skipped_trials < 300);
        assert!(out.warnings.iter().any(|w| w.contains("skipped")));
    }

    #[test]
    fn test_other_errors_abort() {
        let result = run_simulation(
            &normal_input(200, 3),
            &MonteCarloConfig::default(),
            |_| Err(AnalystError::invalid("model", "broken")),
            None,
        );
        assert!(matches!(result, Err(AnalystError::InvalidInput { .. })));
    }

    #[test]
    fn test_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let result = run_simulation(
            &normal_input(1000, 1),
            &MonteCarloConfig::default(),
            |s| Ok(s.clone()),
            Some(&token),
        );
        assert!(matches!(result, Err(AnalystError::Cancelled)));
    }

    #[test]
    fn test_correlated_draws() {
        let input = MonteCarloInput {
            variables: vec![
                McVariable {
                    name: "a".into(),
                    distribution: McDistribution::Normal { mean: 0.0, std_dev: 1.0 },
                },
                McVariable {
                    name: "b".into(),
                    distribution: McDistribution::Normal { mean: 5.0, std_dev: 2.0 },
                },
            ],
            trial_count: 5000,
            correlation_matrix: Some(vec![vec![1.0, 0.8], vec![0.8, 1.0]]),
            seed: Some(11),
            confidence_level: Some(0.9),
            quantiles: None,
        };
        let out = run_monte_carlo_simulation(&input, &MonteCarloConfig::default()).unwrap();
        let rho = out.result.realized_correlation.unwrap()[1][0];
        assert!((rho - 0.8).abs() < 0.05, "rho = {rho}");
    }

    #[test]
    fn test_non_psd_correlation_is_domain_error() {
        let mut input = normal_input(200, 1);
        input.variables.push(McVariable {
            name: "b".into(),
            distribution: McDistribution::Uniform { min: 0.0, max: 1.0 },
        });
        input.variables.push(McVariable {
            name: "c".into(),
            distribution: McDistribution::Uniform { min: 0.0, max: 1.0 },
        });
        input.correlation_matrix = Some(vec![
            vec![1.0, 0.9, 0.9],
            vec![0.9, 1.0, -0.9],
            vec![0.9, -0.9, 1.0],
        ]);
        let result = run_monte_carlo_simulation(&input, &MonteCarloConfig::default());
        assert!(matches!(result, Err(AnalystError::Domain(_))));
    }

    #[test]
    fn test_rejects_small_runs_and_duplicates() {
        assert!(run_monte_carlo_simulation(&normal_input(99, 1), &MonteCarloConfig::default()).is_err());
        let mut dup = normal_input(200, 1);
        dup.variables.push(dup.variables[0].clone());
        assert!(run_monte_carlo_simulation(&dup, &MonteCarloConfig::default()).is_err());
    }

    #[test]
    fn test_entropy_seed_is_reported() {
        let mut input = normal_input(100, 0);
        input.seed = None;
        let out = run_monte_carlo_simulation(&input, &MonteCarloConfig::default()).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains(&out.result.seed.to_string())));
    }
}
