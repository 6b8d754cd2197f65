pub mod analysis;
pub mod correlation;
pub mod distribution;
pub mod engine;
#[cfg(feature = "valuation")]
pub mod evaluators;
pub mod simulation;
pub mod stress;

pub use analysis::{analyze_results, AnalysisSummary, MetricSummary};
pub use distribution::McDistribution;
pub use engine::MonteCarloEngine;
pub use simulation::{
    run_monte_carlo_simulation, run_simulation, CancellationToken, McVariable, MonteCarloInput,
    Sample, SimulationResult, TrialRecord,
};
pub use stress::{run_stress_test, Shock, StressScenario, StressTestInput, StressTestResult};
