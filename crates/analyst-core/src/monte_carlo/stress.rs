use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::AnalystError;
use crate::types::{with_metadata_f64, ComputationOutput};
use crate::AnalystResult;

use super::simulation::Sample;

/// How a shock moves one assumption.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shock {
    /// base + value
    Absolute { value: f64 },
    /// base × (1 + value)
    Relative { value: f64 },
    /// value, ignoring the base
    Override { value: f64 },
}

impl Shock {
    pub fn apply(&self, base: f64) -> f64 {
        match self {
            Shock::Absolute { value } => base + value,
            Shock::Relative { value } => base * (1.0 + value),
            Shock::Override { value } => *value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressScenario {
    pub name: String,
    pub shocks: BTreeMap<String, Shock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressTestInput {
    pub base: Sample,
    pub scenarios: Vec<StressScenario>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressScenarioResult {
    pub name: String,
    pub inputs: Sample,
    /// `None` when the shocked inputs fall outside the model's domain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Sample>,
    /// Scenario output minus base output, per metric
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deltas: Option<Sample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressTestResult {
    pub base_inputs: Sample,
    pub base_outputs: Sample,
    pub scenarios: Vec<StressScenarioResult>,
}

/// Evaluate the base assumption vector and every shocked variant of it.
///
/// Shocks may only name variables present in the base. A scenario the
/// evaluator rejects with a domain error is kept with no outputs and a
/// warning; the base itself must evaluate.
pub fn run_stress_test<F>(
    input: &StressTestInput,
    evaluator: F,
) -> AnalystResult<ComputationOutput<StressTestResult>>
where
    F: Fn(&Sample) -> AnalystResult<Sample>,
{
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    tracing::debug!(scenarios = input.scenarios.len(), "running stress test");

    if input.scenarios.is_empty() {
        return Err(AnalystError::invalid("scenarios", "At least one stress scenario is required"));
    }
    for scenario in &input.scenarios {
        if let Some(unknown) = scenario.shocks.keys().find(|k| !input.base.contains_key(*k)) {
            return Err(AnalystError::invalid(
                "shocks",
                format!("Scenario '{}' shocks unknown variable '{unknown}'", scenario.name),
            ));
        }
    }

    let base_outputs = evaluator(&input.base)?;

    let mut scenarios = Vec::with_capacity(input.scenarios.len());
    for scenario in &input.scenarios {
        let mut inputs = input.base.clone();
        for (name, shock) in &scenario.shocks {
            if let Some(v) = inputs.get_mut(name) {
                *v = shock.apply(*v);
            }
        }
        let (outputs, deltas) = match evaluator(&inputs) {
            Ok(outputs) => {
                let deltas = outputs
                    .iter()
                    .filter_map(|(k, v)| base_outputs.get(k).map(|b| (k.clone(), v - b)))
                    .collect();
                (Some(outputs), Some(deltas))
            }
            Err(e) if e.is_domain() => {
                warnings.push(format!("[{}] Scenario not evaluated: {e}", scenario.name));
                (None, None)
            }
            Err(e) => return Err(e),
        };
        scenarios.push(StressScenarioResult {
            name: scenario.name.clone(),
            inputs,
            outputs,
            deltas,
        });
    }

    let result = StressTestResult {
        base_inputs: input.base.clone(),
        base_outputs,
        scenarios,
    };
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Deterministic stress test: shocked assumption sets against a base case",
        input,
        warnings,
        elapsed,
        result,
    ))
}
