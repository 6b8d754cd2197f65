use serde::{Deserialize, Serialize};

use crate::error::AnalystError;
use crate::numeric::{inverse_normal_cdf, normal_cdf};
use crate::AnalystResult;

/// Probability distribution for one simulated variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum McDistribution {
    Normal { mean: f64, std_dev: f64 },
    Uniform { min: f64, max: f64 },
    Triangular { min: f64, mode: f64, max: f64 },
    /// ln(X) ~ Normal(mu, sigma)
    LogNormal { mu: f64, sigma: f64 },
}

impl McDistribution {
    pub fn validate(&self, name: &str) -> AnalystResult<()> {
        let field = format!("variables[{name}].distribution");
        let finite = match self {
            McDistribution::Normal { mean, std_dev } => mean.is_finite() && std_dev.is_finite(),
            McDistribution::Uniform { min, max } => min.is_finite() && max.is_finite(),
            McDistribution::Triangular { min, mode, max } => {
                min.is_finite() && mode.is_finite() && max.is_finite()
            }
            McDistribution::LogNormal { mu, sigma } => mu.is_finite() && sigma.is_finite(),
        };
        if !finite {
            return Err(AnalystError::invalid(&field, "Parameters must be finite"));
        }
        match self {
            McDistribution::Normal { std_dev, .. } if *std_dev < 0.0 => {
                Err(AnalystError::invalid(&field, "std_dev cannot be negative"))
            }
            McDistribution::LogNormal { sigma, .. } if *sigma < 0.0 => {
                Err(AnalystError::invalid(&field, "sigma cannot be negative"))
            }
            McDistribution::Uniform { min, max } if min >= max => {
                Err(AnalystError::invalid(&field, "min must be below max"))
            }
            McDistribution::Triangular { min, mode, max }
                if min >= max || mode < min || mode > max =>
            {
                Err(AnalystError::invalid(&field, "Requires min <= mode <= max and min < max"))
            }
            _ => Ok(()),
        }
    }

    /// Inverse CDF at `u` ∈ (0, 1).
    pub fn quantile(&self, u: f64) -> AnalystResult<f64> {
        Ok(match self {
            McDistribution::Normal { mean, std_dev } => mean + std_dev * inverse_normal_cdf(u)?,
            McDistribution::Uniform { min, max } => min + u * (max - min),
            McDistribution::Triangular { min, mode, max } => {
                let span = max - min;
                let split = (mode - min) / span;
                if u < split {
                    min + (u * span * (mode - min)).sqrt()
                } else {
                    max - ((1.0 - u) * span * (max - mode)).sqrt()
                }
            }
            McDistribution::LogNormal { mu, sigma } => (mu + sigma * inverse_normal_cdf(u)?).exp(),
        })
    }

    /// Map a standard normal draw onto this marginal (Gaussian copula).
    /// Normal and log-normal use `z` directly; the others go through Φ(z).
    pub fn from_standard_normal(&self, z: f64) -> AnalystResult<f64> {
        match self {
            McDistribution::Normal { mean, std_dev } => Ok(mean + std_dev * z),
            McDistribution::LogNormal { mu, sigma } => Ok((mu + sigma * z).exp()),
            McDistribution::Uniform { .. } | McDistribution::Triangular { .. } => {
                self.quantile(normal_cdf(z))
            }
        }
    }

    /// Theoretical mean.
    pub fn mean(&self) -> f64 {
        match self {
            McDistribution::Normal { mean, .. } => *mean,
            McDistribution::Uniform { min, max } => (min + max) / 2.0,
            McDistribution::Triangular { min, mode, max } => (min + mode + max) / 3.0,
            McDistribution::LogNormal { mu, sigma } => (mu + sigma * sigma / 2.0).exp(),
        }
    }
}
