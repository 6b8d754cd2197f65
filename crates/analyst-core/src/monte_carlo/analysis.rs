use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::AnalystError;
use crate::numeric::descriptive::{excess_kurtosis, mean, sample_std_dev, skewness, sorted};
use crate::numeric::percentile;
use crate::AnalystResult;

use super::simulation::TrialRecord;

/// Quantiles reported for every metric unless the caller asks for others.
pub const DEFAULT_QUANTILES: [f64; 5] = [0.05, 0.25, 0.50, 0.75, 0.95];

const HISTOGRAM_BINS: usize = 20;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (n − 1)
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub skewness: f64,
    pub excess_kurtosis: f64,
}

/// Two-sided empirical interval: the (1 − level)/2 and (1 + level)/2
/// quantiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub level: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Lower-tail quantile at 1 − confidence level
    pub value_at_risk: f64,
    /// Mean of outcomes at or below the value at risk
    pub expected_shortfall: f64,
    pub probability_of_negative: f64,
    /// Semi-deviation below the mean
    pub downside_deviation: f64,
    /// std_dev ÷ |mean|; `None` when the mean is zero
    pub coefficient_of_variation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    pub frequency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub statistics: SummaryStatistics,
    /// Keyed "p5", "p25", ... ("p97.5" for fractional percentiles)
    pub percentiles: BTreeMap<String, f64>,
    pub confidence_interval: ConfidenceInterval,
    pub risk_metrics: RiskMetrics,
    pub histogram: Vec<HistogramBin>,
}

/// Per-metric summaries of a finished simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub outputs: BTreeMap<String, MetricSummary>,
    pub inputs: BTreeMap<String, MetricSummary>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Summarise every input and output metric across `records`.
pub fn analyze_results(
    records: &[TrialRecord],
    confidence_level: f64,
    quantiles: &[f64],
) -> AnalystResult<AnalysisSummary> {
    if records.len() < 2 {
        return Err(AnalystError::insufficient("analyze_results", 2, records.len()));
    }
    let summarize_columns = |pick: fn(&TrialRecord) -> &BTreeMap<String, f64>| {
        let mut columns: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for r in records {
            for (name, v) in pick(r) {
                columns.entry(name.clone()).or_default().push(*v);
            }
        }
        let mut summaries = BTreeMap::new();
        for (name, values) in columns {
            let summary = summarize(&values, confidence_level, quantiles)?;
            summaries.insert(name, summary);
        }
        Ok::<_, AnalystError>(summaries)
    };

    Ok(AnalysisSummary {
        outputs: summarize_columns(|r| &r.outputs)?,
        inputs: summarize_columns(|r| &r.inputs)?,
    })
}

/// Full summary of one metric. Non-finite values are rejected.
pub fn summarize(
    values: &[f64],
    confidence_level: f64,
    quantiles: &[f64],
) -> AnalystResult<MetricSummary> {
    if !(confidence_level > 0.0 && confidence_level < 1.0) {
        return Err(AnalystError::invalid(
            "confidence_level",
            "Must lie strictly between 0 and 1",
        ));
    }
    if values.len() < 2 {
        return Err(AnalystError::insufficient("summarize", 2, values.len()));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(AnalystError::invalid("values", "Outcomes must be finite"));
    }

    let s = sorted(values);
    let m = mean(&s);
    let std_dev = sample_std_dev(&s);

    let statistics = SummaryStatistics {
        count: s.len(),
        mean: m,
        median: percentile(&s, 0.5)?,
        std_dev,
        min: s[0],
        max: s[s.len() - 1],
        skewness: skewness(&s),
        excess_kurtosis: excess_kurtosis(&s),
    };

    let mut percentiles = BTreeMap::new();
    for q in quantiles {
        percentiles.insert(percentile_label(*q), percentile(&s, *q)?);
    }

    let tail = (1.0 - confidence_level) / 2.0;
    let confidence_interval = ConfidenceInterval {
        level: confidence_level,
        lower: percentile(&s, tail)?,
        upper: percentile(&s, 1.0 - tail)?,
    };

    let risk_metrics = risk_metrics(&s, m, std_dev, confidence_level)?;

    Ok(MetricSummary {
        statistics,
        percentiles,
        confidence_interval,
        risk_metrics,
        histogram: histogram(&s, HISTOGRAM_BINS),
    })
}

pub fn percentile_label(q: f64) -> String {
    let pct = (q * 1000.0).round() / 10.0;
    format!("p{pct}")
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn risk_metrics(
    sorted_values: &[f64],
    m: f64,
    std_dev: f64,
    confidence_level: f64,
) -> AnalystResult<RiskMetrics> {
    let n = sorted_values.len() as f64;
    let value_at_risk = percentile(sorted_values, 1.0 - confidence_level)?;

    let tail: Vec<f64> = sorted_values
        .iter()
        .copied()
        .take_while(|v| *v <= value_at_risk)
        .collect();
    // The minimum is always ≤ any interpolated quantile, so the tail is
    // never empty.
    let expected_shortfall = mean(&tail);

    let negatives = sorted_values.iter().filter(|v| **v < 0.0).count();
    let downside = sorted_values
        .iter()
        .map(|v| (v - m).min(0.0).powi(2))
        .sum::<f64>()
        / n;

    Ok(RiskMetrics {
        value_at_risk,
        expected_shortfall,
        probability_of_negative: negatives as f64 / n,
        downside_deviation: downside.sqrt(),
        coefficient_of_variation: (m != 0.0).then(|| std_dev / m.abs()),
    })
}

/// Equal-width bins over [min, max]; the last bin is closed.
fn histogram(sorted_values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let n = sorted_values.len();
    let (lo, hi) = (sorted_values[0], sorted_values[n - 1]);
    if hi - lo <= f64::EPSILON * lo.abs().max(1.0) {
        return vec![HistogramBin {
            lower: lo,
            upper: hi,
            count: n,
            frequency: 1.0,
        }];
    }

    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in sorted_values {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: lo + i as f64 * width,
            upper: if i == bins - 1 { hi } else { lo + (i + 1) as f64 * width },
            count,
            frequency: count as f64 / n as f64,
        })
        .collect()
}
