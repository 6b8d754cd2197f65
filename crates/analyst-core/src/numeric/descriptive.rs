use crate::error::AnalystError;
use crate::AnalystResult;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Unbiased sample variance (n − 1 denominator).
pub fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - 1) as f64
}

pub fn sample_std_dev(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

/// k-th central moment with an n denominator.
pub fn central_moment(values: &[f64], k: i32) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m).powi(k)).sum::<f64>() / values.len() as f64
}

/// Moment coefficient of skewness m3 / m2^1.5. Zero for a constant series.
pub fn skewness(values: &[f64]) -> f64 {
    let m2 = central_moment(values, 2);
    if m2 <= 0.0 {
        return 0.0;
    }
    central_moment(values, 3) / m2.powf(1.5)
}

/// Excess kurtosis m4 / m2² − 3. Zero for a constant series.
pub fn excess_kurtosis(values: &[f64]) -> f64 {
    let m2 = central_moment(values, 2);
    if m2 <= 0.0 {
        return 0.0;
    }
    central_moment(values, 4) / (m2 * m2) - 3.0
}

/// Ascending copy with NaNs ordered last. The input is left untouched.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

/// Empirical quantile of an ascending slice, linear between the two nearest
/// ranks (Hyndman–Fan type 7). `p` is clamped to [0, 1]; 0 and 1 return the
/// minimum and maximum exactly.
pub fn percentile(sorted_values: &[f64], p: f64) -> AnalystResult<f64> {
    if sorted_values.is_empty() {
        return Err(AnalystError::insufficient("percentile", 1, 0));
    }
    if p.is_nan() {
        return Err(AnalystError::invalid("p", "percentile rank is NaN"));
    }
    let p = p.clamp(0.0, 1.0);
    let last = sorted_values.len() - 1;
    let h = last as f64 * p;
    let lo = h.floor() as usize;
    if lo >= last {
        return Ok(sorted_values[last]);
    }
    let frac = h - lo as f64;
    Ok(sorted_values[lo] + frac * (sorted_values[lo + 1] - sorted_values[lo]))
}

pub fn median(sorted_values: &[f64]) -> AnalystResult<f64> {
    percentile(sorted_values, 0.5)
}

/// Sample autocorrelation at `lag`, normalised by the lag-0 sum of squares.
pub fn autocorrelation(values: &[f64], lag: usize) -> f64 {
    let n = values.len();
    if lag >= n {
        return 0.0;
    }
    let m = mean(values);
    let denom: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    if denom == 0.0 {
        return 0.0;
    }
    let num: f64 = (lag..n)
        .map(|t| (values[t] - m) * (values[t - lag] - m))
        .sum();
    num / denom
}

/// Pearson correlation of two equal-length series. Zero when either is
/// constant.
pub fn correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return f64::NAN;
    }
    let (mx, my) = (mean(&x[..n]), mean(&y[..n]));
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x[..n].iter().zip(&y[..n]) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return 0.0;
    }
    sxy / (sxx * syy).sqrt()
}

/// First differences x[t] − x[t−1].
pub fn differences(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}
