use crate::numeric::descriptive::{mean, sample_variance};
use crate::numeric::distributions::student_t_two_tailed;
use crate::AnalystResult;

use super::result::{
    check_alpha, check_same_length, check_sample, zero_variance, HypothesisTestResult,
    TTestVariant, TestDiagnostics,
};

const MIN_OBSERVATIONS: usize = 2;

/// H0: the population mean equals `mu`.
pub fn one_sample_t_test(sample: &[f64], mu: f64, alpha: f64) -> AnalystResult<HypothesisTestResult> {
    check_alpha(alpha)?;
    check_sample("one-sample t-test", sample, MIN_OBSERVATIONS)?;

    let n = sample.len();
    let m = mean(sample);
    let variance = sample_variance(sample);
    if variance <= 0.0 {
        return Err(zero_variance("one-sample t-test"));
    }
    let se = (variance / n as f64).sqrt();
    let t = (m - mu) / se;
    let df = (n - 1) as f64;
    let p = student_t_two_tailed(t, df)?;

    Ok(HypothesisTestResult {
        test_name: "One-sample t-test".into(),
        null_hypothesis: format!("Population mean equals {mu}"),
        alternative_hypothesis: format!("Population mean differs from {mu}"),
        statistic: t,
        degrees_of_freedom: Some(df),
        p_value: Some(p),
        significance_level: alpha,
        reject_null: p < alpha,
        diagnostics: TestDiagnostics::TTest {
            variant: None,
            sample_means: vec![m],
            sample_sizes: vec![n],
            mean_difference: m - mu,
            standard_error: se,
        },
    })
}

/// H0: the two population means are equal.
pub fn two_sample_t_test(
    a: &[f64],
    b: &[f64],
    variant: TTestVariant,
    alpha: f64,
) -> AnalystResult<HypothesisTestResult> {
    check_alpha(alpha)?;
    check_sample("two-sample t-test (sample a)", a, MIN_OBSERVATIONS)?;
    check_sample("two-sample t-test (sample b)", b, MIN_OBSERVATIONS)?;

    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (m1, m2) = (mean(a), mean(b));
    let (v1, v2) = (sample_variance(a), sample_variance(b));

    let (se, df, name) = match variant {
        TTestVariant::Pooled => {
            let pooled = ((n1 - 1.0) * v1 + (n2 - 1.0) * v2) / (n1 + n2 - 2.0);
            (
                (pooled * (1.0 / n1 + 1.0 / n2)).sqrt(),
                n1 + n2 - 2.0,
                "Two-sample t-test (pooled variance)",
            )
        }
        TTestVariant::Welch => {
            let (q1, q2) = (v1 / n1, v2 / n2);
            let denom = q1 * q1 / (n1 - 1.0) + q2 * q2 / (n2 - 1.0);
            let df = if denom > 0.0 {
                (q1 + q2).powi(2) / denom
            } else {
                n1 + n2 - 2.0
            };
            ((q1 + q2).sqrt(), df, "Welch's t-test")
        }
    };
    if se <= 0.0 {
        return Err(zero_variance("two-sample t-test"));
    }

    let t = (m1 - m2) / se;
    let p = student_t_two_tailed(t, df)?;

    Ok(HypothesisTestResult {
        test_name: name.into(),
        null_hypothesis: "Population means are equal".into(),
        alternative_hypothesis: "Population means differ".into(),
        statistic: t,
        degrees_of_freedom: Some(df),
        p_value: Some(p),
        significance_level: alpha,
        reject_null: p < alpha,
        diagnostics: TestDiagnostics::TTest {
            variant: Some(variant),
            sample_means: vec![m1, m2],
            sample_sizes: vec![a.len(), b.len()],
            mean_difference: m1 - m2,
            standard_error: se,
        },
    })
}

/// H0: the mean of the pairwise differences a − b is zero.
pub fn paired_t_test(a: &[f64], b: &[f64], alpha: f64) -> AnalystResult<HypothesisTestResult> {
    check_same_length(a, b)?;
    check_sample("paired t-test (sample a)", a, MIN_OBSERVATIONS)?;
    check_sample("paired t-test (sample b)", b, MIN_OBSERVATIONS)?;

    let diffs: Vec<f64> = a.iter().zip(b).map(|(x, y)| x - y).collect();
    let mut result = one_sample_t_test(&diffs, 0.0, alpha)?;
    result.test_name = "Paired t-test".into();
    result.null_hypothesis = "Mean paired difference is zero".into();
    result.alternative_hypothesis = "Mean paired difference is non-zero".into();
    if let TestDiagnostics::TTest {
        sample_means,
        sample_sizes,
        ..
    } = &mut result.diagnostics
    {
        *sample_means = vec![mean(a), mean(b)];
        *sample_sizes = vec![a.len(), b.len()];
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalystError;

    fn group_a() -> Vec<f64> {
        vec![19.8, 20.4, 19.6, 17.8, 18.5, 18.9, 18.3, 18.9, 19.5, 22.0]
    }

    fn group_b() -> Vec<f64> {
        vec![
            28.2, 26.6, 20.1, 23.3, 25.2, 22.1, 17.7, 27.6, 20.6, 13.7, 23.2, 17.5, 20.6, 18.0,
            23.9, 21.6, 24.3, 20.4, 23.9, 13.3,
        ]
    }

    #[test]
    fn test_mean_equal_to_mu_does_not_reject() {
        let r = one_sample_t_test(&[1.0, 2.0, 3.0, 4.0, 5.0], 3.0, 0.05).unwrap();
        assert!(r.statistic.abs() < 1e-12);
        assert!(!r.reject_null);
        assert!((r.p_value.unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(r.degrees_of_freedom, Some(4.0));
    }

    #[test]
    fn test_one_sample_rejects_far_mean() {
        let r = one_sample_t_test(&[10.1, 9.9, 10.0, 10.2, 9.8], 0.0, 0.05).unwrap();
        assert!(r.reject_null);
        assert!(r.p_value.unwrap() < 1e-6);
    }

    #[test]
    fn test_welch_statistic_and_df() {
        let r = two_sample_t_test(&group_a(), &group_b(), TTestVariant::Welch, 0.05).unwrap();
        assert!((r.statistic + 2.225512).abs() < 1e-5, "t = {}", r.statistic);
        assert!((r.degrees_of_freedom.unwrap() - 24.524635).abs() < 1e-5);
        assert!(r.reject_null);
    }

    #[test]
    fn test_pooled_statistic() {
        let r = two_sample_t_test(&group_a(), &group_b(), TTestVariant::Pooled, 0.05).unwrap();
        assert!((r.statistic + 1.654447).abs() < 1e-5, "t = {}", r.statistic);
        assert_eq!(r.degrees_of_freedom, Some(28.0));
        assert!(!r.reject_null);
    }

    #[test]
    fn test_paired_matches_one_sample_on_differences() {
        let before = [200.0, 190.0, 210.0, 220.0, 205.0, 198.0];
        let after = [192.0, 188.0, 199.0, 214.0, 200.0, 195.0];
        let paired = paired_t_test(&before, &after, 0.05).unwrap();
        let diffs: Vec<f64> = before.iter().zip(&after).map(|(a, b)| a - b).collect();
        let direct = one_sample_t_test(&diffs, 0.0, 0.05).unwrap();
        assert_eq!(paired.statistic, direct.statistic);
        assert_eq!(paired.test_name, "Paired t-test");
    }

    #[test]
    fn test_size_and_variance_errors() {
        assert!(matches!(
            one_sample_t_test(&[1.0], 0.0, 0.05),
            Err(AnalystError::InsufficientData { required: 2, .. })
        ));
        assert!(matches!(
            one_sample_t_test(&[2.0, 2.0, 2.0], 0.0, 0.05),
            Err(AnalystError::Domain(_))
        ));
        assert!(paired_t_test(&[1.0, 2.0], &[1.0], 0.05).is_err());
    }

    #[test]
    fn test_inputs_not_mutated() {
        let a = group_a();
        let copy = a.clone();
        two_sample_t_test(&a, &group_b(), TTestVariant::Welch, 0.05).unwrap();
        assert_eq!(a, copy);
    }
}
