//! Two-sample statistics for the A/B comparison.
//!
//! The t-distribution tail probabilities go through the regularized
//! incomplete beta function (continued-fraction form) with a Lanczos
//! log-gamma; quantiles invert the CDF by bisection. Callers guarantee at
//! least two observations per sample.

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

pub fn sample_variance(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    xs.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64
}

pub fn sample_std(xs: &[f64]) -> f64 {
    sample_variance(xs).sqrt()
}

/// Result of a two-sample test for a difference in means.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoSampleTest {
    pub t_statistic: f64,
    pub degrees_of_freedom: f64,
    pub p_value: f64,
}

/// Welch's t-test: difference in means without assuming equal variances.
pub fn welch_t_test(control: &[f64], treatment: &[f64]) -> TwoSampleTest {
    let n1 = control.len() as f64;
    let n2 = treatment.len() as f64;
    let v1 = sample_variance(control);
    let v2 = sample_variance(treatment);
    let diff = mean(treatment) - mean(control);

    let se_sq = v1 / n1 + v2 / n2;
    if se_sq == 0.0 {
        return degenerate_test(diff, n1 + n2 - 2.0);
    }

    let t = diff / se_sq.sqrt();
    let df_denom = (v1 / n1).powi(2) / (n1 - 1.0) + (v2 / n2).powi(2) / (n2 - 1.0);
    let df = if df_denom > 0.0 {
        se_sq.powi(2) / df_denom
    } else {
        n1 + n2 - 2.0
    };

    TwoSampleTest {
        t_statistic: t,
        degrees_of_freedom: df,
        p_value: t_two_tailed_p(t.abs(), df),
    }
}

/// Student's t-test: the equal-variance variant, kept for parity with
/// reports produced by the earlier pipeline.
pub fn student_t_test(control: &[f64], treatment: &[f64]) -> TwoSampleTest {
    let n1 = control.len() as f64;
    let n2 = treatment.len() as f64;
    let v1 = sample_variance(control);
    let v2 = sample_variance(treatment);
    let diff = mean(treatment) - mean(control);
    let df = n1 + n2 - 2.0;

    let pooled_var = ((n1 - 1.0) * v1 + (n2 - 1.0) * v2) / df;
    let se = (pooled_var * (1.0 / n1 + 1.0 / n2)).sqrt();
    if se == 0.0 {
        return degenerate_test(diff, df);
    }

    let t = diff / se;
    TwoSampleTest {
        t_statistic: t,
        degrees_of_freedom: df,
        p_value: t_two_tailed_p(t.abs(), df),
    }
}

fn degenerate_test(diff: f64, df: f64) -> TwoSampleTest {
    // Zero spread in both samples: any nonzero difference is exact.
    let (t, p) = if diff == 0.0 {
        (0.0, 1.0)
    } else {
        (diff.signum() * f64::INFINITY, 0.0)
    };
    TwoSampleTest {
        t_statistic: t,
        degrees_of_freedom: df,
        p_value: p,
    }
}

/// Cohen's d with the RMS-pooled standard deviation
/// `sqrt((s1^2 + s2^2) / 2)`. Zero when both samples are constant.
pub fn cohens_d(control: &[f64], treatment: &[f64]) -> f64 {
    let pooled = ((sample_variance(control) + sample_variance(treatment)) / 2.0).sqrt();
    if pooled > 0.0 {
        (mean(treatment) - mean(control)) / pooled
    } else {
        0.0
    }
}

/// Confidence interval for the mean difference (treatment minus control),
/// using the t quantile at the Welch-Satterthwaite degrees of freedom.
pub fn welch_confidence_interval(control: &[f64], treatment: &[f64], confidence: f64) -> (f64, f64) {
    let test = welch_t_test(control, treatment);
    let diff = mean(treatment) - mean(control);
    let se_sq =
        sample_variance(control) / control.len() as f64 + sample_variance(treatment) / treatment.len() as f64;
    let se = se_sq.sqrt();
    let t_crit = t_quantile(
        0.5 + confidence / 2.0,
        test.degrees_of_freedom,
    );
    (diff - t_crit * se, diff + t_crit * se)
}

/// Two-tailed tail probability P(|T| > t) for Student's t with `df` degrees
/// of freedom, via I_x(df/2, 1/2) at x = df / (df + t^2).
pub fn t_two_tailed_p(t_abs: f64, df: f64) -> f64 {
    if !t_abs.is_finite() {
        return 0.0;
    }
    let x = df / (df + t_abs * t_abs);
    reg_inc_beta(df / 2.0, 0.5, x)
}

fn t_cdf(t: f64, df: f64) -> f64 {
    let half_tail = 0.5 * t_two_tailed_p(t.abs(), df);
    if t >= 0.0 {
        1.0 - half_tail
    } else {
        half_tail
    }
}

/// Quantile of Student's t distribution by bisection on the CDF. The CDF is
/// strictly increasing, so 200 halvings pin the root far below f64 epsilon.
pub fn t_quantile(p: f64, df: f64) -> f64 {
    let mut lo = -500.0;
    let mut hi = 500.0;
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if t_cdf(mid, df) < p {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Regularized incomplete beta function I_x(a, b), continued-fraction
/// evaluation with the symmetry transform for fast convergence.
pub fn reg_inc_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front =
        ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_cont_frac(a, b, x) / a
    } else {
        1.0 - front * beta_cont_frac(b, a, 1.0 - x) / b
    }
}

fn beta_cont_frac(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 200;
    const EPS: f64 = 3e-14;
    const FPMIN: f64 = 1e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < FPMIN {
        d = FPMIN;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

/// Lanczos approximation of ln(Gamma(x)), g = 7, n = 9 coefficients.
fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    const G: f64 = 7.0;

    if x <= 0.0 {
        return f64::INFINITY;
    }
    if x < 0.5 {
        // Reflection formula.
        let sin_val = (std::f64::consts::PI * x).sin();
        if sin_val.abs() < 1e-300 {
            return f64::INFINITY;
        }
        return std::f64::consts::PI.ln() - sin_val.abs().ln() - ln_gamma(1.0 - x);
    }

    let z = x - 1.0;
    let mut sum = COEFFS[0];
    for (i, &c) in COEFFS[1..].iter().enumerate() {
        sum += c / (z + i as f64 + 1.0);
    }

    let t = z + G + 0.5;
    (z + 0.5) * t.ln() + 0.5 * (2.0 * std::f64::consts::PI).ln() - t + sum.ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Samples with the group sizes and metric means of the reference
    // experiment: 9 control fill rates around 85.2, 11 treatment fill rates
    // around 95.2.
    const CONTROL: [f64; 9] = [
        65.971, 75.44, 77.771, 82.578, 85.2, 89.133, 92.629, 97.437, 100.642,
    ];
    const TREATMENT: [f64; 11] = [
        84.702, 88.036, 90.589, 92.363, 93.994, 95.2, 96.477, 98.179, 99.882, 102.577, 105.202,
    ];

    #[test]
    fn descriptive_stats() {
        assert!((mean(&CONTROL) - 85.2).abs() < 1e-3);
        assert!((mean(&TREATMENT) - 95.2).abs() < 1e-3);
        assert!((sample_std(&CONTROL) - 11.1014).abs() < 1e-3);
        assert!((sample_std(&TREATMENT) - 6.1578).abs() < 1e-3);
    }

    #[test]
    fn ln_gamma_matches_known_values() {
        // Gamma(5) = 24, Gamma(0.5) = sqrt(pi)
        assert!((ln_gamma(5.0) - 24.0f64.ln()).abs() < 1e-10);
        assert!((ln_gamma(0.5) - std::f64::consts::PI.sqrt().ln()).abs() < 1e-10);
    }

    #[test]
    fn t_tail_matches_critical_values() {
        // textbook two-tailed 5% critical points
        assert!((t_two_tailed_p(2.1009, 18.0) - 0.05).abs() < 1e-3);
        assert!((t_two_tailed_p(2.2281, 10.0) - 0.05).abs() < 1e-3);
        assert_eq!(t_two_tailed_p(f64::INFINITY, 10.0), 0.0);
    }

    #[test]
    fn t_quantile_inverts_the_tail() {
        assert!((t_quantile(0.975, 18.0) - 2.1009).abs() < 1e-3);
        assert!((t_quantile(0.5, 7.0)).abs() < 1e-9);
    }

    #[test]
    fn welch_on_reference_samples() {
        let test = welch_t_test(&CONTROL, &TREATMENT);
        assert!((test.t_statistic - 2.415_380_214_217).abs() < 1e-9);
        assert!((test.degrees_of_freedom - 11.929_879_913_536).abs() < 1e-9);
        assert!((test.p_value - 0.032_700_114_798).abs() < 1e-6);
    }

    #[test]
    fn student_on_reference_samples_reproduces_legacy_p() {
        // the earlier pipeline ran the equal-variance test; its published
        // p-value on these samples was 0.0199
        let test = student_t_test(&CONTROL, &TREATMENT);
        assert_eq!(test.degrees_of_freedom, 18.0);
        assert!((test.t_statistic - 2.554_777_530_007).abs() < 1e-9);
        assert!((test.p_value - 0.0199).abs() < 1e-3);
    }

    #[test]
    fn cohens_d_on_reference_samples() {
        let d = cohens_d(&CONTROL, &TREATMENT);
        assert!((d - 1.114).abs() < 1e-3);
    }

    #[test]
    fn welch_ci_on_reference_samples() {
        let (lo, hi) = welch_confidence_interval(&CONTROL, &TREATMENT, 0.95);
        assert!((lo - 0.973_534_993).abs() < 1e-6);
        assert!((hi - 19.026_424_603).abs() < 1e-6);
        let diff = mean(&TREATMENT) - mean(&CONTROL);
        assert!(lo < diff && diff < hi);
    }

    #[test]
    fn degenerate_samples_do_not_blow_up() {
        let flat_a = [5.0, 5.0, 5.0];
        let flat_b = [5.0, 5.0, 5.0];
        let test = welch_t_test(&flat_a, &flat_b);
        assert_eq!(test.t_statistic, 0.0);
        assert_eq!(test.p_value, 1.0);
        assert_eq!(cohens_d(&flat_a, &flat_b), 0.0);

        let shifted = [6.0, 6.0, 6.0];
        let test = welch_t_test(&flat_a, &shifted);
        assert_eq!(test.p_value, 0.0);
        assert!(test.t_statistic.is_infinite());
    }
}
