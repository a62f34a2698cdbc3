//! Statistical comparison of the control and treatment groups.
//!
//! Each metric is tested independently with Welch's t-test; no
//! multiple-comparison correction is applied. That is a documented
//! limitation of the experiment design, not an oversight.

pub mod metrics;
pub mod roi;
pub mod stats;

use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::model::sku::TestGroup;
use self::metrics::{Metric, SkuSummary};
use self::stats::{cohens_d, mean, sample_std, welch_confidence_interval, welch_t_test};

/// Full comparison record for one metric, one row of the statistical
/// results table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub metric: &'static str,
    pub control_n: usize,
    pub treatment_n: usize,
    pub control_mean: f64,
    pub control_std: f64,
    pub treatment_mean: f64,
    pub treatment_std: f64,
    pub difference: f64,
    /// Percent change relative to the control mean; empty when the control
    /// mean is zero.
    pub pct_change: Option<f64>,
    pub t_statistic: f64,
    pub degrees_of_freedom: f64,
    pub p_value: f64,
    pub cohens_d: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub significant: bool,
}

/// Per-metric verdict: a full test, or the reason it could not run.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricOutcome {
    Tested(ComparisonRow),
    Inconclusive {
        metric: &'static str,
        reason: String,
    },
}

/// Compare one metric between the groups. `InsufficientSample` when either
/// side has fewer than two observations (variance undefined).
pub fn compare_metric(
    metric: Metric,
    control: &[f64],
    treatment: &[f64],
    alpha: f64,
) -> Result<ComparisonRow> {
    for (group, sample) in [
        (TestGroup::Control, control),
        (TestGroup::Treatment, treatment),
    ] {
        if sample.len() < 2 {
            return Err(Error::InsufficientSample {
                group,
                n: sample.len(),
            });
        }
    }

    let control_mean = mean(control);
    let treatment_mean = mean(treatment);
    let difference = treatment_mean - control_mean;
    let pct_change = if control_mean != 0.0 {
        Some(difference / control_mean * 100.0)
    } else {
        None
    };

    let test = welch_t_test(control, treatment);
    let (ci_lower, ci_upper) = welch_confidence_interval(control, treatment, 0.95);

    Ok(ComparisonRow {
        metric: metric.label(),
        control_n: control.len(),
        treatment_n: treatment.len(),
        control_mean,
        control_std: sample_std(control),
        treatment_mean,
        treatment_std: sample_std(treatment),
        difference,
        pct_change,
        t_statistic: test.t_statistic,
        degrees_of_freedom: test.degrees_of_freedom,
        p_value: test.p_value,
        cohens_d: cohens_d(control, treatment),
        ci_lower,
        ci_upper,
        significant: test.p_value < alpha,
    })
}

/// Run all three metric comparisons. Sampling problems degrade the affected
/// metric to an inconclusive entry instead of failing the run.
pub fn analyze(summaries: &[SkuSummary], alpha: f64) -> Vec<MetricOutcome> {
    let mut outcomes = Vec::with_capacity(Metric::ALL.len());
    for metric in Metric::ALL {
        let control: Vec<f64> = summaries
            .iter()
            .filter(|s| s.group == TestGroup::Control)
            .map(|s| metric.value(s))
            .collect();
        let treatment: Vec<f64> = summaries
            .iter()
            .filter(|s| s.group == TestGroup::Treatment)
            .map(|s| metric.value(s))
            .collect();

        match compare_metric(metric, &control, &treatment, alpha) {
            Ok(row) => {
                info!(
                    metric = metric.label(),
                    p_value = row.p_value,
                    cohens_d = row.cohens_d,
                    significant = row.significant,
                    "metric compared"
                );
                outcomes.push(MetricOutcome::Tested(row));
            }
            Err(e @ (Error::InsufficientSample { .. } | Error::EmptyGroup(_))) => {
                info!(metric = metric.label(), reason = %e, "metric inconclusive");
                outcomes.push(MetricOutcome::Inconclusive {
                    metric: metric.label(),
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                // nothing else can come out of compare_metric today
                outcomes.push(MetricOutcome::Inconclusive {
                    metric: metric.label(),
                    reason: e.to_string(),
                });
            }
        }
    }
    outcomes
}
