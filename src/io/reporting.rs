use std::fmt::Write as _;
use std::path::Path;

use tracing::info;

use crate::analysis::metrics::{GroupSummary, SkuSummary};
use crate::analysis::roi::RoiAnalysis;
use crate::analysis::{ComparisonRow, MetricOutcome};
use crate::error::Result;
use crate::simulation::config::ExperimentConfig;
use crate::simulation::engine::DayRecord;

/// Write the full per-day trace table.
pub fn write_trace(path: &Path, records: &[DayRecord]) -> Result<()> {
    write_rows(path, records)
}

/// Write the per-SKU summary metrics table.
pub fn write_sku_summaries(path: &Path, summaries: &[SkuSummary]) -> Result<()> {
    write_rows(path, summaries)
}

/// Write the per-group rollup table.
pub fn write_group_summaries(path: &Path, groups: &[GroupSummary]) -> Result<()> {
    write_rows(path, groups)
}

/// Write the statistical test results table. Inconclusive metrics have no
/// numbers to report and are listed in the executive summary instead.
pub fn write_statistical_results(path: &Path, outcomes: &[MetricOutcome]) -> Result<()> {
    let rows: Vec<&ComparisonRow> = outcomes
        .iter()
        .filter_map(|o| match o {
            MetricOutcome::Tested(row) => Some(row),
            MetricOutcome::Inconclusive { .. } => None,
        })
        .collect();
    write_rows(path, &rows)
}

/// Write the ROI projection table (a single row).
pub fn write_roi(path: &Path, roi: &RoiAnalysis) -> Result<()> {
    write_rows(path, std::slice::from_ref(roi))
}

fn write_rows<T: serde::Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = rows.len(), "table written");
    Ok(())
}

/// Render the plain-text executive summary.
pub fn render_executive_summary(
    config: &ExperimentConfig,
    control: Option<&GroupSummary>,
    treatment: Option<&GroupSummary>,
    outcomes: &[MetricOutcome],
    roi: Option<&RoiAnalysis>,
) -> String {
    let mut out = String::new();
    let rule = "=".repeat(60);
    let thin = "-".repeat(60);

    let _ = writeln!(out, "A/B TEST RESULTS: Dynamic ROP vs Fixed ROP");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Test duration: {} days", config.simulation.horizon_days);
    let _ = writeln!(out, "Significance level: {}", config.ab_test.alpha);
    if let (Some(c), Some(t)) = (control, treatment) {
        let _ = writeln!(
            out,
            "Control: {} SKUs (fixed ROP)  Treatment: {} SKUs (dynamic ROP)",
            c.sku_count, t.sku_count
        );
    }

    let _ = writeln!(out, "\nKEY FINDINGS");
    let _ = writeln!(out, "{thin}");
    for outcome in outcomes {
        match outcome {
            MetricOutcome::Tested(row) => {
                let verdict = if row.significant {
                    "SIGNIFICANT"
                } else {
                    "not significant"
                };
                let _ = writeln!(out, "{}:", row.metric);
                let _ = write!(
                    out,
                    "  control mean {:.2}, treatment mean {:.2}",
                    row.control_mean, row.treatment_mean
                );
                match row.pct_change {
                    Some(pct) => {
                        let _ = writeln!(out, " ({pct:+.1}%)");
                    }
                    None => {
                        let _ = writeln!(out);
                    }
                }
                let _ = writeln!(out, "  p-value {:.4} -> {verdict}", row.p_value);
                let _ = writeln!(
                    out,
                    "  effect size (Cohen's d) {:.3}, 95% CI [{:.2}, {:.2}]",
                    row.cohens_d, row.ci_lower, row.ci_upper
                );
            }
            MetricOutcome::Inconclusive { metric, reason } => {
                let _ = writeln!(out, "{metric}: INCONCLUSIVE ({reason})");
            }
        }
    }

    if let Some(roi) = roi {
        let _ = writeln!(out, "\nBUSINESS IMPACT");
        let _ = writeln!(out, "{thin}");
        let _ = writeln!(out, "Inventory value reduction: ${:.0}", roi.inventory_savings);
        let _ = writeln!(
            out,
            "Annual carrying cost savings: ${:.0}",
            roi.annual_carrying_savings
        );
        let _ = writeln!(
            out,
            "Annual stockout cost savings: ${:.0}",
            roi.annual_stockout_savings
        );
        let _ = writeln!(out, "Total annual benefit: ${:.0}", roi.total_annual_benefit);
        match roi.payback_months {
            Some(months) => {
                let _ = writeln!(out, "Payback period: {months:.1} months");
            }
            None => {
                let _ = writeln!(out, "Payback period: never (benefit not positive)");
            }
        }
        let _ = writeln!(out, "3-year NPV: ${:.0}", roi.npv_3_year);
        let _ = writeln!(out, "Year 1 ROI: {:.1}%", roi.roi_year1_pct);
    }

    let _ = writeln!(out, "\nRECOMMENDATION");
    let _ = writeln!(out, "{thin}");
    let _ = writeln!(out, "{}", recommendation(outcomes));

    out
}

/// The original decision rule: adopt the dynamic policy when fill rate shows
/// a significant positive lift; otherwise keep testing.
fn recommendation(outcomes: &[MetricOutcome]) -> &'static str {
    let fill_rate_win = outcomes.iter().any(|o| match o {
        MetricOutcome::Tested(row) => {
            row.metric == "fill_rate" && row.significant && row.difference > 0.0
        }
        MetricOutcome::Inconclusive { .. } => false,
    });
    if fill_rate_win {
        "IMPLEMENT DYNAMIC REORDER POINTS"
    } else {
        "RESULTS INCONCLUSIVE - further testing recommended"
    }
}

/// Render and write the executive summary.
pub fn write_executive_summary(
    path: &Path,
    config: &ExperimentConfig,
    control: Option<&GroupSummary>,
    treatment: Option<&GroupSummary>,
    outcomes: &[MetricOutcome],
    roi: Option<&RoiAnalysis>,
) -> Result<()> {
    let text = render_executive_summary(config, control, treatment, outcomes, roi);
    std::fs::write(path, &text)?;
    info!(path = %path.display(), "executive summary written");
    Ok(())
}
