use serde::Serialize;

use crate::analysis::metrics::GroupSummary;
use crate::simulation::config::CostConfig;

/// Business-impact projection of switching the whole catalog to the
/// treatment policy, priced with the configured cost constants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoiAnalysis {
    /// One-time inventory value freed (or tied up, if negative).
    pub inventory_savings: f64,
    pub annual_carrying_savings: f64,
    pub annual_stockout_savings: f64,
    pub total_annual_benefit: f64,
    /// Months to recover the implementation cost; empty when the benefit is
    /// not positive.
    pub payback_months: Option<f64>,
    pub npv_3_year: f64,
    pub roi_year1_pct: f64,
}

/// Project costs and savings from the two group rollups.
pub fn calculate_roi(
    control: &GroupSummary,
    treatment: &GroupSummary,
    costs: &CostConfig,
) -> RoiAnalysis {
    let inventory_savings =
        (control.total_avg_inventory - treatment.total_avg_inventory) * costs.unit_cost;
    let annual_carrying_savings = inventory_savings * costs.carrying_cost_rate;

    let stockout_delta =
        control.total_stockout_days as f64 - treatment.total_stockout_days as f64;
    let annual_stockout_savings = stockout_delta * costs.stockout_cost;

    let total_annual_benefit =
        annual_carrying_savings + annual_stockout_savings - costs.annual_maintenance;

    let payback_months = if total_annual_benefit > 0.0 {
        Some(costs.implementation_cost / (total_annual_benefit / 12.0))
    } else {
        None
    };

    let mut npv_3_year = -costs.implementation_cost;
    for year in 1..=3 {
        npv_3_year += total_annual_benefit / (1.0 + costs.discount_rate).powi(year);
    }

    let roi_year1_pct = if costs.implementation_cost > 0.0 {
        (total_annual_benefit - costs.implementation_cost) / costs.implementation_cost * 100.0
    } else {
        0.0
    };

    RoiAnalysis {
        inventory_savings,
        annual_carrying_savings,
        annual_stockout_savings,
        total_annual_benefit,
        payback_months,
        npv_3_year,
        roi_year1_pct,
    }
}
