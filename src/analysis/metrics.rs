use serde::Serialize;

use crate::analysis::stats::{mean, sample_std};
use crate::error::{Error, Result};
use crate::model::sku::TestGroup;
use crate::simulation::engine::SkuRun;

/// The three outcome metrics the experiment compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    FillRate,
    AvgInventory,
    StockoutDays,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::FillRate, Metric::AvgInventory, Metric::StockoutDays];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::FillRate => "fill_rate",
            Metric::AvgInventory => "avg_inventory",
            Metric::StockoutDays => "stockout_days",
        }
    }

    pub fn value(&self, summary: &SkuSummary) -> f64 {
        match self {
            Metric::FillRate => summary.fill_rate,
            Metric::AvgInventory => summary.avg_inventory,
            Metric::StockoutDays => f64::from(summary.stockout_days),
        }
    }
}

/// Outcome metrics for one SKU-policy run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkuSummary {
    pub sku_id: String,
    pub group: TestGroup,
    pub policy: &'static str,
    /// Percent of demand served from stock.
    pub fill_rate: f64,
    /// Mean end-of-day on-hand inventory over the horizon.
    pub avg_inventory: f64,
    pub stockout_days: u32,
    pub total_demand: u64,
    pub total_fulfilled: u64,
    /// The reorder point in effect on the final simulated day.
    pub final_reorder_point: f64,
}

/// Roll a per-day trace into the SKU's summary metrics.
pub fn summarize_run(run: &SkuRun) -> SkuSummary {
    let fill_rate = if run.state.total_demand > 0 {
        run.state.total_fulfilled as f64 / run.state.total_demand as f64 * 100.0
    } else {
        // no demand means nothing went unserved
        100.0
    };
    let inventory_levels: Vec<f64> = run.trace.iter().map(|r| f64::from(r.on_hand)).collect();
    let final_reorder_point = run.trace.last().map_or(0.0, |r| r.reorder_point);

    SkuSummary {
        sku_id: run.sku_id.clone(),
        group: run.group,
        policy: run.policy,
        fill_rate,
        avg_inventory: mean(&inventory_levels),
        stockout_days: run.state.stockout_days,
        total_demand: run.state.total_demand,
        total_fulfilled: run.state.total_fulfilled,
        final_reorder_point,
    }
}

/// Mean and sample-std rollup of one group's SKU summaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group: TestGroup,
    pub sku_count: usize,
    pub fill_rate_mean: f64,
    pub fill_rate_std: f64,
    pub avg_inventory_mean: f64,
    pub avg_inventory_std: f64,
    pub stockout_days_mean: f64,
    pub stockout_days_std: f64,
    /// Sum of per-SKU average inventories; feeds the ROI block.
    pub total_avg_inventory: f64,
    pub total_stockout_days: u64,
}

/// Aggregate the summaries belonging to `group`. Fails with `EmptyGroup`
/// rather than dividing by zero.
pub fn summarize_group(group: TestGroup, summaries: &[SkuSummary]) -> Result<GroupSummary> {
    let members: Vec<&SkuSummary> = summaries.iter().filter(|s| s.group == group).collect();
    if members.is_empty() {
        return Err(Error::EmptyGroup(group));
    }

    let collect = |metric: Metric| -> Vec<f64> { members.iter().map(|s| metric.value(s)).collect() };
    let fill_rates = collect(Metric::FillRate);
    let inventories = collect(Metric::AvgInventory);
    let stockouts = collect(Metric::StockoutDays);

    Ok(GroupSummary {
        group,
        sku_count: members.len(),
        fill_rate_mean: mean(&fill_rates),
        fill_rate_std: sample_std(&fill_rates),
        avg_inventory_mean: mean(&inventories),
        avg_inventory_std: sample_std(&inventories),
        stockout_days_mean: mean(&stockouts),
        stockout_days_std: sample_std(&stockouts),
        total_avg_inventory: inventories.iter().sum(),
        total_stockout_days: members.iter().map(|s| u64::from(s.stockout_days)).sum(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::engine::{DayRecord, SimState, SkuRun};

    fn run_with(fulfilled: u64, demand: u64, on_hand: &[u32], stockouts: u32) -> SkuRun {
        let trace = on_hand
            .iter()
            .enumerate()
            .map(|(day, &inv)| DayRecord {
                sku_id: "SKU-001".into(),
                group: TestGroup::Control,
                policy: "fixed",
                day,
                demand: 0,
                fulfilled: 0,
                unfulfilled: 0,
                on_hand: inv,
                reorder_point: 20.0,
                order_placed: 0,
                order_pending: false,
                stockout: false,
            })
            .collect();
        SkuRun {
            sku_id: "SKU-001".into(),
            group: TestGroup::Control,
            policy: "fixed",
            state: SimState {
                day: on_hand.len(),
                on_hand: *on_hand.last().unwrap(),
                pending: None,
                total_demand: demand,
                total_fulfilled: fulfilled,
                total_unfulfilled: demand - fulfilled,
                stockout_days: stockouts,
            },
            trace,
        }
    }

    #[test]
    fn summary_of_a_simple_run() {
        let run = run_with(90, 100, &[30, 20, 10], 2);
        let summary = summarize_run(&run);
        assert!((summary.fill_rate - 90.0).abs() < 1e-12);
        assert!((summary.avg_inventory - 20.0).abs() < 1e-12);
        assert_eq!(summary.stockout_days, 2);
        assert_eq!(summary.final_reorder_point, 20.0);
    }

    #[test]
    fn zero_demand_counts_as_fully_served() {
        let run = run_with(0, 0, &[10, 10], 0);
        assert_eq!(summarize_run(&run).fill_rate, 100.0);
    }

    #[test]
    fn group_rollup_mean_and_std() {
        let mut a = summarize_run(&run_with(80, 100, &[10], 1));
        let mut b = summarize_run(&run_with(90, 100, &[20], 3));
        let mut c = summarize_run(&run_with(100, 100, &[30], 5));
        a.sku_id = "A".into();
        b.sku_id = "B".into();
        c.sku_id = "C".into();

        let group = summarize_group(TestGroup::Control, &[a, b, c]).unwrap();
        assert_eq!(group.sku_count, 3);
        assert!((group.fill_rate_mean - 90.0).abs() < 1e-12);
        assert!((group.fill_rate_std - 10.0).abs() < 1e-12);
        assert!((group.stockout_days_mean - 3.0).abs() < 1e-12);
        assert!((group.stockout_days_std - 2.0).abs() < 1e-12);
        assert!((group.total_avg_inventory - 60.0).abs() < 1e-12);
        assert_eq!(group.total_stockout_days, 9);
    }

    #[test]
    fn empty_group_is_an_error() {
        let control_only = [summarize_run(&run_with(80, 100, &[10], 1))];
        let err = summarize_group(TestGroup::Treatment, &control_only).unwrap_err();
        assert!(matches!(err, Error::EmptyGroup(TestGroup::Treatment)));
    }
}
