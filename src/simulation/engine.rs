use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use tracing::warn;

use crate::error::{Error, Result};
use crate::model::sku::{SkuRecord, TestGroup};
use crate::simulation::config::{DemandMode, ExperimentConfig, SimulationConfig};
use crate::strategy::implementations::{fixed_rop, DynamicRop, FixedRop};
use crate::strategy::optimization::z_for_service_level;
use crate::strategy::traits::{PolicyInput, RopPolicy};

/// One row of the per-day trace table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayRecord {
    pub sku_id: String,
    pub group: TestGroup,
    pub policy: &'static str,
    pub day: usize,
    pub demand: u32,
    pub fulfilled: u32,
    pub unfulfilled: u32,
    /// End-of-day on-hand inventory.
    pub on_hand: u32,
    pub reorder_point: f64,
    /// Units ordered this day; 0 when no order was placed.
    pub order_placed: u32,
    /// Whether a replenishment order is in flight at end of day.
    pub order_pending: bool,
    pub stockout: bool,
}

/// A replenishment order in flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingOrder {
    pub quantity: u32,
    pub arrival_day: usize,
}

/// Mutable simulation state for one SKU-policy pair. Only the engine touches
/// it, one day at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct SimState {
    pub day: usize,
    pub on_hand: u32,
    pub pending: Option<PendingOrder>,
    pub total_demand: u64,
    pub total_fulfilled: u64,
    pub total_unfulfilled: u64,
    pub stockout_days: u32,
}

/// Completed simulation of one SKU under one policy.
#[derive(Debug, Clone, PartialEq)]
pub struct SkuRun {
    pub sku_id: String,
    pub group: TestGroup,
    pub policy: &'static str,
    pub state: SimState,
    pub trace: Vec<DayRecord>,
}

/// Day-by-day inventory simulation for a single SKU under a single policy.
pub struct SkuSimulation<'a> {
    config: &'a SimulationConfig,
    sku: &'a SkuRecord,
    policy: Box<dyn RopPolicy>,
}

impl<'a> SkuSimulation<'a> {
    pub fn new(
        config: &'a SimulationConfig,
        sku: &'a SkuRecord,
        policy: Box<dyn RopPolicy>,
    ) -> Result<Self> {
        if sku.horizon_len() != config.horizon_days {
            return Err(Error::InvalidInput(format!(
                "SKU {} has a {}-day window, config expects {}",
                sku.sku_id,
                sku.horizon_len(),
                config.horizon_days
            )));
        }
        Ok(Self {
            config,
            sku,
            policy,
        })
    }

    /// Run the full horizon and emit the trace.
    ///
    /// Both policies share the same replenishment physics: orders arrive a
    /// fixed `round(avg_lead_time)` days after placement and are sized at
    /// `order_up_to_factor` times the ROP in effect. Only the reorder point
    /// itself differs between the arms.
    pub fn run(self) -> Result<SkuRun> {
        let sku = self.sku;
        let horizon = self.config.horizon_days;

        // Starting stock is seeded from the baseline fixed ROP for both
        // policies, so the comparison is not confounded by starting levels.
        let baseline_rop = fixed_rop(
            sku.stats.avg_daily_demand,
            sku.stats.avg_lead_time,
            z_for_service_level(self.config.service_level),
            sku.stats.demand_std,
        )?;
        let initial_inventory =
            (baseline_rop * self.config.initial_inventory_factor).round() as u32;
        let lead_time_days = (sku.stats.avg_lead_time.round() as usize).max(1);

        let mut rng = match self.config.demand_mode {
            DemandMode::Replay => None,
            DemandMode::Bootstrap => Some(StdRng::seed_from_u64(
                self.config.bootstrap_seed ^ fnv1a_hash(sku.sku_id.as_bytes()),
            )),
        };

        let mut state = SimState {
            day: 0,
            on_hand: initial_inventory,
            pending: None,
            total_demand: 0,
            total_fulfilled: 0,
            total_unfulfilled: 0,
            stockout_days: 0,
        };
        let mut trace = Vec::with_capacity(horizon);

        // Demand observed so far: the baseline window, then one entry per
        // simulated day. Policies only ever see this prefix.
        let mut observed: Vec<u32> = sku.demand[..sku.warmup].to_vec();

        for day in 0..horizon {
            state.day = day;

            // ---- Arrivals -------------------------------------------------
            if let Some(order) = state.pending {
                if order.arrival_day == day {
                    state.on_hand += order.quantity;
                    state.pending = None;
                }
            }

            // ---- Demand and fulfillment ----------------------------------
            let demand = match &mut rng {
                None => sku.demand[sku.warmup + day],
                Some(rng) => *sku
                    .demand
                    .choose(rng)
                    .expect("loader guarantees a non-empty demand series"),
            };
            observed.push(demand);

            let fulfilled = demand.min(state.on_hand);
            let unfulfilled = demand - fulfilled;
            state.on_hand -= fulfilled;
            state.total_demand += u64::from(demand);
            state.total_fulfilled += u64::from(fulfilled);
            state.total_unfulfilled += u64::from(unfulfilled);
            let stockout = unfulfilled > 0;
            if stockout {
                state.stockout_days += 1;
            }

            // ---- Reorder decision ----------------------------------------
            let lt_end = (sku.warmup + day + 1).min(sku.lead_times.len());
            let rop = self.policy.reorder_point(PolicyInput {
                day,
                observed_demand: &observed,
                observed_lead_times: &sku.lead_times[..lt_end],
            })?;

            let mut order_placed = 0;
            if state.pending.is_none() && f64::from(state.on_hand) <= rop {
                let quantity = (rop * self.config.order_up_to_factor).round() as u32;
                if quantity > 0 {
                    state.pending = Some(PendingOrder {
                        quantity,
                        arrival_day: day + lead_time_days,
                    });
                    order_placed = quantity;
                }
            }

            // ---- Record ---------------------------------------------------
            trace.push(DayRecord {
                sku_id: sku.sku_id.clone(),
                group: sku.group,
                policy: self.policy.name(),
                day,
                demand,
                fulfilled,
                unfulfilled,
                on_hand: state.on_hand,
                reorder_point: rop,
                order_placed,
                order_pending: state.pending.is_some(),
                stockout,
            });
        }
        state.day = horizon;

        Ok(SkuRun {
            sku_id: sku.sku_id.clone(),
            group: sku.group,
            policy: self.policy.name(),
            state,
            trace,
        })
    }
}

/// Simulate every SKU under its group's policy: control runs the fixed
/// formula, treatment the dynamic one.
///
/// A SKU whose parameters put a formula outside its domain is logged and
/// skipped; the rest of the run proceeds.
pub fn run_ab_test(skus: &[SkuRecord], config: &ExperimentConfig) -> Result<Vec<SkuRun>> {
    let z = z_for_service_level(config.simulation.service_level);
    let mut runs = Vec::with_capacity(skus.len());

    for sku in skus {
        let policy: Result<Box<dyn RopPolicy>> = match sku.group {
            TestGroup::Control => {
                FixedRop::from_stats(&sku.stats, z).map(|p| Box::new(p) as Box<dyn RopPolicy>)
            }
            TestGroup::Treatment => DynamicRop::new(
                config.policy.wma_weights,
                z,
                config.policy.lead_time_window,
                config.policy.volatility_window,
                config.policy.fallback_lead_time,
            )
            .map(|p| Box::new(p) as Box<dyn RopPolicy>),
        };

        let outcome = policy
            .and_then(|p| SkuSimulation::new(&config.simulation, sku, p))
            .and_then(SkuSimulation::run);

        match outcome {
            Ok(run) => runs.push(run),
            Err(Error::InvalidInput(reason)) => {
                warn!(sku = %sku.sku_id, %reason, "skipping SKU with invalid parameters");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(runs)
}

fn fnv1a_hash(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    let mut hash = FNV_OFFSET;
    for &byte in data {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sku::AbcClass;
    use crate::strategy::implementations::DEFAULT_WMA_WEIGHTS;

    fn constant_sku(group: TestGroup, demand: u32, lead_time: f64, days: usize) -> SkuRecord {
        SkuRecord::new(
            "SKU-001".into(),
            AbcClass::A,
            group,
            vec![demand; days],
            vec![lead_time; days],
            days,
        )
    }

    fn config(horizon: usize) -> ExperimentConfig {
        let mut config = ExperimentConfig::default();
        config.simulation.horizon_days = horizon;
        config
    }

    #[test]
    fn hand_traced_constant_demand_run() {
        // demand 10/day, lead time 2, sigma 0 -> fixed ROP = 20,
        // initial inventory 40, order quantity 30
        let sku = constant_sku(TestGroup::Control, 10, 2.0, 5);
        let config = config(5);
        let policy = FixedRop::from_stats(&sku.stats, 1.65).unwrap();
        assert_eq!(policy.value(), 20.0);

        let run = SkuSimulation::new(&config.simulation, &sku, Box::new(policy))
            .unwrap()
            .run()
            .unwrap();

        let on_hand: Vec<u32> = run.trace.iter().map(|r| r.on_hand).collect();
        assert_eq!(on_hand, vec![30, 20, 10, 30, 20]);

        let orders: Vec<u32> = run.trace.iter().map(|r| r.order_placed).collect();
        assert_eq!(orders, vec![0, 30, 0, 0, 30]);

        assert_eq!(run.state.total_demand, 50);
        assert_eq!(run.state.total_fulfilled, 50);
        assert_eq!(run.state.total_unfulfilled, 0);
        assert_eq!(run.state.stockout_days, 0);
    }

    #[test]
    fn lost_sales_and_conservation() {
        let sku = constant_sku(TestGroup::Control, 10, 2.0, 5);
        let mut config = config(5);
        // start empty: the first two days stock out until the day-0 order lands
        config.simulation.initial_inventory_factor = 0.0;

        let policy = FixedRop::from_stats(&sku.stats, 1.65).unwrap();
        let run = SkuSimulation::new(&config.simulation, &sku, Box::new(policy))
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(run.state.stockout_days, 2);
        assert_eq!(run.state.total_fulfilled, 30);
        assert_eq!(run.state.total_unfulfilled, 20);
        assert_eq!(
            run.state.total_fulfilled + run.state.total_unfulfilled,
            run.state.total_demand
        );
        // u32 already forbids negative stock; spot-check the trace anyway
        assert!(run.trace.iter().all(|r| r.fulfilled <= r.demand));
    }

    #[test]
    fn replay_runs_are_deterministic() {
        let sku = constant_sku(TestGroup::Treatment, 25, 4.0, 60);
        let config = config(60);
        let run_once = || {
            let policy = DynamicRop::new(DEFAULT_WMA_WEIGHTS, 1.65, 10, 30, 14.0).unwrap();
            SkuSimulation::new(&config.simulation, &sku, Box::new(policy))
                .unwrap()
                .run()
                .unwrap()
        };
        assert_eq!(run_once(), run_once());
    }

    #[test]
    fn bootstrap_runs_are_deterministic_per_seed() {
        let mut demand: Vec<u32> = (0..60u32).map(|i| 10 + i % 7).collect();
        demand[3] = 40;
        let sku = SkuRecord::new(
            "SKU-002".into(),
            AbcClass::B,
            TestGroup::Control,
            demand,
            vec![3.0; 60],
            60,
        );
        let mut config = config(60);
        config.simulation.demand_mode = DemandMode::Bootstrap;
        config.simulation.bootstrap_seed = 7;

        let run_once = || {
            let policy = FixedRop::from_stats(&sku.stats, 1.65).unwrap();
            SkuSimulation::new(&config.simulation, &sku, Box::new(policy))
                .unwrap()
                .run()
                .unwrap()
        };
        assert_eq!(run_once(), run_once());
    }

    #[test]
    fn dynamic_policy_never_reads_the_future() {
        // 90 baseline days then a 30-day test window with ramping demand;
        // truncating the series after day k must reproduce the same first
        // k+1 trace days
        let demand: Vec<u32> = (0..120u32).map(|i| 20 + i / 4).collect();
        let lead_times: Vec<f64> = vec![5.0; 120];
        let full = SkuRecord::new(
            "SKU-003".into(),
            AbcClass::A,
            TestGroup::Treatment,
            demand.clone(),
            lead_times.clone(),
            30,
        );
        let full_config = config(30);
        let policy = || DynamicRop::new(DEFAULT_WMA_WEIGHTS, 1.65, 10, 30, 14.0).unwrap();
        let full_run = SkuSimulation::new(&full_config.simulation, &full, Box::new(policy()))
            .unwrap()
            .run()
            .unwrap();

        for k in [0usize, 7, 29] {
            let truncated = SkuRecord::new(
                "SKU-003".into(),
                AbcClass::A,
                TestGroup::Treatment,
                demand[..91 + k].to_vec(),
                lead_times[..91 + k].to_vec(),
                k + 1,
            );
            assert_eq!(truncated.warmup, 90);
            let trunc_config = config(k + 1);
            let trunc_run =
                SkuSimulation::new(&trunc_config.simulation, &truncated, Box::new(policy()))
                    .unwrap()
                    .run()
                    .unwrap();
            assert_eq!(&full_run.trace[..=k], &trunc_run.trace[..]);
        }
    }

    #[test]
    fn ab_test_skips_invalid_skus() {
        let good = constant_sku(TestGroup::Control, 10, 2.0, 90);
        let mut bad = constant_sku(TestGroup::Control, 10, 2.0, 90);
        bad.sku_id = "SKU-BAD".into();
        bad.stats.avg_lead_time = -4.0;

        let config = config(90);
        let runs = run_ab_test(&[good, bad], &config).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].sku_id, "SKU-001");
    }

    #[test]
    fn groups_map_to_their_policies() {
        let control = constant_sku(TestGroup::Control, 10, 2.0, 90);
        let mut treatment = constant_sku(TestGroup::Treatment, 10, 2.0, 90);
        treatment.sku_id = "SKU-002".into();

        let config = config(90);
        let runs = run_ab_test(&[control, treatment], &config).unwrap();
        assert_eq!(runs[0].policy, "fixed");
        assert_eq!(runs[1].policy, "dynamic");
    }
}
