use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// ABC tier of a SKU: A moves the most value, C the least.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbcClass {
    A,
    B,
    C,
}

impl std::fmt::Display for AbcClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbcClass::A => write!(f, "A"),
            AbcClass::B => write!(f, "B"),
            AbcClass::C => write!(f, "C"),
        }
    }
}

/// Which arm of the A/B test a SKU belongs to.
///
/// Control is simulated under the fixed ROP formula, treatment under the
/// dynamic (WMA) formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestGroup {
    Control,
    Treatment,
}

impl std::fmt::Display for TestGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestGroup::Control => write!(f, "control"),
            TestGroup::Treatment => write!(f, "treatment"),
        }
    }
}

/// Demand and lead-time statistics over a SKU's baseline window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkuStats {
    pub avg_daily_demand: f64,
    pub demand_std: f64,
    pub total_demand: u64,
    pub avg_lead_time: f64,
    pub lead_time_std: f64,
}

impl SkuStats {
    /// Compute stats from raw observations. Sample standard deviations;
    /// zero when fewer than two observations exist.
    pub fn from_series(demand: &[u32], lead_times: &[f64]) -> Self {
        let total_demand: u64 = demand.iter().map(|&d| u64::from(d)).sum();
        let n = demand.len();
        let avg_daily_demand = if n > 0 {
            total_demand as f64 / n as f64
        } else {
            0.0
        };
        let demand_std = sample_std_u32(demand, avg_daily_demand);

        let m = lead_times.len();
        let avg_lead_time = if m > 0 {
            lead_times.iter().sum::<f64>() / m as f64
        } else {
            0.0
        };
        let lead_time_std = sample_std_f64(lead_times, avg_lead_time);

        Self {
            avg_daily_demand,
            demand_std,
            total_demand,
            avg_lead_time,
            lead_time_std,
        }
    }
}

fn sample_std_u32(xs: &[u32], mean: f64) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let ss: f64 = xs.iter().map(|&x| (f64::from(x) - mean).powi(2)).sum();
    (ss / (xs.len() - 1) as f64).sqrt()
}

fn sample_std_f64(xs: &[f64], mean: f64) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let ss: f64 = xs.iter().map(|&x| (x - mean).powi(2)).sum();
    (ss / (xs.len() - 1) as f64).sqrt()
}

/// One product in the test. Immutable once the loader builds it.
///
/// `demand` and `lead_times` cover the full observed series. The final
/// `horizon` days are what the simulation replays; everything before them is
/// the baseline window that `stats` is computed from. When the series is
/// exactly the horizon long, `warmup` is 0 and `stats` covers the whole
/// series instead.
#[derive(Debug, Clone, PartialEq)]
pub struct SkuRecord {
    pub sku_id: String,
    pub abc_class: AbcClass,
    pub group: TestGroup,
    pub demand: Vec<u32>,
    pub lead_times: Vec<f64>,
    pub warmup: usize,
    pub stats: SkuStats,
}

impl SkuRecord {
    pub fn new(
        sku_id: String,
        abc_class: AbcClass,
        group: TestGroup,
        demand: Vec<u32>,
        lead_times: Vec<f64>,
        horizon: usize,
    ) -> Self {
        let warmup = demand.len().saturating_sub(horizon);
        let stats = if warmup > 0 {
            SkuStats::from_series(&demand[..warmup], &lead_times[..warmup.min(lead_times.len())])
        } else {
            SkuStats::from_series(&demand, &lead_times)
        };
        Self {
            sku_id,
            abc_class,
            group,
            demand,
            lead_times,
            warmup,
            stats,
        }
    }

    /// Number of days the simulation will replay for this SKU.
    pub fn horizon_len(&self) -> usize {
        self.demand.len() - self.warmup
    }
}

/// Reassign test groups by stratified randomization: within each ABC class,
/// shuffle with a seeded RNG and send the first half to control, the rest to
/// treatment. Deterministic for a given seed and input order.
pub fn assign_groups_stratified(skus: &mut [SkuRecord], seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for class in [AbcClass::A, AbcClass::B, AbcClass::C] {
        let mut members: Vec<usize> = skus
            .iter()
            .enumerate()
            .filter(|(_, s)| s.abc_class == class)
            .map(|(i, _)| i)
            .collect();
        members.shuffle(&mut rng);
        let split = members.len() / 2;
        for (rank, &idx) in members.iter().enumerate() {
            skus[idx].group = if rank < split {
                TestGroup::Control
            } else {
                TestGroup::Treatment
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, class: AbcClass, demand: Vec<u32>, horizon: usize) -> SkuRecord {
        let lead_times = vec![7.0; demand.len()];
        SkuRecord::new(
            id.to_string(),
            class,
            TestGroup::Control,
            demand,
            lead_times,
            horizon,
        )
    }

    #[test]
    fn stats_over_baseline_window_only() {
        // 4 warmup days of demand 10, then 3 horizon days of demand 99
        let sku = record("S1", AbcClass::A, vec![10, 10, 10, 10, 99, 99, 99], 3);
        assert_eq!(sku.warmup, 4);
        assert_eq!(sku.stats.avg_daily_demand, 10.0);
        assert_eq!(sku.stats.demand_std, 0.0);
        assert_eq!(sku.stats.total_demand, 40);
        assert_eq!(sku.horizon_len(), 3);
    }

    #[test]
    fn stats_fall_back_to_full_series_without_warmup() {
        let sku = record("S1", AbcClass::B, vec![4, 6, 8], 3);
        assert_eq!(sku.warmup, 0);
        assert_eq!(sku.stats.avg_daily_demand, 6.0);
        assert_eq!(sku.stats.total_demand, 18);
        assert!((sku.stats.demand_std - 2.0).abs() < 1e-12);
    }

    #[test]
    fn lead_time_stats() {
        let sku = SkuRecord::new(
            "S1".into(),
            AbcClass::C,
            TestGroup::Treatment,
            vec![1, 1, 1],
            vec![6.0, 8.0, 10.0],
            3,
        );
        assert!((sku.stats.avg_lead_time - 8.0).abs() < 1e-12);
        assert!((sku.stats.lead_time_std - 2.0).abs() < 1e-12);
    }

    #[test]
    fn stratified_assignment_is_deterministic_and_balanced() {
        let make = || {
            (0..12)
                .map(|i| {
                    let class = match i % 3 {
                        0 => AbcClass::A,
                        1 => AbcClass::B,
                        _ => AbcClass::C,
                    };
                    record(&format!("SKU-{i:03}"), class, vec![5; 10], 10)
                })
                .collect::<Vec<_>>()
        };

        let mut a = make();
        let mut b = make();
        assign_groups_stratified(&mut a, 42);
        assign_groups_stratified(&mut b, 42);
        let groups_a: Vec<_> = a.iter().map(|s| s.group).collect();
        let groups_b: Vec<_> = b.iter().map(|s| s.group).collect();
        assert_eq!(groups_a, groups_b);

        // 4 per class, split 2/2 within each
        for class in [AbcClass::A, AbcClass::B, AbcClass::C] {
            let control = a
                .iter()
                .filter(|s| s.abc_class == class && s.group == TestGroup::Control)
                .count();
            assert_eq!(control, 2);
        }
    }
}
