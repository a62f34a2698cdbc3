use std::path::Path;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::model::sku::{AbcClass, TestGroup};

/// Knobs for the synthetic dataset generator.
#[derive(Debug, Clone)]
pub struct GeneratorParams {
    pub sku_count: usize,
    /// Days of history per SKU; anything beyond the simulation horizon
    /// becomes the baseline window.
    pub days: usize,
    pub seed: u64,
    pub start_date: NaiveDate,
}

impl Default for GeneratorParams {
    fn default() -> Self {
        Self {
            sku_count: 20,
            days: 180,
            seed: 42,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid calendar date"),
        }
    }
}

/// One generated dataset row; field order defines the CSV header order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntheticRow {
    pub sku_id: String,
    pub date: NaiveDate,
    pub demand: u32,
    pub lead_time_days: f64,
    pub abc_class: AbcClass,
    pub group: TestGroup,
}

/// Fabricate a plausible catalog: per-SKU demand drawn from a seeded normal
/// distribution (negative draws clamped to zero, like any sane demand
/// series), lead times around two weeks with a five-day floor, ABC classes
/// split 20/30/50, and groups assigned by stratified randomization within
/// each class. Deterministic for a given seed.
pub fn generate_dataset(params: &GeneratorParams) -> Result<Vec<SyntheticRow>> {
    if params.sku_count == 0 || params.days == 0 {
        return Err(Error::InvalidInput(
            "generator needs at least one SKU and one day".into(),
        ));
    }
    let mut rng = StdRng::seed_from_u64(params.seed);

    let classes: Vec<AbcClass> = (0..params.sku_count)
        .map(|i| {
            let rank = i as f64 / params.sku_count as f64;
            if rank < 0.2 {
                AbcClass::A
            } else if rank < 0.5 {
                AbcClass::B
            } else {
                AbcClass::C
            }
        })
        .collect();

    // Stratified group split: shuffle within each class, first half control.
    let mut groups = vec![TestGroup::Treatment; params.sku_count];
    for class in [AbcClass::A, AbcClass::B, AbcClass::C] {
        let mut members: Vec<usize> = (0..params.sku_count)
            .filter(|&i| classes[i] == class)
            .collect();
        members.shuffle(&mut rng);
        for &i in &members[..members.len() / 2] {
            groups[i] = TestGroup::Control;
        }
    }

    let lead_time_dist = Normal::<f64>::new(14.0, 3.0)
        .map_err(|e| Error::InvalidInput(format!("lead time distribution: {e}")))?;

    let mut rows = Vec::with_capacity(params.sku_count * params.days);
    for i in 0..params.sku_count {
        let sku_id = format!("SKU-{:03}", i + 1);
        let mean_demand: f64 = rng.gen_range(20.0..120.0);
        let cv: f64 = rng.gen_range(0.15..0.35);
        let demand_dist = Normal::new(mean_demand, mean_demand * cv)
            .map_err(|e| Error::InvalidInput(format!("demand distribution: {e}")))?;

        let mut date = params.start_date;
        for day in 0..params.days {
            let raw: f64 = demand_dist.sample(&mut rng);
            let demand = if raw < 0.0 { 0 } else { raw.round() as u32 };

            let lead_time: f64 = lead_time_dist.sample(&mut rng).max(5.0);
            let lead_time_days = (lead_time * 10.0).round() / 10.0;

            rows.push(SyntheticRow {
                sku_id: sku_id.clone(),
                date,
                demand,
                lead_time_days,
                abc_class: classes[i],
                group: groups[i],
            });
            if day + 1 < params.days {
                date = date.succ_opt().ok_or_else(|| {
                    Error::InvalidInput(format!("date overflow after {date}"))
                })?;
            }
        }
    }
    Ok(rows)
}

/// Generate and write the dataset CSV.
pub fn write_dataset(path: &Path, params: &GeneratorParams) -> Result<()> {
    let rows = generate_dataset(params)?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!(
        path = %path.display(),
        skus = params.sku_count,
        rows = rows.len(),
        "synthetic dataset written"
    );
    Ok(())
}
