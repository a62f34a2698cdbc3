use crate::error::{Error, Result};
use crate::model::sku::SkuStats;
use crate::strategy::traits::{PolicyInput, RopPolicy};

/// Default weighted-moving-average weights for the 30/60/90-day demand
/// windows. Must sum to 1.0.
pub const DEFAULT_WMA_WEIGHTS: [f64; 3] = [0.5, 0.3, 0.2];

/// Longest demand window the dynamic formula blends over.
const WMA_FULL_WINDOW: usize = 90;

/// Check that WMA weights are non-negative and sum to 1.0.
pub fn validate_wma_weights(weights: &[f64; 3]) -> Result<()> {
    if weights.iter().any(|&w| w < 0.0 || !w.is_finite()) {
        return Err(Error::InvalidInput(format!(
            "WMA weights must be non-negative, got {weights:?}"
        )));
    }
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > 1e-9 {
        return Err(Error::InvalidInput(format!(
            "WMA weights must sum to 1.0, got {sum}"
        )));
    }
    Ok(())
}

// =========================================================================
// Pure formulas
// =========================================================================

/// Traditional fixed reorder point.
///
/// ROP = avg_daily_demand * avg_lead_time + z * demand_std * sqrt(avg_lead_time)
pub fn fixed_rop(
    avg_daily_demand: f64,
    avg_lead_time: f64,
    z_score: f64,
    demand_std: f64,
) -> Result<f64> {
    if avg_lead_time < 0.0 || !avg_lead_time.is_finite() {
        return Err(Error::InvalidInput(format!(
            "average lead time must be non-negative, got {avg_lead_time}"
        )));
    }
    if demand_std < 0.0 || !demand_std.is_finite() {
        return Err(Error::InvalidInput(format!(
            "demand std dev must be non-negative, got {demand_std}"
        )));
    }
    if avg_daily_demand < 0.0 || !avg_daily_demand.is_finite() {
        return Err(Error::InvalidInput(format!(
            "average daily demand must be non-negative, got {avg_daily_demand}"
        )));
    }
    let safety_stock = z_score * demand_std * avg_lead_time.sqrt();
    Ok(avg_daily_demand * avg_lead_time + safety_stock)
}

/// Dynamic reorder point with the default 0.5/0.3/0.2 window weights.
///
/// The weighted average of the 30/60/90-day demand means replaces the plain
/// average, and a forecast lead time replaces the historical one; the safety
/// stock term is structurally identical to the fixed formula's.
pub fn dynamic_rop(
    demand_30: f64,
    demand_60: f64,
    demand_90: f64,
    forecast_lead_time: f64,
    z_score: f64,
    demand_std: f64,
) -> Result<f64> {
    dynamic_rop_weighted(
        &DEFAULT_WMA_WEIGHTS,
        demand_30,
        demand_60,
        demand_90,
        forecast_lead_time,
        z_score,
        demand_std,
    )
}

/// Dynamic reorder point with caller-supplied window weights.
pub fn dynamic_rop_weighted(
    weights: &[f64; 3],
    demand_30: f64,
    demand_60: f64,
    demand_90: f64,
    forecast_lead_time: f64,
    z_score: f64,
    demand_std: f64,
) -> Result<f64> {
    validate_wma_weights(weights)?;
    for (label, d) in [("30", demand_30), ("60", demand_60), ("90", demand_90)] {
        if d < 0.0 || !d.is_finite() {
            return Err(Error::InvalidInput(format!(
                "{label}-day demand mean must be non-negative, got {d}"
            )));
        }
    }
    let wma = weights[0] * demand_30 + weights[1] * demand_60 + weights[2] * demand_90;
    fixed_rop(wma, forecast_lead_time, z_score, demand_std)
}

// =========================================================================
// Fixed policy
// =========================================================================

/// The control policy: one reorder point, computed up front from the SKU's
/// baseline statistics and held for the whole horizon.
#[derive(Debug, Clone)]
pub struct FixedRop {
    rop: f64,
}

impl FixedRop {
    pub fn from_stats(stats: &SkuStats, z_score: f64) -> Result<Self> {
        let rop = fixed_rop(
            stats.avg_daily_demand,
            stats.avg_lead_time,
            z_score,
            stats.demand_std,
        )?;
        Ok(Self { rop })
    }

    pub fn value(&self) -> f64 {
        self.rop
    }
}

impl RopPolicy for FixedRop {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn reorder_point(&self, _input: PolicyInput<'_>) -> Result<f64> {
        Ok(self.rop)
    }
}

// =========================================================================
// Dynamic policy
// =========================================================================

/// The treatment policy: recomputes the reorder point every day from the
/// demand observed so far.
///
/// With 90+ observations the 30/60/90-day window means are blended by the
/// configured weights; with fewer, all three windows collapse to the mean of
/// everything available (expanding window). The forecast lead time is the
/// mean of the last `lead_time_window` lead-time observations, and the
/// safety-stock sigma is the sample std of the last `volatility_window`
/// demand observations.
#[derive(Debug, Clone)]
pub struct DynamicRop {
    weights: [f64; 3],
    z_score: f64,
    lead_time_window: usize,
    volatility_window: usize,
    fallback_lead_time: f64,
}

impl DynamicRop {
    pub fn new(
        weights: [f64; 3],
        z_score: f64,
        lead_time_window: usize,
        volatility_window: usize,
        fallback_lead_time: f64,
    ) -> Result<Self> {
        validate_wma_weights(&weights)?;
        if lead_time_window == 0 || volatility_window == 0 {
            return Err(Error::InvalidInput(
                "policy windows must be at least 1 day".into(),
            ));
        }
        if fallback_lead_time < 0.0 {
            return Err(Error::InvalidInput(format!(
                "fallback lead time must be non-negative, got {fallback_lead_time}"
            )));
        }
        Ok(Self {
            weights,
            z_score,
            lead_time_window,
            volatility_window,
            fallback_lead_time,
        })
    }
}

impl RopPolicy for DynamicRop {
    fn name(&self) -> &'static str {
        "dynamic"
    }

    fn reorder_point(&self, input: PolicyInput<'_>) -> Result<f64> {
        let demand = input.observed_demand;
        let (d30, d60, d90) = if demand.len() >= WMA_FULL_WINDOW {
            (
                mean_of_last(demand, 30),
                mean_of_last(demand, 60),
                mean_of_last(demand, 90),
            )
        } else {
            let m = mean_of_last(demand, demand.len());
            (m, m, m)
        };

        let lead_times = input.observed_lead_times;
        let forecast_lt = if lead_times.is_empty() {
            self.fallback_lead_time
        } else {
            let k = self.lead_time_window.min(lead_times.len());
            lead_times[lead_times.len() - k..].iter().sum::<f64>() / k as f64
        };

        let sigma = std_of_last(demand, self.volatility_window);

        dynamic_rop_weighted(
            &self.weights,
            d30,
            d60,
            d90,
            forecast_lt,
            self.z_score,
            sigma,
        )
    }
}

fn mean_of_last(xs: &[u32], k: usize) -> f64 {
    let k = k.min(xs.len());
    if k == 0 {
        return 0.0;
    }
    let tail = &xs[xs.len() - k..];
    tail.iter().map(|&x| f64::from(x)).sum::<f64>() / k as f64
}

fn std_of_last(xs: &[u32], k: usize) -> f64 {
    let k = k.min(xs.len());
    if k < 2 {
        return 0.0;
    }
    let tail = &xs[xs.len() - k..];
    let mean = tail.iter().map(|&x| f64::from(x)).sum::<f64>() / k as f64;
    let ss: f64 = tail.iter().map(|&x| (f64::from(x) - mean).powi(2)).sum();
    (ss / (k - 1) as f64).sqrt()
}
