use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::strategy::implementations::{validate_wma_weights, DEFAULT_WMA_WEIGHTS};

/// How the engine obtains each simulated day's demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemandMode {
    /// Replay the historical sequence as-is. The default; fully deterministic.
    Replay,
    /// Resample with replacement from the SKU's history, seeded.
    Bootstrap,
}

/// Where group assignment comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupAssignment {
    /// Use the `group` column of the dataset.
    Dataset,
    /// Reassign by seeded stratified randomization within ABC classes.
    Stratified,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Days simulated per SKU.
    pub horizon_days: usize,
    /// Target cycle service level; converted to a z-score for both formulas.
    pub service_level: f64,
    /// Starting inventory as a multiple of the SKU's baseline fixed ROP.
    pub initial_inventory_factor: f64,
    /// Replenishment order size as a multiple of the ROP in effect.
    pub order_up_to_factor: f64,
    pub demand_mode: DemandMode,
    /// Seed for bootstrap demand draws; unused in replay mode.
    pub bootstrap_seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            horizon_days: 90,
            service_level: 0.95,
            initial_inventory_factor: 2.0,
            order_up_to_factor: 1.5,
            demand_mode: DemandMode::Replay,
            bootstrap_seed: 42,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Weights for the 30/60/90-day demand windows; must sum to 1.0.
    pub wma_weights: [f64; 3],
    /// How many recent lead-time observations feed the forecast.
    pub lead_time_window: usize,
    /// How many recent demand observations feed the dynamic sigma.
    pub volatility_window: usize,
    /// Lead time assumed when a SKU has no lead-time observations at all.
    pub fallback_lead_time: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            wma_weights: DEFAULT_WMA_WEIGHTS,
            lead_time_window: 10,
            volatility_window: 30,
            fallback_lead_time: 14.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AbTestConfig {
    /// Significance threshold for the hypothesis tests.
    pub alpha: f64,
    pub assignment: GroupAssignment,
    /// Seed for stratified reassignment; unused with dataset assignment.
    pub random_seed: u64,
}

impl Default for AbTestConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            assignment: GroupAssignment::Dataset,
            random_seed: 42,
        }
    }
}

/// Cost constants for the ROI block of the report.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostConfig {
    pub unit_cost: f64,
    /// Annual carrying cost as a fraction of inventory value.
    pub carrying_cost_rate: f64,
    /// Lost sale plus expedite fee per stockout day.
    pub stockout_cost: f64,
    pub implementation_cost: f64,
    pub annual_maintenance: f64,
    /// Discount rate for the 3-year NPV.
    pub discount_rate: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            unit_cost: 25.0,
            carrying_cost_rate: 0.25,
            stockout_cost: 150.0,
            implementation_cost: 50_000.0,
            annual_maintenance: 15_000.0,
            discount_rate: 0.10,
        }
    }
}

/// Immutable configuration for one experiment run, passed explicitly into
/// every component. Never read from ambient global state.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    pub simulation: SimulationConfig,
    pub policy: PolicyConfig,
    pub ab_test: AbTestConfig,
    pub costs: CostConfig,
}

impl ExperimentConfig {
    /// Load from a TOML file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&raw).map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.simulation.horizon_days == 0 {
            return Err(Error::InvalidInput("horizon_days must be positive".into()));
        }
        if !(0.0..1.0).contains(&self.simulation.service_level)
            || self.simulation.service_level <= 0.0
        {
            return Err(Error::InvalidInput(format!(
                "service_level must be in (0, 1), got {}",
                self.simulation.service_level
            )));
        }
        if self.simulation.initial_inventory_factor < 0.0 {
            return Err(Error::InvalidInput(
                "initial_inventory_factor must be non-negative".into(),
            ));
        }
        if self.simulation.order_up_to_factor <= 0.0 {
            return Err(Error::InvalidInput(
                "order_up_to_factor must be positive".into(),
            ));
        }
        validate_wma_weights(&self.policy.wma_weights)?;
        if self.policy.lead_time_window == 0 || self.policy.volatility_window == 0 {
            return Err(Error::InvalidInput(
                "policy windows must be at least 1 day".into(),
            ));
        }
        if !(self.ab_test.alpha > 0.0 && self.ab_test.alpha < 1.0) {
            return Err(Error::InvalidInput(format!(
                "alpha must be in (0, 1), got {}",
                self.ab_test.alpha
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ExperimentConfig::default();
        config.validate().unwrap();
        assert_eq!(config.simulation.horizon_days, 90);
        assert_eq!(config.policy.wma_weights, [0.5, 0.3, 0.2]);
        assert_eq!(config.ab_test.alpha, 0.05);
    }

    #[test]
    fn toml_overrides_merge_with_defaults() {
        let config: ExperimentConfig = toml::from_str(
            r#"
            [simulation]
            horizon_days = 30
            demand_mode = "bootstrap"

            [ab_test]
            assignment = "stratified"
            "#,
        )
        .unwrap();
        assert_eq!(config.simulation.horizon_days, 30);
        assert_eq!(config.simulation.demand_mode, DemandMode::Bootstrap);
        assert_eq!(config.ab_test.assignment, GroupAssignment::Stratified);
        // untouched sections keep their defaults
        assert_eq!(config.simulation.service_level, 0.95);
        assert_eq!(config.costs.unit_cost, 25.0);
    }

    #[test]
    fn bad_weights_rejected() {
        let config: ExperimentConfig = toml::from_str(
            r#"
            [policy]
            wma_weights = [0.5, 0.4, 0.2]
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_alpha_rejected() {
        let config: ExperimentConfig = toml::from_str(
            r#"
            [ab_test]
            alpha = 1.5
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }
}
