//! Auxiliary inventory-parameter calculations shared by the policies and
//! the configuration layer.

/// Z-score for a target service level (cycle service level, one-sided).
///
/// A service level of 0.95 maps to roughly 1.645. Values at or beyond the
/// open interval (0, 1) are clamped to ±5 sigma.
pub fn z_for_service_level(service_level: f64) -> f64 {
    inverse_normal_cdf(service_level)
}

/// Approximate inverse CDF (quantile function) of the standard normal
/// distribution, Abramowitz and Stegun formula 26.2.23. Absolute error is
/// below 4.5e-4, which is well inside the tolerance of any safety-stock
/// calculation here.
fn inverse_normal_cdf(p: f64) -> f64 {
    if p >= 1.0 {
        return 5.0;
    }
    if p <= 0.0 {
        return -5.0;
    }
    if p == 0.5 {
        return 0.0;
    }

    // The rational approximation covers 0 < q <= 0.5; mirror for the rest.
    let q = if p < 0.5 { p } else { 1.0 - p };

    let t = (-2.0 * q.ln()).sqrt();

    let c0 = 2.515517;
    let c1 = 0.802853;
    let c2 = 0.010328;

    let d1 = 1.432788;
    let d2 = 0.189269;
    let d3 = 0.001308;

    let numerator = c0 + c1 * t + c2 * t * t;
    let denominator = 1.0 + d1 * t + d2 * t * t + d3 * t * t * t;

    let x = t - (numerator / denominator);

    if p < 0.5 {
        -x
    } else {
        x
    }
}

/// Classical Economic Order Quantity.
///
/// EOQ = sqrt(2 * annual_demand * order_cost / (unit_cost * holding_cost_rate))
///
/// Returns 0 when the holding cost is zero (no finite optimum exists).
pub fn economic_order_quantity(
    annual_demand: f64,
    order_cost: f64,
    holding_cost_rate: f64,
    unit_cost: f64,
) -> f64 {
    let holding_cost = unit_cost * holding_cost_rate;
    if holding_cost <= 0.0 {
        return 0.0;
    }
    ((2.0 * annual_demand * order_cost) / holding_cost).sqrt()
}
