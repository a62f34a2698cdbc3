use std::fmt::Debug;

use crate::error::Result;

/// Everything a policy may look at when producing the reorder point in
/// effect on a given day.
///
/// `observed_demand` and `observed_lead_times` run from the start of the
/// SKU's series through the current day inclusive, never beyond it. The
/// engine only ever hands a policy this prefix, which keeps the dynamic
/// formula free of lookahead by construction.
#[derive(Debug, Clone, Copy)]
pub struct PolicyInput<'a> {
    /// Day index within the simulation horizon (0-based).
    pub day: usize,
    /// Daily demand observed so far, baseline window included.
    pub observed_demand: &'a [u32],
    /// Daily lead-time observations so far, baseline window included.
    pub observed_lead_times: &'a [f64],
}

/// Decision logic for when to reorder.
///
/// We require `Send` + `Sync` so SKU simulations can be fanned out across
/// threads later; correctness never depends on it.
pub trait RopPolicy: Debug + Send + Sync {
    /// Short machine-readable name, written into trace and summary tables.
    fn name(&self) -> &'static str;

    /// Reorder point in effect on `input.day`.
    ///
    /// Fails with `InvalidInput` when the observed series puts the formula
    /// outside its domain; the caller drops that SKU from the run.
    fn reorder_point(&self, input: PolicyInput<'_>) -> Result<f64>;
}
