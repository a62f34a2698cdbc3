pub mod dataset;
pub mod demand;
pub mod reporting;
