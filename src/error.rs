use crate::model::sku::TestGroup;

/// Error taxonomy for the whole pipeline.
///
/// `Schema` aborts the run at load time (no valid data to simulate).
/// `InvalidInput` is fatal only for the SKU whose parameters are bad; the
/// caller logs and skips it. `EmptyGroup` and `InsufficientSample` invalidate
/// a single statistic and are surfaced as inconclusive results.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} group contains no SKUs")]
    EmptyGroup(TestGroup),

    #[error("{group} group has {n} observation(s), need at least 2")]
    InsufficientSample { group: TestGroup, n: usize },

    #[error("dataset schema: {0}")]
    Schema(String),

    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
