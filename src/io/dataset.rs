use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::model::sku::{AbcClass, SkuRecord, TestGroup};

/// Columns the dataset must carry, in any order.
const REQUIRED_COLUMNS: [&str; 6] = [
    "sku_id",
    "date",
    "demand",
    "lead_time_days",
    "abc_class",
    "group",
];

#[derive(Debug, Deserialize)]
struct RawRow {
    sku_id: String,
    date: NaiveDate,
    // u32 rejects negatives and empty cells; a missing demand value fails
    // the row rather than defaulting to zero
    demand: u32,
    lead_time_days: f64,
    abc_class: AbcClass,
    group: TestGroup,
}

struct SkuBucket {
    abc_class: AbcClass,
    group: TestGroup,
    rows: Vec<(NaiveDate, u32, f64)>,
}

/// Load and validate the daily demand dataset.
///
/// Validation failures are all `Schema` errors and abort the run: with a
/// malformed dataset there is nothing valid to simulate. Checks: required
/// columns present, demand a non-negative integer, lead times non-negative,
/// dates contiguous per SKU with no duplicates, class/group consistent per
/// SKU, and at least `horizon` days of history per SKU.
pub fn load_dataset(path: &Path, horizon: usize) -> Result<Vec<SkuRecord>> {
    info!(path = %path.display(), "loading dataset");
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(Error::Schema(format!("missing required column '{column}'")));
        }
    }

    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, SkuBucket> = HashMap::new();
    let mut row_count = 0usize;

    for (index, record) in reader.deserialize::<RawRow>().enumerate() {
        // +2: one for the header line, one for 1-based numbering
        let line = index + 2;
        let row = record.map_err(|e| Error::Schema(format!("line {line}: {e}")))?;

        if !row.lead_time_days.is_finite() || row.lead_time_days < 0.0 {
            return Err(Error::Schema(format!(
                "line {line}: lead_time_days must be non-negative, got {}",
                row.lead_time_days
            )));
        }
        row_count += 1;

        match buckets.get_mut(&row.sku_id) {
            None => {
                order.push(row.sku_id.clone());
                buckets.insert(
                    row.sku_id.clone(),
                    SkuBucket {
                        abc_class: row.abc_class,
                        group: row.group,
                        rows: vec![(row.date, row.demand, row.lead_time_days)],
                    },
                );
            }
            Some(bucket) => {
                if bucket.abc_class != row.abc_class {
                    return Err(Error::Schema(format!(
                        "line {line}: SKU {} changes ABC class mid-series",
                        row.sku_id
                    )));
                }
                if bucket.group != row.group {
                    return Err(Error::Schema(format!(
                        "line {line}: SKU {} changes test group mid-series",
                        row.sku_id
                    )));
                }
                bucket.rows.push((row.date, row.demand, row.lead_time_days));
            }
        }
    }

    let mut skus = Vec::with_capacity(order.len());
    for sku_id in order {
        let mut bucket = buckets.remove(&sku_id).expect("bucket exists for ordered id");
        bucket.rows.sort_by_key(|&(date, _, _)| date);

        for pair in bucket.rows.windows(2) {
            let (prev, next) = (pair[0].0, pair[1].0);
            if prev.succ_opt() != Some(next) {
                return Err(Error::Schema(format!(
                    "SKU {sku_id}: dates not contiguous ({prev} is followed by {next})"
                )));
            }
        }
        if bucket.rows.len() < horizon {
            return Err(Error::Schema(format!(
                "SKU {sku_id}: {} day(s) of history, need at least {horizon}",
                bucket.rows.len()
            )));
        }

        let demand: Vec<u32> = bucket.rows.iter().map(|&(_, d, _)| d).collect();
        let lead_times: Vec<f64> = bucket.rows.iter().map(|&(_, _, lt)| lt).collect();
        skus.push(SkuRecord::new(
            sku_id,
            bucket.abc_class,
            bucket.group,
            demand,
            lead_times,
            horizon,
        ));
    }

    info!(skus = skus.len(), rows = row_count, "dataset loaded");
    Ok(skus)
}
