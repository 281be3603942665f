use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::info;

use crate::routine_aggregator::RoutineAggregator;

/// Reads a routine export file: either a JSON array of product-like records
/// or an object wrapping one under `items`.
pub fn load_routine_records(path: &Path) -> Result<Vec<Value>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read routine file {}", path.display()))?;
    let parsed: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Routine file {} is not valid JSON", path.display()))?;
    match parsed {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(records)) => Ok(records),
            _ => bail!(
                "Routine file {} has no items array at the top level",
                path.display()
            ),
        },
        _ => bail!(
            "Routine file {} must hold an array of product records",
            path.display()
        ),
    }
}

/// Folds records into an aggregator in file order. The file is an append-log
/// of scans (oldest first), so prepend-on-insert leaves the newest scan at
/// the top and later duplicates win their merges.
pub fn build_aggregator(records: &[Value]) -> RoutineAggregator {
    let mut aggregator = RoutineAggregator::new();
    for record in records {
        aggregator.upsert_record(record);
    }
    aggregator
}

pub fn load_routine(path: &Path) -> Result<RoutineAggregator> {
    let records = load_routine_records(path)?;
    let aggregator = build_aggregator(&records);
    info!(
        records = records.len(),
        items = aggregator.len(),
        "loaded routine"
    );
    Ok(aggregator)
}
