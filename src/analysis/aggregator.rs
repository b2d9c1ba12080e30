//! Per-county aggregation and statistics.
//!
//! This module sums exchange values by canonical county and provides
//! small helpers for summarizing the resulting aggregate map.

use crate::models::{AggregateMap, Record};
use std::collections::HashMap;

/// Sum record values by county.
///
/// Values are sorted within each county before summing, so any permutation
/// of `records` yields bit-identical totals.
pub fn aggregate_by_county<'a, I>(records: I) -> AggregateMap
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut grouped: HashMap<&str, Vec<f64>> = HashMap::new();

    for record in records {
        grouped
            .entry(record.county.as_str())
            .or_default()
            .push(record.value);
    }

    grouped
        .into_iter()
        .map(|(county, mut values)| {
            values.sort_by(f64::total_cmp);
            (county.to_string(), values.into_iter().sum())
        })
        .collect()
}

/// Look up a county, treating an absent county as zero.
pub fn value_for(aggregates: &AggregateMap, county: &str) -> f64 {
    aggregates.get(county).copied().unwrap_or(0.0)
}

/// Grand total across all counties.
pub fn total_value(aggregates: &AggregateMap) -> f64 {
    let mut values: Vec<f64> = aggregates.values().copied().collect();
    values.sort_by(f64::total_cmp);
    values.into_iter().sum()
}

/// Counties ranked by value (highest first, ties by name).
pub fn ranked_counties(aggregates: &AggregateMap) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = aggregates
        .iter()
        .map(|(county, value)| (county.clone(), *value))
        .collect();

    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    ranked
}
