//! Joining aggregate values onto geometry features.

use crate::analysis::value_for;
use crate::models::{AggregateMap, Feature, FeatureCollection};
use serde_json::Value;
use tracing::{debug, warn};

/// Property names used by the join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOptions {
    /// Feature property holding the county name.
    pub county_property: String,
    /// Feature property the aggregate value is written to.
    pub value_property: String,
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            county_property: "county".to_string(),
            value_property: "exchange_value".to_string(),
        }
    }
}

/// Copy every feature with its county's aggregate written to
/// `options.value_property`.
///
/// The output always has as many features as the input. A county missing
/// from `aggregates` (or a feature without a county) gets zero. A sum that
/// overflowed is written as `f64::MAX`; JSON has no infinity.
pub fn join_aggregates(
    geometry: &FeatureCollection,
    aggregates: &AggregateMap,
    options: &JoinOptions,
) -> Vec<Feature> {
    let mut unmatched = 0usize;

    let joined = geometry
        .features
        .iter()
        .map(|feature| {
            let value = match feature.property_str(&options.county_property) {
                Some(county) => finite_value(county, value_for(aggregates, county)),
                None => {
                    unmatched += 1;
                    0.0
                }
            };

            let mut out = feature.clone();
            out.properties
                .insert(options.value_property.clone(), Value::from(value));
            out
        })
        .collect();

    if unmatched > 0 {
        debug!(
            "{} features have no '{}' property; joined as zero",
            unmatched, options.county_property
        );
    }

    joined
}

fn finite_value(county: &str, value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        warn!("Sum for {} overflowed; clamping to the largest finite value", county);
        f64::MAX
    }
}
