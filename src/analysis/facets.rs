//! Facet domains: the distinct option values for each filter dimension.

use crate::models::{FacetDomains, Record};
use std::collections::HashSet;
use std::hash::Hash;

/// Collect the distinct values of `key` over `records`, in first-seen order.
pub fn distinct_by<T, F>(records: &[Record], key: F) -> Vec<T>
where
    T: Eq + Hash + Clone,
    F: Fn(&Record) -> T,
{
    let mut seen = HashSet::new();
    let mut values = Vec::new();

    for record in records {
        let value = key(record);
        if seen.insert(value.clone()) {
            values.push(value);
        }
    }

    values
}

/// Build the facet domains from the complete record set.
///
/// Domains never depend on the active filter, so a narrowed selection can
/// always be widened again.
pub fn index_facets(records: &[Record]) -> FacetDomains {
    let mut years = distinct_by(records, |r| r.year);
    years.sort_unstable();

    FacetDomains {
        years,
        counties: distinct_by(records, |r| r.county.clone()),
        species_groups: distinct_by(records, |r| r.species_group.clone()),
        ecosystem_types: distinct_by(records, |r| r.ecosystem_type.clone()),
    }
}
