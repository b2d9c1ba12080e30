//! Filter engine.

use crate::models::{FilterSelection, Record};

/// Return the records matching every constrained dimension of `selection`,
/// in input order. An empty result is valid.
pub fn apply_filter<'a>(records: &'a [Record], selection: &FilterSelection) -> Vec<&'a Record> {
    records.iter().filter(|r| selection.matches(r)).collect()
}
