//! Analysis over normalized records.
//!
//! Facet indexing, filtering and per-county aggregation.

pub mod aggregator;
pub mod facets;
pub mod filter;

pub use aggregator::*;
pub use facets::*;
pub use filter::*;
