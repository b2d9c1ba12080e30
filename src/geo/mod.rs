//! Geometry side of the pipeline.
//!
//! Joins aggregates onto county features, buckets them into quantile
//! color classes, and derives per-feature paint styles.

pub mod classify;
pub mod join;
pub mod style;

pub use classify::{classify_features, Breakpoints, Palette};
pub use join::{join_aggregates, JoinOptions};
pub use style::style_for;
