//! Output artifacts for the rendering layer.

pub mod generator;

pub use generator::*;
