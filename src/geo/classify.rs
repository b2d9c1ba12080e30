//! Quantile classification of joined features.
//!
//! Breakpoints are relative to the whole joined set, so the same raw value
//! can land in different classes under different filters.

use crate::models::{ClassifiedFeature, ColorClass, Feature};
use serde::{Deserialize, Serialize};

/// Percentile positions of the four breakpoints.
const PERCENTILES: [f64; 4] = [0.2, 0.4, 0.6, 0.8];

/// Default fill colors, lowest class first.
pub const DEFAULT_COLORS: [&str; 5] = ["#FFEDA0", "#FEB24C", "#FC4E2A", "#E31A1C", "#800026"];

/// The four quantile thresholds separating the five classes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Breakpoints {
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
    pub q4: f64,
}

impl Breakpoints {
    /// Compute breakpoints from an unsorted value sequence.
    ///
    /// Fewer than two values yields all-zero breakpoints.
    pub fn from_values(values: &[f64]) -> Self {
        if values.len() < 2 {
            return Self::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let at = |p: f64| {
            let index = (sorted.len() as f64 * p).floor() as usize;
            sorted[index.min(sorted.len() - 1)]
        };

        Self {
            q1: at(PERCENTILES[0]),
            q2: at(PERCENTILES[1]),
            q3: at(PERCENTILES[2]),
            q4: at(PERCENTILES[3]),
        }
    }

    /// Bucket a value, comparing from the top breakpoint down.
    pub fn classify(&self, value: f64) -> ColorClass {
        if value > self.q4 {
            ColorClass::Highest
        } else if value > self.q3 {
            ColorClass::High
        } else if value > self.q2 {
            ColorClass::Middle
        } else if value > self.q1 {
            ColorClass::Low
        } else {
            ColorClass::Lowest
        }
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.q1, self.q2, self.q3, self.q4]
    }
}

/// Fill colors for the five classes, lowest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: [String; 5],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_COLORS.map(String::from),
        }
    }
}

impl Palette {
    /// Build a palette from exactly five colors. Returns `None` otherwise.
    pub fn from_colors(colors: &[String]) -> Option<Self> {
        let colors: [String; 5] = colors.to_vec().try_into().ok()?;
        Some(Self { colors })
    }

    /// Color for a class.
    pub fn color(&self, class: ColorClass) -> &str {
        &self.colors[class.index()]
    }
}

/// Classify every joined feature by the value stored in `value_property`.
///
/// Returns the classified features (same order and count as the input) and
/// the breakpoints used.
pub fn classify_features(
    joined: Vec<Feature>,
    value_property: &str,
) -> (Vec<ClassifiedFeature>, Breakpoints) {
    let values: Vec<f64> = joined
        .iter()
        .map(|f| f.property_f64(value_property).unwrap_or(0.0))
        .collect();

    let breakpoints = Breakpoints::from_values(&values);

    let classified = joined
        .into_iter()
        .zip(values)
        .map(|(feature, value)| ClassifiedFeature {
            feature,
            value,
            class: breakpoints.classify(value),
        })
        .collect();

    (classified, breakpoints)
}
