//! Data models for the choropleth pipeline.
//!
//! This module contains the core data structures shared by every stage:
//! normalized records, the filter selection, facet domains, geometry
//! features and color classes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// A single raw tabular row: column name to raw string.
pub type RawRow = HashMap<String, String>;

/// County name to summed exchange value under the active filter.
///
/// Counties without a matching record are absent and read as zero.
pub type AggregateMap = HashMap<String, f64>;

/// One normalized observation from the tabular source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Observation year.
    pub year: i32,
    /// Canonical county name (after alias resolution).
    pub county: String,
    /// Species group, e.g. "Pelagic".
    pub species_group: String,
    /// Ecosystem type, e.g. "Reef".
    pub ecosystem_type: String,
    /// Exchange value. Never negative.
    pub value: f64,
}

/// Which tabular dataset is active.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum DatasetMode {
    /// Non-commercial fishery exchange values (default)
    #[default]
    NonCommercial,
    /// Commercial fishery exchange values
    Commercial,
}

impl DatasetMode {
    /// The dataset the selector toggles to.
    pub fn other(self) -> Self {
        match self {
            DatasetMode::NonCommercial => DatasetMode::Commercial,
            DatasetMode::Commercial => DatasetMode::NonCommercial,
        }
    }
}

impl fmt::Display for DatasetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetMode::NonCommercial => write!(f, "non-commercial"),
            DatasetMode::Commercial => write!(f, "commercial"),
        }
    }
}

/// The active filter. `None` on a dimension means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub species_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ecosystem_type: Option<String>,
}

impl FilterSelection {
    /// A selection with every dimension set to "any".
    pub fn any() -> Self {
        Self::default()
    }

    /// Returns true if no dimension is constrained.
    pub fn is_any(&self) -> bool {
        self.year.is_none()
            && self.county.is_none()
            && self.species_group.is_none()
            && self.ecosystem_type.is_none()
    }

    /// Returns true if the record satisfies every constrained dimension.
    pub fn matches(&self, record: &Record) -> bool {
        self.year.map_or(true, |y| record.year == y)
            && self.county.as_deref().map_or(true, |c| record.county == c)
            && self
                .species_group
                .as_deref()
                .map_or(true, |s| record.species_group == s)
            && self
                .ecosystem_type
                .as_deref()
                .map_or(true, |e| record.ecosystem_type == e)
    }
}

impl fmt::Display for FilterSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year = self
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "any".to_string());
        write!(
            f,
            "year={} county={} species={} ecosystem={}",
            year,
            self.county.as_deref().unwrap_or("any"),
            self.species_group.as_deref().unwrap_or("any"),
            self.ecosystem_type.as_deref().unwrap_or("any"),
        )
    }
}

/// Distinct option values for each filterable dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetDomains {
    /// Years, ascending.
    pub years: Vec<i32>,
    /// Counties, in first-seen order.
    pub counties: Vec<String>,
    /// Species groups, in first-seen order.
    pub species_groups: Vec<String>,
    /// Ecosystem types, in first-seen order.
    pub ecosystem_types: Vec<String>,
}

/// A GeoJSON feature. Only the property bag is inspected; every other
/// member is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    #[serde(default)]
    pub geometry: Value,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Map<String, Value>,
    #[serde(flatten)]
    pub foreign: Map<String, Value>,
}

fn feature_type() -> String {
    "Feature".to_string()
}

/// GeoJSON allows `"properties": null`.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Feature {
    /// Returns a string property, if present.
    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Value::as_str)
    }

    /// Returns a numeric property, if present.
    pub fn property_f64(&self, name: &str) -> Option<f64> {
        self.properties.get(name).and_then(Value::as_f64)
    }
}

/// A GeoJSON FeatureCollection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
    #[serde(flatten)]
    pub foreign: Map<String, Value>,
}

impl FeatureCollection {
    /// Build a collection from features.
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: "FeatureCollection".to_string(),
            features,
            foreign: Map::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Quantile bucket a feature falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorClass {
    /// At or below the 20th percentile breakpoint
    Lowest,
    /// Above the 20th percentile breakpoint
    Low,
    /// Above the 40th percentile breakpoint
    Middle,
    /// Above the 60th percentile breakpoint
    High,
    /// Above the 80th percentile breakpoint
    Highest,
}

impl ColorClass {
    /// All classes, lowest first.
    pub const ALL: [ColorClass; 5] = [
        ColorClass::Lowest,
        ColorClass::Low,
        ColorClass::Middle,
        ColorClass::High,
        ColorClass::Highest,
    ];

    /// Zero-based position, lowest first. Indexes into the palette.
    pub fn index(&self) -> usize {
        match self {
            ColorClass::Lowest => 0,
            ColorClass::Low => 1,
            ColorClass::Middle => 2,
            ColorClass::High => 3,
            ColorClass::Highest => 4,
        }
    }
}

impl fmt::Display for ColorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorClass::Lowest => write!(f, "Lowest"),
            ColorClass::Low => write!(f, "Low"),
            ColorClass::Middle => write!(f, "Middle"),
            ColorClass::High => write!(f, "High"),
            ColorClass::Highest => write!(f, "Highest"),
        }
    }
}

/// A joined feature together with its color class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedFeature {
    pub feature: Feature,
    /// The injected aggregate value.
    pub value: f64,
    pub class: ColorClass,
}
