//! Error types for the loading and configuration boundary.
//!
//! The pipeline itself never fails: malformed values degrade to zero or
//! dropped rows. Only reading the two source assets and the config file
//! can produce an error.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while reading one of the source assets.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed tabular data in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("tabular source {path} is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("invalid GeoJSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} is a GeoJSON {found}, expected a FeatureCollection")]
    NotFeatureCollection { path: PathBuf, found: String },
}

/// Invalid configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("classification palette needs exactly 5 colors, found {0}")]
    PaletteSize(usize),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_message() {
        let err = LoadError::MissingColumn {
            path: PathBuf::from("data.csv"),
            column: "year".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "tabular source data.csv is missing required column 'year'"
        );
    }

    #[test]
    fn test_palette_message() {
        assert_eq!(
            ConfigError::PaletteSize(3).to_string(),
            "classification palette needs exactly 5 colors, found 3"
        );
    }
}
