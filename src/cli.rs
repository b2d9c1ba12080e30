//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{DatasetMode, FilterSelection};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Fishmap - county choropleth of fishery exchange values
///
/// Joins a tabular dataset of exchange values onto county boundaries,
/// filtered by year, county, species group and ecosystem type, and
/// writes a styled GeoJSON map or a JSON/Markdown summary.
///
/// Examples:
///   fishmap --geometry counties.geojson --data noncomm_ev.csv
///   fishmap --dataset commercial --year 2020 --species Pelagic
///   fishmap --year 2021 --spotlight Maui --format markdown -o summary.md
///   fishmap --facets
///   fishmap --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// County boundaries (GeoJSON FeatureCollection)
    ///
    /// Overrides `geometry.path` from the config file.
    #[arg(short, long, value_name = "FILE", env = "FISHMAP_GEOMETRY")]
    pub geometry: Option<PathBuf>,

    /// Tabular source for the selected dataset
    ///
    /// Overrides the configured path of the dataset chosen with --dataset.
    #[arg(short, long, value_name = "FILE")]
    pub data: Option<PathBuf>,

    /// Which dataset to map
    #[arg(long, default_value = "non-commercial", value_name = "DATASET")]
    pub dataset: DatasetMode,

    /// Only include this year
    #[arg(short, long, value_name = "YEAR")]
    pub year: Option<i32>,

    /// Only include this (canonical) county
    #[arg(long, value_name = "NAME")]
    pub county: Option<String>,

    /// Only include this species group
    #[arg(long, value_name = "NAME")]
    pub species: Option<String>,

    /// Only include this ecosystem type
    #[arg(long, value_name = "NAME")]
    pub ecosystem: Option<String>,

    /// Paint only this county; all others are hidden
    ///
    /// Does not change values or color classes.
    #[arg(long, value_name = "NAME")]
    pub spotlight: Option<String>,

    /// Output file path
    ///
    /// Default: from config or fishmap.geojson
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (geojson, json, markdown)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .fishmap.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// List the available filter values and exit
    #[arg(long)]
    pub facets: bool,

    /// Generate a default .fishmap.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the map artifact.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Styled GeoJSON FeatureCollection (default)
    #[default]
    Geojson,
    /// JSON summary
    Json,
    /// Markdown summary
    Markdown,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        for (flag, value) in [
            ("--county", &self.county),
            ("--species", &self.species),
            ("--ecosystem", &self.ecosystem),
            ("--spotlight", &self.spotlight),
        ] {
            if let Some(v) = value {
                if v.trim().is_empty() {
                    return Err(format!("{} must not be empty", flag));
                }
            }
        }

        // Validate input files if provided
        for path in [&self.geometry, &self.data].into_iter().flatten() {
            if !path.exists() {
                return Err(format!("Input file does not exist: {}", path.display()));
            }
            if !path.is_file() {
                return Err(format!("Input path is not a file: {}", path.display()));
            }
        }

        Ok(())
    }

    /// The filter selection requested on the command line.
    pub fn selection(&self) -> FilterSelection {
        FilterSelection {
            year: self.year,
            county: self.county.clone(),
            species_group: self.species.clone(),
            ecosystem_type: self.ecosystem.clone(),
        }
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `--quiet` wins over both `--verbose` and `verbose` in the config file.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
