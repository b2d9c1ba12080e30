//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.fishmap.toml` files.

use crate::cli::OutputFormat;
use crate::error::ConfigError;
use crate::geo::{JoinOptions, Palette};
use crate::ingest::CountyAliases;
use crate::models::DatasetMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".fishmap.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// County boundary settings.
    #[serde(default)]
    pub geometry: GeometryConfig,

    /// Tabular dataset settings, one per dataset mode.
    #[serde(default)]
    pub datasets: DatasetsConfig,

    /// Color classification settings.
    #[serde(default)]
    pub classification: ClassificationConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Default output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            format: OutputFormat::default(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "fishmap.geojson".to_string()
}

/// County boundary (GeoJSON) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Path to the county FeatureCollection.
    #[serde(default = "default_geometry_path")]
    pub path: String,

    /// Feature property naming the county.
    #[serde(default = "default_county_property")]
    pub county_property: String,

    /// Feature property the aggregated value is written to.
    #[serde(default = "default_value_property")]
    pub value_property: String,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            path: default_geometry_path(),
            county_property: default_county_property(),
            value_property: default_value_property(),
        }
    }
}

fn default_geometry_path() -> String {
    "fisheriesdata/county_boundaries.geojson".to_string()
}

fn default_county_property() -> String {
    "county".to_string()
}

fn default_value_property() -> String {
    "exchange_value".to_string()
}

/// Settings for both selectable datasets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetsConfig {
    #[serde(default = "default_non_commercial")]
    pub non_commercial: DatasetConfig,

    #[serde(default = "default_commercial")]
    pub commercial: DatasetConfig,
}

impl Default for DatasetsConfig {
    fn default() -> Self {
        Self {
            non_commercial: default_non_commercial(),
            commercial: default_commercial(),
        }
    }
}

/// A single tabular dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Human-readable label.
    pub label: String,

    /// Path to the delimited source.
    pub path: String,

    /// Raw place name to canonical county.
    #[serde(default = "default_aliases")]
    pub aliases: BTreeMap<String, String>,
}

fn default_non_commercial() -> DatasetConfig {
    DatasetConfig {
        label: "Non-Commercial Fisheries".to_string(),
        path: "fisheriesdata/noncomm_ev.csv".to_string(),
        aliases: default_aliases(),
    }
}

fn default_commercial() -> DatasetConfig {
    DatasetConfig {
        label: "Commercial Fisheries".to_string(),
        path: "fisheriesdata/comm_ev.csv".to_string(),
        aliases: default_aliases(),
    }
}

/// Lanai and Molokai report under Maui County.
fn default_aliases() -> BTreeMap<String, String> {
    [
        ("Lanai", "Maui"),
        ("Lānaʻi", "Maui"),
        ("Molokai", "Maui"),
        ("Molokaʻi", "Maui"),
    ]
    .into_iter()
    .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
    .collect()
}

/// Color classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// Five fill colors, lowest class first.
    #[serde(default = "default_colors")]
    pub colors: Vec<String>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            colors: default_colors(),
        }
    }
}

fn default_colors() -> Vec<String> {
    crate::geo::classify::DEFAULT_COLORS
        .into_iter()
        .map(String::from)
        .collect()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_optional(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but
    /// can't be parsed or fails validation.
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        if path.exists() {
            Ok(Some(Self::load(path)?))
        } else {
            Ok(None)
        }
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.classification.colors.len() != 5 {
            return Err(ConfigError::PaletteSize(self.classification.colors.len()));
        }
        if self.geometry.county_property.is_empty() {
            return Err(ConfigError::EmptyField("geometry.county_property"));
        }
        if self.geometry.value_property.is_empty() {
            return Err(ConfigError::EmptyField("geometry.value_property"));
        }
        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref geometry) = args.geometry {
            self.geometry.path = geometry.display().to_string();
        }

        // --data replaces the source of the selected dataset only
        if let Some(ref data) = args.data {
            self.dataset_mut(args.dataset).path = data.display().to_string();
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Settings for a dataset mode.
    pub fn dataset(&self, mode: DatasetMode) -> &DatasetConfig {
        match mode {
            DatasetMode::NonCommercial => &self.datasets.non_commercial,
            DatasetMode::Commercial => &self.datasets.commercial,
        }
    }

    fn dataset_mut(&mut self, mode: DatasetMode) -> &mut DatasetConfig {
        match mode {
            DatasetMode::NonCommercial => &mut self.datasets.non_commercial,
            DatasetMode::Commercial => &mut self.datasets.commercial,
        }
    }

    /// Alias table for a dataset mode.
    pub fn aliases(&self, mode: DatasetMode) -> CountyAliases {
        CountyAliases::from(&self.dataset(mode).aliases)
    }

    /// Palette built from the classification colors. Falls back to the
    /// default palette if the config was never validated.
    pub fn palette(&self) -> Palette {
        Palette::from_colors(&self.classification.colors).unwrap_or_default()
    }

    /// Property names for the geometry join.
    pub fn join_options(&self) -> JoinOptions {
        JoinOptions {
            county_property: self.geometry.county_property.clone(),
            value_property: self.geometry.value_property.clone(),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.geometry.county_property, "county");
        assert_eq!(config.geometry.value_property, "exchange_value");
        assert_eq!(config.classification.colors.len(), 5);
        assert!(config.validate().is_ok());

        let aliases = config.aliases(DatasetMode::NonCommercial);
        assert_eq!(aliases.resolve("Lanai"), "Maui");
        assert_eq!(aliases.resolve("Molokai"), "Maui");
        assert_eq!(aliases.resolve("Oahu"), "Oahu");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r##"
[general]
output = "map.json"
format = "json"

[geometry]
county_property = "NAME"

[datasets.commercial]
label = "Commercial"
path = "data/comm.csv"

[datasets.commercial.aliases]
"Kahoolawe" = "Maui"

[classification]
colors = ["#1", "#2", "#3", "#4", "#5"]
"##;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "map.json");
        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(config.geometry.county_property, "NAME");
        assert_eq!(config.geometry.value_property, "exchange_value");
        assert_eq!(config.dataset(DatasetMode::Commercial).path, "data/comm.csv");
        assert_eq!(
            config.aliases(DatasetMode::Commercial).resolve("Kahoolawe"),
            "Maui"
        );
        // untouched dataset keeps its defaults
        assert_eq!(
            config.dataset(DatasetMode::NonCommercial).label,
            "Non-Commercial Fisheries"
        );
        assert_eq!(config.palette().color(crate::models::ColorClass::Highest), "#5");
    }

    #[test]
    fn test_validate_palette_size() {
        let mut config = Config::default();
        config.classification.colors.pop();
        assert_eq!(config.validate(), Err(ConfigError::PaletteSize(4)));
    }

    #[test]
    fn test_load_rejects_bad_palette() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "[classification]\ncolors = [\"#fff\"]\n").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_load_optional() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        assert!(Config::load_optional(&path).unwrap().is_none());

        std::fs::write(&path, "[classification]\ncolors = [\"#fff\", \"#000\", \"#111\"]\n").unwrap();
        assert!(Config::load_optional(&path).is_err());

        std::fs::write(&path, "[general]\nverbose = true\n").unwrap();
        let config = Config::load_optional(&path).unwrap().unwrap();
        assert!(config.general.verbose);
    }

    #[test]
    fn test_config_verbose_raises_log_level() {
        let mut config: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        let args = crate::cli::Args::parse_from(["fishmap"]);
        config.merge_with_args(&args);
        assert_eq!(args.log_level(config.general.verbose), tracing::Level::DEBUG);

        let quiet = crate::cli::Args::parse_from(["fishmap", "--quiet"]);
        assert_eq!(quiet.log_level(config.general.verbose), tracing::Level::ERROR);

        let plain = Config::default();
        assert_eq!(args.log_level(plain.general.verbose), tracing::Level::INFO);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[geometry]"));
        assert!(toml_str.contains("[classification]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert!(parsed.validate().is_ok());
    }
}
