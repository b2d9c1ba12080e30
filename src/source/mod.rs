//! Loading the two source assets.
//!
//! The county boundaries and the tabular dataset are read concurrently;
//! neither is handed to the pipeline until both have arrived.

use crate::error::LoadError;
use crate::ingest::REQUIRED_COLUMNS;
use crate::models::{FeatureCollection, RawRow};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Both assets, loaded.
#[derive(Debug, Clone)]
pub struct LoadedSources {
    pub geometry: FeatureCollection,
    pub rows: Vec<RawRow>,
}

/// Read raw rows from delimited text with a header row.
///
/// Blank lines are skipped and surrounding whitespace is trimmed. Every
/// column in [`REQUIRED_COLUMNS`] must be present in the header.
pub fn parse_rows(path: &Path, text: &str) -> Result<Vec<RawRow>, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| crate::ingest::clean_field(h).to_string())
        .collect();

    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(LoadError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }

    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record.map_err(csv_err)?;

        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        rows.push(row);
    }

    debug!("Parsed {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Decode a GeoJSON FeatureCollection.
pub fn parse_geometry(path: &Path, text: &str) -> Result<FeatureCollection, LoadError> {
    let json_err = |source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    };

    let value: Value = serde_json::from_str(text).map_err(json_err)?;

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    if kind != "FeatureCollection" {
        return Err(LoadError::NotFeatureCollection {
            path: path.to_path_buf(),
            found: kind,
        });
    }

    let collection: FeatureCollection = serde_json::from_value(value).map_err(json_err)?;
    debug!(
        "Decoded {} features from {}",
        collection.len(),
        path.display()
    );
    Ok(collection)
}

async fn read(path: &Path) -> Result<String, LoadError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Load the county boundaries.
pub async fn load_geometry(path: PathBuf) -> Result<FeatureCollection, LoadError> {
    let text = read(&path).await?;
    parse_geometry(&path, &text)
}

/// Load the raw rows of a tabular dataset.
pub async fn load_rows(path: PathBuf) -> Result<Vec<RawRow>, LoadError> {
    let text = read(&path).await?;
    parse_rows(&path, &text)
}

/// Load both assets concurrently, showing a spinner unless `quiet`.
pub async fn load_sources(
    geometry_path: PathBuf,
    data_path: PathBuf,
    label: &str,
    quiet: bool,
) -> Result<LoadedSources, LoadError> {
    info!(
        "Loading {} from {} and {}",
        label,
        geometry_path.display(),
        data_path.display()
    );

    let spinner = if quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed_precise}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Loading {}...", label));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    };

    let result = futures::try_join!(load_geometry(geometry_path), load_rows(data_path));

    if let Some(pb) = spinner {
        match result {
            Ok(_) => pb.finish_with_message(format!("Loaded {}", label)),
            Err(_) => pb.abandon_with_message(format!("Failed to load {}", label)),
        }
    }

    let (geometry, rows) = result?;
    Ok(LoadedSources { geometry, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "year,county,species_group,ecosystem_type,exchange_value\n";

    #[test]
    fn test_parse_rows_strips_quotes_and_blank_lines() {
        let text = format!(
            "{}\"2020\",\"Lanai\",\"Pelagic\",\"Reef\",\"100\"\n\n2020, Maui ,Pelagic,Reef,50\n",
            HEADER
        );
        let rows = parse_rows(Path::new("t.csv"), &text).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["county"], "Lanai");
        assert_eq!(rows[0]["exchange_value"], "100");
        assert_eq!(rows[1]["county"], "Maui");
    }

    #[test]
    fn test_parse_rows_short_row_leaves_field_missing() {
        let text = format!("{}2020,Maui,Pelagic\n", HEADER);
        let rows = parse_rows(Path::new("t.csv"), &text).unwrap();

        assert_eq!(rows.len(), 1);
        assert!(rows[0].get("exchange_value").is_none());
    }

    #[test]
    fn test_parse_rows_missing_column() {
        let text = "year,county,species_group,ecosystem_type\n2020,Maui,Pelagic,Reef\n";
        let err = parse_rows(Path::new("t.csv"), text).unwrap_err();

        match err {
            LoadError::MissingColumn { column, .. } => assert_eq!(column, "exchange_value"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_rows_extra_columns_kept() {
        let text = "region,year,county,species_group,ecosystem_type,exchange_value\nEast,2020,Maui,Pelagic,Reef,1\n";
        let rows = parse_rows(Path::new("t.csv"), text).unwrap();
        assert_eq!(rows[0]["region"], "East");
    }

    #[test]
    fn test_parse_geometry_rejects_single_feature() {
        let text = r#"{"type": "Feature", "geometry": null, "properties": {}}"#;
        let err = parse_geometry(Path::new("g.geojson"), text).unwrap_err();
        assert!(matches!(err, LoadError::NotFeatureCollection { .. }));
    }

    #[test]
    fn test_parse_geometry_invalid_json() {
        let err = parse_geometry(Path::new("g.geojson"), "{not json").unwrap_err();
        assert!(matches!(err, LoadError::Json { .. }));
    }

    #[test]
    fn test_load_sources_reads_both() {
        let dir = tempfile::tempdir().unwrap();
        let geometry_path = dir.path().join("counties.geojson");
        let data_path = dir.path().join("values.csv");

        std::fs::write(
            &geometry_path,
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "geometry": null, "properties": {"county": "Maui"}}
            ]}"#,
        )
        .unwrap();
        let mut file = std::fs::File::create(&data_path).unwrap();
        write!(file, "{}2020,Maui,Pelagic,Reef,5\n", HEADER).unwrap();

        let loaded = tokio_test::block_on(load_sources(
            geometry_path,
            data_path,
            "Test Fisheries",
            true,
        ))
        .unwrap();

        assert_eq!(loaded.geometry.len(), 1);
        assert_eq!(loaded.rows.len(), 1);
    }

    #[test]
    fn test_load_sources_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = tokio_test::block_on(load_sources(
            dir.path().join("nope.geojson"),
            dir.path().join("nope.csv"),
            "Test Fisheries",
            true,
        ));

        assert!(matches!(result, Err(LoadError::Io { .. })));
    }
}
