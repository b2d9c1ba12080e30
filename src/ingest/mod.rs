//! Record normalization.
//!
//! Turns raw tabular rows into canonical [`Record`]s: fields are cleaned of
//! quotes and whitespace, numbers are parsed, and raw place names are
//! resolved to canonical counties through a [`CountyAliases`] table.

use crate::models::{RawRow, Record};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Column holding the observation year.
pub const YEAR_COLUMN: &str = "year";
/// Column holding the raw place name.
pub const COUNTY_COLUMN: &str = "county";
/// Column holding the species group.
pub const SPECIES_COLUMN: &str = "species_group";
/// Column holding the ecosystem type.
pub const ECOSYSTEM_COLUMN: &str = "ecosystem_type";
/// Column holding the exchange value.
pub const VALUE_COLUMN: &str = "exchange_value";

/// Columns a tabular source must provide.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    YEAR_COLUMN,
    COUNTY_COLUMN,
    SPECIES_COLUMN,
    ECOSYSTEM_COLUMN,
    VALUE_COLUMN,
];

/// Static lookup from raw place names to canonical county names.
///
/// Names without an entry are already canonical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountyAliases {
    table: HashMap<String, String>,
}

impl CountyAliases {
    /// Create an empty alias table (every name maps to itself).
    #[allow(dead_code)] // Builder for tables assembled in code
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an alias, returning the table for chaining.
    #[allow(dead_code)] // Builder for tables assembled in code
    pub fn with(mut self, raw: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.table.insert(raw.into(), canonical.into());
        self
    }

    /// Resolve a raw place name to its canonical county.
    pub fn resolve<'a>(&'a self, raw: &'a str) -> &'a str {
        self.table.get(raw).map(String::as_str).unwrap_or(raw)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }
}

impl From<&BTreeMap<String, String>> for CountyAliases {
    fn from(table: &BTreeMap<String, String>) -> Self {
        Self {
            table: table
                .iter()
                .map(|(raw, canonical)| (clean_field(raw).to_string(), canonical.clone()))
                .collect(),
        }
    }
}

/// Output of a normalization pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRows {
    /// Records in input order.
    pub records: Vec<Record>,
    /// Rows dropped because their year could not be parsed.
    pub dropped: usize,
}

/// Strip surrounding whitespace and double quotes from a raw field.
pub fn clean_field(raw: &str) -> &str {
    raw.trim().trim_matches('"').trim()
}

/// Parse an exchange value. Anything that is not a finite,
/// non-negative number becomes zero.
pub fn parse_value(raw: &str) -> f64 {
    match clean_field(raw).parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => v,
        _ => 0.0,
    }
}

/// Parse a year. Returns `None` if the field is not an integer.
pub fn parse_year(raw: &str) -> Option<i32> {
    clean_field(raw).parse::<i32>().ok()
}

/// Normalize a single raw row. Returns `None` if the row has no usable year.
pub fn normalize_row(row: &RawRow, aliases: &CountyAliases) -> Option<Record> {
    let field = |name: &str| row.get(name).map(|s| clean_field(s)).unwrap_or("");

    let year = parse_year(field(YEAR_COLUMN))?;
    let county = aliases.resolve(field(COUNTY_COLUMN)).to_string();

    Some(Record {
        year,
        county,
        species_group: field(SPECIES_COLUMN).to_string(),
        ecosystem_type: field(ECOSYSTEM_COLUMN).to_string(),
        value: parse_value(field(VALUE_COLUMN)),
    })
}

/// Normalize every raw row, preserving input order.
pub fn normalize_rows(rows: &[RawRow], aliases: &CountyAliases) -> NormalizedRows {
    let mut out = NormalizedRows {
        records: Vec::with_capacity(rows.len()),
        dropped: 0,
    };

    for (i, row) in rows.iter().enumerate() {
        match normalize_row(row, aliases) {
            Some(record) => out.records.push(record),
            None => {
                debug!(
                    "Dropping row {}: unparseable year {:?}",
                    i + 1,
                    row.get(YEAR_COLUMN)
                );
                out.dropped += 1;
            }
        }
    }

    if out.dropped > 0 {
        warn!(
            "Dropped {} of {} rows with an invalid year",
            out.dropped,
            rows.len()
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(year: &str, county: &str, value: &str) -> RawRow {
        [
            (YEAR_COLUMN, year),
            (COUNTY_COLUMN, county),
            (SPECIES_COLUMN, "Pelagic"),
            (ECOSYSTEM_COLUMN, "Reef"),
            (VALUE_COLUMN, value),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn maui_aliases() -> CountyAliases {
        CountyAliases::new()
            .with("Lanai", "Maui")
            .with("Molokai", "Maui")
    }

    #[test]
    fn test_clean_field() {
        assert_eq!(clean_field("  \"Maui\" "), "Maui");
        assert_eq!(clean_field("\"\""), "");
        assert_eq!(clean_field("Hawaii"), "Hawaii");
    }

    #[test]
    fn test_parse_value_defaults_to_zero() {
        assert_eq!(parse_value("100"), 100.0);
        assert_eq!(parse_value("\"12.5\""), 12.5);
        assert_eq!(parse_value(""), 0.0);
        assert_eq!(parse_value("n/a"), 0.0);
        assert_eq!(parse_value("-5"), 0.0);
        assert_eq!(parse_value("NaN"), 0.0);
        assert_eq!(parse_value("inf"), 0.0);
    }

    #[test]
    fn test_alias_resolution() {
        let rows = vec![raw("2020", "Lanai", "100"), raw("2020", "Kauai", "5")];
        let out = normalize_rows(&rows, &maui_aliases());

        assert_eq!(out.records[0].county, "Maui");
        assert_eq!(out.records[1].county, "Kauai");
    }

    #[test]
    fn test_invalid_year_drops_row() {
        let rows = vec![
            raw("2020", "Maui", "1"),
            raw("twenty", "Maui", "2"),
            raw("", "Maui", "3"),
            raw("2021", "Maui", "4"),
        ];
        let out = normalize_rows(&rows, &CountyAliases::new());

        assert_eq!(out.records.len(), 2);
        assert_eq!(out.dropped, 2);
        assert_eq!(out.records[0].year, 2020);
        assert_eq!(out.records[1].year, 2021);
    }

    #[test]
    fn test_missing_value_column_is_zero() {
        let mut row = raw("2020", "Oahu", "1");
        row.remove(VALUE_COLUMN);
        let record = normalize_row(&row, &CountyAliases::new()).unwrap();
        assert_eq!(record.value, 0.0);
    }

    #[test]
    fn test_quoted_fields_are_stripped() {
        let row = raw("\"2019\"", " \"Molokai\" ", "\"42\"");
        let record = normalize_row(&row, &maui_aliases()).unwrap();

        assert_eq!(record.year, 2019);
        assert_eq!(record.county, "Maui");
        assert_eq!(record.value, 42.0);
    }

    #[test]
    fn test_aliases_from_config_table() {
        let mut table = BTreeMap::new();
        table.insert("Lanai".to_string(), "Maui".to_string());
        let aliases = CountyAliases::from(&table);

        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases.resolve("Lanai"), "Maui");
        assert_eq!(aliases.resolve("Maui"), "Maui");
    }
}
