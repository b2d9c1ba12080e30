//! Map artifact and summary report generation.
//!
//! This module turns a ready [`MapView`] into the artifacts handed to the
//! rendering layer: a styled GeoJSON FeatureCollection, or a JSON/Markdown
//! summary of values, breakpoints and facets.

use crate::analysis::{ranked_counties, total_value};
use crate::geo::{style_for, Breakpoints, Palette};
use crate::models::{ColorClass, FacetDomains, Feature, FeatureCollection, FilterSelection};
use crate::session::MapView;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Metadata about a generated map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Dataset label, e.g. "Non-Commercial Fisheries".
    pub dataset: String,
    /// Geometry source path.
    pub geometry_path: String,
    /// Tabular source path.
    pub data_path: String,
    /// When the map was generated.
    pub generated_at: DateTime<Utc>,
    /// Load + pipeline duration in seconds.
    pub duration_seconds: f64,
}

/// One row of the color legend.
#[derive(Debug, Clone, Serialize)]
pub struct LegendEntry {
    pub class: ColorClass,
    pub color: String,
    /// Exclusive lower bound (`None` for the lowest class).
    pub above: Option<f64>,
    /// Inclusive upper bound (`None` for the highest class).
    pub up_to: Option<f64>,
    /// Features in this class.
    pub features: usize,
}

/// Value and class of one county feature.
#[derive(Debug, Clone, Serialize)]
pub struct CountyRow {
    pub county: String,
    pub value: f64,
    pub class: ColorClass,
    pub color: String,
    pub visible: bool,
}

/// Record counts behind the map.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordStats {
    pub records: usize,
    pub matched: usize,
    pub dropped_rows: usize,
    pub features: usize,
    pub total_value: f64,
}

/// Summary of a generated map.
#[derive(Debug, Clone, Serialize)]
pub struct MapReport {
    pub metadata: ReportMetadata,
    pub selection: FilterSelection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spotlight: Option<String>,
    pub stats: RecordStats,
    pub breakpoints: Breakpoints,
    pub legend: Vec<LegendEntry>,
    /// Features, highest value first.
    pub counties: Vec<CountyRow>,
    /// Aggregated counties with no matching feature.
    pub unmatched_counties: Vec<String>,
    pub facets: FacetDomains,
}

/// Build the summary report for a ready map view.
pub fn build_report(
    view: &MapView,
    metadata: ReportMetadata,
    palette: &Palette,
    county_property: &str,
) -> MapReport {
    let spotlight = view.spotlight.as_deref();

    let mut counties: Vec<CountyRow> = view
        .features
        .iter()
        .map(|f| CountyRow {
            county: f
                .feature
                .property_str(county_property)
                .unwrap_or("(unnamed)")
                .to_string(),
            value: f.value,
            class: f.class,
            color: palette.color(f.class).to_string(),
            visible: style_for(f, county_property, spotlight, palette).visible,
        })
        .collect();
    counties.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.county.cmp(&b.county)));

    let mapped: HashSet<&str> = view
        .features
        .iter()
        .filter_map(|f| f.feature.property_str(county_property))
        .collect();
    let unmatched_counties: Vec<String> = ranked_counties(&view.aggregates)
        .into_iter()
        .map(|(county, _)| county)
        .filter(|county| !mapped.contains(county.as_str()))
        .collect();

    MapReport {
        metadata,
        selection: view.selection.clone(),
        spotlight: view.spotlight.clone(),
        stats: RecordStats {
            records: view.record_count,
            matched: view.matched_count,
            dropped_rows: view.dropped_rows,
            features: view.features.len(),
            total_value: total_value(&view.aggregates),
        },
        breakpoints: view.breakpoints,
        legend: build_legend(view, palette),
        counties,
        unmatched_counties,
        facets: view.facets.clone(),
    }
}

fn build_legend(view: &MapView, palette: &Palette) -> Vec<LegendEntry> {
    let bounds = view.breakpoints.as_array();

    ColorClass::ALL
        .iter()
        .map(|&class| {
            let i = class.index();
            LegendEntry {
                class,
                color: palette.color(class).to_string(),
                above: i.checked_sub(1).map(|j| bounds[j]),
                up_to: bounds.get(i).copied(),
                features: view.features.iter().filter(|f| f.class == class).count(),
            }
        })
        .collect()
}

/// Generate the styled GeoJSON FeatureCollection.
///
/// Each feature gains `class`, `fill_color` and a `style` object next to
/// the injected value.
pub fn generate_geojson(view: &MapView, palette: &Palette, county_property: &str) -> Result<String> {
    let spotlight = view.spotlight.as_deref();

    let features: Vec<Feature> = view
        .features
        .iter()
        .map(|classified| -> Result<Feature> {
            let style = style_for(classified, county_property, spotlight, palette);
            let mut feature = classified.feature.clone();
            feature
                .properties
                .insert("class".to_string(), Value::from(classified.class.to_string()));
            feature
                .properties
                .insert("fill_color".to_string(), Value::from(style.fill_color.clone()));
            feature
                .properties
                .insert("style".to_string(), serde_json::to_value(&style)?);
            Ok(feature)
        })
        .collect::<Result<_>>()?;

    let mut collection = FeatureCollection::new(features);
    collection.foreign = view.collection_members.clone();

    serde_json::to_string_pretty(&collection).map_err(Into::into)
}

/// Generate a JSON report.
pub fn generate_json_report(report: &MapReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Generate a Markdown report.
pub fn generate_markdown_report(report: &MapReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {} Exchange Value Map\n\n", report.metadata.dataset));
    output.push_str(&generate_metadata_section(report));
    output.push_str(&generate_legend_section(&report.legend));
    output.push_str(&generate_counties_section(report));
    output.push_str(&generate_facets_section(&report.facets));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(report: &MapReport) -> String {
    let metadata = &report.metadata;
    let stats = &report.stats;
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Geometry:** `{}`\n", metadata.geometry_path));
    section.push_str(&format!("- **Data:** `{}`\n", metadata.data_path));
    section.push_str(&format!("- **Filter:** {}\n", report.selection));
    if let Some(ref county) = report.spotlight {
        section.push_str(&format!("- **Spotlight:** {}\n", county));
    }
    section.push_str(&format!(
        "- **Records:** {} matched of {}\n",
        stats.matched, stats.records
    ));
    if stats.dropped_rows > 0 {
        section.push_str(&format!(
            "- **Dropped Rows:** {} (invalid year)\n",
            stats.dropped_rows
        ));
    }
    section.push_str(&format!("- **Total Value:** {:.2}\n", stats.total_value));
    section.push_str(&format!(
        "- **Duration:** {:.2}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the legend table.
fn generate_legend_section(legend: &[LegendEntry]) -> String {
    let mut section = String::new();

    section.push_str("## Legend\n\n");
    section.push_str("| Class | Color | Range | Features |\n");
    section.push_str("|:---|:---:|:---|:---:|\n");

    for entry in legend.iter().rev() {
        let range = match (entry.above, entry.up_to) {
            (None, Some(hi)) => format!("≤ {:.2}", hi),
            (Some(lo), Some(hi)) => format!("> {:.2} and ≤ {:.2}", lo, hi),
            (Some(lo), None) => format!("> {:.2}", lo),
            (None, None) => "all".to_string(),
        };
        section.push_str(&format!(
            "| {} | `{}` | {} | {} |\n",
            entry.class, entry.color, range, entry.features
        ));
    }
    section.push('\n');

    section
}

/// Generate the per-county table.
fn generate_counties_section(report: &MapReport) -> String {
    let mut section = String::new();

    section.push_str("## Counties\n\n");

    if report.counties.is_empty() {
        section.push_str("No county features.\n\n");
        return section;
    }

    section.push_str("| County | Value | Class |\n");
    section.push_str("|:---|---:|:---|\n");
    for row in &report.counties {
        let hidden = if row.visible { "" } else { " (hidden)" };
        section.push_str(&format!(
            "| {}{} | {:.2} | {} |\n",
            row.county, hidden, row.value, row.class
        ));
    }
    section.push('\n');

    if !report.unmatched_counties.is_empty() {
        section.push_str(&format!(
            "> Counties with values but no boundary: {}\n\n",
            report.unmatched_counties.join(", ")
        ));
    }

    section
}

/// Generate the facet listing.
fn generate_facets_section(facets: &FacetDomains) -> String {
    let mut section = String::new();

    section.push_str("## Available Filters\n\n");
    section.push_str(&format!("- **Years:** {}\n", join_list(&facets.years)));
    section.push_str(&format!("- **Counties:** {}\n", join_list(&facets.counties)));
    section.push_str(&format!(
        "- **Species Groups:** {}\n",
        join_list(&facets.species_groups)
    ));
    section.push_str(&format!(
        "- **Ecosystem Types:** {}\n",
        join_list(&facets.ecosystem_types)
    ));
    section.push('\n');

    section
}

/// Plain-text facet listing for `--facets`.
pub fn format_facets(facets: &FacetDomains) -> String {
    let mut out = String::new();
    out.push_str(&format!("   Years:           {}\n", join_list(&facets.years)));
    out.push_str(&format!("   Counties:        {}\n", join_list(&facets.counties)));
    out.push_str(&format!(
        "   Species groups:  {}\n",
        join_list(&facets.species_groups)
    ));
    out.push_str(&format!(
        "   Ecosystem types: {}\n",
        join_list(&facets.ecosystem_types)
    ));
    out
}

fn join_list<T: ToString>(items: &[T]) -> String {
    if items.is_empty() {
        return "(none)".to_string();
    }
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn generate_footer() -> String {
    "---\n\n*Generated by fishmap*\n".to_string()
}
