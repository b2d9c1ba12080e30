//! Interactive session state.
//!
//! A [`Session`] owns everything the map view depends on: the active
//! dataset, the two loaded inputs, the filter selection and the county
//! spotlight. [`Session::view`] re-runs the whole pipeline from scratch.

use crate::analysis::{aggregate_by_county, apply_filter, index_facets};
use crate::geo::{classify_features, join_aggregates, Breakpoints, JoinOptions};
use crate::ingest::{normalize_rows, CountyAliases};
use crate::models::{
    AggregateMap, ClassifiedFeature, DatasetMode, FacetDomains, FeatureCollection,
    FilterSelection, RawRow, Record,
};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Normalized records of the active dataset plus everything derived from
/// the full record set.
#[derive(Debug, Clone)]
struct Dataset {
    records: Vec<Record>,
    dropped: usize,
    facets: FacetDomains,
}

/// What the rendering layer needs to draw the map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub mode: DatasetMode,
    pub features: Vec<ClassifiedFeature>,
    pub breakpoints: Breakpoints,
    pub aggregates: AggregateMap,
    pub facets: FacetDomains,
    pub selection: FilterSelection,
    pub spotlight: Option<String>,
    /// Collection-level members of the geometry source (`name`, `crs`, `bbox`, ...).
    pub collection_members: Map<String, Value>,
    /// Total normalized records in the dataset.
    pub record_count: usize,
    /// Records that passed the filter.
    pub matched_count: usize,
    /// Rows dropped during normalization.
    pub dropped_rows: usize,
}

/// Either both inputs are present, or the map is still loading.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionView {
    Loading,
    Ready(MapView),
}

impl SessionView {
    #[allow(dead_code)] // Interactive selection API
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionView::Loading)
    }
}

/// Single-user session driving the pipeline.
#[derive(Debug, Clone)]
pub struct Session {
    mode: DatasetMode,
    aliases: CountyAliases,
    join: JoinOptions,
    geometry: Option<FeatureCollection>,
    dataset: Option<Dataset>,
    selection: FilterSelection,
    spotlight: Option<String>,
}

impl Session {
    /// Start a session in `mode` with nothing loaded.
    pub fn new(mode: DatasetMode, aliases: CountyAliases, join: JoinOptions) -> Self {
        debug!("New {} session with {} county aliases", mode, aliases.len());
        Self {
            mode,
            aliases,
            join,
            geometry: None,
            dataset: None,
            selection: FilterSelection::any(),
            spotlight: None,
        }
    }

    pub fn mode(&self) -> DatasetMode {
        self.mode
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    /// Facet domains of the loaded dataset, if any.
    pub fn facets(&self) -> Option<&FacetDomains> {
        self.dataset.as_ref().map(|d| &d.facets)
    }

    /// Provide the county boundaries.
    pub fn set_geometry(&mut self, geometry: FeatureCollection) {
        debug!("Geometry set: {} features", geometry.len());
        self.geometry = Some(geometry);
    }

    /// Normalize raw rows as the active dataset. Resets the filter.
    ///
    /// Returns the number of rows dropped for an invalid year.
    pub fn load_rows(&mut self, rows: &[RawRow]) -> usize {
        let normalized = normalize_rows(rows, &self.aliases);
        let facets = index_facets(&normalized.records);

        info!(
            "{} dataset: {} records, {} years, {} counties",
            self.mode,
            normalized.records.len(),
            facets.years.len(),
            facets.counties.len()
        );

        let dropped = normalized.dropped;
        self.dataset = Some(Dataset {
            records: normalized.records,
            dropped,
            facets,
        });
        self.selection = FilterSelection::any();
        dropped
    }

    /// Switch to another dataset. Drops the current records, resets the
    /// filter and the spotlight; the session is loading until
    /// [`Session::load_rows`] is called again.
    pub fn switch_dataset(&mut self, mode: DatasetMode, aliases: CountyAliases) {
        info!("Switching dataset: {} -> {}", self.mode, mode);
        self.mode = mode;
        self.aliases = aliases;
        self.dataset = None;
        self.selection = FilterSelection::any();
        self.spotlight = None;
    }

    /// Replace the whole selection.
    pub fn set_selection(&mut self, selection: FilterSelection) {
        self.selection = selection;
    }

    #[allow(dead_code)] // Interactive selection API
    pub fn select_year(&mut self, year: Option<i32>) {
        self.selection.year = year;
    }

    #[allow(dead_code)] // Interactive selection API
    pub fn select_county(&mut self, county: Option<String>) {
        self.selection.county = county;
    }

    #[allow(dead_code)] // Interactive selection API
    pub fn select_species(&mut self, species_group: Option<String>) {
        self.selection.species_group = species_group;
    }

    #[allow(dead_code)] // Interactive selection API
    pub fn select_ecosystem(&mut self, ecosystem_type: Option<String>) {
        self.selection.ecosystem_type = ecosystem_type;
    }

    /// Reset every filter dimension to "any".
    #[allow(dead_code)] // Interactive selection API
    pub fn clear_filters(&mut self) {
        self.selection = FilterSelection::any();
    }

    /// Set or clear the county spotlight.
    pub fn set_spotlight(&mut self, county: Option<String>) {
        self.spotlight = county;
    }

    /// Run the full pipeline on the current state.
    pub fn view(&self) -> SessionView {
        let (Some(geometry), Some(dataset)) = (&self.geometry, &self.dataset) else {
            return SessionView::Loading;
        };

        let filtered = apply_filter(&dataset.records, &self.selection);
        let matched_count = filtered.len();
        let aggregates = aggregate_by_county(filtered);

        let joined = join_aggregates(geometry, &aggregates, &self.join);
        let (features, breakpoints) = classify_features(joined, &self.join.value_property);

        debug!(
            "Selection [{}]: {} records, {} counties, breakpoints {:?}",
            self.selection,
            matched_count,
            aggregates.len(),
            breakpoints.as_array()
        );

        SessionView::Ready(MapView {
            mode: self.mode,
            features,
            breakpoints,
            aggregates,
            facets: dataset.facets.clone(),
            selection: self.selection.clone(),
            spotlight: self.spotlight.clone(),
            collection_members: geometry.foreign.clone(),
            record_count: dataset.records.len(),
            matched_count,
            dropped_rows: dataset.dropped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColorClass, Feature};
    use serde_json::json;

    fn raw(year: &str, county: &str, species: &str, value: &str) -> RawRow {
        [
            ("year", year),
            ("county", county),
            ("species_group", species),
            ("ecosystem_type", "Reef"),
            ("exchange_value", value),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn geometry() -> FeatureCollection {
        let features: Vec<Feature> = ["Hawaii", "Maui", "Oahu", "Kauai", "Kalawao"]
            .into_iter()
            .map(|county| {
                serde_json::from_value(json!({
                    "type": "Feature",
                    "geometry": null,
                    "properties": {"county": county}
                }))
                .unwrap()
            })
            .collect();
        FeatureCollection::new(features)
    }

    fn rows() -> Vec<RawRow> {
        vec![
            raw("2019", "Hawaii", "Pelagic", "500"),
            raw("2019", "Oahu", "Bottomfish", "300"),
            raw("2020", "Lanai", "Pelagic", "100"),
            raw("2020", "Maui", "Pelagic", "50"),
            raw("2020", "Kauai", "Bottomfish", "20"),
            raw("2020", "Oahu", "Pelagic", "400"),
            raw("bad", "Oahu", "Pelagic", "1"),
        ]
    }

    fn ready_session() -> Session {
        let mut session = Session::new(
            DatasetMode::NonCommercial,
            CountyAliases::new().with("Lanai", "Maui"),
            JoinOptions::default(),
        );
        session.set_geometry(geometry());
        session.load_rows(&rows());
        session
    }

    fn ready(view: SessionView) -> MapView {
        match view {
            SessionView::Ready(map) => map,
            SessionView::Loading => panic!("session still loading"),
        }
    }

    #[test]
    fn test_loading_until_both_inputs_present() {
        let mut session = Session::new(
            DatasetMode::NonCommercial,
            CountyAliases::new(),
            JoinOptions::default(),
        );
        assert!(session.view().is_loading());

        session.load_rows(&rows());
        assert!(session.view().is_loading());

        session.set_geometry(geometry());
        assert!(!session.view().is_loading());
    }

    #[test]
    fn test_no_filter_view() {
        let map = ready(ready_session().view());

        assert_eq!(map.features.len(), 5);
        assert_eq!(map.dropped_rows, 1);
        assert_eq!(map.record_count, 6);
        assert_eq!(map.aggregates.get("Maui"), Some(&150.0));
        assert_eq!(map.aggregates.get("Oahu"), Some(&700.0));
        assert!(map.aggregates.get("Kalawao").is_none());
        assert_eq!(map.facets.years, vec![2019, 2020]);
    }

    #[test]
    fn test_year_without_rows_zeroes_every_feature() {
        let mut session = ready_session();
        session.select_year(Some(2021));
        let map = ready(session.view());

        assert!(map.aggregates.is_empty());
        assert_eq!(map.matched_count, 0);
        assert_eq!(map.features.len(), 5);
        assert!(map.features.iter().all(|f| f.value == 0.0));
        assert!(map.features.iter().all(|f| f.class == ColorClass::Lowest));
    }

    #[test]
    fn test_facets_ignore_selection() {
        let mut session = ready_session();
        let before = ready(session.view()).facets;

        session.select_year(Some(2019));
        session.select_species(Some("Bottomfish".to_string()));
        let after = ready(session.view()).facets;

        assert_eq!(before, after);
        assert_eq!(after.counties, vec!["Hawaii", "Oahu", "Maui", "Kauai"]);
    }

    #[test]
    fn test_spotlight_keeps_breakpoints_filter_moves_them() {
        let mut session = ready_session();
        session.select_year(Some(2020));
        let base = ready(session.view());

        session.set_spotlight(Some("Maui".to_string()));
        let spotlit = ready(session.view());
        assert_eq!(base.breakpoints, spotlit.breakpoints);
        assert_eq!(base.features, spotlit.features);
        assert_eq!(base.aggregates, spotlit.aggregates);

        session.select_year(Some(2019));
        let refiltered = ready(session.view());
        assert_ne!(base.breakpoints, refiltered.breakpoints);
    }

    #[test]
    fn test_view_is_idempotent() {
        let mut session = ready_session();
        session.select_species(Some("Pelagic".to_string()));

        assert_eq!(session.view(), session.view());
    }

    #[test]
    fn test_switch_dataset_resets_state() {
        let mut session = ready_session();
        session.select_year(Some(2020));
        session.set_spotlight(Some("Oahu".to_string()));

        session.switch_dataset(DatasetMode::Commercial, CountyAliases::new());

        assert_eq!(session.mode(), DatasetMode::Commercial);
        assert!(session.selection().is_any());
        assert!(session.facets().is_none());
        assert!(session.view().is_loading());

        session.load_rows(&rows());
        let map = ready(session.view());
        assert!(map.spotlight.is_none());
        // no alias table for this dataset
        assert_eq!(map.aggregates.get("Lanai"), Some(&100.0));
        assert_eq!(map.aggregates.get("Maui"), Some(&50.0));
    }

    #[test]
    fn test_load_rows_resets_selection() {
        let mut session = ready_session();
        session.set_selection(FilterSelection {
            county: Some("Oahu".to_string()),
            ..Default::default()
        });
        session.load_rows(&rows());
        assert!(session.selection().is_any());
    }

    #[test]
    fn test_clear_filters() {
        let mut session = ready_session();
        session.select_county(Some("Oahu".to_string()));
        session.select_ecosystem(Some("Reef".to_string()));
        session.clear_filters();
        assert!(session.selection().is_any());
    }

    #[test]
    fn test_fixture_pipeline() {
        let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
        let (geometry, rows) = tokio_test::block_on(async {
            futures::try_join!(
                crate::source::load_geometry(root.join("counties.geojson")),
                crate::source::load_rows(root.join("noncomm_ev.csv")),
            )
        })
        .unwrap();

        let mut session = Session::new(
            DatasetMode::NonCommercial,
            CountyAliases::new().with("Lanai", "Maui").with("Molokai", "Maui"),
            JoinOptions::default(),
        );
        session.set_geometry(geometry);
        assert_eq!(session.load_rows(&rows), 1);

        let map = ready(session.view());
        assert_eq!(map.record_count, 9);
        assert!((map.aggregates["Maui"] - 268.6).abs() < 1e-9);
        assert!((map.aggregates["Honolulu"] - 718.75).abs() < 1e-9);
        assert!((map.aggregates["Hawaii"] - 512.4).abs() < 1e-9);

        let kalawao = map
            .features
            .iter()
            .find(|f| f.feature.property_str("county") == Some("Kalawao"))
            .unwrap();
        assert_eq!(kalawao.value, 0.0);
        assert_eq!(kalawao.class, ColorClass::Lowest);
        assert_eq!(map.facets.years, vec![2019, 2020, 2021]);
    }
}
