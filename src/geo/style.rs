//! Paint styles for classified features.
//!
//! The county spotlight lives here and only here: it decides which features
//! are painted, never what they are worth or which class they fall into.

use super::classify::Palette;
use crate::models::ClassifiedFeature;
use serde::Serialize;

const STROKE_COLOR: &str = "#ffffff";
const STROKE_WEIGHT: f64 = 1.0;
const FILL_OPACITY: f64 = 0.8;

/// How a single feature should be painted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureStyle {
    pub visible: bool,
    pub fill_color: String,
    pub fill_opacity: f64,
    pub color: String,
    pub opacity: f64,
    pub weight: f64,
}

impl FeatureStyle {
    fn hidden(fill_color: &str) -> Self {
        Self {
            visible: false,
            fill_color: fill_color.to_string(),
            fill_opacity: 0.0,
            color: STROKE_COLOR.to_string(),
            opacity: 0.0,
            weight: STROKE_WEIGHT,
        }
    }

    fn painted(fill_color: &str) -> Self {
        Self {
            visible: true,
            fill_color: fill_color.to_string(),
            fill_opacity: FILL_OPACITY,
            color: STROKE_COLOR.to_string(),
            opacity: 1.0,
            weight: STROKE_WEIGHT,
        }
    }
}

/// Style a classified feature.
///
/// With a spotlight set, every feature whose county differs is suppressed.
pub fn style_for(
    classified: &ClassifiedFeature,
    county_property: &str,
    spotlight: Option<&str>,
    palette: &Palette,
) -> FeatureStyle {
    let fill = palette.color(classified.class);

    match spotlight {
        Some(county) if classified.feature.property_str(county_property) != Some(county) => {
            FeatureStyle::hidden(fill)
        }
        _ => FeatureStyle::painted(fill),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColorClass, Feature};
    use serde_json::json;

    fn classified(county: &str, class: ColorClass) -> ClassifiedFeature {
        let feature: Feature = serde_json::from_value(json!({
            "type": "Feature",
            "geometry": null,
            "properties": {"county": county}
        }))
        .unwrap();

        ClassifiedFeature {
            feature,
            value: 0.0,
            class,
        }
    }

    #[test]
    fn test_no_spotlight_paints_all() {
        let palette = Palette::default();
        let style = style_for(
            &classified("Maui", ColorClass::Highest),
            "county",
            None,
            &palette,
        );

        assert!(style.visible);
        assert_eq!(style.fill_color, "#800026");
        assert_eq!(style.fill_opacity, 0.8);
        assert_eq!(style.color, "#ffffff");
    }

    #[test]
    fn test_spotlight_hides_other_counties() {
        let palette = Palette::default();
        let maui = classified("Maui", ColorClass::Low);
        let kauai = classified("Kauai", ColorClass::Low);

        let shown = style_for(&maui, "county", Some("Maui"), &palette);
        let hidden = style_for(&kauai, "county", Some("Maui"), &palette);

        assert!(shown.visible);
        assert!(!hidden.visible);
        assert_eq!(hidden.fill_opacity, 0.0);
        assert_eq!(hidden.opacity, 0.0);
        // class color is unchanged by the spotlight
        assert_eq!(hidden.fill_color, shown.fill_color);
    }
}
