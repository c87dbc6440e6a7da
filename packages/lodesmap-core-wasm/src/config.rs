// Configuration handed over from JavaScript when the map is created.
use serde::{Deserialize, Serialize};

use crate::params::{Geography, JobSegment, Origin, Year};

pub const LODES_BASE_URL: &str = "https://data.lodesmap.com/lodes";
pub const TILES_BASE_URL: &str = "https://data.lodesmap.com/tiles";
// All LODES v8 years are drawn on 2023 TIGER/Line shapes
pub const TILES_YEAR: &str = "2023";
pub const STYLE_URL: &str = "https://tiles.openfreemap.org/styles/positron";

/// How query results are turned into fill colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStrategy {
    /// Five labelled buckets stored as `geoColor` feature-state.
    Discrete,
    /// Raw `count` feature-state, color interpolated by the style, plus a selection outline.
    Continuous,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectionDefaults {
    pub origin: Origin,
    pub job_segment: JobSegment,
    pub year: Year,
    pub geography: Geography,
}

impl Default for SelectionDefaults {
    fn default() -> Self {
        SelectionDefaults {
            origin: Origin::Home,
            job_segment: JobSegment::S000,
            year: Year::Y2022,
            geography: Geography::Tract,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapConfig {
    pub lodes_base_url: String,
    pub tiles_base_url: String,
    pub tiles_year: String,
    pub style_url: String,
    /// DOM id of the map container.
    pub container: String,
    pub center: [f64; 2],
    pub zoom: f64,
    pub zoom_limits: [f64; 2],
    pub max_bounds: [[f64; 2]; 2],
    pub render_strategy: RenderStrategy,
    /// When set, each origin has its own file under an `origin=` path segment.
    pub split_by_origin: bool,
    pub progress_debounce_ms: i32,
    /// Delay before the freshly shown spinner jumps to `min_progress`.
    pub spinner_reveal_ms: i32,
    /// Smallest visible spinner width, in percent.
    pub min_progress: f64,
    pub defaults: SelectionDefaults,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            lodes_base_url: LODES_BASE_URL.to_string(),
            tiles_base_url: TILES_BASE_URL.to_string(),
            tiles_year: TILES_YEAR.to_string(),
            style_url: STYLE_URL.to_string(),
            container: "map".to_string(),
            center: [-74.0, 40.75],
            zoom: 10.0,
            zoom_limits: [2.0, 14.0],
            max_bounds: [[-175.0, -9.0], [-20.0, 72.1]],
            render_strategy: RenderStrategy::Discrete,
            split_by_origin: false,
            progress_debounce_ms: 50,
            spinner_reveal_ms: 100,
            min_progress: 10.0,
            defaults: SelectionDefaults::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: MapConfig = serde_json::from_str(
            r#"{"renderStrategy": "continuous", "defaults": {"geography": "county"}}"#,
        )
        .unwrap();
        assert_eq!(config.render_strategy, RenderStrategy::Continuous);
        assert_eq!(config.defaults.geography, Geography::County);
        assert_eq!(config.defaults.origin, Origin::Home);
        assert_eq!(config.lodes_base_url, LODES_BASE_URL);
        assert_eq!(config.zoom_limits, [2.0, 14.0]);
    }

    #[test]
    fn empty_object_is_the_default_config() {
        let config: MapConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, MapConfig::default());
    }
}
