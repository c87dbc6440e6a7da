//! Map wrapper: sources, layers, visibility and per-geography feature-state.
//!
//! The renderer sits behind [`MapSurface`]. Hover and selection are tracked
//! per geography so switching the visible level never disturbs the state
//! of another level.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::catalog::{source_id, Catalog};
use crate::color_scale::ColorScale;
use crate::config::RenderStrategy;
use crate::error::Result;
use crate::layers::{
    fill_layer, fill_layer_id, line_layer, line_layer_id, query_layer, source_spec, QUERY_LAYER_ID,
    SOURCE_LAYER,
};
use crate::params::{Geography, Parameter};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

/// Feature addressed by a feature-state call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureTarget {
    pub id: String,
    pub source: String,
    pub source_layer: &'static str,
}

impl FeatureTarget {
    pub fn new(geography: Geography, id: &str) -> Self {
        FeatureTarget {
            id: id.to_string(),
            source: source_id(geography),
            source_layer: SOURCE_LAYER,
        }
    }
}

/// The subset of a vector-tile renderer this crate drives.
pub trait MapSurface {
    fn add_source(&self, id: &str, spec: &Value) -> Result<()>;
    fn add_layer(&self, spec: &Value, before_id: Option<&str>) -> Result<()>;
    /// First symbol layer of the base style; data layers go beneath it.
    fn first_symbol_layer(&self) -> Option<String>;
    fn set_layer_visibility(&self, layer_id: &str, visible: bool);
    fn set_feature_state(&self, target: &FeatureTarget, state: &Value);
    /// `id` property of the topmost rendered feature of `layer_id` at `point`.
    fn feature_id_at(&self, point: ScreenPoint, layer_id: &str) -> Option<String>;
    fn zoom(&self) -> f64;
    fn set_cursor(&self, cursor: &str);
}

pub struct GeoMap<S: MapSurface> {
    surface: S,
    scale: ColorScale,
    hovered: HashMap<Geography, String>,
    selected: HashMap<Geography, String>,
    visible: Option<Geography>,
    previous_zoom: Option<f64>,
}

impl<S: MapSurface> GeoMap<S> {
    pub fn new(surface: S, scale: ColorScale) -> Self {
        GeoMap {
            surface,
            scale,
            hovered: HashMap::new(),
            selected: HashMap::new(),
            visible: None,
            previous_zoom: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Adds one vector source per geography, their fill/line layers and the click query layer.
    pub fn install(&self, catalog: &Catalog) -> Result<()> {
        for geography in Geography::all() {
            self.surface
                .add_source(&source_id(*geography), &source_spec(&catalog.tiles_url(*geography)))?;
        }

        let before = self.surface.first_symbol_layer();
        for geography in Geography::all() {
            let source = source_id(*geography);
            self.surface
                .add_layer(&fill_layer(*geography, &source, &self.scale), before.as_deref())?;
            self.surface.add_layer(
                &line_layer(*geography, &source, self.scale.strategy()),
                before.as_deref(),
            )?;
        }
        self.surface
            .add_layer(&query_layer(&source_id(Geography::BlockGroup)), before.as_deref())
    }

    pub fn visible_geography(&self) -> Option<Geography> {
        self.visible
    }

    /// Shows `geography`'s layers and hides every other level.
    pub fn switch_layer_visibility(&mut self, geography: Geography) {
        self.surface.set_layer_visibility(&fill_layer_id(geography), true);
        self.surface.set_layer_visibility(&line_layer_id(geography), true);
        for other in Geography::all().iter().filter(|g| **g != geography) {
            self.surface.set_layer_visibility(&fill_layer_id(*other), false);
            self.surface.set_layer_visibility(&line_layer_id(*other), false);
        }
        self.visible = Some(geography);
    }

    /// Block-group GEOID under the pointer, whatever level is displayed.
    pub fn feature_at(&self, point: ScreenPoint) -> Option<String> {
        self.surface.feature_id_at(point, QUERY_LAYER_ID)
    }

    /// Moves the hover highlight of `geography` to the feature under `point`.
    pub fn hover(&mut self, geography: Geography, point: ScreenPoint) -> Option<String> {
        let Some(id) = self.surface.feature_id_at(point, &fill_layer_id(geography)) else {
            self.surface.set_cursor("");
            return None;
        };
        self.surface.set_cursor("pointer");
        if let Some(previous) = self.hovered.get(&geography) {
            self.surface
                .set_feature_state(&FeatureTarget::new(geography, previous), &json!({ "hover": false }));
        }
        self.surface
            .set_feature_state(&FeatureTarget::new(geography, &id), &json!({ "hover": true }));
        self.hovered.insert(geography, id.clone());
        Some(id)
    }

    pub fn clear_hover(&mut self, geography: Geography) {
        if let Some(previous) = self.hovered.remove(&geography) {
            self.surface
                .set_feature_state(&FeatureTarget::new(geography, &previous), &json!({ "hover": false }));
        }
    }

    pub fn hovered(&self, geography: Geography) -> Option<&str> {
        self.hovered.get(&geography).map(String::as_str)
    }

    /// Outlines the queried unit; only the continuous style draws selections.
    pub fn select(&mut self, geography: Geography, id: &str) {
        if self.scale.strategy() != RenderStrategy::Continuous {
            return;
        }
        if let Some(previous) = self.selected.get(&geography) {
            self.surface
                .set_feature_state(&FeatureTarget::new(geography, previous), &json!({ "selected": false }));
        }
        self.surface
            .set_feature_state(&FeatureTarget::new(geography, id), &json!({ "selected": true }));
        self.selected.insert(geography, id.to_string());
    }

    pub fn selected(&self, geography: Geography) -> Option<&str> {
        self.selected.get(&geography).map(String::as_str)
    }

    pub fn paint(&self, geography: Geography, id: &str, count: u64) {
        self.surface.set_feature_state(
            &FeatureTarget::new(geography, id),
            &self.scale.feature_state(count, geography),
        );
    }

    /// Resets `ids` to "no data" on `geography`.
    pub fn clear<'a>(&self, geography: Geography, ids: impl IntoIterator<Item = &'a str>) {
        let cleared = self.scale.cleared_state();
        for id in ids {
            self.surface
                .set_feature_state(&FeatureTarget::new(geography, id), &cleared);
        }
    }

    /// Records `zoom` and reports whether it moved across any of `thresholds`.
    pub fn zoom_crossed(&mut self, thresholds: [f64; 2], zoom: f64) -> bool {
        let crossed = match self.previous_zoom {
            Some(previous) => thresholds
                .iter()
                .any(|t| (previous < *t && zoom >= *t) || (previous >= *t && zoom < *t)),
            None => false,
        };
        self.previous_zoom = Some(zoom);
        crossed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;
    use crate::test_support::{RecordingSurface, SurfaceCall};
    use pretty_assertions::assert_eq;

    fn map(strategy: RenderStrategy) -> GeoMap<RecordingSurface> {
        GeoMap::new(RecordingSurface::default(), ColorScale::new(strategy))
    }

    #[test]
    fn install_adds_sources_then_layers_under_symbols() {
        let map = map(RenderStrategy::Discrete);
        map.surface().set_first_symbol("place_label");
        map.install(&Catalog::new(&MapConfig::default())).unwrap();
        let calls = map.surface().take();

        let sources: Vec<_> = calls
            .iter()
            .filter_map(|c| match c {
                SurfaceCall::AddSource(id, _) => Some(id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            sources,
            vec!["protomap-block_group", "protomap-tract", "protomap-supertract", "protomap-county"]
        );

        let layers: Vec<_> = calls
            .iter()
            .filter_map(|c| match c {
                SurfaceCall::AddLayer(id, before) => Some((id.as_str(), before.as_deref())),
                _ => None,
            })
            .collect();
        assert_eq!(layers.len(), 9);
        assert!(layers.iter().all(|(_, before)| *before == Some("place_label")));
        assert_eq!(layers.last().unwrap().0, QUERY_LAYER_ID);
    }

    #[test]
    fn switching_geography_hides_the_others() {
        let mut map = map(RenderStrategy::Discrete);
        map.switch_layer_visibility(Geography::Tract);
        map.surface().take();
        map.switch_layer_visibility(Geography::County);
        let calls = map.surface().take();
        assert!(calls.contains(&SurfaceCall::Visibility("geo_fill_county".into(), true)));
        assert!(calls.contains(&SurfaceCall::Visibility("geo_line_county".into(), true)));
        assert!(calls.contains(&SurfaceCall::Visibility("geo_fill_tract".into(), false)));
        assert!(calls.contains(&SurfaceCall::Visibility("geo_line_tract".into(), false)));
        // Visibility toggles only, never feature-state
        assert!(calls.iter().all(|c| matches!(c, SurfaceCall::Visibility(..))));
        assert_eq!(map.visible_geography(), Some(Geography::County));
    }

    #[test]
    fn hover_is_tracked_per_geography() {
        let mut map = map(RenderStrategy::Discrete);
        let p = ScreenPoint { x: 1.0, y: 2.0 };
        map.surface().put_feature("geo_fill_tract", "36061000100");
        assert_eq!(map.hover(Geography::Tract, p).as_deref(), Some("36061000100"));
        map.surface().put_feature("geo_fill_tract", "36061000200");
        map.hover(Geography::Tract, p);
        let calls = map.surface().take();
        assert!(calls.contains(&SurfaceCall::State(
            FeatureTarget::new(Geography::Tract, "36061000100"),
            json!({"hover": false})
        )));
        assert_eq!(map.hovered(Geography::Tract), Some("36061000200"));
        assert_eq!(map.hovered(Geography::County), None);

        map.clear_hover(Geography::County);
        assert!(map.surface().take().is_empty());
        map.clear_hover(Geography::Tract);
        assert_eq!(map.hovered(Geography::Tract), None);
    }

    #[test]
    fn hover_over_nothing_resets_cursor() {
        let mut map = map(RenderStrategy::Discrete);
        assert_eq!(map.hover(Geography::Tract, ScreenPoint { x: 0.0, y: 0.0 }), None);
        assert_eq!(map.surface().take(), vec![SurfaceCall::Cursor(String::new())]);
    }

    #[test]
    fn selection_outline_only_when_continuous() {
        let mut discrete = map(RenderStrategy::Discrete);
        discrete.select(Geography::Tract, "36061000100");
        assert!(discrete.surface().take().is_empty());

        let mut continuous = map(RenderStrategy::Continuous);
        continuous.select(Geography::Tract, "36061000100");
        continuous.select(Geography::Tract, "36061000200");
        let calls = continuous.surface().take();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[1],
            SurfaceCall::State(FeatureTarget::new(Geography::Tract, "36061000100"), json!({"selected": false}))
        );
    }

    #[test]
    fn clear_overwrites_instead_of_removing() {
        let map = map(RenderStrategy::Discrete);
        map.clear(Geography::Tract, ["a", "b"]);
        assert_eq!(
            map.surface().take(),
            vec![
                SurfaceCall::State(FeatureTarget::new(Geography::Tract, "a"), json!({"geoColor": "none"})),
                SurfaceCall::State(FeatureTarget::new(Geography::Tract, "b"), json!({"geoColor": "none"})),
            ]
        );
    }

    #[test]
    fn zoom_threshold_crossing() {
        let mut map = map(RenderStrategy::Discrete);
        let t = [6.0, 8.0];
        assert!(!map.zoom_crossed(t, 10.0));
        assert!(!map.zoom_crossed(t, 9.0));
        assert!(map.zoom_crossed(t, 7.5));
        assert!(!map.zoom_crossed(t, 7.0));
        assert!(map.zoom_crossed(t, 5.0));
        assert!(map.zoom_crossed(t, 8.0));
    }
}
