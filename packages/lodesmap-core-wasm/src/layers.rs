// MapLibre style fragments for the per-geography sources and layers.
use serde_json::{json, Value};

use crate::color_scale::ColorScale;
use crate::config::{MapConfig, RenderStrategy};
use crate::params::{Geography, Parameter};

/// Layer name inside every tile archive.
pub const SOURCE_LAYER: &str = "geometry";
/// Invisible block-group fill used to identify clicks at any zoom.
pub const QUERY_LAYER_ID: &str = "geo_fill_query";

pub fn fill_layer_id(geography: Geography) -> String {
    format!("geo_fill_{}", geography.as_str())
}

pub fn line_layer_id(geography: Geography) -> String {
    format!("geo_line_{}", geography.as_str())
}

pub fn source_spec(tiles_url: &str) -> Value {
    json!({
        "type": "vector",
        "url": tiles_url,
        "promoteId": "id",
    })
}

fn polygon_filter() -> Value {
    json!(["==", ["geometry-type"], "Polygon"])
}

pub fn fill_layer(geography: Geography, source: &str, scale: &ColorScale) -> Value {
    json!({
        "id": fill_layer_id(geography),
        "type": "fill",
        "source": source,
        "source-layer": SOURCE_LAYER,
        "filter": polygon_filter(),
        "layout": { "visibility": "none" },
        "paint": { "fill-color": scale.fill_color(geography) },
    })
}

pub fn line_layer(geography: Geography, source: &str, strategy: RenderStrategy) -> Value {
    let paint = match strategy {
        RenderStrategy::Discrete => json!({
            "line-color": "#333",
            "line-opacity": ["case", ["boolean", ["feature-state", "hover"], false], 0.5, 0.0],
            "line-width": ["case", ["boolean", ["feature-state", "hover"], false], 5, 1],
        }),
        RenderStrategy::Continuous => json!({
            "line-color": "#333",
            "line-opacity": [
                "case",
                ["boolean", ["feature-state", "hover"], false], 0.5,
                ["boolean", ["feature-state", "selected"], false], 1.0,
                0.0
            ],
            "line-width": [
                "case",
                ["boolean", ["feature-state", "hover"], false], 5,
                ["boolean", ["feature-state", "selected"], false], 3,
                1
            ],
        }),
    };
    json!({
        "id": line_layer_id(geography),
        "type": "line",
        "source": source,
        "source-layer": SOURCE_LAYER,
        "filter": polygon_filter(),
        "layout": { "visibility": "none" },
        "paint": paint,
    })
}

pub fn query_layer(block_group_source: &str) -> Value {
    json!({
        "id": QUERY_LAYER_ID,
        "type": "fill",
        "source": block_group_source,
        "source-layer": SOURCE_LAYER,
        "filter": polygon_filter(),
        "paint": { "fill-opacity": 0 },
    })
}

/// Options for the `maplibregl.Map` constructor.
pub fn map_options(config: &MapConfig) -> Value {
    json!({
        "container": config.container,
        "style": config.style_url,
        "center": config.center,
        "zoom": config.zoom,
        "minZoom": config.zoom_limits[0],
        "maxZoom": config.zoom_limits[1],
        "maxBounds": config.max_bounds,
        "doubleClickZoom": false,
        "pitchWithRotate": false,
        "hash": true,
    })
}
