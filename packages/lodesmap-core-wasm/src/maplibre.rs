//! Bindings to the page's `maplibregl` and `pmtiles` globals.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::console_warn;
use crate::error::{LodesError, Result};
use crate::map_view::{FeatureTarget, MapSurface, ScreenPoint};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = maplibregl, js_name = Map)]
    pub type MaplibreMap;

    #[wasm_bindgen(constructor, js_namespace = maplibregl, js_class = "Map", catch)]
    pub fn new(options: &JsValue) -> std::result::Result<MaplibreMap, JsValue>;

    #[wasm_bindgen(method, catch, js_name = addSource)]
    fn add_source(this: &MaplibreMap, id: &str, source: &JsValue) -> std::result::Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = addLayer)]
    fn add_layer(this: &MaplibreMap, layer: &JsValue, before_id: &JsValue) -> std::result::Result<(), JsValue>;

    #[wasm_bindgen(method, js_name = getStyle)]
    fn get_style(this: &MaplibreMap) -> JsValue;

    #[wasm_bindgen(method, catch, js_name = setLayoutProperty)]
    fn set_layout_property(
        this: &MaplibreMap,
        layer: &str,
        name: &str,
        value: &JsValue,
    ) -> std::result::Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = setFeatureState)]
    fn set_feature_state(this: &MaplibreMap, target: &JsValue, state: &JsValue) -> std::result::Result<(), JsValue>;

    #[wasm_bindgen(method, js_name = queryRenderedFeatures)]
    fn query_rendered_features(this: &MaplibreMap, point: &JsValue, options: &JsValue) -> js_sys::Array;

    #[wasm_bindgen(method, js_name = getZoom)]
    pub fn get_zoom(this: &MaplibreMap) -> f64;

    #[wasm_bindgen(method, js_name = getCanvas)]
    fn get_canvas(this: &MaplibreMap) -> web_sys::HtmlElement;

    #[wasm_bindgen(method, js_name = getContainer)]
    pub fn get_container(this: &MaplibreMap) -> web_sys::HtmlElement;

    #[wasm_bindgen(method)]
    pub fn on(this: &MaplibreMap, event: &str, listener: &js_sys::Function);

    #[wasm_bindgen(js_namespace = maplibregl, js_name = addProtocol)]
    fn add_protocol(name: &str, handler: &JsValue);

    #[wasm_bindgen(js_namespace = pmtiles, js_name = Protocol)]
    type PmtilesProtocol;

    #[wasm_bindgen(constructor, js_namespace = pmtiles, js_class = "Protocol")]
    fn new() -> PmtilesProtocol;

    #[wasm_bindgen(method, getter)]
    fn tile(this: &PmtilesProtocol) -> JsValue;
}

/// Lets `pmtiles://` URLs resolve through the pmtiles range reader.
pub fn register_pmtiles_protocol() {
    let protocol = PmtilesProtocol::new();
    add_protocol("pmtiles", &protocol.tile());
}

#[derive(Deserialize)]
struct StyleLayer {
    id: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct StyleSummary {
    #[serde(default)]
    layers: Vec<StyleLayer>,
}

/// Plain JS objects rather than `Map`s, as MapLibre expects.
fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| LodesError::Map(e.to_string()))
}

/// Screen position carried by a MapLibre mouse event.
pub fn event_point(event: &JsValue) -> Option<ScreenPoint> {
    let point = js_sys::Reflect::get(event, &"point".into()).ok()?;
    let x = js_sys::Reflect::get(&point, &"x".into()).ok()?.as_f64()?;
    let y = js_sys::Reflect::get(&point, &"y".into()).ok()?.as_f64()?;
    Some(ScreenPoint { x, y })
}

/// GEOID of a rendered feature. Numeric ids are ignored: they drop the
/// leading zero of states 01 to 09.
fn feature_id(feature: &JsValue) -> Option<String> {
    let id = js_sys::Reflect::get(feature, &"id".into()).ok()?;
    id.as_string().or_else(|| {
        let properties = js_sys::Reflect::get(feature, &"properties".into()).ok()?;
        js_sys::Reflect::get(&properties, &"id".into()).ok()?.as_string()
    })
}

pub struct MaplibreSurface {
    map: MaplibreMap,
}

impl MaplibreSurface {
    pub fn new(map: MaplibreMap) -> Self {
        MaplibreSurface { map }
    }
}

impl MapSurface for MaplibreSurface {
    fn add_source(&self, id: &str, spec: &Value) -> Result<()> {
        self.map.add_source(id, &to_js(spec)?)?;
        Ok(())
    }

    fn add_layer(&self, spec: &Value, before_id: Option<&str>) -> Result<()> {
        let before = before_id.map(JsValue::from_str).unwrap_or(JsValue::UNDEFINED);
        self.map.add_layer(&to_js(spec)?, &before)?;
        Ok(())
    }

    fn first_symbol_layer(&self) -> Option<String> {
        let style: StyleSummary = serde_wasm_bindgen::from_value(self.map.get_style()).ok()?;
        style
            .layers
            .into_iter()
            .find(|layer| layer.kind == "symbol")
            .map(|layer| layer.id)
    }

    fn set_layer_visibility(&self, layer_id: &str, visible: bool) {
        let value = JsValue::from_str(if visible { "visible" } else { "none" });
        if let Err(err) = self.map.set_layout_property(layer_id, "visibility", &value) {
            console_warn!("{}: {}", layer_id, LodesError::from(err));
        }
    }

    fn set_feature_state(&self, target: &FeatureTarget, state: &Value) {
        let result = to_js(target).and_then(|t| {
            self.map.set_feature_state(&t, &to_js(state)?)?;
            Ok(())
        });
        if let Err(err) = result {
            console_warn!("feature state for {}: {}", target.id, err);
        }
    }

    fn feature_id_at(&self, point: ScreenPoint, layer_id: &str) -> Option<String> {
        let point = to_js(&[point.x, point.y]).ok()?;
        let options = to_js(&serde_json::json!({ "layers": [layer_id] })).ok()?;
        let features = self.map.query_rendered_features(&point, &options);
        feature_id(&features.get(0))
    }

    fn zoom(&self) -> f64 {
        self.map.get_zoom()
    }

    fn set_cursor(&self, cursor: &str) {
        if let Err(err) = self.map.get_canvas().style().set_property("cursor", cursor) {
            console_warn!("cursor: {}", LodesError::from(err));
        }
    }
}

/// Wraps a handler so it can be passed to `MaplibreMap::on`; the closure is leaked.
pub fn listener(handler: impl FnMut(JsValue) + 'static) -> js_sys::Function {
    let closure = Closure::<dyn FnMut(JsValue)>::new(handler);
    let function = closure.as_ref().unchecked_ref::<js_sys::Function>().clone();
    closure.forget();
    function
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    fn feature(json: &str) -> JsValue {
        js_sys::JSON::parse(json).unwrap()
    }

    #[wasm_bindgen_test]
    fn string_ids_keep_leading_zeros() {
        assert_eq!(
            feature_id(&feature(r#"{"id":"010010201001"}"#)).as_deref(),
            Some("010010201001")
        );
    }

    #[wasm_bindgen_test]
    fn numeric_ids_fall_back_to_the_id_property() {
        let f = feature(r#"{"id":10010201001,"properties":{"id":"010010201001"}}"#);
        assert_eq!(feature_id(&f).as_deref(), Some("010010201001"));
        assert_eq!(feature_id(&feature(r#"{"id":10010201001}"#)), None);
    }
}
