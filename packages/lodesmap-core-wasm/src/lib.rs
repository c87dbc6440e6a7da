use wasm_bindgen::prelude::*;
use serde_wasm_bindgen::to_value;

// Create a console module for logging
pub mod console;
// Error taxonomy shared by every module
pub mod error;
// Map configuration passed in from JS
pub mod config;
// Control enumerations and validators
pub mod params;
// Query-string state
pub mod url_state;
// Current selection and how it was triggered
pub mod selection;
// Dataset and tile URLs
pub mod catalog;
// Buckets, legend and dropdown models
pub mod color_scale;
// Progress bar state machine
pub mod spinner;
// MapLibre style fragments
pub mod layers;
// Map wrapper over a rendering surface
pub mod map_view;
// Byte-range reads
pub mod range_source;
// Cached Parquet footers
pub mod metadata_cache;
// Global module state
mod module_state;
// Row-group pruning and decoding
pub mod row_groups;
pub mod flow_reader;
// Aggregated query results
pub mod result_set;
// Query execution
pub mod processor;
pub mod query_gate;
// Event orchestration
pub mod app;

// Browser glue
#[cfg(target_arch = "wasm32")]
pub mod http;
#[cfg(target_arch = "wasm32")]
pub mod maplibre;
#[cfg(target_arch = "wasm32")]
pub mod dom;

#[cfg(test)]
mod test_support;

use module_state::ModuleState;

// Enable better panic messages in console during development
#[cfg(feature = "console_error_panic_hook")]
pub use console_error_panic_hook::set_once as set_panic_hook;

#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => ($crate::console::log(&format!($($t)*)))
}

#[macro_export]
macro_rules! console_warn {
    ($($t:tt)*) => ($crate::console::warn(&format!($($t)*)))
}

use std::sync::Once;
static INIT: Once = Once::new();

// This sets up the wasm_bindgen start functionality
#[wasm_bindgen(start)]
pub fn start() {
    INIT.call_once(|| {
        // Set the panic hook for better error messages
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        // Touch the module state so the shared cache exists before the first map
        let stats = ModuleState::with(|state| state.stats());
        console_log!(
            "LODES map module initialized ({} cached files)",
            stats.cache.metadata
        );
    });
}

/// Metadata cache and query counters, as a plain JS object.
#[wasm_bindgen]
pub fn get_cache_stats() -> Result<JsValue, JsValue> {
    let stats = ModuleState::with(|state| state.stats());
    Ok(to_value(&stats)?)
}

#[wasm_bindgen]
pub fn clear_caches() -> bool {
    ModuleState::with_mut(|state| state.clear_all_caches());
    true
}

#[cfg(target_arch = "wasm32")]
pub use browser::LodesMap;

#[cfg(target_arch = "wasm32")]
mod browser {
    use std::cell::RefCell;
    use std::rc::{Rc, Weak};

    use serde::Serialize;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::spawn_local;

    use crate::app::LodesMapApp;
    use crate::color_scale::{Dropdown, Legend};
    use crate::config::MapConfig;
    use crate::dom::{self, BrowserUrl, DomPanel, DomSpinner};
    use crate::http::FetchRangeSource;
    use crate::layers::map_options;
    use crate::maplibre::{event_point, listener, register_pmtiles_protocol, MaplibreMap, MaplibreSurface};
    use crate::module_state::ModuleState;
    use crate::params::Parameter;
    use crate::selection::{Control, Selection};
    use crate::{console_log, console_warn};

    type BrowserApp = LodesMapApp<MaplibreSurface, FetchRangeSource, BrowserUrl, DomSpinner, DomPanel>;

    /// Filled in once the app exists; callbacks created earlier read it.
    type AppSlot = Rc<RefCell<Weak<BrowserApp>>>;

    fn upgrade(slot: &AppSlot) -> Option<Rc<BrowserApp>> {
        slot.borrow().upgrade()
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct SelectionView<'a> {
        mode: &'static str,
        job_segment: &'static str,
        geography: &'static str,
        year: &'static str,
        id: Option<&'a str>,
    }

    /// A LODES flow map bound to the page.
    #[wasm_bindgen]
    pub struct LodesMap {
        app: Rc<BrowserApp>,
    }

    #[wasm_bindgen]
    impl LodesMap {
        /// Creates the map in `config.container` and wires every event.
        #[wasm_bindgen(constructor)]
        pub fn new(config: JsValue) -> Result<LodesMap, JsValue> {
            crate::start();
            let config: MapConfig = if config.is_undefined() || config.is_null() {
                MapConfig::default()
            } else {
                serde_wasm_bindgen::from_value(config)?
            };

            register_pmtiles_protocol();
            let options = map_options(&config)
                .serialize(&serde_wasm_bindgen::Serializer::json_compatible())?;
            let map = MaplibreMap::new(&options)?;

            let document = dom::document()?;
            let initial = Selection::from_defaults(&config.defaults);
            let dropdowns: Vec<Dropdown> = Control::ALL
                .into_iter()
                .map(|c| Dropdown::for_control(c, initial.control_value(c)))
                .collect();
            let panel = DomPanel::build(&document, &map.get_container(), &Legend::new(initial.geography), &dropdowns)?;

            let slot: AppSlot = Rc::new(RefCell::new(Weak::new()));
            let flush_slot = Rc::clone(&slot);
            let transition_slot = Rc::clone(&slot);
            let spinner = DomSpinner::new(
                &document,
                move |ticket| {
                    if let Some(app) = upgrade(&flush_slot) {
                        app.on_spinner_flush(ticket);
                    }
                },
                move |property| {
                    if let Some(app) = upgrade(&transition_slot) {
                        app.on_spinner_transition_end(&property);
                    }
                },
            )?;

            let app = Rc::new(LodesMapApp::new(
                config,
                MaplibreSurface::new(map.clone()),
                FetchRangeSource::new(),
                BrowserUrl,
                spinner,
                panel,
                ModuleState::metadata_cache(),
            ));
            *slot.borrow_mut() = Rc::downgrade(&app);

            bind_events(&map, &slot)?;
            console_log!("LODES map created in #{}", app.config().container);
            Ok(LodesMap { app })
        }

        pub fn is_querying(&self) -> bool {
            self.app.is_querying()
        }

        /// Current selection as `{ mode, jobSegment, geography, year, id }`.
        pub fn selection(&self) -> Result<JsValue, JsValue> {
            let selection = self.app.selection();
            let view = SelectionView {
                mode: selection.origin.as_str(),
                job_segment: selection.job_segment.as_str(),
                geography: selection.geography.as_str(),
                year: selection.year.as_str(),
                id: selection.id.as_deref(),
            };
            Ok(serde_wasm_bindgen::to_value(&view)?)
        }

        /// Sets a control programmatically, as if its dropdown changed.
        pub fn set_control(&self, element_id: &str, value: String) -> Result<(), JsValue> {
            let control = Control::from_element_id(element_id)
                .ok_or_else(|| JsValue::from_str(&format!("unknown control {}", element_id)))?;
            let app = Rc::clone(&self.app);
            spawn_local(async move { app.on_control_change(control, &value).await });
            Ok(())
        }
    }

    fn bind_events(map: &MaplibreMap, slot: &AppSlot) -> Result<(), JsValue> {
        let s = Rc::clone(slot);
        map.on(
            "load",
            &listener(move |_| {
                let Some(app) = upgrade(&s) else { return };
                if let Err(err) = app.install_layers() {
                    console_warn!("Could not add map layers: {}", err);
                    return;
                }
                spawn_local(async move { app.on_load().await });
            }),
        );

        let s = Rc::clone(slot);
        map.on(
            "mousemove",
            &listener(move |event| {
                if let (Some(app), Some(point)) = (upgrade(&s), event_point(&event)) {
                    app.on_mouse_move(point);
                }
            }),
        );

        let s = Rc::clone(slot);
        map.on(
            "mouseout",
            &listener(move |_| {
                if let Some(app) = upgrade(&s) {
                    app.on_mouse_leave();
                }
            }),
        );

        let s = Rc::clone(slot);
        map.on(
            "click",
            &listener(move |event| {
                if let (Some(app), Some(point)) = (upgrade(&s), event_point(&event)) {
                    spawn_local(async move { app.on_click(point).await });
                }
            }),
        );

        let s = Rc::clone(slot);
        map.on(
            "zoomend",
            &listener(move |_| {
                if let Some(app) = upgrade(&s) {
                    app.on_zoom_end();
                }
            }),
        );

        let s = Rc::clone(slot);
        map.on(
            "moveend",
            &listener(move |_| {
                if let Some(app) = upgrade(&s) {
                    app.on_move_end();
                }
            }),
        );

        let Some(app) = upgrade(slot) else {
            return Ok(());
        };
        let s = Rc::clone(slot);
        app.panel().on_control_change(move |control, value| {
            if let Some(app) = upgrade(&s) {
                spawn_local(async move { app.on_control_change(control, &value).await });
            }
        })?;
        let s = Rc::clone(slot);
        app.panel().on_toggle(move || {
            if let Some(app) = upgrade(&s) {
                app.toggle_legend();
            }
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_is_idempotent() {
        start();
        start();
        assert!(INIT.is_completed());
    }
}
