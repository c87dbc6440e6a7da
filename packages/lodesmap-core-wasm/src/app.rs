//! Event handling for one map page.
//!
//! `LodesMapApp` owns the selection and every piece of UI state, and reacts
//! to browser events forwarded by the wasm handle. All methods take `&self`;
//! interior borrows are short and never held across an await, so handlers
//! may interleave while a query is in flight.

use std::cell::RefCell;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::color_scale::{ColorScale, Legend};
use crate::config::MapConfig;
use crate::error::Result;
use crate::map_view::{GeoMap, MapSurface, ScreenPoint};
use crate::metadata_cache::MetadataCache;
use crate::module_state::ModuleState;
use crate::params::{Geography, Parameter};
use crate::processor::{QueryProcessor, QuerySink};
use crate::query_gate::{GateDecision, QueryGate};
use crate::range_source::RangeSource;
use crate::selection::{Control, QueryTrigger, Selection, SelectionEvent, ID_PARAM};
use crate::spinner::{Spinner, SpinnerView};
use crate::url_state::{read_query, refresh_url, set_url_param, UrlSink};
use crate::{console_log, console_warn};

/// Control panel widgets outside the map canvas.
pub trait PanelView {
    fn sync_control(&self, control: Control, value: &str);
    fn render_legend(&self, legend: &Legend);
    fn show_info(&self, text: &str);
    fn hide_info(&self);
}

pub struct LodesMapApp<S, R, U, V, P>
where
    S: MapSurface,
    R: RangeSource,
    U: UrlSink,
    V: SpinnerView,
    P: PanelView,
{
    config: MapConfig,
    catalog: Catalog,
    selection: RefCell<Selection>,
    map: RefCell<GeoMap<S>>,
    legend: RefCell<Legend>,
    spinner: RefCell<Spinner<V>>,
    gate: RefCell<QueryGate>,
    processor: QueryProcessor<R>,
    url: U,
    panel: P,
}

impl<S, R, U, V, P> LodesMapApp<S, R, U, V, P>
where
    S: MapSurface,
    R: RangeSource,
    U: UrlSink,
    V: SpinnerView,
    P: PanelView,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: MapConfig,
        surface: S,
        source: R,
        url: U,
        spinner_view: V,
        panel: P,
        cache: Arc<MetadataCache>,
    ) -> Self {
        let catalog = Catalog::new(&config);
        let selection = Selection::from_defaults(&config.defaults);
        let spinner = Spinner::new(
            spinner_view,
            config.min_progress,
            config.progress_debounce_ms,
            config.spinner_reveal_ms,
        );
        LodesMapApp {
            map: RefCell::new(GeoMap::new(surface, ColorScale::new(config.render_strategy))),
            legend: RefCell::new(Legend::new(selection.geography)),
            processor: QueryProcessor::new(source, catalog.clone(), cache),
            selection: RefCell::new(selection),
            spinner: RefCell::new(spinner),
            gate: RefCell::new(QueryGate::default()),
            catalog,
            config,
            url,
            panel,
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn selection(&self) -> Selection {
        self.selection.borrow().clone()
    }

    pub fn processor(&self) -> &QueryProcessor<R> {
        &self.processor
    }

    pub fn url(&self) -> &U {
        &self.url
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn with_map<T>(&self, f: impl FnOnce(&GeoMap<S>) -> T) -> T {
        f(&self.map.borrow())
    }

    pub fn with_spinner<T>(&self, f: impl FnOnce(&Spinner<V>) -> T) -> T {
        f(&self.spinner.borrow())
    }

    pub fn is_querying(&self) -> bool {
        self.gate.borrow().is_running()
    }

    /// Adds sources and layers once the base style has loaded.
    pub fn install_layers(&self) -> Result<()> {
        self.map.borrow().install(&self.catalog)
    }

    /// Applies the page's query string and runs the query it describes.
    pub async fn on_load(&self) {
        let query = read_query(&self.url);
        let (selection, rejected) = Selection::from_query(&query, &self.config.defaults);
        for err in &rejected {
            console_warn!("{}", err);
        }
        *self.selection.borrow_mut() = selection.clone();

        for control in Control::ALL {
            self.sync_control(control, selection.control_value(control));
        }
        self.show_geography(selection.geography);
        set_url_param(&self.url, Control::Origin.url_param(), selection.origin.as_str());
        set_url_param(&self.url, Control::Geography.url_param(), selection.geography.as_str());
        console_log!(
            "Loaded selection: {} {} {} {}",
            selection.origin.as_str(),
            selection.job_segment.as_str(),
            selection.geography.as_str(),
            selection.id.as_deref().unwrap_or("(no id)")
        );

        if selection.id.is_some() {
            self.request_query(SelectionEvent::new(QueryTrigger::Load, selection))
                .await;
        }
    }

    /// A dropdown changed. Invalid values are warned about and reverted.
    pub async fn on_control_change(&self, control: Control, value: &str) {
        let current = self.selection();
        let next = match current.with_control(control, value) {
            Ok(next) => next,
            Err(err) => {
                console_warn!("{}", err);
                self.sync_control(control, current.control_value(control));
                return;
            }
        };
        *self.selection.borrow_mut() = next.clone();
        set_url_param(&self.url, control.url_param(), next.control_value(control));
        self.sync_control(control, next.control_value(control));

        if control == Control::Geography {
            self.show_geography(next.geography);
        }

        if next.id.is_some() {
            self.request_query(SelectionEvent::new(QueryTrigger::Control(control), next))
                .await;
        }
    }

    /// Queries the unit under the pointer. Ignored while a query runs.
    pub async fn on_click(&self, point: ScreenPoint) {
        if self.is_querying() {
            console_log!("Query in progress, click ignored");
            return;
        }
        let Some(feature_id) = self.map.borrow().feature_at(point) else {
            return;
        };
        let next = match self.selection().with_id(&feature_id) {
            Ok(next) => next,
            Err(err) => {
                console_warn!("{}", err);
                return;
            }
        };
        *self.selection.borrow_mut() = next.clone();
        set_url_param(&self.url, ID_PARAM, &feature_id);
        self.request_query(SelectionEvent::new(QueryTrigger::Click, next))
            .await;
    }

    pub fn on_mouse_move(&self, point: ScreenPoint) {
        let geography = self.selection.borrow().geography;
        let hovered = self.map.borrow_mut().hover(geography, point);
        match hovered {
            Some(id) => self
                .panel
                .show_info(&format!("{} ID: {}", geography.title(), id)),
            None => self.panel.hide_info(),
        }
    }

    pub fn on_mouse_leave(&self) {
        let geography = self.selection.borrow().geography;
        self.map.borrow_mut().clear_hover(geography);
        self.panel.hide_info();
    }

    /// Repaints the live results when the zoom crosses an origin threshold.
    pub fn on_zoom_end(&self) {
        let selection = self.selection();
        let mut map = self.map.borrow_mut();
        let zoom = map.surface().zoom();
        let crossed = map.zoom_crossed(selection.origin.zoom_thresholds(), zoom);
        drop(map);
        if !crossed || self.is_querying() {
            return;
        }
        let geography = selection.geography;
        let live = self.processor.live_results(geography);
        {
            let map = self.map.borrow();
            for entry in live.iter() {
                map.paint(geography, &entry.id, entry.count);
            }
        }
        self.legend.borrow_mut().update_labels(geography);
        self.panel.render_legend(&self.legend.borrow());
    }

    pub fn on_move_end(&self) {
        refresh_url(&self.url);
    }

    pub fn on_spinner_flush(&self, ticket: u64) {
        self.spinner.borrow_mut().flush(ticket);
    }

    pub fn on_spinner_transition_end(&self, property: &str) {
        self.spinner.borrow_mut().on_transition_end(property);
    }

    /// Collapses or expands the legend; returns the new collapsed state.
    pub fn toggle_legend(&self) -> bool {
        let collapsed = self.legend.borrow_mut().toggle();
        self.panel.render_legend(&self.legend.borrow());
        collapsed
    }

    fn sync_control(&self, control: Control, value: &str) {
        self.panel.sync_control(control, value);
    }

    fn show_geography(&self, geography: Geography) {
        self.map.borrow_mut().switch_layer_visibility(geography);
        self.legend.borrow_mut().update_labels(geography);
        self.panel.render_legend(&self.legend.borrow());
    }

    async fn request_query(&self, event: SelectionEvent) {
        let decision = self.gate.borrow_mut().request(&event);
        match decision {
            GateDecision::Run => self.drive(event).await,
            GateDecision::Deferred => console_log!("Query deferred until the current one finishes"),
            GateDecision::Dropped => console_log!("Query in progress, request dropped"),
        }
    }

    /// Runs `event`, then whatever was deferred while it ran.
    async fn drive(&self, mut event: SelectionEvent) {
        loop {
            self.execute(&event).await;
            let next = self.gate.borrow_mut().finish();
            match next {
                Some(pending) => event = pending,
                None => break,
            }
        }
    }

    async fn execute(&self, event: &SelectionEvent) {
        let selection = &event.selection;
        self.spinner.borrow_mut().show();
        if let Some(id) = selection.query_id() {
            self.map.borrow_mut().select(selection.geography, id);
        }
        let result = self.processor.run_query(self, selection).await;
        self.spinner.borrow_mut().hide();
        ModuleState::record_query(result.is_ok());
        if let Err(err) = result {
            console_warn!("Query after {:?} failed: {}", event.trigger, err);
        }
    }
}

impl<S, R, U, V, P> QuerySink for LodesMapApp<S, R, U, V, P>
where
    S: MapSurface,
    R: RangeSource,
    U: UrlSink,
    V: SpinnerView,
    P: PanelView,
{
    fn paint(&self, geography: Geography, id: &str, count: u64) {
        self.map.borrow().paint(geography, id, count);
    }

    fn clear(&self, geography: Geography, ids: &[String]) {
        self.map
            .borrow()
            .clear(geography, ids.iter().map(String::as_str));
    }

    fn progress(&self, percentage: f64) {
        self.spinner.borrow_mut().update_progress(percentage);
    }
}
