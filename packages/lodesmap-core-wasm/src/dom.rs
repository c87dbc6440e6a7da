//! DOM widgets: control dropdowns, legend, ID display, progress spinner and
//! the page location.

use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Event, HtmlElement, HtmlLabelElement, HtmlOptionElement, HtmlSelectElement,
    TransitionEvent,
};

use crate::app::PanelView;
use crate::color_scale::{Dropdown, Legend};
use crate::console_warn;
use crate::error::{LodesError, Result};
use crate::selection::Control;
use crate::spinner::SpinnerView;
use crate::url_state::UrlSink;

fn create<T: JsCast>(document: &Document, tag: &str) -> Result<T> {
    document
        .create_element(tag)?
        .dyn_into::<T>()
        .map_err(|_| LodesError::Map(format!("<{}> has an unexpected element type", tag)))
}

fn warn_on_err(what: &str, result: std::result::Result<(), JsValue>) {
    if let Err(err) = result {
        console_warn!("{}: {}", what, LodesError::from(err));
    }
}

pub fn document() -> Result<Document> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| LodesError::Map("no document".to_string()))
}

/// Legend, dropdowns, collapse toggle and the hover ID display.
pub struct DomPanel {
    container: HtmlElement,
    labels: Vec<HtmlElement>,
    selects: Vec<(Control, HtmlSelectElement)>,
    toggle: HtmlElement,
    info: HtmlElement,
}

impl DomPanel {
    /// Builds the legend inside `host` and the ID display on `<body>`.
    pub fn build(document: &Document, host: &HtmlElement, legend: &Legend, dropdowns: &[Dropdown]) -> Result<Self> {
        let container: HtmlElement = create(document, "div")?;
        container.set_id("map-color-scale");

        let title: HtmlElement = create(document, "div")?;
        title.set_id("legend-title");
        let heading: HtmlElement = create(document, "h2")?;
        heading.set_text_content(Some(legend.title));
        title.append_child(&heading)?;
        container.append_child(&title)?;

        let mut labels = Vec::with_capacity(legend.items.len());
        for item in &legend.items {
            let row: HtmlElement = create(document, "div")?;
            let swatch: HtmlElement = create(document, "div")?;
            swatch.style().set_property("background-color", item.swatch)?;
            let text: HtmlElement = create(document, "span")?;
            text.set_text_content(Some(item.label));
            row.append_child(&swatch)?;
            row.append_child(&text)?;
            container.append_child(&row)?;
            labels.push(text);
        }

        let mut selects = Vec::with_capacity(dropdowns.len());
        for dropdown in dropdowns {
            let wrapper: HtmlElement = create(document, "div")?;
            wrapper.set_class_name("dropdown-container");
            let label: HtmlLabelElement = create(document, "label")?;
            label.set_html_for(dropdown.control.element_id());
            label.set_text_content(Some(dropdown.control.label()));
            let select: HtmlSelectElement = create(document, "select")?;
            select.set_id(dropdown.control.element_id());
            for option in &dropdown.options {
                let element: HtmlOptionElement = create(document, "option")?;
                element.set_value(option.value);
                element.set_text_content(Some(&option.text));
                element.set_selected(option.selected);
                select.append_child(&element)?;
            }
            wrapper.append_child(&label)?;
            wrapper.append_child(&select)?;
            container.append_child(&wrapper)?;
            selects.push((dropdown.control, select));
        }

        let toggle: HtmlElement = create(document, "button")?;
        toggle.set_id("map-color-scale-toggle");
        toggle.set_text_content(Some(legend.toggle_glyph()));
        container.append_child(&toggle)?;
        host.append_child(&container)?;

        let info: HtmlElement = create(document, "div")?;
        info.set_id("map-info");
        info.style().set_property("display", "none")?;
        document
            .body()
            .ok_or_else(|| LodesError::Map("no <body>".to_string()))?
            .append_child(&info)?;

        Ok(DomPanel {
            container,
            labels,
            selects,
            toggle,
            info,
        })
    }

    /// Calls `handler(control, value)` whenever a dropdown changes.
    pub fn on_control_change(&self, handler: impl Fn(Control, String) + 'static) -> Result<()> {
        let handler = Rc::new(handler);
        for (control, select) in &self.selects {
            let control = *control;
            let handler = Rc::clone(&handler);
            let source = select.clone();
            let closure = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
                handler(control, source.value());
            });
            select.add_event_listener_with_callback("change", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        Ok(())
    }

    pub fn on_toggle(&self, handler: impl Fn() + 'static) -> Result<()> {
        let closure = Closure::<dyn FnMut(Event)>::new(move |_event: Event| handler());
        self.toggle
            .add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
        closure.forget();
        Ok(())
    }
}

impl PanelView for DomPanel {
    fn sync_control(&self, control: Control, value: &str) {
        if let Some((_, select)) = self.selects.iter().find(|(c, _)| *c == control) {
            select.set_value(value);
        }
    }

    fn render_legend(&self, legend: &Legend) {
        for (element, item) in self.labels.iter().zip(&legend.items) {
            element.set_text_content(Some(item.label));
        }
        warn_on_err(
            "legend",
            self.container
                .class_list()
                .toggle_with_force("collapsed", legend.collapsed)
                .map(|_| ()),
        );
        self.toggle.set_text_content(Some(legend.toggle_glyph()));
    }

    fn show_info(&self, text: &str) {
        self.info.set_text_content(Some(text));
        warn_on_err("map-info", self.info.style().set_property("display", "block"));
    }

    fn hide_info(&self) {
        warn_on_err("map-info", self.info.style().set_property("display", "none"));
    }
}

/// The `#map-spinner` bar inside the page's `.content` node.
pub struct DomSpinner {
    element: HtmlElement,
    parent: HtmlElement,
    on_flush: Rc<dyn Fn(u64)>,
}

impl DomSpinner {
    pub fn new(
        document: &Document,
        on_flush: impl Fn(u64) + 'static,
        on_transition_end: impl Fn(String) + 'static,
    ) -> Result<Self> {
        let element: HtmlElement = create(document, "div")?;
        element.set_id("map-spinner");
        let parent = match document.query_selector(".content")? {
            Some(node) => node.dyn_into::<HtmlElement>().ok(),
            None => None,
        }
        .or_else(|| document.body())
        .ok_or_else(|| LodesError::Map("no spinner parent".to_string()))?;

        let closure = Closure::<dyn FnMut(TransitionEvent)>::new(move |event: TransitionEvent| {
            on_transition_end(event.property_name());
        });
        element.add_event_listener_with_callback("transitionend", closure.as_ref().unchecked_ref())?;
        closure.forget();

        Ok(DomSpinner {
            element,
            parent,
            on_flush: Rc::new(on_flush),
        })
    }
}

impl SpinnerView for DomSpinner {
    fn attach(&self) {
        warn_on_err("spinner", self.parent.append_child(&self.element).map(|_| ()));
    }

    fn detach(&self) {
        if self.is_attached() {
            warn_on_err("spinner", self.parent.remove_child(&self.element).map(|_| ()));
        }
    }

    fn is_attached(&self) -> bool {
        self.parent.contains(Some(self.element.as_ref()))
    }

    fn set_scale(&self, scale: f64) {
        warn_on_err(
            "spinner",
            self.element
                .style()
                .set_property("transform", &format!("scaleX({:.2})", scale)),
        );
    }

    fn set_fading(&self, fading: bool) {
        warn_on_err(
            "spinner",
            self.element
                .class_list()
                .toggle_with_force("spinner-fade-out", fading)
                .map(|_| ()),
        );
    }

    fn schedule_flush(&self, ticket: u64, delay_ms: i32) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let on_flush = Rc::clone(&self.on_flush);
        let callback = Closure::once_into_js(move || on_flush(ticket));
        warn_on_err(
            "spinner",
            window
                .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), delay_ms)
                .map(|_| ()),
        );
    }
}

/// `window.location` plus `history.replaceState`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserUrl;

impl UrlSink for BrowserUrl {
    fn search(&self) -> String {
        web_sys::window()
            .and_then(|w| w.location().search().ok())
            .unwrap_or_default()
    }

    fn hash(&self) -> String {
        web_sys::window()
            .and_then(|w| w.location().hash().ok())
            .unwrap_or_default()
    }

    fn replace_state(&self, url: &str) {
        let Some(window) = web_sys::window() else {
            return;
        };
        match window.history() {
            Ok(history) => warn_on_err(
                "history",
                history.replace_state_with_url(&JsValue::NULL, "", Some(url)),
            ),
            Err(err) => console_warn!("history: {}", LodesError::from(err)),
        }
    }
}
