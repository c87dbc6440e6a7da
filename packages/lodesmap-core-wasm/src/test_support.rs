//! Recording fakes and fixture builders shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use serde_json::Value;

use crate::color_scale::Legend;
use crate::error::Result;
use crate::map_view::{FeatureTarget, MapSurface, ScreenPoint};
use crate::params::{JobSegment, Parameter};
use crate::selection::Control;
use crate::spinner::SpinnerView;

#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceCall {
    AddSource(String, Value),
    /// Layer id and the layer it was inserted before.
    AddLayer(String, Option<String>),
    Visibility(String, bool),
    State(FeatureTarget, Value),
    Cursor(String),
}

#[derive(Default)]
pub struct RecordingSurface {
    calls: RefCell<Vec<SurfaceCall>>,
    first_symbol: RefCell<Option<String>>,
    features: RefCell<HashMap<String, String>>,
    zoom: Cell<f64>,
}

impl RecordingSurface {
    pub fn set_first_symbol(&self, layer: &str) {
        *self.first_symbol.borrow_mut() = Some(layer.to_string());
    }

    /// Makes `id` the feature found under any point on `layer`.
    pub fn put_feature(&self, layer: &str, id: &str) {
        self.features
            .borrow_mut()
            .insert(layer.to_string(), id.to_string());
    }

    pub fn remove_feature(&self, layer: &str) {
        self.features.borrow_mut().remove(layer);
    }

    pub fn set_zoom(&self, zoom: f64) {
        self.zoom.set(zoom);
    }

    /// Drains the recorded calls.
    pub fn take(&self) -> Vec<SurfaceCall> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    /// Recorded feature-state writes, without draining.
    pub fn states(&self) -> Vec<(FeatureTarget, Value)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                SurfaceCall::State(target, state) => Some((target.clone(), state.clone())),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: SurfaceCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl MapSurface for RecordingSurface {
    fn add_source(&self, id: &str, spec: &Value) -> Result<()> {
        self.push(SurfaceCall::AddSource(id.to_string(), spec.clone()));
        Ok(())
    }

    fn add_layer(&self, spec: &Value, before_id: Option<&str>) -> Result<()> {
        let id = spec["id"].as_str().unwrap_or_default().to_string();
        self.push(SurfaceCall::AddLayer(id, before_id.map(str::to_string)));
        Ok(())
    }

    fn first_symbol_layer(&self) -> Option<String> {
        self.first_symbol.borrow().clone()
    }

    fn set_layer_visibility(&self, layer_id: &str, visible: bool) {
        self.push(SurfaceCall::Visibility(layer_id.to_string(), visible));
    }

    fn set_feature_state(&self, target: &FeatureTarget, state: &Value) {
        self.push(SurfaceCall::State(target.clone(), state.clone()));
    }

    fn feature_id_at(&self, _point: ScreenPoint, layer_id: &str) -> Option<String> {
        self.features.borrow().get(layer_id).cloned()
    }

    fn zoom(&self) -> f64 {
        self.zoom.get()
    }

    fn set_cursor(&self, cursor: &str) {
        self.push(SurfaceCall::Cursor(cursor.to_string()));
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SpinnerCall {
    Attach,
    Detach,
    Scale(f64),
    Fading(bool),
    Schedule(u64, i32),
}

#[derive(Default)]
pub struct RecordingView {
    calls: RefCell<Vec<SpinnerCall>>,
    attached: Cell<bool>,
}

impl RecordingView {
    pub fn take(&self) -> Vec<SpinnerCall> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    /// Newest scheduled flush ticket, if any was recorded since the last `take`.
    pub fn last_ticket(&self) -> Option<u64> {
        self.calls.borrow().iter().rev().find_map(|c| match c {
            SpinnerCall::Schedule(ticket, _) => Some(*ticket),
            _ => None,
        })
    }
}

impl SpinnerView for RecordingView {
    fn attach(&self) {
        self.attached.set(true);
        self.calls.borrow_mut().push(SpinnerCall::Attach);
    }

    fn detach(&self) {
        self.attached.set(false);
        self.calls.borrow_mut().push(SpinnerCall::Detach);
    }

    fn is_attached(&self) -> bool {
        self.attached.get()
    }

    fn set_scale(&self, scale: f64) {
        self.calls.borrow_mut().push(SpinnerCall::Scale(scale));
    }

    fn set_fading(&self, fading: bool) {
        self.calls.borrow_mut().push(SpinnerCall::Fading(fading));
    }

    fn schedule_flush(&self, ticket: u64, delay_ms: i32) {
        self.calls
            .borrow_mut()
            .push(SpinnerCall::Schedule(ticket, delay_ms));
    }
}

/// One origin-destination pair; every job segment column carries `jobs`.
#[derive(Clone, Debug)]
pub struct FlowRow {
    pub w_geo: String,
    pub h_geo: String,
    pub jobs: i64,
}

impl FlowRow {
    pub fn new(w_geo: &str, h_geo: &str, jobs: i64) -> Self {
        FlowRow {
            w_geo: w_geo.to_string(),
            h_geo: h_geo.to_string(),
            jobs,
        }
    }
}

/// Writes `rows` as an uncompressed LODES extract with `row_group_size` rows per group.
pub fn lodes_parquet(rows: &[FlowRow], row_group_size: usize) -> Bytes {
    write_lodes(rows, row_group_size, EnabledStatistics::Chunk)
}

pub fn lodes_parquet_without_statistics(rows: &[FlowRow], row_group_size: usize) -> Bytes {
    write_lodes(rows, row_group_size, EnabledStatistics::None)
}

fn write_lodes(rows: &[FlowRow], row_group_size: usize, statistics: EnabledStatistics) -> Bytes {
    let mut fields = vec![
        Field::new("w_geo", DataType::Utf8, false),
        Field::new("h_geo", DataType::Utf8, false),
    ];
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.w_geo.as_str()))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.h_geo.as_str()))),
    ];
    for segment in JobSegment::all() {
        fields.push(Field::new(segment.column(), DataType::Int64, true));
        columns.push(Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.jobs))));
    }
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(Arc::clone(&schema), columns).unwrap();

    let props = WriterProperties::builder()
        .set_max_row_group_size(row_group_size)
        .set_statistics_enabled(statistics)
        .build();
    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, schema, Some(props)).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
    Bytes::from(buffer)
}

/// Panel double that remembers what it was told to show.
#[derive(Default)]
pub struct RecordingPanel {
    pub controls: RefCell<HashMap<Control, String>>,
    pub legend_labels: RefCell<Vec<String>>,
    pub legend_collapsed: Cell<bool>,
    pub info: RefCell<Option<String>>,
}

impl crate::app::PanelView for RecordingPanel {
    fn sync_control(&self, control: Control, value: &str) {
        self.controls.borrow_mut().insert(control, value.to_string());
    }

    fn render_legend(&self, legend: &Legend) {
        *self.legend_labels.borrow_mut() = legend.items.iter().map(|i| i.label.to_string()).collect();
        self.legend_collapsed.set(legend.collapsed);
    }

    fn show_info(&self, text: &str) {
        *self.info.borrow_mut() = Some(text.to_string());
    }

    fn hide_info(&self) {
        *self.info.borrow_mut() = None;
    }
}
