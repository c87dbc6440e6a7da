//! Error taxonomy for parameter validation, remote reads and columnar decoding.

use thiserror::Error;
use wasm_bindgen::JsValue;

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, LodesError>;

#[derive(Debug, Error)]
pub enum LodesError {
    /// A query-string or control value outside its allowed set.
    #[error("Invalid {name} {value}. Must be one of: {allowed}.")]
    InvalidParameter {
        name: &'static str,
        value: String,
        allowed: String,
    },

    /// A GEOID prefix that does not map to a state abbreviation.
    #[error("unknown state FIPS code: {0}")]
    UnknownState(String),

    #[error("fetch of {url} failed: {message}")]
    Fetch { url: String, message: String },

    /// The file footer or its metadata could not be read.
    #[error("corrupt parquet file {url}: {message}")]
    CorruptFile { url: String, message: String },

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("column {0} not found in file schema")]
    MissingColumn(String),

    #[error("map error: {0}")]
    Map(String),
}

impl From<LodesError> for JsValue {
    fn from(err: LodesError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

impl From<JsValue> for LodesError {
    fn from(value: JsValue) -> Self {
        use wasm_bindgen::JsCast;
        let message = value
            .as_string()
            .or_else(|| value.dyn_ref::<js_sys::Error>().map(|e| String::from(e.message())))
            .unwrap_or_else(|| "unknown JavaScript error".to_string());
        LodesError::Map(message)
    }
}
