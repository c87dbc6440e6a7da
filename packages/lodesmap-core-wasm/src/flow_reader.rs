//! Decodes origin-destination flows out of one fetched row group.

use std::io::Cursor;

use arrow::array::{Array, ArrayRef, AsArray, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Int64Type};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::{ArrowReaderMetadata, ParquetRecordBatchReaderBuilder};
use parquet::arrow::ProjectionMask;
use parquet::errors::ParquetError;
use parquet::file::reader::{ChunkReader, Length};
use parquet::schema::types::SchemaDescriptor;

use crate::error::{LodesError, Result};
use crate::params::{JobSegment, Origin};

/// Names of the three columns a flow query decodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlowColumns {
    pub source: &'static str,
    pub destination: &'static str,
    pub count: &'static str,
}

impl FlowColumns {
    pub fn new(origin: Origin, segment: JobSegment) -> Self {
        FlowColumns {
            source: origin.source_column(),
            destination: origin.destination_column(),
            count: segment.column(),
        }
    }

    /// Leaf indices of source, destination and count, in that order.
    pub fn leaf_indices(&self, schema: &SchemaDescriptor) -> Result<[usize; 3]> {
        let find = |name: &str| {
            schema
                .columns()
                .iter()
                .position(|c| c.path().string() == name)
                .ok_or_else(|| LodesError::MissingColumn(name.to_string()))
        };
        Ok([find(self.source)?, find(self.destination)?, find(self.count)?])
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Flow {
    pub destination: String,
    pub count: u64,
}

/// A fetched byte range addressed with file-absolute offsets.
pub struct RangeBytesReader {
    data: Bytes,
    file_offset: u64,
}

impl RangeBytesReader {
    pub fn new(data: Bytes, file_offset: u64) -> Self {
        RangeBytesReader { data, file_offset }
    }

    fn relative(&self, start: u64) -> parquet::errors::Result<usize> {
        start
            .checked_sub(self.file_offset)
            .map(|r| r as usize)
            .filter(|r| *r <= self.data.len())
            .ok_or_else(|| {
                ParquetError::General(format!(
                    "read at {} outside fetched range {}..{}",
                    start,
                    self.file_offset,
                    self.file_offset + self.data.len() as u64
                ))
            })
    }
}

impl Length for RangeBytesReader {
    /// End of the fetched range, as a file offset.
    fn len(&self) -> u64 {
        self.file_offset + self.data.len() as u64
    }
}

impl ChunkReader for RangeBytesReader {
    type T = Cursor<Bytes>;

    fn get_read(&self, start: u64) -> parquet::errors::Result<Self::T> {
        let start = self.relative(start)?;
        Ok(Cursor::new(self.data.slice(start..)))
    }

    fn get_bytes(&self, start: u64, length: usize) -> parquet::errors::Result<Bytes> {
        let start = self.relative(start)?;
        let end = start + length;
        if end > self.data.len() {
            return Err(ParquetError::EOF(format!(
                "wanted {} bytes at {}, only {} fetched",
                length,
                start,
                self.data.len() - start
            )));
        }
        Ok(self.data.slice(start..end))
    }
}

/// GEOID column as stored: text, or an integer that lost its leading zeros.
enum GeoColumn {
    Text(StringArray),
    Integer { values: Int64Array, width: usize },
}

impl GeoColumn {
    fn new(array: &ArrayRef, width: usize) -> Result<Self> {
        if array.data_type().is_integer() {
            let values = cast(array, &DataType::Int64)?.as_primitive::<Int64Type>().clone();
            Ok(GeoColumn::Integer { values, width })
        } else {
            let values = cast(array, &DataType::Utf8)?.as_string::<i32>().clone();
            Ok(GeoColumn::Text(values))
        }
    }

    fn matches(&self, row: usize, id: &str, id_number: Option<i64>) -> bool {
        match self {
            GeoColumn::Text(values) => values.is_valid(row) && values.value(row) == id,
            GeoColumn::Integer { values, .. } => {
                values.is_valid(row) && id_number == Some(values.value(row))
            }
        }
    }

    fn value(&self, row: usize) -> Option<String> {
        match self {
            GeoColumn::Text(values) => values.is_valid(row).then(|| values.value(row).to_string()),
            GeoColumn::Integer { values, width } => values
                .is_valid(row)
                .then(|| format!("{:0width$}", values.value(row), width = *width)),
        }
    }
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| LodesError::MissingColumn(name.to_string()))
}

/// Rows of `row_group` whose source column equals `id`.
///
/// `data` holds the group's projected column chunks starting at file offset
/// `file_offset`. Rows with a null destination or count are skipped.
pub fn decode_flows(
    data: Bytes,
    file_offset: u64,
    row_group: usize,
    reader_metadata: &ArrowReaderMetadata,
    columns: &FlowColumns,
    id: &str,
    id_width: usize,
) -> Result<Vec<Flow>> {
    let schema = reader_metadata.metadata().file_metadata().schema_descr();
    let mask = ProjectionMask::leaves(schema, columns.leaf_indices(schema)?);
    let reader = ParquetRecordBatchReaderBuilder::new_with_metadata(
        RangeBytesReader::new(data, file_offset),
        reader_metadata.clone(),
    )
    .with_projection(mask)
    .with_row_groups(vec![row_group])
    .build()?;

    let id_number = id.parse::<i64>().ok();
    let mut flows = Vec::new();
    for batch in reader {
        let batch = batch?;
        let source = GeoColumn::new(column(&batch, columns.source)?, id_width)?;
        let destination = GeoColumn::new(column(&batch, columns.destination)?, id_width)?;
        let counts = cast(column(&batch, columns.count)?, &DataType::Int64)?;
        let counts = counts.as_primitive::<Int64Type>();

        for row in 0..batch.num_rows() {
            if !source.matches(row, id, id_number) || counts.is_null(row) {
                continue;
            }
            let Some(destination) = destination.value(row) else {
                continue;
            };
            let Ok(count) = u64::try_from(counts.value(row)) else {
                continue;
            };
            flows.push(Flow { destination, count });
        }
    }
    Ok(flows)
}
