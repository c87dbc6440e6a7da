//! Row-group pruning from column-chunk statistics.
//!
//! A row group is read only when the min/max of its source column can
//! contain the requested GEOID. Groups written without statistics are
//! skipped outright.

use std::ops::Range;

use parquet::file::metadata::{ParquetMetaData, RowGroupMetaData};
use parquet::file::statistics::Statistics;

/// Where one shortlisted row group lives in the file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowGroupSlice {
    pub index: usize,
    pub first_row: u64,
    pub num_rows: u64,
    /// Bytes spanning every projected column chunk of the group.
    pub byte_range: Range<u64>,
}

/// Min/max of a column chunk, typed the way it is compared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatRange {
    Text { min: String, max: String },
    Integer { min: i64, max: i64 },
}

impl StatRange {
    pub fn from_statistics(stats: &Statistics) -> Option<Self> {
        match stats {
            Statistics::ByteArray(_) | Statistics::FixedLenByteArray(_) => {
                let min = std::str::from_utf8(stats.min_bytes_opt()?).ok()?;
                let max = std::str::from_utf8(stats.max_bytes_opt()?).ok()?;
                Some(StatRange::Text {
                    min: min.to_string(),
                    max: max.to_string(),
                })
            }
            Statistics::Int32(s) => Some(StatRange::Integer {
                min: i64::from(*s.min_opt()?),
                max: i64::from(*s.max_opt()?),
            }),
            Statistics::Int64(s) => Some(StatRange::Integer {
                min: *s.min_opt()?,
                max: *s.max_opt()?,
            }),
            _ => None,
        }
    }

    /// Inclusive range test. Text compares bytewise, integers numerically.
    pub fn contains(&self, id: &str) -> bool {
        match self {
            StatRange::Text { min, max } => min.as_str() <= id && id <= max.as_str(),
            StatRange::Integer { min, max } => id
                .parse::<i64>()
                .map(|v| *min <= v && v <= *max)
                .unwrap_or(false),
        }
    }
}

/// Row groups whose `source_column` statistics admit `id`, in file order.
///
/// `projected` lists the leaf columns that will be decoded; the returned
/// byte ranges cover all of them.
pub fn shortlist(
    metadata: &ParquetMetaData,
    source_column: usize,
    projected: &[usize],
    id: &str,
) -> Vec<RowGroupSlice> {
    let mut slices = Vec::new();
    let mut first_row = 0u64;
    for (index, row_group) in metadata.row_groups().iter().enumerate() {
        let num_rows = u64::try_from(row_group.num_rows()).unwrap_or(0);
        let admits = row_group
            .column(source_column)
            .statistics()
            .and_then(StatRange::from_statistics)
            .map(|range| range.contains(id))
            .unwrap_or(false);
        if admits {
            if let Some(byte_range) = projected_range(row_group, projected) {
                slices.push(RowGroupSlice {
                    index,
                    first_row,
                    num_rows,
                    byte_range,
                });
            }
        }
        first_row += num_rows;
    }
    slices
}

fn projected_range(row_group: &RowGroupMetaData, projected: &[usize]) -> Option<Range<u64>> {
    projected
        .iter()
        .map(|&i| {
            let (start, len) = row_group.column(i).byte_range();
            start..start + len
        })
        .reduce(|a, b| a.start.min(b.start)..a.end.max(b.end))
}
