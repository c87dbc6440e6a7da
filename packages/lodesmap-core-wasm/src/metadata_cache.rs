//! File lengths and decoded Parquet footers, cached per URL.
//!
//! Entries never expire: the LODES extracts are immutable for a given URL.
//! Locks are held only around map lookups, never across a fetch.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use parquet::file::metadata::{ParquetMetaData, ParquetMetaDataReader};
use serde::Serialize;

use crate::console_log;
use crate::error::{LodesError, Result};
use crate::range_source::RangeSource;

/// Length of the Parquet trailer: metadata length plus the `PAR1` magic.
pub const FOOTER_SIZE: usize = 8;

/// Tail bytes requested up front when reading a footer.
pub const DEFAULT_FOOTER_PREFETCH: u64 = 64 * 1024;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub byte_lengths: usize,
    pub metadata: usize,
    pub hits: usize,
    pub misses: usize,
}

#[derive(Debug)]
pub struct MetadataCache {
    footer_prefetch: u64,
    byte_lengths: Mutex<HashMap<String, u64>>,
    metadata: Mutex<HashMap<String, Arc<ParquetMetaData>>>,
    counters: Mutex<(usize, usize)>,
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::with_prefetch(DEFAULT_FOOTER_PREFETCH)
    }
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefetch(footer_prefetch: u64) -> Self {
        Self {
            footer_prefetch: footer_prefetch.max(FOOTER_SIZE as u64),
            byte_lengths: Mutex::new(HashMap::new()),
            metadata: Mutex::new(HashMap::new()),
            counters: Mutex::new((0, 0)),
        }
    }

    pub async fn byte_length<R>(&self, source: &R, url: &str) -> Result<u64>
    where
        R: RangeSource + ?Sized,
    {
        let cached = self.byte_lengths.lock().get(url).copied();
        if let Some(len) = cached {
            self.record(true);
            return Ok(len);
        }
        self.record(false);
        let len = source.byte_length(url).await?;
        self.byte_lengths.lock().insert(url.to_string(), len);
        Ok(len)
    }

    /// Decoded footer of `url`, fetched on first use.
    pub async fn metadata<R>(&self, source: &R, url: &str) -> Result<Arc<ParquetMetaData>>
    where
        R: RangeSource + ?Sized,
    {
        let cached = self.metadata.lock().get(url).cloned();
        if let Some(metadata) = cached {
            self.record(true);
            return Ok(metadata);
        }
        self.record(false);

        let len = self.byte_length(source, url).await?;
        let metadata = Arc::new(read_metadata(source, url, len, self.footer_prefetch).await?);
        console_log!(
            "Loaded metadata for {}: {} row groups, {} rows",
            url,
            metadata.num_row_groups(),
            metadata.file_metadata().num_rows()
        );
        self.metadata
            .lock()
            .insert(url.to_string(), Arc::clone(&metadata));
        Ok(metadata)
    }

    pub fn stats(&self) -> CacheStats {
        let (hits, misses) = *self.counters.lock();
        CacheStats {
            byte_lengths: self.byte_lengths.lock().len(),
            metadata: self.metadata.lock().len(),
            hits,
            misses,
        }
    }

    pub fn clear(&self) {
        self.byte_lengths.lock().clear();
        self.metadata.lock().clear();
        *self.counters.lock() = (0, 0);
    }

    fn record(&self, hit: bool) {
        let mut counters = self.counters.lock();
        if hit {
            counters.0 += 1;
        } else {
            counters.1 += 1;
        }
    }
}

/// Reads the footer of a `file_len` byte file with at most two range requests.
pub async fn read_metadata<R>(
    source: &R,
    url: &str,
    file_len: u64,
    prefetch: u64,
) -> Result<ParquetMetaData>
where
    R: RangeSource + ?Sized,
{
    let corrupt = |message: String| LodesError::CorruptFile {
        url: url.to_string(),
        message,
    };
    if file_len < FOOTER_SIZE as u64 {
        return Err(corrupt(format!("file is only {} bytes", file_len)));
    }

    let prefetch = prefetch.min(file_len);
    let tail = source.fetch_range(url, file_len - prefetch..file_len).await?;
    if tail.len() as u64 != prefetch {
        return Err(corrupt(format!(
            "expected {} tail bytes, got {}",
            prefetch,
            tail.len()
        )));
    }

    let mut footer = [0u8; FOOTER_SIZE];
    footer.copy_from_slice(&tail[tail.len() - FOOTER_SIZE..]);
    let metadata_len = ParquetMetaDataReader::decode_footer(&footer)?;
    let total = metadata_len as u64 + FOOTER_SIZE as u64;
    if total > file_len {
        return Err(corrupt(format!(
            "footer claims {} bytes of metadata in a {} byte file",
            metadata_len, file_len
        )));
    }

    let buffer: Bytes = if total <= prefetch {
        let start = (prefetch - total) as usize;
        tail.slice(start..start + metadata_len)
    } else {
        let head = source
            .fetch_range(url, file_len - total..file_len - prefetch)
            .await?;
        let mut combined = BytesMut::with_capacity(total as usize);
        combined.extend_from_slice(&head);
        combined.extend_from_slice(&tail);
        combined.freeze().slice(..metadata_len)
    };

    Ok(ParquetMetaDataReader::decode_metadata(&buffer)?)
}
