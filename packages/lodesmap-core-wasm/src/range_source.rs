//! Read-only access to remote files through byte-range requests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::Range;

use bytes::Bytes;
use futures::future::{self, FutureExt, LocalBoxFuture};

use crate::error::{LodesError, Result};

/// A store of immutable files addressed by URL.
pub trait RangeSource {
    /// Total size of the file in bytes.
    fn byte_length<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<u64>>;

    /// Bytes `range.start..range.end` of the file.
    fn fetch_range<'a>(&'a self, url: &'a str, range: Range<u64>) -> LocalBoxFuture<'a, Result<Bytes>>;
}

/// Files held in memory; records every range request it serves.
#[derive(Debug, Default)]
pub struct InMemorySource {
    files: HashMap<String, Bytes>,
    requests: RefCell<Vec<(String, Range<u64>)>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: &str, data: impl Into<Bytes>) {
        self.files.insert(url.to_string(), data.into());
    }

    pub fn requests(&self) -> Vec<(String, Range<u64>)> {
        self.requests.borrow().clone()
    }

    fn file(&self, url: &str) -> Result<&Bytes> {
        self.files.get(url).ok_or_else(|| LodesError::Fetch {
            url: url.to_string(),
            message: "404 Not Found".to_string(),
        })
    }
}

impl RangeSource for InMemorySource {
    fn byte_length<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<u64>> {
        future::ready(self.file(url).map(|data| data.len() as u64)).boxed_local()
    }

    fn fetch_range<'a>(&'a self, url: &'a str, range: Range<u64>) -> LocalBoxFuture<'a, Result<Bytes>> {
        let result = self.file(url).and_then(|data| {
            if range.start > range.end || range.end > data.len() as u64 {
                return Err(LodesError::Fetch {
                    url: url.to_string(),
                    message: format!("416 Range Not Satisfiable: {:?} of {}", range, data.len()),
                });
            }
            self.requests.borrow_mut().push((url.to_string(), range.clone()));
            Ok(data.slice(range.start as usize..range.end as usize))
        });
        future::ready(result).boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn serves_ranges_and_records_them() {
        let mut source = InMemorySource::new();
        source.insert("mem://a", &b"0123456789"[..]);
        assert_eq!(block_on(source.byte_length("mem://a")).unwrap(), 10);
        let bytes = block_on(source.fetch_range("mem://a", 2..5)).unwrap();
        assert_eq!(&bytes[..], b"234");
        assert_eq!(source.requests(), vec![("mem://a".to_string(), 2..5)]);
    }

    #[test]
    fn missing_file_and_bad_range_fail() {
        let mut source = InMemorySource::new();
        source.insert("mem://a", &b"abc"[..]);
        assert!(block_on(source.byte_length("mem://b")).is_err());
        assert!(block_on(source.fetch_range("mem://a", 1..9)).is_err());
        assert!(source.requests().is_empty());
    }
}
