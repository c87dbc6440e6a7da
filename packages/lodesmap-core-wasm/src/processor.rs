//! Runs one flow query: locate the state file, prune row groups by
//! statistics, read the survivors concurrently and paint running totals.

use std::cell::RefCell;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use parquet::arrow::arrow_reader::{ArrowReaderMetadata, ArrowReaderOptions};
use serde::Serialize;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::error::{LodesError, Result};
use crate::flow_reader::{decode_flows, Flow, FlowColumns};
use crate::metadata_cache::MetadataCache;
use crate::params::{Geography, Parameter};
use crate::range_source::RangeSource;
use crate::result_set::{ResultSet, ResultStore};
use crate::row_groups::{shortlist, RowGroupSlice};
use crate::selection::{Selection, ID_PARAM};
use crate::{console_log, console_warn};

/// Receives the visible effects of a running query.
pub trait QuerySink {
    /// `count` is the running total for `id` so far.
    fn paint(&self, geography: Geography, id: &str, count: u64);
    fn clear(&self, geography: Geography, ids: &[String]);
    /// Percentage of shortlisted row groups processed, `1.0..=100.0`.
    fn progress(&self, percentage: f64);
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutcome {
    pub query_id: String,
    pub url: String,
    pub geography: Geography,
    pub id: String,
    pub row_groups_read: usize,
    pub row_groups_total: usize,
    pub destinations: usize,
    pub cleared: usize,
}

pub struct QueryProcessor<R: RangeSource> {
    source: R,
    catalog: Catalog,
    cache: Arc<MetadataCache>,
    live: RefCell<ResultStore>,
}

impl<R: RangeSource> QueryProcessor<R> {
    pub fn new(source: R, catalog: Catalog, cache: Arc<MetadataCache>) -> Self {
        QueryProcessor {
            source,
            catalog,
            cache,
            live: RefCell::new(ResultStore::default()),
        }
    }

    pub fn source(&self) -> &R {
        &self.source
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Results currently painted on `geography`.
    pub fn live_results(&self, geography: Geography) -> ResultSet {
        self.live.borrow().get(geography).cloned().unwrap_or_default()
    }

    pub fn live_count(&self, geography: Geography, id: &str) -> Option<u64> {
        self.live.borrow().get(geography).and_then(|r| r.get(id))
    }

    /// Queries the flows of the selected unit and paints them through `sink`.
    ///
    /// When no row group can contain the ID the map is left untouched. On a
    /// read failure everything painted so far stays tracked so the next
    /// query can clear it.
    pub async fn run_query<K>(&self, sink: &K, selection: &Selection) -> Result<QueryOutcome>
    where
        K: QuerySink + ?Sized,
    {
        let (Some(id), Some(fips)) = (selection.query_id(), selection.state_fips()) else {
            return Err(LodesError::InvalidParameter {
                name: ID_PARAM,
                value: String::new(),
                allowed: "a 5 to 12 digit Census GEOID".to_string(),
            });
        };
        let geography = selection.geography;
        let url = self
            .catalog
            .lodes_url(selection.year, geography, selection.origin, fips)?;
        let query_id = Uuid::new_v4().to_string();
        console_log!(
            "[{}] {} flows for {} {} ({})",
            query_id,
            selection.origin.as_str(),
            geography.as_str(),
            id,
            selection.job_segment.as_str()
        );

        let metadata = self.cache.metadata(&self.source, &url).await?;
        let columns = FlowColumns::new(selection.origin, selection.job_segment);
        let leaves = columns.leaf_indices(metadata.file_metadata().schema_descr())?;
        let slices = shortlist(&metadata, leaves[0], &leaves, id);
        let row_groups_total = metadata.num_row_groups();

        let mut outcome = QueryOutcome {
            query_id,
            url: url.clone(),
            geography,
            id: id.to_string(),
            row_groups_read: 0,
            row_groups_total,
            destinations: 0,
            cleared: 0,
        };
        if slices.is_empty() {
            console_warn!("No data found for the given ID {}.", id);
            return Ok(outcome);
        }

        let reader_metadata = ArrowReaderMetadata::try_new(Arc::clone(&metadata), ArrowReaderOptions::new())?;
        let mut pending: FuturesUnordered<_> = slices
            .iter()
            .map(|slice| self.read_slice(&url, &reader_metadata, &columns, slice, id, geography))
            .collect();

        let mut results = ResultSet::new();
        let mut processed = 0usize;
        let mut failure = None;
        while let Some(read) = pending.next().await {
            match read {
                Ok(flows) => {
                    for flow in flows {
                        let total = results.add(&flow.destination, flow.count);
                        sink.paint(geography, &flow.destination, total);
                    }
                }
                Err(err) => {
                    failure.get_or_insert(err);
                }
            }
            processed += 1;
            sink.progress(((processed * 100).div_ceil(slices.len())) as f64);
        }
        drop(pending);

        if let Some(err) = failure {
            self.live.borrow_mut().merge(geography, &results);
            return Err(err);
        }

        outcome.row_groups_read = processed;
        outcome.destinations = results.len();
        let stale = self.live.borrow_mut().replace(geography, results);
        sink.clear(geography, &stale);
        outcome.cleared = stale.len();
        console_log!(
            "[{}] {} destinations from {}/{} row groups, {} cleared",
            outcome.query_id,
            outcome.destinations,
            outcome.row_groups_read,
            outcome.row_groups_total,
            outcome.cleared
        );
        Ok(outcome)
    }

    async fn read_slice(
        &self,
        url: &str,
        reader_metadata: &ArrowReaderMetadata,
        columns: &FlowColumns,
        slice: &RowGroupSlice,
        id: &str,
        geography: Geography,
    ) -> Result<Vec<Flow>> {
        let data = self.source.fetch_range(url, slice.byte_range.clone()).await?;
        decode_flows(
            data,
            slice.byte_range.start,
            slice.index,
            reader_metadata,
            columns,
            id,
            geography.id_len(),
        )
    }
}
