// Per-destination counts of one query and the "live" set per geography.
use std::collections::HashMap;

use serde::Serialize;

use crate::params::Geography;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResultEntry {
    pub id: String,
    pub count: u64,
}

/// Aggregated counts keyed by destination GEOID, in first-seen order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultSet {
    entries: Vec<ResultEntry>,
    index: HashMap<String, usize>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `count` to `id` and returns the new total.
    pub fn add(&mut self, id: &str, count: u64) -> u64 {
        match self.index.get(id) {
            Some(&pos) => {
                let entry = &mut self.entries[pos];
                entry.count = entry.count.saturating_add(count);
                entry.count
            }
            None => {
                self.index.insert(id.to_string(), self.entries.len());
                self.entries.push(ResultEntry {
                    id: id.to_string(),
                    count,
                });
                count
            }
        }
    }

    /// Sets `id` to exactly `count`.
    pub fn set(&mut self, id: &str, count: u64) {
        match self.index.get(id) {
            Some(&pos) => self.entries[pos].count = count,
            None => {
                self.add(id, count);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<u64> {
        self.index.get(id).map(|&pos| self.entries[pos].count)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResultEntry> {
        self.entries.iter()
    }

    /// IDs present here but missing from `next`.
    pub fn stale_against(&self, next: &ResultSet) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| !next.contains(&e.id))
            .map(|e| e.id.clone())
            .collect()
    }
}

/// The painted result set of each geography.
#[derive(Debug, Default)]
pub struct ResultStore {
    live: HashMap<Geography, ResultSet>,
}

impl ResultStore {
    pub fn get(&self, geography: Geography) -> Option<&ResultSet> {
        self.live.get(&geography)
    }

    /// Makes `next` the live set of `geography`; returns IDs that must be cleared.
    pub fn replace(&mut self, geography: Geography, next: ResultSet) -> Vec<String> {
        let stale = self
            .live
            .get(&geography)
            .map(|previous| previous.stale_against(&next))
            .unwrap_or_default();
        self.live.insert(geography, next);
        stale
    }

    /// Records entries that were painted without dropping the rest of the
    /// live set. Painted counts win over older ones.
    pub fn merge(&mut self, geography: Geography, painted: &ResultSet) {
        let live = self.live.entry(geography).or_default();
        for entry in painted.iter() {
            live.set(&entry.id, entry.count);
        }
    }
}
