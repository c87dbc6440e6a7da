//! Query-string state. Parameters are written back with replace-state so the
//! browser history never grows; the hash is owned by the map and carried along.

use std::cell::RefCell;

use url::form_urlencoded;

/// Ordered `name=value` pairs with `URLSearchParams` semantics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryString {
    pairs: Vec<(String, String)>,
}

impl QueryString {
    /// Parses `?a=1&b=2` (leading `?` optional).
    pub fn parse(search: &str) -> Self {
        let raw = search.strip_prefix('?').unwrap_or(search);
        QueryString {
            pairs: form_urlencoded::parse(raw.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Replaces the first occurrence and drops the rest, or appends.
    pub fn set(&mut self, name: &str, value: &str) {
        let mut seen = false;
        self.pairs.retain_mut(|(k, v)| {
            if k != name {
                return true;
            }
            if seen {
                return false;
            }
            seen = true;
            *v = value.to_string();
            true
        });
        if !seen {
            self.pairs.push((name.to_string(), value.to_string()));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Encoded pairs without the leading `?`.
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }
}

/// Relative URL handed to `history.replaceState`.
pub fn compose_url(query: &QueryString, hash: &str) -> String {
    format!("?{}{}", query.encode(), hash)
}

/// The page location as far as this crate is concerned.
pub trait UrlSink {
    fn search(&self) -> String;
    fn hash(&self) -> String;
    fn replace_state(&self, url: &str);
}

pub fn read_query<U: UrlSink + ?Sized>(sink: &U) -> QueryString {
    QueryString::parse(&sink.search())
}

pub fn set_url_param<U: UrlSink + ?Sized>(sink: &U, name: &str, value: &str) {
    let mut query = read_query(sink);
    query.set(name, value);
    sink.replace_state(&compose_url(&query, &sink.hash()));
}

/// Re-writes the current query string so it survives a hash update.
pub fn refresh_url<U: UrlSink + ?Sized>(sink: &U) {
    let query = read_query(sink);
    sink.replace_state(&compose_url(&query, &sink.hash()));
}

/// Location kept in memory, for hosts without a browser window.
#[derive(Debug, Default)]
pub struct MemoryUrl {
    search: RefCell<String>,
    hash: RefCell<String>,
    replacements: RefCell<Vec<String>>,
}

impl MemoryUrl {
    pub fn new(search: &str, hash: &str) -> Self {
        MemoryUrl {
            search: RefCell::new(search.to_string()),
            hash: RefCell::new(hash.to_string()),
            replacements: RefCell::new(Vec::new()),
        }
    }

    pub fn replacements(&self) -> Vec<String> {
        self.replacements.borrow().clone()
    }

    pub fn set_hash(&self, hash: &str) {
        *self.hash.borrow_mut() = hash.to_string();
    }
}

impl UrlSink for MemoryUrl {
    fn search(&self) -> String {
        self.search.borrow().clone()
    }

    fn hash(&self) -> String {
        self.hash.borrow().clone()
    }

    fn replace_state(&self, url: &str) {
        let without_hash = url.split('#').next().unwrap_or_default();
        *self.search.borrow_mut() = without_hash.to_string();
        if let Some(pos) = url.find('#') {
            *self.hash.borrow_mut() = url[pos..].to_string();
        }
        self.replacements.borrow_mut().push(url.to_string());
    }
}
