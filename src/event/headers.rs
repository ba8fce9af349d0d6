//! Record headers with deferred allocation
//!
//! A record that arrived without headers carries an unmaterialized
//! [`HeaderCollection`]. Reads on it see an empty collection and allocate
//! nothing. The first write installs the backing store through a single
//! atomic transition of a [`OnceCell`]; concurrent writers agree on one
//! winner and every other writer appends to the winner's store.

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::fmt;

/// A single name/binary-value pair attached to a record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Header {
    key: String,
    value: Vec<u8>,
}

impl Header {
    /// Create a header
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Header name
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Header value
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Split into name and value
    pub fn into_parts(self) -> (String, Vec<u8>) {
        (self.key, self.value)
    }
}

impl<K: Into<String>, V: Into<Vec<u8>>> From<(K, V)> for Header {
    fn from((key, value): (K, V)) -> Self {
        Header::new(key, value)
    }
}

/// Ordered, multi-valued header collection.
///
/// Duplicate names are kept; insertion order is preserved.
pub struct HeaderCollection {
    store: OnceCell<RwLock<Vec<Header>>>,
}

impl HeaderCollection {
    /// A collection with no backing store yet
    pub fn unmaterialized() -> Self {
        Self {
            store: OnceCell::new(),
        }
    }

    /// A collection backed by the given entries
    pub fn populated(headers: Vec<Header>) -> Self {
        Self {
            store: OnceCell::with_value(RwLock::new(headers)),
        }
    }

    /// Whether a backing store has been installed
    pub fn is_materialized(&self) -> bool {
        self.store.get().is_some()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.store.get().map_or(0, |store| store.read().len())
    }

    /// True when there are no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a header, materializing the backing store on first write
    pub fn add(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        let header = Header::new(key, value);
        self.materialize().write().push(header);
    }

    /// First value recorded under `key`
    pub fn first(&self, key: &str) -> Option<Vec<u8>> {
        let store = self.store.get()?;
        let guard = store.read();
        guard.iter().find(|h| h.key == key).map(|h| h.value.clone())
    }

    /// Last value recorded under `key`
    pub fn last(&self, key: &str) -> Option<Vec<u8>> {
        let store = self.store.get()?;
        let guard = store.read();
        guard.iter().rev().find(|h| h.key == key).map(|h| h.value.clone())
    }

    /// Every value recorded under `key`, in insertion order
    pub fn get_all(&self, key: &str) -> Vec<Vec<u8>> {
        match self.store.get() {
            Some(store) => store
                .read()
                .iter()
                .filter(|h| h.key == key)
                .map(|h| h.value.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Remove every entry under `key`, returning how many were removed
    pub fn remove(&self, key: &str) -> usize {
        let Some(store) = self.store.get() else {
            return 0;
        };
        let mut guard = store.write();
        let before = guard.len();
        guard.retain(|h| h.key != key);
        before - guard.len()
    }

    /// Point-in-time copy of all entries
    pub fn to_vec(&self) -> Vec<Header> {
        self.store
            .get()
            .map(|store| store.read().clone())
            .unwrap_or_default()
    }

    fn materialize(&self) -> &RwLock<Vec<Header>> {
        self.store.get_or_init(|| RwLock::new(Vec::new()))
    }
}

impl Default for HeaderCollection {
    fn default() -> Self {
        Self::unmaterialized()
    }
}

/// Clones keep the materialization state of the source
impl Clone for HeaderCollection {
    fn clone(&self) -> Self {
        match self.store.get() {
            Some(store) => Self::populated(store.read().clone()),
            None => Self::unmaterialized(),
        }
    }
}

impl fmt::Debug for HeaderCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.store.get() {
            Some(store) => f.debug_list().entries(store.read().iter()).finish(),
            None => f.write_str("<unmaterialized>"),
        }
    }
}

impl PartialEq for HeaderCollection {
    fn eq(&self, other: &Self) -> bool {
        self.to_vec() == other.to_vec()
    }
}

impl FromIterator<Header> for HeaderCollection {
    fn from_iter<I: IntoIterator<Item = Header>>(iter: I) -> Self {
        Self::populated(iter.into_iter().collect())
    }
}
