//! Ordered, de-duplicated collection of torrent hashes.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Torrent hashes in first-seen order, each present at most once.
///
/// Used both for the set of hashes ever known for an item and for the set
/// of hashes that are safe to remove.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadIdSet(IndexSet<String>);

impl DownloadIdSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hash; returns false if it was already present
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.0.insert(id.into())
    }

    /// Drop a hash, keeping the order of the others
    pub fn remove(&mut self, id: &str) -> bool {
        self.0.shift_remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    /// Remove every hash contained in `other`
    pub fn subtract(&mut self, other: &DownloadIdSet) {
        self.0.retain(|id| !other.contains(id));
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into a plain list, preserving order
    pub fn into_vec(self) -> Vec<String> {
        self.0.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for DownloadIdSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for DownloadIdSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl IntoIterator for DownloadIdSet {
    type Item = String;
    type IntoIter = indexmap::set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
