//! Sets of fabric provider identifiers.

use serde::{Deserialize, Serialize};
use std::collections::btree_set::{self, BTreeSet};
use std::fmt;

/// An ordered set of provider identifiers such as `ucx+rc_x`.
///
/// Inserting a provider that is already present leaves the set unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderSet(BTreeSet<String>);

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a provider. Returns true if it was not already present.
    pub fn insert(&mut self, provider: impl Into<String>) -> bool {
        self.0.insert(provider.into())
    }

    /// Adds every provider of `other`.
    pub fn merge(&mut self, other: &ProviderSet) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn contains(&self, provider: &str) -> bool {
        self.0.contains(provider)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates providers in sorted order.
    pub fn iter(&self) -> btree_set::Iter<'_, String> {
        self.0.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for ProviderSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for ProviderSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl<'a> IntoIterator for &'a ProviderSet {
    type Item = &'a String;
    type IntoIter = btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ProviderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.0.iter().map(String::as_str).collect();
        write!(f, "{}", joined.join(", "))
    }
}
