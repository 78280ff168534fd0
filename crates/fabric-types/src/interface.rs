//! Fabric interfaces and the registry that collects them.

use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

use crate::ProviderSet;

/// A fabric-capable device and the providers that can drive it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricInterface {
    /// Device identifier as reported by the transport (e.g. `mlx5_0:1`).
    pub name: String,
    /// Operating system device name (e.g. `mlx5_0`).
    pub os_name: String,
    pub providers: ProviderSet,
}

impl FabricInterface {
    pub fn new(
        name: impl Into<String>,
        os_name: impl Into<String>,
        providers: ProviderSet,
    ) -> Self {
        Self {
            name: name.into(),
            os_name: os_name.into(),
            providers,
        }
    }
}

impl fmt::Display for FabricInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.os_name.is_empty() && self.os_name != self.name {
            write!(f, " ({})", self.os_name)?;
        }
        write!(f, ": {}", self.providers)
    }
}

/// Collection of fabric interfaces keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FabricInterfaceSet {
    by_name: BTreeMap<String, FabricInterface>,
}

impl FabricInterfaceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an interface, or merges it into the entry with the same name.
    ///
    /// Merging unions the provider sets. An existing empty `os_name` is
    /// filled from the new record; a non-empty one is kept.
    pub fn update(&mut self, fi: FabricInterface) {
        match self.by_name.entry(fi.name.clone()) {
            btree_map::Entry::Vacant(entry) => {
                entry.insert(fi);
            }
            btree_map::Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                if existing.os_name.is_empty() {
                    existing.os_name = fi.os_name;
                }
                existing.providers.merge(&fi.providers);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&FabricInterface> {
        self.by_name.get(name)
    }

    /// Interface names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.by_name.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> btree_map::Values<'_, String, FabricInterface> {
        self.by_name.values()
    }
}

impl<'a> IntoIterator for &'a FabricInterfaceSet {
    type Item = &'a FabricInterface;
    type IntoIter = btree_map::Values<'a, String, FabricInterface>;

    fn into_iter(self) -> Self::IntoIter {
        self.by_name.values()
    }
}

impl fmt::Display for FabricInterfaceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fi in self.iter() {
            writeln!(f, "{}", fi)?;
        }
        Ok(())
    }
}
