// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::{RenderError, ResourceKind};
use std::collections::HashMap;

/// A map from logical resource name to a backend entry.
///
/// Inserting under an existing name replaces the entry and hands the previous
/// one back; its native handle is not released.
#[derive(Debug)]
pub struct Registry<T> {
    kind: ResourceKind,
    entries: HashMap<String, T>,
}

impl<T> Registry<T> {
    /// Creates an empty registry for one kind of resource.
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            entries: HashMap::new(),
        }
    }

    /// The kind of resource stored.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Stores an entry, returning the one it replaced.
    pub fn insert(&mut self, name: &str, entry: T) -> Option<T> {
        let previous = self.entries.insert(name.to_string(), entry);
        if previous.is_some() {
            log::warn!(
                "Registry: {} '{}' was overwritten; the previous native handle was not released",
                self.kind,
                name
            );
        }
        previous
    }

    /// Looks up an entry, failing with [`RenderError::NotFound`].
    pub fn get(&self, name: &str) -> Result<&T, RenderError> {
        self.entries
            .get(name)
            .ok_or_else(|| RenderError::not_found(self.kind, name))
    }

    /// Looks up an entry mutably, failing with [`RenderError::NotFound`].
    pub fn get_mut(&mut self, name: &str) -> Result<&mut T, RenderError> {
        let kind = self.kind;
        self.entries
            .get_mut(name)
            .ok_or_else(|| RenderError::not_found(kind, name))
    }

    /// Looks up an entry without failing, for warn-and-skip paths.
    pub fn find(&self, name: &str) -> Option<&T> {
        self.entries.get(name)
    }

    /// Looks up an entry mutably without producing an error.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut T> {
        self.entries.get_mut(name)
    }

    /// Removes an entry, failing with [`RenderError::NotFound`].
    pub fn remove(&mut self, name: &str) -> Result<T, RenderError> {
        self.entries
            .remove(name)
            .ok_or_else(|| RenderError::not_found(self.kind, name))
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Removes and yields every entry.
    pub fn drain(&mut self) -> impl Iterator<Item = (String, T)> + '_ {
        self.entries.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_unknown_name_fails() {
        let registry: Registry<u32> = Registry::new(ResourceKind::Buffer);
        assert_eq!(
            registry.get("missing"),
            Err(RenderError::not_found(ResourceKind::Buffer, "missing"))
        );
        assert!(registry.find("missing").is_none());
    }

    #[test]
    fn overwrite_returns_previous_entry() {
        let mut registry = Registry::new(ResourceKind::Texture);
        assert_eq!(registry.insert("albedo", 1), None);
        assert_eq!(registry.insert("albedo", 2), Some(1));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("albedo"), Ok(&2));
    }

    #[test]
    fn remove_and_drain_empty_the_registry() {
        let mut registry = Registry::new(ResourceKind::Sampler);
        registry.insert("a", ());
        registry.insert("b", ());
        assert!(registry.remove("a").is_ok());
        assert!(registry.remove("a").is_err());
        assert_eq!(registry.drain().count(), 1);
        assert!(registry.is_empty());
    }
}
