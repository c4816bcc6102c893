//! Client-side mirror of the authority's collection.

use std::collections::BTreeMap;

use blueprints::Blueprint;

/// Replaced wholesale by every list response; pushes add to it.
#[derive(Debug, Default, Clone)]
pub struct RemoteCache {
    blueprints: BTreeMap<String, Blueprint>,
}

impl RemoteCache {
    /// Clear, then fill from `blueprints`. On repeated IDs the first wins.
    pub fn replace_all(&mut self, blueprints: Vec<Blueprint>) {
        self.blueprints.clear();
        for blueprint in blueprints {
            self.insert_if_absent(blueprint);
        }
    }

    /// Returns false (and keeps the cached copy) if the ID is already cached.
    pub fn insert_if_absent(&mut self, blueprint: Blueprint) -> bool {
        if self.blueprints.contains_key(&blueprint.id) {
            return false;
        }
        self.blueprints.insert(blueprint.id.clone(), blueprint);
        true
    }

    pub fn get(&self, id: &str) -> Option<&Blueprint> {
        self.blueprints.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.blueprints.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.blueprints.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.blueprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blueprints.is_empty()
    }

    pub fn clear(&mut self) {
        self.blueprints.clear();
    }
}
