//! Capabilities the host simulation provides to capture and placement.
//!
//! The blueprint core never touches the live scene directly. Capture reads a
//! [`SpatialRegistry`], placement resolves types through a [`PieceCatalog`]
//! and spawns through an [`ObjectLifecycle`], and stores keep the host's
//! placeable representation of each blueprint in sync via a
//! [`BlueprintRegistrar`].

use std::collections::{BTreeSet, HashSet};

use bevy::prelude::*;

use crate::blueprint::Blueprint;

/// A placed object as the host reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedObject {
    pub type_id: String,
    pub position: Vec3,
    pub rotation: Quat,
    pub aux_text: String,
}

impl PlacedObject {
    pub fn new(type_id: impl Into<String>, position: Vec3, rotation: Quat) -> Self {
        Self {
            type_id: type_id.into(),
            position,
            rotation,
            aux_text: String::new(),
        }
    }
}

/// Enumerates every currently placed object.
pub trait SpatialRegistry {
    /// Objects in the registry's natural iteration order. The order only has
    /// to be stable for the duration of one call.
    fn placed_objects(&self) -> Vec<PlacedObject>;
}

impl SpatialRegistry for [PlacedObject] {
    fn placed_objects(&self) -> Vec<PlacedObject> {
        self.to_vec()
    }
}

impl SpatialRegistry for Vec<PlacedObject> {
    fn placed_objects(&self) -> Vec<PlacedObject> {
        self.clone()
    }
}

/// Lookup into the host's object catalog.
pub trait PieceCatalog {
    fn contains(&self, type_id: &str) -> bool;
}

impl PieceCatalog for BTreeSet<String> {
    fn contains(&self, type_id: &str) -> bool {
        BTreeSet::contains(self, type_id)
    }
}

impl PieceCatalog for HashSet<String> {
    fn contains(&self, type_id: &str) -> bool {
        HashSet::contains(self, type_id)
    }
}

/// Spawns live objects for a placement.
pub trait ObjectLifecycle {
    type Handle;

    /// Spawn an object, or `None` if the host refused.
    fn spawn(&mut self, type_id: &str, position: Vec3, rotation: Quat) -> Option<Self::Handle>;

    /// Apply an entry's auxiliary text to a freshly spawned object.
    fn set_text(&mut self, _handle: &Self::Handle, _text: &str) {}

    /// Visual/audio spawn feedback. Called for at most the configured number
    /// of objects per placement.
    fn play_place_effect(&mut self, _handle: &Self::Handle) {}
}

/// The host's live, placeable representation of each stored blueprint.
pub trait BlueprintRegistrar {
    fn register(&mut self, blueprint: &Blueprint);
    fn release(&mut self, id: &str);
}

/// Registrar for hosts that keep no per-blueprint representation (e.g. a
/// dedicated authority).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRegistrar;

impl BlueprintRegistrar for NoRegistrar {
    fn register(&mut self, _blueprint: &Blueprint) {}
    fn release(&mut self, _id: &str) {}
}

/// External build counter, bumped once per spawned object.
pub trait BuildStatistics {
    fn record_build(&mut self);
}

/// Per-player build count.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    pub builds: u64,
}

impl BuildStatistics for BuildStats {
    fn record_build(&mut self) {
        self.builds += 1;
    }
}
