// ---------------------------------------------------------------------------
// Save structs for blueprints and blueprint collections
// ---------------------------------------------------------------------------

use bevy::prelude::*;
use bitcode::{Decode, Encode};

use blueprints::{Blueprint, PieceEntry};

#[derive(Encode, Decode, Debug, Clone, PartialEq)]
pub struct SavePieceEntry {
    pub type_id: String,
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub aux_text: String,
}

#[derive(Encode, Decode, Debug, Clone, PartialEq)]
pub struct SaveBlueprint {
    pub id: String,
    pub entries: Vec<SavePieceEntry>,
}

/// Full collection, as answered to a list request.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Default)]
pub struct SaveCollection {
    pub blueprints: Vec<SaveBlueprint>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<&PieceEntry> for SavePieceEntry {
    fn from(entry: &PieceEntry) -> Self {
        Self {
            type_id: entry.type_id.clone(),
            position: entry.offset.to_array(),
            rotation: entry.rotation.to_array(),
            aux_text: entry.aux_text.clone(),
        }
    }
}

impl From<SavePieceEntry> for PieceEntry {
    fn from(entry: SavePieceEntry) -> Self {
        // Quat::from_array keeps the stored components bit-for-bit.
        PieceEntry {
            type_id: entry.type_id,
            offset: Vec3::from_array(entry.position),
            rotation: Quat::from_array(entry.rotation),
            aux_text: entry.aux_text,
        }
    }
}

impl From<&Blueprint> for SaveBlueprint {
    fn from(blueprint: &Blueprint) -> Self {
        Self {
            id: blueprint.id.clone(),
            entries: blueprint.entries.iter().map(SavePieceEntry::from).collect(),
        }
    }
}

impl From<SaveBlueprint> for Blueprint {
    fn from(save: SaveBlueprint) -> Self {
        Blueprint::new(
            save.id,
            save.entries.into_iter().map(PieceEntry::from).collect(),
        )
    }
}

impl<'a> FromIterator<&'a Blueprint> for SaveCollection {
    fn from_iter<I: IntoIterator<Item = &'a Blueprint>>(iter: I) -> Self {
        Self {
            blueprints: iter.into_iter().map(SaveBlueprint::from).collect(),
        }
    }
}
