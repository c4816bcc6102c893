//! `Blueprint` and `PieceEntry`: a captured template of object placements.

use bevy::prelude::*;

/// One captured object, relative to the capture origin.
#[derive(Debug, Clone, PartialEq)]
pub struct PieceEntry {
    /// Key into the host's object catalog.
    pub type_id: String,
    /// Offset along the origin's local axes: `x` right, `y` up, `z` forward.
    pub offset: Vec3,
    /// Rotation relative to the origin's rotation.
    pub rotation: Quat,
    /// Free-form text carried by the object (e.g. a sign inscription), or
    /// empty.
    pub aux_text: String,
}

impl PieceEntry {
    pub fn new(type_id: impl Into<String>, offset: Vec3, rotation: Quat) -> Self {
        Self {
            type_id: type_id.into(),
            offset,
            rotation,
            aux_text: String::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.aux_text = text.into();
        self
    }
}

/// A named, position-independent template of object placements.
///
/// Entry order is the order the objects were captured in. It carries no
/// meaning beyond making re-instantiation and round trips deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct Blueprint {
    /// Unique key in every store; also the file base-name.
    pub id: String,
    pub entries: Vec<PieceEntry>,
}

impl Blueprint {
    pub fn new(id: impl Into<String>, entries: Vec<PieceEntry>) -> Self {
        Self {
            id: id.into(),
            entries,
        }
    }

    /// Same entries under a different ID (used when the player names a fresh
    /// capture).
    pub fn renamed(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn piece_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Footprint of all entry offsets in the origin's local X/Z plane, padded
    /// by `margin` on every side.
    pub fn extent(&self, margin: f32) -> Extent {
        let mut min = Vec2::ZERO;
        let mut max = Vec2::ZERO;
        for (i, entry) in self.entries.iter().enumerate() {
            let p = Vec2::new(entry.offset.x, entry.offset.z);
            if i == 0 {
                min = p;
                max = p;
            } else {
                min = min.min(p);
                max = max.max(p);
            }
        }
        Extent {
            min: min - Vec2::splat(margin),
            max: max + Vec2::splat(margin),
        }
    }
}

/// Axis-aligned rectangle in the capture origin's local X/Z plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min: Vec2,
    pub max: Vec2,
}

impl Extent {
    /// Size along the local X axis.
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    /// Size along the local Z axis.
    pub fn depth(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
}

/// Whether `id` can be used as a file base-name without escaping the
/// blueprint directory.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && !id.starts_with('.')
        && !id
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':' | '\0') || c.is_control())
}
