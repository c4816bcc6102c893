//! Capture: turn the placed objects around an origin into a [`Blueprint`].

use bevy::prelude::*;

use crate::blueprint::{Blueprint, PieceEntry};
use crate::error::BlueprintError;
use crate::host::{PlacedObject, SpatialRegistry};

/// Reference frame of a capture (or a placement target).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureOrigin {
    pub position: Vec3,
    pub rotation: Quat,
}

impl CaptureOrigin {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Origin at `position`, facing along world forward.
    pub fn at(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Express a world pose in this frame.
    pub fn to_local(&self, position: Vec3, rotation: Quat) -> (Vec3, Quat) {
        let inverse = self.rotation.inverse();
        (inverse * (position - self.position), inverse * rotation)
    }

    /// Express a local pose in world space.
    pub fn to_world(&self, offset: Vec3, rotation: Quat) -> (Vec3, Quat) {
        (self.position + self.rotation * offset, self.rotation * rotation)
    }
}

/// Capture selection: a horizontal radius plus a tolerance band below the
/// origin. Objects above the origin are never excluded by height.
pub fn in_capture_range(
    origin: Vec3,
    position: Vec3,
    radius: f32,
    height_tolerance: f32,
) -> bool {
    let horizontal = Vec2::new(position.x - origin.x, position.z - origin.z);
    horizontal.length() < radius && position.y >= origin.y - height_tolerance
}

/// Number of objects a capture with these parameters would take.
pub fn count_in_radius<R: SpatialRegistry + ?Sized>(
    registry: &R,
    origin: Vec3,
    radius: f32,
    height_tolerance: f32,
) -> usize {
    registry
        .placed_objects()
        .iter()
        .filter(|obj| in_capture_range(origin, obj.position, radius, height_tolerance))
        .count()
}

/// Capture every object within `radius` of `origin` as a new blueprint.
///
/// Entries follow the registry's iteration order, which is only guaranteed
/// stable within this call. Fails with [`BlueprintError::EmptyCapture`] when
/// nothing is in range; a single object is a valid capture.
pub fn capture<R: SpatialRegistry + ?Sized>(
    registry: &R,
    id: impl Into<String>,
    origin: CaptureOrigin,
    radius: f32,
    height_tolerance: f32,
) -> Result<Blueprint, BlueprintError> {
    let id = id.into();
    let entries: Vec<PieceEntry> = registry
        .placed_objects()
        .into_iter()
        .filter(|obj| in_capture_range(origin.position, obj.position, radius, height_tolerance))
        .map(|obj| to_entry(&origin, obj))
        .collect();

    if entries.is_empty() {
        debug!("Capture of {} found no pieces within {}", id, radius);
        return Err(BlueprintError::EmptyCapture { radius });
    }

    debug!("Captured {} pieces for blueprint {}", entries.len(), id);
    Ok(Blueprint::new(id, entries))
}

fn to_entry(origin: &CaptureOrigin, obj: PlacedObject) -> PieceEntry {
    let (offset, rotation) = origin.to_local(obj.position, obj.rotation);
    PieceEntry {
        type_id: obj.type_id,
        offset,
        rotation,
        aux_text: obj.aux_text,
    }
}
