//! Placement: turn a [`Blueprint`] plus a target frame into spawn
//! instructions, and carry them out against the host.

use bevy::prelude::*;

use crate::blueprint::Blueprint;
use crate::capture::CaptureOrigin;
use crate::error::BlueprintError;
use crate::host::{BuildStatistics, ObjectLifecycle, PieceCatalog};

/// One object to spawn, in world space.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnInstruction {
    pub type_id: String,
    pub position: Vec3,
    pub rotation: Quat,
    pub aux_text: String,
    /// Whether this spawn gets visual/audio feedback.
    pub rich_feedback: bool,
}

/// Output of [`instantiate`].
#[derive(Debug, Default)]
pub struct PlacementPlan {
    pub instructions: Vec<SpawnInstruction>,
    /// One [`BlueprintError::MissingType`] per skipped entry.
    pub missing: Vec<BlueprintError>,
}

impl PlacementPlan {
    pub fn effect_count(&self) -> usize {
        self.instructions.iter().filter(|i| i.rich_feedback).count()
    }
}

/// Result of applying a plan to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaceResult {
    pub spawned: u32,
    /// Spawns the host refused.
    pub refused: u32,
    pub missing: u32,
    pub effects: u32,
}

/// Compute where every entry of `blueprint` lands when placed at `target`.
///
/// Entries whose type the catalog doesn't know are skipped with a warning;
/// the rest are still placed. Only the first `max_effects` instructions are
/// flagged for rich feedback.
pub fn instantiate<C: PieceCatalog + ?Sized>(
    blueprint: &Blueprint,
    target: CaptureOrigin,
    catalog: &C,
    max_effects: u32,
) -> PlacementPlan {
    let mut plan = PlacementPlan::default();
    let mut effects = 0u32;

    for entry in &blueprint.entries {
        if !catalog.contains(&entry.type_id) {
            warn!(
                "Blueprint {}: {} not found, skipping entry",
                blueprint.id, entry.type_id
            );
            plan.missing
                .push(BlueprintError::MissingType(entry.type_id.clone()));
            continue;
        }

        let (position, rotation) = target.to_world(entry.offset, entry.rotation);
        let rich_feedback = effects < max_effects;
        if rich_feedback {
            effects += 1;
        }
        plan.instructions.push(SpawnInstruction {
            type_id: entry.type_id.clone(),
            position,
            rotation,
            aux_text: entry.aux_text.clone(),
            rich_feedback,
        });
    }

    plan
}

/// Spawn every instruction of `plan`, bumping `stats` once per spawned
/// object. Returns the handles of everything spawned.
pub fn apply_plan<L, S>(
    plan: &PlacementPlan,
    lifecycle: &mut L,
    stats: &mut S,
) -> (PlaceResult, Vec<L::Handle>)
where
    L: ObjectLifecycle + ?Sized,
    S: BuildStatistics + ?Sized,
{
    let mut result = PlaceResult {
        missing: plan.missing.len() as u32,
        ..default()
    };
    let mut handles = Vec::with_capacity(plan.instructions.len());

    for instruction in &plan.instructions {
        let Some(handle) =
            lifecycle.spawn(&instruction.type_id, instruction.position, instruction.rotation)
        else {
            warn!("Host refused to spawn {}", instruction.type_id);
            result.refused += 1;
            continue;
        };
        if !instruction.aux_text.is_empty() {
            lifecycle.set_text(&handle, &instruction.aux_text);
        }
        if instruction.rich_feedback {
            lifecycle.play_place_effect(&handle);
            result.effects += 1;
        }
        stats.record_build();
        result.spawned += 1;
        handles.push(handle);
    }

    (result, handles)
}
