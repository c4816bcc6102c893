//! Blueprint components, events, systems, and Bevy plugin registration.
//!
//! This is the thin layer between the ECS host and the capture/placement
//! engines: placed objects are entities carrying a [`PlacedPiece`], and the
//! engines only ever see them through the [`SpatialRegistry`] and
//! [`ObjectLifecycle`] contracts.

use std::collections::BTreeSet;

use bevy::prelude::*;

use crate::blueprint::{Blueprint, Extent};
use crate::capture::{capture, count_in_radius, CaptureOrigin};
use crate::config::{adjust_selection_radius, BlueprintConfig};
use crate::host::{
    BlueprintRegistrar, BuildStats, ObjectLifecycle, PieceCatalog, PlacedObject, SpatialRegistry,
};
use crate::placement::{apply_plan, instantiate, PlaceResult};

// =============================================================================
// Components
// =============================================================================

/// A placed object in the world.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct PlacedPiece {
    pub type_id: String,
    pub position: Vec3,
    pub rotation: Quat,
}

/// Text inscribed on a placed object.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct PieceText(pub String);

/// Marks an object that should play its placement effect this frame.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct PlaceEffect;

// =============================================================================
// Resources
// =============================================================================

/// Object types the host can spawn.
#[derive(Resource, Debug, Clone, Default)]
pub struct PieceTypes(pub BTreeSet<String>);

impl PieceCatalog for PieceTypes {
    fn contains(&self, type_id: &str) -> bool {
        self.0.contains(type_id)
    }
}

/// Blueprints currently offered to the player as placeable pieces.
#[derive(Resource, Debug, Clone, Default)]
pub struct BlueprintPieces {
    pub registered: BTreeSet<String>,
}

impl BlueprintPieces {
    /// Host-side piece name for a blueprint.
    pub fn piece_name(id: &str) -> String {
        format!("piece_blueprint ({id})")
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.registered.contains(id)
    }
}

impl BlueprintRegistrar for BlueprintPieces {
    fn register(&mut self, blueprint: &Blueprint) {
        debug!("Registering {}", Self::piece_name(&blueprint.id));
        self.registered.insert(blueprint.id.clone());
    }

    fn release(&mut self, id: &str) {
        if self.registered.remove(id) {
            debug!("Released {}", Self::piece_name(id));
        }
    }
}

// =============================================================================
// Events
// =============================================================================

/// Request to capture the pieces around `origin`.
#[derive(Event, Debug, Clone)]
pub struct CaptureBlueprint {
    pub id: String,
    pub origin: CaptureOrigin,
    /// Overrides the configured selection radius.
    pub radius: Option<f32>,
}

/// Fired after a successful capture. The store picks this up.
#[derive(Event, Debug, Clone)]
pub struct BlueprintCaptured {
    pub blueprint: Blueprint,
    /// Footprint padded by the configured `extent_margin`.
    pub extent: Extent,
}

/// Request to place `blueprint` at `target`.
#[derive(Event, Debug, Clone)]
pub struct PlaceBlueprint {
    pub blueprint: Blueprint,
    pub target: CaptureOrigin,
}

/// Fired after a placement has been carried out. Terrain shaping reads
/// `extent` relative to `target`.
#[derive(Event, Debug, Clone)]
pub struct BlueprintPlaced {
    pub id: String,
    pub target: CaptureOrigin,
    pub extent: Extent,
    pub result: PlaceResult,
}

/// Ask how many pieces a capture at `origin` would take.
#[derive(Event, Debug, Clone, Copy)]
pub struct PreviewCapture {
    pub origin: CaptureOrigin,
    /// Overrides the configured selection radius.
    pub radius: Option<f32>,
}

/// Answer to [`PreviewCapture`].
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct CapturePreview {
    pub origin: CaptureOrigin,
    pub radius: f32,
    pub count: usize,
}

/// Grow (positive) or shrink (negative) the configured selection radius.
#[derive(Event, Debug, Clone, Copy)]
pub struct AdjustSelectionRadius {
    pub delta: f32,
}

// =============================================================================
// ECS adapters
// =============================================================================

/// Spawns placed pieces through `Commands`.
pub struct CommandsLifecycle<'a, 'w, 's> {
    pub commands: &'a mut Commands<'w, 's>,
}

impl ObjectLifecycle for CommandsLifecycle<'_, '_, '_> {
    type Handle = Entity;

    fn spawn(&mut self, type_id: &str, position: Vec3, rotation: Quat) -> Option<Entity> {
        let entity = self
            .commands
            .spawn(PlacedPiece {
                type_id: type_id.to_string(),
                position,
                rotation,
            })
            .id();
        Some(entity)
    }

    fn set_text(&mut self, handle: &Entity, text: &str) {
        self.commands
            .entity(*handle)
            .insert(PieceText(text.to_string()));
    }

    fn play_place_effect(&mut self, handle: &Entity) {
        self.commands.entity(*handle).insert(PlaceEffect);
    }
}

/// Snapshot of every placed piece, in query order.
struct PieceSnapshot(Vec<PlacedObject>);

impl SpatialRegistry for PieceSnapshot {
    fn placed_objects(&self) -> Vec<PlacedObject> {
        self.0.clone()
    }
}

// =============================================================================
// Systems
// =============================================================================

impl PieceSnapshot {
    fn take(pieces: &Query<(&PlacedPiece, Option<&PieceText>)>) -> Self {
        Self(
            pieces
                .iter()
                .map(|(piece, text)| PlacedObject {
                    type_id: piece.type_id.clone(),
                    position: piece.position,
                    rotation: piece.rotation,
                    aux_text: text.map(|t| t.0.clone()).unwrap_or_default(),
                })
                .collect(),
        )
    }
}

/// System that processes `CaptureBlueprint` events.
fn handle_capture_blueprint(
    mut events: EventReader<CaptureBlueprint>,
    pieces: Query<(&PlacedPiece, Option<&PieceText>)>,
    config: Res<BlueprintConfig>,
    mut captured_events: EventWriter<BlueprintCaptured>,
) {
    for ev in events.read() {
        let snapshot = PieceSnapshot::take(&pieces);
        let radius = ev.radius.unwrap_or(config.selection_radius);
        match capture(
            &snapshot,
            ev.id.clone(),
            ev.origin,
            radius,
            config.height_tolerance,
        ) {
            Ok(blueprint) => {
                info!(
                    "Blueprint '{}' captured ({} pieces within {})",
                    blueprint.id,
                    blueprint.piece_count(),
                    radius
                );
                let extent = blueprint.extent(config.extent_margin);
                captured_events.send(BlueprintCaptured { blueprint, extent });
            }
            Err(e) => warn!("Could not capture blueprint {}: {}", ev.id, e),
        }
    }
}

/// System that processes `PlaceBlueprint` events.
fn handle_place_blueprint(
    mut events: EventReader<PlaceBlueprint>,
    mut commands: Commands,
    catalog: Res<PieceTypes>,
    config: Res<BlueprintConfig>,
    mut stats: ResMut<BuildStats>,
    mut placed_events: EventWriter<BlueprintPlaced>,
) {
    for ev in events.read() {
        let plan = instantiate(&ev.blueprint, ev.target, &*catalog, config.max_place_effects);
        let mut lifecycle = CommandsLifecycle {
            commands: &mut commands,
        };
        let (result, _) = apply_plan(&plan, &mut lifecycle, &mut *stats);
        info!(
            "Blueprint '{}' placed at {} ({} spawned, {} missing types)",
            ev.blueprint.id, ev.target.position, result.spawned, result.missing
        );
        placed_events.send(BlueprintPlaced {
            id: ev.blueprint.id.clone(),
            target: ev.target,
            extent: ev.blueprint.extent(config.extent_margin),
            result,
        });
    }
}

fn handle_preview_capture(
    mut events: EventReader<PreviewCapture>,
    pieces: Query<(&PlacedPiece, Option<&PieceText>)>,
    config: Res<BlueprintConfig>,
    mut previews: EventWriter<CapturePreview>,
) {
    for ev in events.read() {
        let radius = ev.radius.unwrap_or(config.selection_radius);
        let count = count_in_radius(
            &PieceSnapshot::take(&pieces),
            ev.origin.position,
            radius,
            config.height_tolerance,
        );
        previews.send(CapturePreview {
            origin: ev.origin,
            radius,
            count,
        });
    }
}

fn handle_adjust_selection_radius(
    mut events: EventReader<AdjustSelectionRadius>,
    mut config: ResMut<BlueprintConfig>,
) {
    for ev in events.read() {
        let radius = adjust_selection_radius(
            config.selection_radius,
            ev.delta,
            config.min_selection_radius,
        );
        if radius != config.selection_radius {
            config.selection_radius = radius;
            debug!("Selection radius now {}", radius);
        }
    }
}

/// Placement effects are one-shot.
fn clear_place_effects(mut commands: Commands, effects: Query<Entity, With<PlaceEffect>>) {
    for entity in &effects {
        commands.entity(entity).remove::<PlaceEffect>();
    }
}

// =============================================================================
// Plugin
// =============================================================================

pub struct BlueprintPlugin;

impl Plugin for BlueprintPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<BlueprintConfig>()
            .init_resource::<BuildStats>()
            .init_resource::<PieceTypes>()
            .init_resource::<BlueprintPieces>()
            .add_event::<CaptureBlueprint>()
            .add_event::<BlueprintCaptured>()
            .add_event::<PlaceBlueprint>()
            .add_event::<BlueprintPlaced>()
            .add_event::<PreviewCapture>()
            .add_event::<CapturePreview>()
            .add_event::<AdjustSelectionRadius>()
            .add_systems(First, clear_place_effects)
            .add_systems(
                Update,
                (
                    handle_adjust_selection_radius,
                    (handle_preview_capture, handle_capture_blueprint),
                    handle_place_blueprint,
                )
                    .chain(),
            );
    }
}
