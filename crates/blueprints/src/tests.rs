//! Unit tests for capture, placement and the blueprint plugin.

use std::collections::BTreeSet;
use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;

use super::*;

const EPS: f32 = 1e-4;

fn catalog(types: &[&str]) -> BTreeSet<String> {
    types.iter().map(|t| t.to_string()).collect()
}

fn small_hut() -> Vec<PlacedObject> {
    vec![
        PlacedObject::new("wood_floor", Vec3::new(100.0, 10.0, 50.0), Quat::IDENTITY),
        PlacedObject::new(
            "wood_wall",
            Vec3::new(102.0, 11.0, 50.0),
            Quat::from_rotation_y(FRAC_PI_2),
        ),
        PlacedObject {
            type_id: "sign".to_string(),
            position: Vec3::new(99.0, 12.5, 53.0),
            rotation: Quat::from_rotation_y(0.3),
            aux_text: "Welcome".to_string(),
        },
        // Far away: outside any sensible radius.
        PlacedObject::new("wood_wall", Vec3::new(400.0, 10.0, 400.0), Quat::IDENTITY),
    ]
}

/// Records everything a placement asks the host to do.
#[derive(Default)]
struct RecordingHost {
    spawned: Vec<(String, Vec3, Quat)>,
    texts: Vec<(usize, String)>,
    effects: usize,
    refuse: Option<String>,
}

impl ObjectLifecycle for RecordingHost {
    type Handle = usize;

    fn spawn(&mut self, type_id: &str, position: Vec3, rotation: Quat) -> Option<usize> {
        if self.refuse.as_deref() == Some(type_id) {
            return None;
        }
        self.spawned.push((type_id.to_string(), position, rotation));
        Some(self.spawned.len() - 1)
    }

    fn set_text(&mut self, handle: &usize, text: &str) {
        self.texts.push((*handle, text.to_string()));
    }

    fn play_place_effect(&mut self, _handle: &usize) {
        self.effects += 1;
    }
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

#[test]
fn test_capture_takes_only_objects_in_radius() {
    let world = small_hut();
    let origin = CaptureOrigin::at(Vec3::new(100.0, 10.0, 50.0));
    let bp = capture(&world, "hut", origin, 10.0, 1.0).expect("capture should succeed");

    assert_eq!(bp.id, "hut");
    assert_eq!(bp.piece_count(), 3);
    assert_eq!(bp.entries[0].type_id, "wood_floor");
    assert_eq!(bp.entries[1].type_id, "wood_wall");
    assert_eq!(bp.entries[2].type_id, "sign");
    assert_eq!(bp.entries[2].aux_text, "Welcome");
}

#[test]
fn test_capture_offsets_are_relative_to_origin() {
    let world = small_hut();
    let origin = CaptureOrigin::at(Vec3::new(100.0, 10.0, 50.0));
    let bp = capture(&world, "hut", origin, 10.0, 1.0).unwrap();

    assert!(bp.entries[0].offset.abs_diff_eq(Vec3::ZERO, EPS));
    assert!(bp.entries[1].offset.abs_diff_eq(Vec3::new(2.0, 1.0, 0.0), EPS));
    assert!(bp.entries[2].offset.abs_diff_eq(Vec3::new(-1.0, 2.5, 3.0), EPS));
}

#[test]
fn test_capture_uses_origin_rotation() {
    // Origin turned a quarter turn: world +X becomes a local axis.
    let world = vec![PlacedObject::new(
        "stake",
        Vec3::new(3.0, 0.0, 0.0),
        Quat::from_rotation_y(FRAC_PI_2),
    )];
    let origin = CaptureOrigin::new(Vec3::ZERO, Quat::from_rotation_y(FRAC_PI_2));
    let bp = capture(&world, "stake", origin, 5.0, 1.0).unwrap();

    let entry = &bp.entries[0];
    assert!(entry.rotation.abs_diff_eq(Quat::IDENTITY, EPS));
    assert!((entry.offset.length() - 3.0).abs() < EPS);
    assert!(
        (Quat::from_rotation_y(FRAC_PI_2) * entry.offset).abs_diff_eq(Vec3::new(3.0, 0.0, 0.0), EPS)
    );
}

#[test]
fn test_capture_distance_is_horizontal_only() {
    let world = vec![PlacedObject::new(
        "banner",
        Vec3::new(1.0, 40.0, 0.0),
        Quat::IDENTITY,
    )];
    let bp = capture(&world, "tall", CaptureOrigin::at(Vec3::ZERO), 2.0, 1.0).unwrap();
    assert_eq!(bp.piece_count(), 1);
}

#[test]
fn test_capture_height_tolerance_below_origin() {
    let world = vec![
        PlacedObject::new("foundation", Vec3::new(0.0, -0.5, 0.0), Quat::IDENTITY),
        PlacedObject::new("cellar", Vec3::new(0.0, -8.0, 0.0), Quat::IDENTITY),
    ];
    let bp = capture(&world, "base", CaptureOrigin::at(Vec3::ZERO), 5.0, 1.0).unwrap();
    assert_eq!(bp.piece_count(), 1);
    assert_eq!(bp.entries[0].type_id, "foundation");
}

#[test]
fn test_capture_single_object_succeeds() {
    let world = vec![PlacedObject::new("chest", Vec3::new(0.5, 0.0, 0.5), Quat::IDENTITY)];
    let bp = capture(&world, "one", CaptureOrigin::at(Vec3::ZERO), 2.0, 1.0).unwrap();
    assert_eq!(bp.piece_count(), 1);
}

#[test]
fn test_capture_zero_radius_fails() {
    let world = small_hut();
    let result = capture(&world, "none", CaptureOrigin::at(Vec3::new(100.0, 10.0, 50.0)), 0.0, 1.0);
    assert!(matches!(result, Err(BlueprintError::EmptyCapture { .. })));
}

#[test]
fn test_capture_empty_world_fails() {
    let world: Vec<PlacedObject> = Vec::new();
    let result = capture(&world, "none", CaptureOrigin::at(Vec3::ZERO), 50.0, 1.0);
    assert!(result.is_err());
}

#[test]
fn test_count_in_radius_matches_capture() {
    let world = small_hut();
    let origin = Vec3::new(100.0, 10.0, 50.0);
    assert_eq!(count_in_radius(&world, origin, 10.0, 1.0), 3);
    assert_eq!(count_in_radius(&world, origin, 0.0, 1.0), 0);
    assert_eq!(count_in_radius(&world, origin, 1000.0, 1.0), 4);
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

#[test]
fn test_capture_then_place_at_same_origin_restores_world() {
    let world = small_hut();
    let origin = CaptureOrigin::new(Vec3::new(100.0, 10.0, 50.0), Quat::from_rotation_y(0.7));
    let bp = capture(&world, "hut", origin, 10.0, 1.0).unwrap();

    let plan = instantiate(&bp, origin, &catalog(&["wood_floor", "wood_wall", "sign"]), 10);
    assert_eq!(plan.instructions.len(), 3);
    for (instruction, original) in plan.instructions.iter().zip(world.iter()) {
        assert_eq!(instruction.type_id, original.type_id);
        assert!(
            instruction.position.abs_diff_eq(original.position, EPS),
            "{} vs {}",
            instruction.position,
            original.position
        );
        assert!(instruction.rotation.abs_diff_eq(original.rotation, EPS));
        assert_eq!(instruction.aux_text, original.aux_text);
    }
}

#[test]
fn test_place_rotates_offsets_into_target_frame() {
    let bp = Blueprint::new(
        "arrow",
        vec![PieceEntry::new("stake", Vec3::new(0.0, 0.0, 2.0), Quat::IDENTITY)],
    );
    let target = CaptureOrigin::new(Vec3::new(10.0, 0.0, 10.0), Quat::from_rotation_y(FRAC_PI_2));
    let plan = instantiate(&bp, target, &catalog(&["stake"]), 10);

    let expected = Vec3::new(10.0, 0.0, 10.0) + Quat::from_rotation_y(FRAC_PI_2) * Vec3::new(0.0, 0.0, 2.0);
    assert!(plan.instructions[0].position.abs_diff_eq(expected, EPS));
    assert!(plan.instructions[0]
        .rotation
        .abs_diff_eq(Quat::from_rotation_y(FRAC_PI_2), EPS));
}

#[test]
fn test_missing_type_skips_only_that_entry() {
    let mut entries: Vec<PieceEntry> = (0..500)
        .map(|i| PieceEntry::new("stone_wall", Vec3::new(i as f32, 0.0, 0.0), Quat::IDENTITY))
        .collect();
    entries[250].type_id = "removed_by_update".to_string();
    let bp = Blueprint::new("castle", entries);

    let plan = instantiate(&bp, CaptureOrigin::at(Vec3::ZERO), &catalog(&["stone_wall"]), 10);
    assert_eq!(plan.instructions.len(), 499);
    assert_eq!(plan.missing.len(), 1);
    assert!(matches!(
        &plan.missing[0],
        BlueprintError::MissingType(t) if t == "removed_by_update"
    ));
}

#[test]
fn test_rich_feedback_is_capped() {
    let entries: Vec<PieceEntry> = (0..25)
        .map(|i| PieceEntry::new("torch", Vec3::new(0.0, 0.0, i as f32), Quat::IDENTITY))
        .collect();
    let bp = Blueprint::new("torches", entries);

    let plan = instantiate(&bp, CaptureOrigin::at(Vec3::ZERO), &catalog(&["torch"]), 10);
    assert_eq!(plan.instructions.len(), 25);
    assert_eq!(plan.effect_count(), 10);
    assert!(plan.instructions[..10].iter().all(|i| i.rich_feedback));
    assert!(plan.instructions[10..].iter().all(|i| !i.rich_feedback));
}

#[test]
fn test_apply_plan_counts_builds_once_per_spawn() {
    let entries: Vec<PieceEntry> = (0..12)
        .map(|i| PieceEntry::new("torch", Vec3::new(i as f32, 0.0, 0.0), Quat::IDENTITY))
        .collect();
    let mut bp = Blueprint::new("torches", entries);
    bp.entries[3].aux_text = "north".to_string();
    let plan = instantiate(&bp, CaptureOrigin::at(Vec3::ZERO), &catalog(&["torch"]), 10);

    let mut host = RecordingHost::default();
    let mut stats = BuildStats::default();
    let (result, handles) = apply_plan(&plan, &mut host, &mut stats);

    assert_eq!(result.spawned, 12);
    assert_eq!(result.effects, 10);
    assert_eq!(host.effects, 10);
    assert_eq!(stats.builds, 12);
    assert_eq!(handles.len(), 12);
    assert_eq!(host.texts, vec![(3, "north".to_string())]);
}

#[test]
fn test_apply_plan_refused_spawn_is_not_counted() {
    let bp = Blueprint::new(
        "mixed",
        vec![
            PieceEntry::new("torch", Vec3::ZERO, Quat::IDENTITY),
            PieceEntry::new("portal", Vec3::X, Quat::IDENTITY),
        ],
    );
    let plan = instantiate(&bp, CaptureOrigin::at(Vec3::ZERO), &catalog(&["torch", "portal"]), 10);

    let mut host = RecordingHost {
        refuse: Some("portal".to_string()),
        ..Default::default()
    };
    let mut stats = BuildStats::default();
    let (result, _) = apply_plan(&plan, &mut host, &mut stats);

    assert_eq!(result.spawned, 1);
    assert_eq!(result.refused, 1);
    assert_eq!(stats.builds, 1);
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

fn plugin_app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.add_plugins(BlueprintPlugin);
    app.insert_resource(PieceTypes(catalog(&["wood_floor", "wood_wall", "sign"])));
    app
}

fn spawn_hut(app: &mut App) {
    for obj in small_hut() {
        let mut entity = app.world_mut().spawn(PlacedPiece {
            type_id: obj.type_id.clone(),
            position: obj.position,
            rotation: obj.rotation,
        });
        if !obj.aux_text.is_empty() {
            entity.insert(PieceText(obj.aux_text.clone()));
        }
    }
}

#[test]
fn test_plugin_capture_emits_captured_event() {
    let mut app = plugin_app();
    spawn_hut(&mut app);

    app.world_mut().send_event(CaptureBlueprint {
        id: "hut".to_string(),
        origin: CaptureOrigin::at(Vec3::new(100.0, 10.0, 50.0)),
        radius: None,
    });
    app.update();

    let events = app.world().resource::<Events<BlueprintCaptured>>();
    let mut reader = events.get_cursor();
    let captured: Vec<_> = reader.read(events).collect();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].blueprint.piece_count(), 3);
    assert!(captured[0]
        .blueprint
        .entries
        .iter()
        .any(|e| e.aux_text == "Welcome"));
}

#[test]
fn test_plugin_place_spawns_entities_and_counts_builds() {
    let mut app = plugin_app();
    let bp = Blueprint::new(
        "pair",
        vec![
            PieceEntry::new("wood_wall", Vec3::ZERO, Quat::IDENTITY),
            PieceEntry::new("sign", Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY).with_text("Hi"),
            PieceEntry::new("unknown", Vec3::new(2.0, 0.0, 0.0), Quat::IDENTITY),
        ],
    );
    app.world_mut().send_event(PlaceBlueprint {
        blueprint: bp,
        target: CaptureOrigin::at(Vec3::new(5.0, 0.0, 5.0)),
    });
    app.update();

    assert_eq!(app.world().resource::<BuildStats>().builds, 2);
    let mut query = app.world_mut().query::<&PlacedPiece>();
    assert_eq!(query.iter(app.world()).count(), 2);
    let mut texts = app.world_mut().query::<&PieceText>();
    assert_eq!(
        texts.iter(app.world()).map(|t| t.0.clone()).collect::<Vec<_>>(),
        vec!["Hi".to_string()]
    );
}

#[test]
fn test_plugin_capture_extent_uses_configured_margin() {
    let mut app = plugin_app();
    app.insert_resource(BlueprintConfig {
        extent_margin: 0.5,
        ..Default::default()
    });
    spawn_hut(&mut app);

    app.world_mut().send_event(CaptureBlueprint {
        id: "hut".to_string(),
        origin: CaptureOrigin::at(Vec3::new(100.0, 10.0, 50.0)),
        radius: None,
    });
    app.update();

    let events = app.world().resource::<Events<BlueprintCaptured>>();
    let mut reader = events.get_cursor();
    let captured: Vec<_> = reader.read(events).collect();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].extent.min, Vec2::new(-1.5, -0.5));
    assert_eq!(captured[0].extent.max, Vec2::new(2.5, 3.5));
}

#[test]
fn test_plugin_placed_event_carries_target_and_extent() {
    let mut app = plugin_app();
    app.insert_resource(BlueprintConfig {
        extent_margin: 2.0,
        ..Default::default()
    });
    let target = CaptureOrigin::at(Vec3::new(5.0, 0.0, 5.0));
    app.world_mut().send_event(PlaceBlueprint {
        blueprint: Blueprint::new(
            "post",
            vec![PieceEntry::new("wood_wall", Vec3::ZERO, Quat::IDENTITY)],
        ),
        target,
    });
    app.update();

    let events = app.world().resource::<Events<BlueprintPlaced>>();
    let mut reader = events.get_cursor();
    let placed: Vec<_> = reader.read(events).collect();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].target, target);
    assert_eq!(placed[0].extent.width(), 4.0);
    assert_eq!(placed[0].extent.depth(), 4.0);
}

#[test]
fn test_plugin_preview_counts_without_capturing() {
    let mut app = plugin_app();
    spawn_hut(&mut app);
    let origin = CaptureOrigin::at(Vec3::new(100.0, 10.0, 50.0));

    app.world_mut().send_event(PreviewCapture {
        origin,
        radius: None,
    });
    app.world_mut().send_event(PreviewCapture {
        origin,
        radius: Some(2.5),
    });
    app.update();

    let events = app.world().resource::<Events<CapturePreview>>();
    let mut reader = events.get_cursor();
    let counts: Vec<_> = reader.read(events).map(|p| (p.radius, p.count)).collect();
    assert_eq!(counts, vec![(10.0, 3), (2.5, 2)]);
    assert!(app.world().resource::<Events<BlueprintCaptured>>().is_empty());
}

#[test]
fn test_plugin_selection_radius_is_clamped_to_minimum() {
    let mut app = plugin_app();
    app.update();

    app.world_mut().send_event(AdjustSelectionRadius { delta: 5.0 });
    app.update();
    assert_eq!(app.world().resource::<BlueprintConfig>().selection_radius, 15.0);

    app.world_mut().send_event(AdjustSelectionRadius { delta: -100.0 });
    app.update();
    let config = app.world().resource::<BlueprintConfig>();
    assert_eq!(config.selection_radius, config.min_selection_radius);
}

#[test]
fn test_blueprint_pieces_register_and_release() {
    let mut pieces = BlueprintPieces::default();
    let bp = Blueprint::new("gate", Vec::new());
    pieces.register(&bp);
    assert!(pieces.is_registered("gate"));
    assert_eq!(BlueprintPieces::piece_name("gate"), "piece_blueprint (gate)");
    pieces.release("gate");
    assert!(!pieces.is_registered("gate"));
}
