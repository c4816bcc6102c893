use bevy::prelude::*;

use blueprints::{
    BlueprintCaptured, BlueprintConfig, BlueprintPieces, BlueprintRegistrar, CaptureOrigin,
    PlaceBlueprint,
};

use crate::local_store::BlueprintStore;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Write the stored blueprint `id` to the save directory.
#[derive(Event, Debug, Clone)]
pub struct SaveBlueprintEvent {
    pub id: String,
}

/// Place the stored blueprint `id` at `target`.
#[derive(Event, Debug, Clone)]
pub struct PlaceStoredBlueprint {
    pub id: String,
    pub target: CaptureOrigin,
}

/// Systems that populate the local store. Anything reading the store at
/// `Startup` should run after this set.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreLoadSet;

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

pub struct StorePlugin;

impl Plugin for StorePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<BlueprintConfig>()
            .init_resource::<BlueprintPieces>()
            .init_resource::<BlueprintStore>()
            .add_event::<BlueprintCaptured>()
            .add_event::<PlaceBlueprint>()
            .add_event::<SaveBlueprintEvent>()
            .add_event::<PlaceStoredBlueprint>()
            .add_systems(Startup, load_local_blueprints.in_set(StoreLoadSet))
            .add_systems(
                Update,
                (
                    store_captured_blueprints,
                    handle_save_blueprint,
                    handle_place_stored_blueprint,
                ),
            );
    }
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

/// Builds the store from the config and loads every search directory.
fn load_local_blueprints(
    config: Res<BlueprintConfig>,
    mut store: ResMut<BlueprintStore>,
    mut pieces: ResMut<BlueprintPieces>,
) {
    *store = BlueprintStore::from_config(&config);
    let report = store.load(&config.search_directories, &config.extensions);
    if report.tmp_cleaned > 0 {
        info!("Removed {} interrupted blueprint writes", report.tmp_cleaned);
    }
    for blueprint in store.iter() {
        pieces.register(blueprint);
    }
}

/// A fresh capture gets a default ID if it has none, then is stored, written
/// and registered as a placeable piece.
fn store_captured_blueprints(
    mut events: EventReader<BlueprintCaptured>,
    mut store: ResMut<BlueprintStore>,
    mut pieces: ResMut<BlueprintPieces>,
) {
    for ev in events.read() {
        let blueprint = if ev.blueprint.id.is_empty() {
            ev.blueprint.clone().renamed(store.next_default_id())
        } else {
            ev.blueprint.clone()
        };
        let id = blueprint.id.clone();

        if store.contains(&id) {
            warn!("Blueprint ID {} already exists", id);
            continue;
        }
        if let Err(e) = store.persist(&blueprint) {
            warn!("{}", e);
            continue;
        }
        pieces.register(&blueprint);
        if let Err(e) = store.insert(blueprint) {
            warn!("{}", e);
            continue;
        }
        info!("Blueprint {} stored", id);
    }
}

fn handle_save_blueprint(
    mut events: EventReader<SaveBlueprintEvent>,
    store: Res<BlueprintStore>,
) {
    for ev in events.read() {
        match store.save(&ev.id) {
            Ok(path) => info!("Blueprint {} saved to {}", ev.id, path.display()),
            Err(e) => warn!("{}", e),
        }
    }
}

fn handle_place_stored_blueprint(
    mut events: EventReader<PlaceStoredBlueprint>,
    store: Res<BlueprintStore>,
    mut place: EventWriter<PlaceBlueprint>,
) {
    for ev in events.read() {
        match store.get(&ev.id) {
            Some(blueprint) => {
                place.send(PlaceBlueprint {
                    blueprint: blueprint.clone(),
                    target: ev.target,
                });
            }
            None => warn!("No local blueprint {}", ev.id),
        }
    }
}
