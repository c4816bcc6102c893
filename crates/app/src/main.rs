//! Headless blueprint demo.
//!
//! Runs an authority and a client in one process over an in-memory
//! transport: the client captures a few placed objects, pushes the result to
//! the server, lists the server collection, pulls it back and places it.
//!
//! Environment:
//!   BLUEPRINT_CONFIG   path to a JSON `BlueprintConfig` (defaults if absent)
//!   BLUEPRINT_DEMO_DIR working directory for both peers' blueprint files

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bevy::app::AppExit;
use bevy::ecs::event::EventCursor;
use bevy::log::LogPlugin;
use bevy::prelude::*;

use blueprint_sync::{
    ConnectionStatus, ListRemoteBlueprints, LoopbackHub, PeerConnection, PeerId,
    PullRemoteBlueprint, PushLocalBlueprint, SyncClient, SyncCompleted, SyncOperation, SyncPlugin,
    SyncTransport,
};
use blueprints::{
    BlueprintConfig, BlueprintPlaced, BlueprintPlugin, CaptureBlueprint, CaptureOrigin,
    PieceTypes, PlacedPiece,
};
use save::{BlueprintStore, PlaceStoredBlueprint, StorePlugin};

const AUTHORITY: PeerId = PeerId(1);
const CLIENT: PeerId = PeerId(2);

/// Frames to wait for a reply before giving up.
const MAX_PUMP_FRAMES: usize = 16;

const DEMO_ID: &str = "demo_hut";

fn main() -> ExitCode {
    let config_path = std::env::var_os("BLUEPRINT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("blueprints.json"));
    let root = std::env::var_os("BLUEPRINT_DEMO_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("blueprint-demo"));
    let config = BlueprintConfig::load_or_default(&config_path);

    match run(&config, &root) {
        Ok(placed) => {
            info!("Demo finished, {} pieces placed from {}", placed, DEMO_ID);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Demo failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ---------------------------------------------------------------------------
// Peers
// ---------------------------------------------------------------------------

struct Peer {
    app: App,
    cursor: EventCursor<SyncCompleted>,
}

impl Peer {
    fn new(mut app: App) -> Self {
        // Startup runs on the first update.
        app.update();
        Self {
            app,
            cursor: EventCursor::default(),
        }
    }

    /// Sync outcomes since the last call, rendered for logging.
    fn completions(&mut self) -> Vec<(SyncOperation, Result<String, String>)> {
        let events = self.app.world().resource::<Events<SyncCompleted>>();
        self.cursor
            .read(events)
            .map(|e| {
                let result = match &e.result {
                    Ok(outcome) => Ok(format!("{outcome:?}")),
                    Err(err) => Err(err.to_string()),
                };
                (e.operation.clone(), result)
            })
            .collect()
    }
}

fn peer_app(config: &BlueprintConfig, dir: &Path, conn: PeerConnection, hub: &LoopbackHub) -> App {
    let local = conn.local;
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    // One global subscriber serves both apps.
    if local == AUTHORITY {
        app.add_plugins(LogPlugin::default());
    }
    app.insert_resource(BlueprintConfig {
        search_directories: vec![dir.to_path_buf()],
        save_directory: dir.to_path_buf(),
        ..config.clone()
    });
    app.insert_resource(PieceTypes(
        ["wood_floor", "wood_wall", "wood_roof"]
            .into_iter()
            .map(String::from)
            .collect(),
    ));
    app.insert_resource(conn);
    app.insert_resource(SyncTransport::new(hub.endpoint(local)));
    app.add_plugins((BlueprintPlugin, StorePlugin, SyncPlugin));
    app
}

/// Ticks both peers until the client reports `operation`.
fn pump(server: &mut Peer, client: &mut Peer, operation: &SyncOperation) -> Result<String, String> {
    for _ in 0..MAX_PUMP_FRAMES {
        client.app.update();
        server.app.update();
        if let Some((_, result)) = client
            .completions()
            .into_iter()
            .find(|(done, _)| done == operation)
        {
            return result;
        }
    }
    Err(format!("no reply to {operation:?} after {MAX_PUMP_FRAMES} frames"))
}

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

fn run(config: &BlueprintConfig, root: &Path) -> Result<u32, String> {
    let server_dir = root.join("server");
    let client_dir = root.join("client");
    for dir in [&server_dir, &client_dir] {
        std::fs::create_dir_all(dir).map_err(|e| format!("{}: {}", dir.display(), e))?;
    }
    // Leftovers from an earlier run would turn the push into a duplicate.
    let file_name = format!("{DEMO_ID}.{}", config.write_extension());
    for dir in [&server_dir, &client_dir] {
        let _ = std::fs::remove_file(dir.join(&file_name));
    }

    let hub = LoopbackHub::new();
    let mut server_conn = PeerConnection::authority(AUTHORITY);
    server_conn.add_peer(CLIENT);
    let mut client_conn = PeerConnection::client(CLIENT, AUTHORITY);
    client_conn.set_status(ConnectionStatus::Connected);

    let mut server = Peer::new(peer_app(config, &server_dir, server_conn, &hub));
    let mut client = Peer::new(peer_app(config, &client_dir, client_conn, &hub));

    // A small hut around the origin.
    let world = client.app.world_mut();
    for (type_id, x, z) in [
        ("wood_floor", 0.0, 0.0),
        ("wood_floor", 2.0, 0.0),
        ("wood_wall", -1.0, 1.0),
        ("wood_wall", 3.0, 1.0),
    ] {
        world.spawn(PlacedPiece {
            type_id: type_id.into(),
            position: Vec3::new(x, 0.0, z),
            rotation: Quat::IDENTITY,
        });
    }
    world.spawn(PlacedPiece {
        type_id: "wood_roof".into(),
        position: Vec3::new(1.0, 2.5, 0.5),
        rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
    });
    world.send_event(CaptureBlueprint {
        id: DEMO_ID.into(),
        origin: CaptureOrigin::at(Vec3::ZERO),
        radius: None,
    });
    client.app.update();
    client.app.update();
    if !client.app.world().resource::<BlueprintStore>().contains(DEMO_ID) {
        return Err(format!("capture did not store {DEMO_ID}"));
    }
    info!("Captured {}", DEMO_ID);

    client.app.world_mut().send_event(PushLocalBlueprint { id: DEMO_ID.into() });
    let pushed = pump(
        &mut server,
        &mut client,
        &SyncOperation::Push { id: DEMO_ID.into() },
    )?;
    info!("Push: {}", pushed);

    client
        .app
        .world_mut()
        .send_event(ListRemoteBlueprints { use_cache: false });
    let listed = pump(&mut server, &mut client, &SyncOperation::List)?;
    info!(
        "List: {} ({:?})",
        listed,
        client
            .app
            .world()
            .resource::<SyncClient>()
            .cache()
            .ids()
            .collect::<Vec<_>>()
    );

    client.app.world_mut().send_event(PullRemoteBlueprint { id: DEMO_ID.into() });
    let pulled = pump(
        &mut server,
        &mut client,
        &SyncOperation::Pull { id: DEMO_ID.into() },
    )?;
    info!("Pull: {}", pulled);

    client.app.world_mut().send_event(PlaceStoredBlueprint {
        id: DEMO_ID.into(),
        target: CaptureOrigin::at(Vec3::new(20.0, 0.0, 0.0)),
    });
    let mut placed_cursor = EventCursor::<BlueprintPlaced>::default();
    let mut placed = None;
    for _ in 0..MAX_PUMP_FRAMES {
        client.app.update();
        let events = client.app.world().resource::<Events<BlueprintPlaced>>();
        if let Some(event) = placed_cursor.read(events).find(|e| e.id == DEMO_ID) {
            placed = Some(event.result.spawned);
            break;
        }
    }

    client.app.world_mut().send_event(AppExit::Success);
    client.app.update();
    server.app.world_mut().send_event(AppExit::Success);
    server.app.update();

    placed.ok_or_else(|| format!("{DEMO_ID} was never placed"))
}
