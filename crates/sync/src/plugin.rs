use std::sync::{Arc, Mutex, PoisonError};

use bevy::app::AppExit;
use bevy::prelude::*;

use blueprints::{BlueprintConfig, BlueprintError, BlueprintPieces};
use save::{BlueprintStore, StoreLoadSet};

use crate::authority::SyncAuthority;
use crate::client::SyncClient;
use crate::connection::{ConnectionState, PeerConnection};
use crate::requests::{SyncCallback, SyncResult};
use crate::transport::SyncTransport;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Fetch the server's blueprint list into the remote cache.
#[derive(Event, Debug, Clone, Copy)]
pub struct ListRemoteBlueprints {
    pub use_cache: bool,
}

/// Send a local blueprint to the server.
#[derive(Event, Debug, Clone)]
pub struct PushLocalBlueprint {
    pub id: String,
}

/// Send a cached server blueprint back to the server.
#[derive(Event, Debug, Clone)]
pub struct PushCachedBlueprint {
    pub id: String,
}

/// Copy a cached server blueprint into the local store.
#[derive(Event, Debug, Clone)]
pub struct PullRemoteBlueprint {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOperation {
    List,
    Push { id: String },
    PushCached { id: String },
    Pull { id: String },
}

/// Outcome of a list/push/pull, fired on the tick it completes.
#[derive(Event, Debug)]
pub struct SyncCompleted {
    pub operation: SyncOperation,
    pub result: SyncResult,
}

// ---------------------------------------------------------------------------
// Completion buffer
// ---------------------------------------------------------------------------

/// Callbacks run inside systems that cannot write events; they park their
/// outcome here and `emit_sync_completions` turns it into events.
#[derive(Resource, Default, Clone)]
pub(crate) struct SyncCompletionBuffer(pub(crate) Arc<Mutex<Vec<SyncCompleted>>>);

impl SyncCompletionBuffer {
    fn callback(&self, operation: SyncOperation) -> SyncCallback {
        let slot = self.0.clone();
        Box::new(move |result| {
            slot.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(SyncCompleted { operation, result });
        })
    }

    fn drain(&self) -> Vec<SyncCompleted> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

/// Ordering of the per-tick sync work.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SyncSet {
    Receive,
    Requests,
    Emit,
}

/// Client/authority blueprint sync. Needs a [`PeerConnection`] and a
/// [`SyncTransport`] resource; the role in `PeerConnection` decides which
/// side of the protocol this app runs.
pub struct SyncPlugin;

impl Plugin for SyncPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<BlueprintConfig>()
            .init_resource::<BlueprintStore>()
            .init_resource::<BlueprintPieces>()
            .init_resource::<SyncClient>()
            .init_resource::<SyncCompletionBuffer>()
            .add_event::<ListRemoteBlueprints>()
            .add_event::<PushLocalBlueprint>()
            .add_event::<PushCachedBlueprint>()
            .add_event::<PullRemoteBlueprint>()
            .add_event::<SyncCompleted>()
            .configure_sets(
                Update,
                (SyncSet::Receive, SyncSet::Requests, SyncSet::Emit).chain(),
            )
            .add_systems(Startup, on_start.after(StoreLoadSet))
            .add_systems(PreUpdate, (apply_sync_config, reset_on_disconnect))
            .add_systems(
                Update,
                (
                    receive_sync_messages.in_set(SyncSet::Receive),
                    (
                        handle_list_requests,
                        handle_push_requests,
                        handle_push_cached_requests,
                        handle_pull_requests,
                    )
                        .chain()
                        .in_set(SyncSet::Requests),
                    emit_sync_completions.in_set(SyncSet::Emit),
                ),
            )
            .add_systems(Last, on_shutdown);
    }
}

// ---------------------------------------------------------------------------
// Lifecycle systems
// ---------------------------------------------------------------------------

fn on_start(
    mut commands: Commands,
    config: Res<BlueprintConfig>,
    store: Res<BlueprintStore>,
    mut pieces: ResMut<BlueprintPieces>,
    mut client: ResMut<SyncClient>,
) {
    commands.insert_resource(SyncAuthority::from_config(&config));
    client.set_enabled(config.allow_remote_blueprints);
    client.on_start(&store, &mut *pieces);
}

fn apply_sync_config(
    config: Res<BlueprintConfig>,
    mut client: ResMut<SyncClient>,
    authority: Option<ResMut<SyncAuthority>>,
) {
    if !config.is_changed() {
        return;
    }
    client.set_enabled(config.allow_remote_blueprints);
    if let Some(mut authority) = authority {
        let stats = authority.stats;
        *authority = SyncAuthority::from_config(&config);
        authority.stats = stats;
    }
}

/// A lost connection ends the session: unanswered requests are forgotten.
fn reset_on_disconnect(conn: Option<Res<PeerConnection>>, mut client: ResMut<SyncClient>) {
    let Some(conn) = conn else {
        return;
    };
    if conn.is_changed() && !conn.is_authority() && !conn.is_connected() {
        client.on_shutdown();
    }
}

fn on_shutdown(mut exits: EventReader<AppExit>, mut client: ResMut<SyncClient>) {
    if exits.read().next().is_some() {
        client.on_shutdown();
    }
}

// ---------------------------------------------------------------------------
// Per-tick systems
// ---------------------------------------------------------------------------

/// Drains the transport once per tick and routes by role.
fn receive_sync_messages(
    transport: Option<ResMut<SyncTransport>>,
    conn: Option<Res<PeerConnection>>,
    mut client: ResMut<SyncClient>,
    authority: Option<ResMut<SyncAuthority>>,
    mut store: ResMut<BlueprintStore>,
    mut pieces: ResMut<BlueprintPieces>,
) {
    let (Some(mut transport), Some(conn)) = (transport, conn) else {
        return;
    };
    let inbound = transport.0.drain();
    if inbound.is_empty() {
        return;
    }

    if conn.is_authority() {
        let Some(mut authority) = authority else {
            return;
        };
        for envelope in inbound {
            authority.handle(
                envelope,
                &conn,
                &mut store,
                &mut *pieces,
                transport.0.as_mut(),
            );
        }
    } else {
        for envelope in inbound {
            client.receive(envelope, &*conn);
        }
    }
}

/// Why a request cannot go out when the app has no transport or connection.
fn unreachable_reason(client: &SyncClient) -> BlueprintError {
    if client.is_enabled() {
        BlueprintError::NotConnected
    } else {
        BlueprintError::FeatureDisabled
    }
}

fn handle_list_requests(
    mut events: EventReader<ListRemoteBlueprints>,
    transport: Option<ResMut<SyncTransport>>,
    conn: Option<Res<PeerConnection>>,
    mut client: ResMut<SyncClient>,
    buffer: Res<SyncCompletionBuffer>,
) {
    let (Some(mut transport), Some(conn)) = (transport, conn) else {
        for _ in events.read() {
            buffer.callback(SyncOperation::List)(Err(unreachable_reason(&client)));
        }
        return;
    };
    for ev in events.read() {
        client.list(
            ev.use_cache,
            &*conn,
            transport.0.as_mut(),
            buffer.callback(SyncOperation::List),
        );
    }
}

fn handle_push_requests(
    mut events: EventReader<PushLocalBlueprint>,
    transport: Option<ResMut<SyncTransport>>,
    conn: Option<Res<PeerConnection>>,
    store: Res<BlueprintStore>,
    mut client: ResMut<SyncClient>,
    buffer: Res<SyncCompletionBuffer>,
) {
    let (Some(mut transport), Some(conn)) = (transport, conn) else {
        for ev in events.read() {
            buffer.callback(SyncOperation::Push { id: ev.id.clone() })(Err(
                unreachable_reason(&client),
            ));
        }
        return;
    };
    for ev in events.read() {
        client.push(
            &ev.id,
            &store,
            &*conn,
            transport.0.as_mut(),
            buffer.callback(SyncOperation::Push { id: ev.id.clone() }),
        );
    }
}

fn handle_push_cached_requests(
    mut events: EventReader<PushCachedBlueprint>,
    transport: Option<ResMut<SyncTransport>>,
    conn: Option<Res<PeerConnection>>,
    mut client: ResMut<SyncClient>,
    buffer: Res<SyncCompletionBuffer>,
) {
    let (Some(mut transport), Some(conn)) = (transport, conn) else {
        for ev in events.read() {
            buffer.callback(SyncOperation::PushCached { id: ev.id.clone() })(Err(
                unreachable_reason(&client),
            ));
        }
        return;
    };
    for ev in events.read() {
        client.push_cached(
            &ev.id,
            &*conn,
            transport.0.as_mut(),
            buffer.callback(SyncOperation::PushCached { id: ev.id.clone() }),
        );
    }
}

fn handle_pull_requests(
    mut events: EventReader<PullRemoteBlueprint>,
    client: Res<SyncClient>,
    mut store: ResMut<BlueprintStore>,
    mut pieces: ResMut<BlueprintPieces>,
    mut completed: EventWriter<SyncCompleted>,
) {
    for ev in events.read() {
        let result = client.pull(&ev.id, &mut store, &mut *pieces);
        if let Err(e) = &result {
            warn!("Could not pull blueprint {}: {}", ev.id, e);
        }
        completed.send(SyncCompleted {
            operation: SyncOperation::Pull { id: ev.id.clone() },
            result,
        });
    }
}

fn emit_sync_completions(
    buffer: Res<SyncCompletionBuffer>,
    mut completed: EventWriter<SyncCompleted>,
) {
    for event in buffer.drain() {
        completed.send(event);
    }
}
