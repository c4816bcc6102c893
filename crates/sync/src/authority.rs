// ---------------------------------------------------------------------------
// authority – Serving list and push requests from the canonical collection
// ---------------------------------------------------------------------------

use std::path::PathBuf;

use bevy::prelude::*;

use blueprints::{BlueprintConfig, BlueprintError, BlueprintRegistrar};
use save::{decode_blueprint, encode_collection, BlueprintStore};

use crate::connection::{PeerConnection, PeerId};
use crate::messages::SyncMessage;
use crate::requests::RequestToken;
use crate::transport::{Envelope, Transport};

/// Counters for what the authority has served.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AuthorityStats {
    pub lists_served: u32,
    pub pushes_accepted: u32,
    pub pushes_rejected: u32,
    pub messages_dropped: u32,
}

/// Authority-role sync state.
#[derive(Resource, Debug, Clone)]
pub struct SyncAuthority {
    enabled: bool,
    search_directories: Vec<PathBuf>,
    extensions: Vec<String>,
    pub stats: AuthorityStats,
}

impl Default for SyncAuthority {
    fn default() -> Self {
        Self::from_config(&BlueprintConfig::default())
    }
}

impl SyncAuthority {
    pub fn from_config(config: &BlueprintConfig) -> Self {
        Self {
            enabled: config.allow_remote_blueprints,
            search_directories: config.search_directories.clone(),
            extensions: config.extensions.clone(),
            stats: AuthorityStats::default(),
        }
    }

    /// Handle one inbound message. Malformed envelopes and messages from
    /// unknown peers are dropped; every decodable request is answered.
    pub fn handle<T, R>(
        &mut self,
        envelope: Envelope,
        conn: &PeerConnection,
        store: &mut BlueprintStore,
        registrar: &mut R,
        transport: &mut T,
    ) where
        T: Transport + ?Sized,
        R: BlueprintRegistrar + ?Sized,
    {
        let from = envelope.from;
        if !conn.is_known_peer(from) {
            warn!("Dropping blueprint sync message from unknown peer {}", from.0);
            self.stats.messages_dropped += 1;
            return;
        }
        let message = match SyncMessage::from_bytes(&envelope.bytes) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping malformed message from peer {}: {}", from.0, e);
                self.stats.messages_dropped += 1;
                return;
            }
        };

        let reply = match message {
            SyncMessage::ListRequest { token } => {
                self.handle_list(RequestToken(token), from, store)
            }
            SyncMessage::PushRequest { token, blueprint } => {
                self.handle_push(RequestToken(token), from, &blueprint, store, registrar)
            }
            other => {
                debug!("Authority ignoring {} response", other.rpc_name());
                return;
            }
        };
        transport.send(from, reply.to_bytes());
    }

    fn handle_list(
        &mut self,
        token: RequestToken,
        from: PeerId,
        store: &mut BlueprintStore,
    ) -> SyncMessage {
        let collection = if self.enabled {
            // Pick up files dropped into the blueprint directories since the
            // last scan.
            store.load(&self.search_directories, &self.extensions);
            info!("Sending {} blueprints to peer {}", store.len(), from.0);
            encode_collection(store.iter())
        } else {
            info!("Server blueprints disabled, sending none to peer {}", from.0);
            encode_collection(std::iter::empty())
        };
        self.stats.lists_served += 1;
        SyncMessage::ListResponse {
            token: token.0,
            collection,
        }
    }

    fn handle_push<R: BlueprintRegistrar + ?Sized>(
        &mut self,
        token: RequestToken,
        from: PeerId,
        bytes: &[u8],
        store: &mut BlueprintStore,
        registrar: &mut R,
    ) -> SyncMessage {
        match self.accept_push(bytes, store, registrar) {
            Ok(id) => {
                info!("Received blueprint {} from peer {}", id, from.0);
                self.stats.pushes_accepted += 1;
                SyncMessage::push_success(token, &id)
            }
            Err(e) => {
                warn!("Rejected blueprint push from peer {}: {}", from.0, e);
                self.stats.pushes_rejected += 1;
                SyncMessage::push_failure(token, &e)
            }
        }
    }

    fn accept_push<R: BlueprintRegistrar + ?Sized>(
        &self,
        bytes: &[u8],
        store: &mut BlueprintStore,
        registrar: &mut R,
    ) -> Result<String, BlueprintError> {
        if !self.enabled {
            return Err(BlueprintError::FeatureDisabled);
        }
        let blueprint = decode_blueprint(bytes)?;
        if store.contains(&blueprint.id) {
            return Err(BlueprintError::DuplicateId(blueprint.id));
        }
        store.persist(&blueprint)?;
        let id = blueprint.id.clone();
        registrar.register(&blueprint);
        store.insert(blueprint)?;
        Ok(id)
    }
}
