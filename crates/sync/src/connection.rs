//! Peer identity, role and connection state.

use std::collections::BTreeSet;

use bevy::prelude::*;

/// Transport-level peer address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerRole {
    /// Owns the canonical collection and does all remote-side persistence.
    Authority,
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Role/connection queries the sync protocol needs from the host.
pub trait ConnectionState {
    fn is_authority(&self) -> bool;
    fn is_connected(&self) -> bool;
    fn current_peer_id(&self) -> PeerId;
    /// Where requests go. `None` until the authority is known.
    fn authority_peer(&self) -> Option<PeerId>;
}

/// This peer's view of the session.
#[derive(Resource, Debug, Clone)]
pub struct PeerConnection {
    pub local: PeerId,
    pub role: PeerRole,
    pub status: ConnectionStatus,
    /// The authority's address (a client's only correspondent).
    pub authority: Option<PeerId>,
    /// Peers the authority accepts messages from.
    known_peers: BTreeSet<PeerId>,
}

impl PeerConnection {
    pub fn authority(local: PeerId) -> Self {
        Self {
            local,
            role: PeerRole::Authority,
            status: ConnectionStatus::Connected,
            authority: Some(local),
            known_peers: BTreeSet::new(),
        }
    }

    /// A client that has not connected yet.
    pub fn client(local: PeerId, authority: PeerId) -> Self {
        Self {
            local,
            role: PeerRole::Client,
            status: ConnectionStatus::Disconnected,
            authority: Some(authority),
            known_peers: BTreeSet::new(),
        }
    }

    pub fn set_status(&mut self, status: ConnectionStatus) {
        if self.status != status {
            debug!("Peer {} connection {:?} -> {:?}", self.local.0, self.status, status);
            self.status = status;
        }
    }

    pub fn add_peer(&mut self, peer: PeerId) {
        self.known_peers.insert(peer);
    }

    pub fn remove_peer(&mut self, peer: PeerId) {
        self.known_peers.remove(&peer);
    }

    pub fn is_known_peer(&self, peer: PeerId) -> bool {
        self.known_peers.contains(&peer)
    }
}

impl ConnectionState for PeerConnection {
    fn is_authority(&self) -> bool {
        self.role == PeerRole::Authority
    }

    fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    fn current_peer_id(&self) -> PeerId {
        self.local
    }

    fn authority_peer(&self) -> Option<PeerId> {
        self.authority
    }
}
