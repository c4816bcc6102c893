//! Routed-message transport seam.
//!
//! The sync protocol only needs "send these bytes to peer X" and "give me
//! everything that arrived since the last tick". Sends never block; inbound
//! messages are drained once per tick by the plugin.
//!
//! [`LoopbackHub`] is an in-process transport connecting any number of peers,
//! used by the headless demo and the protocol tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bevy::prelude::*;

use crate::connection::PeerId;

/// One inbound message and the peer that sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub from: PeerId,
    pub bytes: Vec<u8>,
}

pub trait Transport: Send + Sync {
    /// Fire-and-forget send.
    fn send(&mut self, to: PeerId, bytes: Vec<u8>);

    /// Everything received since the last call, in arrival order.
    fn drain(&mut self) -> Vec<Envelope>;
}

/// The transport a peer's sync systems use.
#[derive(Resource)]
pub struct SyncTransport(pub Box<dyn Transport>);

impl SyncTransport {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self(Box::new(transport))
    }
}

// ---------------------------------------------------------------------------
// Loopback
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct HubInner {
    inboxes: HashMap<PeerId, VecDeque<Envelope>>,
    sent: HashMap<PeerId, usize>,
}

/// Shared mailbox set for in-process peers.
#[derive(Debug, Clone, Default)]
pub struct LoopbackHub {
    inner: Arc<Mutex<HubInner>>,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        // A panic while holding the lock cannot leave the queues half-updated.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Transport endpoint for `peer`.
    pub fn endpoint(&self, peer: PeerId) -> LoopbackTransport {
        self.lock().inboxes.entry(peer).or_default();
        LoopbackTransport {
            peer,
            hub: self.clone(),
        }
    }

    /// Number of messages `peer` has sent so far.
    pub fn sent_by(&self, peer: PeerId) -> usize {
        self.lock().sent.get(&peer).copied().unwrap_or(0)
    }

    /// Number of messages waiting for `peer`.
    pub fn pending_for(&self, peer: PeerId) -> usize {
        self.lock().inboxes.get(&peer).map_or(0, VecDeque::len)
    }

    /// Inject raw bytes as if `from` had sent them to `to`.
    pub fn inject(&self, from: PeerId, to: PeerId, bytes: Vec<u8>) {
        self.lock()
            .inboxes
            .entry(to)
            .or_default()
            .push_back(Envelope { from, bytes });
    }
}

/// One peer's end of a [`LoopbackHub`].
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    peer: PeerId,
    hub: LoopbackHub,
}

impl LoopbackTransport {
    pub fn peer(&self) -> PeerId {
        self.peer
    }
}

impl Transport for LoopbackTransport {
    fn send(&mut self, to: PeerId, bytes: Vec<u8>) {
        let mut hub = self.hub.lock();
        *hub.sent.entry(self.peer).or_default() += 1;
        match hub.inboxes.get_mut(&to) {
            Some(inbox) => inbox.push_back(Envelope {
                from: self.peer,
                bytes,
            }),
            None => debug!("Peer {} has no endpoint, message dropped", to.0),
        }
    }

    fn drain(&mut self) -> Vec<Envelope> {
        self.hub
            .lock()
            .inboxes
            .get_mut(&self.peer)
            .map(|inbox| inbox.drain(..).collect())
            .unwrap_or_default()
    }
}
