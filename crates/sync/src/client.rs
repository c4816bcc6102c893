// ---------------------------------------------------------------------------
// client – List / push / pull from the non-authoritative side
// ---------------------------------------------------------------------------
//
// Every operation reports through its callback exactly once, unless the
// session ends first. Local precondition failures (feature off, not
// connected, unknown ID) invoke the callback before the call returns and
// send nothing. Network outcomes arrive on a later tick via `receive`.

use bevy::prelude::*;

use blueprints::{Blueprint, BlueprintError, BlueprintRegistrar};
use save::{decode_collection, encode_blueprint, BlueprintStore};

use crate::connection::{ConnectionState, PeerId};
use crate::messages::SyncMessage;
use crate::remote_cache::RemoteCache;
use crate::requests::{
    PendingRequests, RequestContext, RequestToken, SyncCallback, SyncOutcome, SyncResult,
};
use crate::transport::{Envelope, Transport};

/// Client-role sync state: the remote cache and outstanding requests.
#[derive(Resource, Debug)]
pub struct SyncClient {
    enabled: bool,
    cache: RemoteCache,
    pending: PendingRequests,
}

impl Default for SyncClient {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SyncClient {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            cache: RemoteCache::default(),
            pending: PendingRequests::default(),
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn cache(&self) -> &RemoteCache {
        &self.cache
    }

    pub fn pending(&self) -> &PendingRequests {
        &self.pending
    }

    /// Authority address if a request may be sent right now.
    fn ready<C: ConnectionState + ?Sized>(&self, conn: &C) -> Result<PeerId, BlueprintError> {
        if !self.enabled {
            return Err(BlueprintError::FeatureDisabled);
        }
        if conn.is_authority() || !conn.is_connected() {
            return Err(BlueprintError::NotConnected);
        }
        conn.authority_peer().ok_or(BlueprintError::NotConnected)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Session start: fresh state, and a live host representation for every
    /// local blueprint.
    pub fn on_start<R: BlueprintRegistrar + ?Sized>(
        &mut self,
        store: &BlueprintStore,
        registrar: &mut R,
    ) {
        self.cache.clear();
        self.pending.clear();
        for blueprint in store.iter() {
            registrar.register(blueprint);
        }
        debug!("Blueprint sync started with {} local blueprints", store.len());
    }

    /// Session end: forget the remote collection and every unanswered
    /// request. Their callbacks are never invoked.
    pub fn on_shutdown(&mut self) {
        let dropped = self.pending.clear();
        self.cache.clear();
        if dropped > 0 {
            info!("Blueprint sync shut down with {} unanswered requests", dropped);
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Fetch the authority's collection into the remote cache.
    ///
    /// With `use_cache` and a non-empty cache this completes immediately
    /// without a request.
    pub fn list<C, T>(
        &mut self,
        use_cache: bool,
        conn: &C,
        transport: &mut T,
        callback: SyncCallback,
    ) -> Option<RequestToken>
    where
        C: ConnectionState + ?Sized,
        T: Transport + ?Sized,
    {
        let authority = match self.ready(conn) {
            Ok(peer) => peer,
            Err(e) => {
                callback(Err(e));
                return None;
            }
        };
        if use_cache && !self.cache.is_empty() {
            callback(Ok(SyncOutcome::Listed {
                count: self.cache.len(),
                cached: true,
            }));
            return None;
        }

        let token = self.pending.create(RequestContext::List, callback);
        transport.send(authority, SyncMessage::ListRequest { token: token.0 }.to_bytes());
        debug!("Requested remote blueprint list (token {})", token.0);
        Some(token)
    }

    /// Send the local blueprint `id` to the authority.
    pub fn push<C, T>(
        &mut self,
        id: &str,
        store: &BlueprintStore,
        conn: &C,
        transport: &mut T,
        callback: SyncCallback,
    ) -> Option<RequestToken>
    where
        C: ConnectionState + ?Sized,
        T: Transport + ?Sized,
    {
        let authority = match self.ready(conn) {
            Ok(peer) => peer,
            Err(e) => {
                callback(Err(e));
                return None;
            }
        };
        let Some(blueprint) = store.get(id) else {
            callback(Err(BlueprintError::UnknownId(id.to_string())));
            return None;
        };
        Some(self.send_push(blueprint.clone(), authority, transport, callback))
    }

    /// Send the cached remote blueprint `id` back to the authority, e.g. to
    /// restore one whose file the server has lost. Needs a prior `list`.
    pub fn push_cached<C, T>(
        &mut self,
        id: &str,
        conn: &C,
        transport: &mut T,
        callback: SyncCallback,
    ) -> Option<RequestToken>
    where
        C: ConnectionState + ?Sized,
        T: Transport + ?Sized,
    {
        let authority = match self.ready(conn) {
            Ok(peer) => peer,
            Err(e) => {
                callback(Err(e));
                return None;
            }
        };
        let Some(blueprint) = self.cache.get(id).cloned() else {
            callback(Err(BlueprintError::UnknownId(id.to_string())));
            return None;
        };
        Some(self.send_push(blueprint, authority, transport, callback))
    }

    fn send_push<T: Transport + ?Sized>(
        &mut self,
        blueprint: Blueprint,
        authority: PeerId,
        transport: &mut T,
        callback: SyncCallback,
    ) -> RequestToken {
        let bytes = encode_blueprint(&blueprint);
        let id = blueprint.id.clone();
        let token = self
            .pending
            .create(RequestContext::Push { blueprint }, callback);
        transport.send(
            authority,
            SyncMessage::PushRequest {
                token: token.0,
                blueprint: bytes,
            }
            .to_bytes(),
        );
        debug!("Pushing blueprint {} (token {})", id, token.0);
        token
    }

    /// Copy the cached remote blueprint `id` into the local store.
    ///
    /// Purely local: it needs a prior `list` to have filled the cache. An
    /// existing local blueprint with the same ID is replaced; its host
    /// representation is released before the entry is removed.
    pub fn pull<R: BlueprintRegistrar + ?Sized>(
        &self,
        id: &str,
        store: &mut BlueprintStore,
        registrar: &mut R,
    ) -> SyncResult {
        if !self.enabled {
            return Err(BlueprintError::FeatureDisabled);
        }
        let remote = self
            .cache
            .get(id)
            .ok_or_else(|| BlueprintError::UnknownId(id.to_string()))?;

        // Written before the old entry goes so a failed write keeps it.
        store.persist(remote)?;
        store.release_and_remove(id, registrar);
        registrar.register(remote);
        store.insert(remote.clone())?;
        info!("Pulled blueprint {} from the server", id);
        Ok(SyncOutcome::Pulled { id: id.to_string() })
    }

    // -----------------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------------

    /// Handle one inbound message. Anything not from the authority, not
    /// decodable, or not matching an outstanding token is dropped.
    pub fn receive<C: ConnectionState + ?Sized>(&mut self, envelope: Envelope, conn: &C) {
        if conn.authority_peer() != Some(envelope.from) {
            warn!(
                "Dropping blueprint sync message from non-server peer {}",
                envelope.from.0
            );
            return;
        }
        let message = match SyncMessage::from_bytes(&envelope.bytes) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping malformed blueprint sync message: {}", e);
                return;
            }
        };
        if message.is_request() {
            debug!("Client ignoring {} request", message.rpc_name());
            return;
        }

        let token = message.token();
        let Some(request) = self.pending.take(token) else {
            warn!(
                "No pending {} request for token {}",
                message.rpc_name(),
                token.0
            );
            return;
        };

        let result = match (message, request.context) {
            (SyncMessage::ListResponse { collection, .. }, RequestContext::List) => {
                self.cache.clear();
                decode_collection(&collection).map(|blueprints| {
                    self.cache.replace_all(blueprints);
                    info!("Received {} server blueprints", self.cache.len());
                    SyncOutcome::Listed {
                        count: self.cache.len(),
                        cached: false,
                    }
                })
            }
            (
                SyncMessage::PushResponse {
                    success,
                    message,
                    reason,
                    ..
                },
                RequestContext::Push { blueprint },
            ) => {
                if success {
                    self.cache.insert_if_absent(blueprint);
                    Ok(SyncOutcome::Pushed { id: message })
                } else {
                    Err(reason.map_or(BlueprintError::PersistFailure(message), |r| {
                        r.into_error()
                    }))
                }
            }
            (message, _) => Err(BlueprintError::DeserializeFailure(format!(
                "{} response does not match its request",
                message.rpc_name()
            ))),
        };

        if let Err(e) = &result {
            warn!("Blueprint sync request {} failed: {}", token.0, e);
        }
        (request.callback)(result);
    }
}
