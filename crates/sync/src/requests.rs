//! Request-token correlation.
//!
//! Every outbound request gets a fresh token; the response echoes it. The
//! callback registered for a token runs exactly once, when its response is
//! received. Tokens are never reused within one [`PendingRequests`], so
//! concurrent requests of the same kind each get their own answer.

use std::collections::HashMap;

use blueprints::{Blueprint, BlueprintError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(pub u64);

/// What a completed sync operation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The remote cache holds `count` blueprints. `cached` is true when no
    /// request was sent.
    Listed { count: usize, cached: bool },
    /// The authority committed the blueprint under `id`.
    Pushed { id: String },
    /// The remote blueprint `id` is now in the local store.
    Pulled { id: String },
}

pub type SyncResult = Result<SyncOutcome, BlueprintError>;

pub type SyncCallback = Box<dyn FnOnce(SyncResult) + Send + Sync>;

/// What the client needs to remember to handle the response.
#[derive(Debug, Clone)]
pub enum RequestContext {
    List,
    /// The pushed blueprint, added to the remote cache on success.
    Push { blueprint: Blueprint },
}

pub struct PendingRequest {
    pub context: RequestContext,
    pub callback: SyncCallback,
}

impl std::fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct PendingRequests {
    next_token: u64,
    pending: HashMap<RequestToken, PendingRequest>,
}

impl PendingRequests {
    /// Register a request and return the token to send with it.
    pub fn create(&mut self, context: RequestContext, callback: SyncCallback) -> RequestToken {
        self.next_token += 1;
        let token = RequestToken(self.next_token);
        self.pending.insert(token, PendingRequest { context, callback });
        token
    }

    /// Remove and return the request for `token`, if it is outstanding.
    pub fn take(&mut self, token: RequestToken) -> Option<PendingRequest> {
        self.pending.remove(&token)
    }

    pub fn is_pending(&self, token: RequestToken) -> bool {
        self.pending.contains_key(&token)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every outstanding request without invoking its callback.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}
