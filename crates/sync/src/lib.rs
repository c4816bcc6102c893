//! Client/authority blueprint exchange.
//!
//! The authority owns the canonical collection and does all server-side
//! persistence. Clients list it into a local remote-cache, push their own
//! blueprints to it, and pull cached blueprints into their local store.
//! Requests and responses are correlated by token, so any number of them can
//! be in flight at once.

pub mod authority;
pub mod client;
pub mod connection;
pub mod messages;
mod plugin;
pub mod remote_cache;
pub mod requests;
pub mod transport;

pub use authority::{AuthorityStats, SyncAuthority};
pub use client::SyncClient;
pub use connection::{ConnectionState, ConnectionStatus, PeerConnection, PeerId, PeerRole};
pub use messages::{SyncMessage, WireFailure, GET_REMOTE_BLUEPRINTS, PUSH_BLUEPRINT};
pub use plugin::{
    ListRemoteBlueprints, PullRemoteBlueprint, PushCachedBlueprint, PushLocalBlueprint,
    SyncCompleted, SyncOperation, SyncPlugin, SyncSet,
};
pub use remote_cache::RemoteCache;
pub use requests::{PendingRequests, RequestContext, RequestToken, SyncCallback, SyncOutcome, SyncResult};
pub use transport::{Envelope, LoopbackHub, LoopbackTransport, SyncTransport, Transport};
