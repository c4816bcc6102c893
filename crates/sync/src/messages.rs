// ---------------------------------------------------------------------------
// messages – Sync protocol wire envelope
// ---------------------------------------------------------------------------
//
// Two remote procedures travel over the transport:
//   GetRemoteBlueprints: ListRequest -> ListResponse (full collection)
//   PushBlueprint:       PushRequest -> PushResponse (success, message)
// Every message carries the request token of the call it belongs to. The
// blueprint payloads inside are the codec's headered bytes.

use bitcode::{Decode, Encode};

use blueprints::{BlueprintError, FailureKind};

use crate::requests::RequestToken;

pub const GET_REMOTE_BLUEPRINTS: &str = "GetRemoteBlueprints";
pub const PUSH_BLUEPRINT: &str = "PushBlueprint";

/// Typed failure reason carried by a failed push response.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct WireFailure {
    pub kind: u8,
    pub detail: String,
}

impl WireFailure {
    pub fn from_error(err: &BlueprintError) -> Self {
        Self {
            kind: err.kind().to_u8(),
            detail: err.detail(),
        }
    }

    /// Back to a typed error. Unknown kinds from a newer peer become
    /// `DeserializeFailure`.
    pub fn into_error(self) -> BlueprintError {
        match FailureKind::from_u8(self.kind) {
            Some(kind) => BlueprintError::from_kind(kind, self.detail),
            None => BlueprintError::DeserializeFailure(format!(
                "unknown failure kind {}: {}",
                self.kind, self.detail
            )),
        }
    }
}

#[derive(Encode, Decode, Debug, Clone, PartialEq)]
pub enum SyncMessage {
    ListRequest {
        token: u64,
    },
    ListResponse {
        token: u64,
        collection: Vec<u8>,
    },
    PushRequest {
        token: u64,
        blueprint: Vec<u8>,
    },
    PushResponse {
        token: u64,
        success: bool,
        /// Committed ID on success, failure text otherwise.
        message: String,
        reason: Option<WireFailure>,
    },
}

impl SyncMessage {
    pub fn token(&self) -> RequestToken {
        match self {
            SyncMessage::ListRequest { token }
            | SyncMessage::ListResponse { token, .. }
            | SyncMessage::PushRequest { token, .. }
            | SyncMessage::PushResponse { token, .. } => RequestToken(*token),
        }
    }

    /// Remote procedure this message belongs to.
    pub fn rpc_name(&self) -> &'static str {
        match self {
            SyncMessage::ListRequest { .. } | SyncMessage::ListResponse { .. } => {
                GET_REMOTE_BLUEPRINTS
            }
            SyncMessage::PushRequest { .. } | SyncMessage::PushResponse { .. } => PUSH_BLUEPRINT,
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(
            self,
            SyncMessage::ListRequest { .. } | SyncMessage::PushRequest { .. }
        )
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        bitcode::encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BlueprintError> {
        bitcode::decode(bytes)
            .map_err(|e| BlueprintError::DeserializeFailure(format!("sync message: {e}")))
    }

    pub fn push_failure(token: RequestToken, err: &BlueprintError) -> Self {
        SyncMessage::PushResponse {
            token: token.0,
            success: false,
            message: err.to_string(),
            reason: Some(WireFailure::from_error(err)),
        }
    }

    pub fn push_success(token: RequestToken, id: &str) -> Self {
        SyncMessage::PushResponse {
            token: token.0,
            success: true,
            message: id.to_string(),
            reason: None,
        }
    }
}
