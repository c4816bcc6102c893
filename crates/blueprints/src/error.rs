// ---------------------------------------------------------------------------
// BlueprintError: every failure the blueprint subsystem can report
// ---------------------------------------------------------------------------

use thiserror::Error;

/// Errors reported by capture, placement, the local store, the codec and the
/// sync protocol.
///
/// Nothing here is fatal to the host: every path ends in one of these values
/// (or a success) being handed back to the caller.
#[derive(Debug, Error)]
pub enum BlueprintError {
    /// The remote blueprint feature flag is off.
    #[error("Server blueprints disabled")]
    FeatureDisabled,
    /// The local peer is the authority, or is not connected to one.
    #[error("Not connected")]
    NotConnected,
    /// A blueprint with this ID is already present in the target collection.
    #[error("Blueprint ID {0} already exists")]
    DuplicateId(String),
    /// No blueprint with this ID is known.
    #[error("Unknown blueprint ID {0}")]
    UnknownId(String),
    /// Bytes could not be turned back into a blueprint (truncated, corrupt,
    /// wrong payload kind, or from a newer format).
    #[error("Could not read blueprint data: {0}")]
    DeserializeFailure(String),
    /// Writing a blueprint file failed.
    #[error("Could not save blueprint: {0}")]
    PersistFailure(String),
    /// The host catalog has no object type with this ID. Non-fatal: placement
    /// skips the entry and carries on.
    #[error("Object type {0} not found")]
    MissingType(String),
    /// A capture found nothing to capture.
    #[error("No pieces found within {radius} of the capture origin")]
    EmptyCapture { radius: f32 },
    /// I/O error outside of a blueprint write (directory scan, removal).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlueprintError {
    /// Coarse failure kind, used to carry the reason across the wire.
    pub fn kind(&self) -> FailureKind {
        match self {
            BlueprintError::FeatureDisabled => FailureKind::FeatureDisabled,
            BlueprintError::NotConnected => FailureKind::NotConnected,
            BlueprintError::DuplicateId(_) => FailureKind::DuplicateId,
            BlueprintError::UnknownId(_) => FailureKind::UnknownId,
            BlueprintError::DeserializeFailure(_) => FailureKind::DeserializeFailure,
            BlueprintError::PersistFailure(_) | BlueprintError::Io(_) => {
                FailureKind::PersistFailure
            }
            BlueprintError::MissingType(_) => FailureKind::MissingType,
            BlueprintError::EmptyCapture { .. } => FailureKind::EmptyCapture,
        }
    }

    /// The variable part of the error (an ID, a type ID or an inner message).
    pub fn detail(&self) -> String {
        match self {
            BlueprintError::FeatureDisabled | BlueprintError::NotConnected => String::new(),
            BlueprintError::DuplicateId(s)
            | BlueprintError::UnknownId(s)
            | BlueprintError::DeserializeFailure(s)
            | BlueprintError::PersistFailure(s)
            | BlueprintError::MissingType(s) => s.clone(),
            BlueprintError::EmptyCapture { radius } => radius.to_string(),
            BlueprintError::Io(e) => e.to_string(),
        }
    }

    /// Rebuild an error from a kind and the detail that travelled with it.
    pub fn from_kind(kind: FailureKind, detail: String) -> Self {
        match kind {
            FailureKind::FeatureDisabled => BlueprintError::FeatureDisabled,
            FailureKind::NotConnected => BlueprintError::NotConnected,
            FailureKind::DuplicateId => BlueprintError::DuplicateId(detail),
            FailureKind::UnknownId => BlueprintError::UnknownId(detail),
            FailureKind::DeserializeFailure => BlueprintError::DeserializeFailure(detail),
            FailureKind::PersistFailure => BlueprintError::PersistFailure(detail),
            FailureKind::MissingType => BlueprintError::MissingType(detail),
            FailureKind::EmptyCapture => BlueprintError::EmptyCapture {
                radius: detail.parse().unwrap_or(0.0),
            },
        }
    }
}

/// Field-less mirror of [`BlueprintError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    FeatureDisabled,
    NotConnected,
    DuplicateId,
    UnknownId,
    DeserializeFailure,
    PersistFailure,
    MissingType,
    EmptyCapture,
}

impl FailureKind {
    pub fn to_u8(self) -> u8 {
        match self {
            FailureKind::FeatureDisabled => 0,
            FailureKind::NotConnected => 1,
            FailureKind::DuplicateId => 2,
            FailureKind::UnknownId => 3,
            FailureKind::DeserializeFailure => 4,
            FailureKind::PersistFailure => 5,
            FailureKind::MissingType => 6,
            FailureKind::EmptyCapture => 7,
        }
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(FailureKind::FeatureDisabled),
            1 => Some(FailureKind::NotConnected),
            2 => Some(FailureKind::DuplicateId),
            3 => Some(FailureKind::UnknownId),
            4 => Some(FailureKind::DeserializeFailure),
            5 => Some(FailureKind::PersistFailure),
            6 => Some(FailureKind::MissingType),
            7 => Some(FailureKind::EmptyCapture),
            _ => None,
        }
    }
}
