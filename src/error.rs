//! Error taxonomy
//!
//! Every failure in this crate is recoverable locally: a failed join
//! degrades to single-player, a failed asset load keeps a placeholder
//! visible, and a malformed peer message is dropped without touching
//! the peer's record. Nothing here aborts the frame loop.

/// Transport join or session establishment failure
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("no transport path to room '{room}': {reason}")]
    Unreachable { room: String, reason: String },

    #[error("room '{room}' refused the join: {reason}")]
    Refused { room: String, reason: String },
}

/// Character model or clip fetch failure
#[derive(Debug, Clone, thiserror::Error)]
pub enum AssetLoadError {
    #[error("character '{0}' not found")]
    NotFound(String),

    #[error("character '{0}' failed to decode: {1}")]
    Malformed(String, String),

    #[error("fetch for '{0}' aborted: {1}")]
    Aborted(String, String),
}

/// Inbound wire message rejected at the transport boundary
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("snapshot is not valid JSON: {0}")]
    Syntax(String),

    #[error("snapshot field '{0}' is missing or mistyped")]
    MissingField(&'static str),

    #[error("snapshot field '{0}' is not finite")]
    NonFinite(&'static str),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Syntax(err.to_string())
    }
}
