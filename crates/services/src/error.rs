//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::ModeId;
use storage::repository::StorageError;

/// Errors emitted by audio backends and the sequencer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlaybackError {
    #[error("playback failed to start: {0}")]
    StartFailed(String),
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),
}

/// Errors emitted by the round engines.
///
/// Guard failures are typed values; none of them corrupt session stats or
/// leave a round half-built.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error("no modes selected")]
    NoModesSelected,

    #[error("catalog has no playable modes")]
    EmptyCatalog,

    #[error("mode '{0}' has no items")]
    ModeHasNoItems(ModeId),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Errors emitted while loading the static catalog.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("malformed catalog: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors emitted by the server-backed round client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Failure message returned by the server, surfaced verbatim.
    #[error("{0}")]
    Server(String),

    #[error("round service request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("invalid server response: {0}")]
    InvalidResponse(String),
}

/// Errors emitted by `PreferencesService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PreferencesServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Errors emitted by report export.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportError {
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
