//! Error types of the soundboard engine.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::audio_engine::AudioError;
use crate::soundboard::mode::Mode;

/// Clip field named by a [`ValidationError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipField {
    SoundPath,
    Volume,
    StartOffset,
    EndOffset,
    Placement,
}

impl fmt::Display for ClipField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClipField::SoundPath => "sound_path",
            ClipField::Volume => "volume",
            ClipField::StartOffset => "start_offset",
            ClipField::EndOffset => "end_offset",
            ClipField::Placement => "row/col",
        };
        f.write_str(name)
    }
}

/// Malformed clip input. Shown to the user for correction.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: ClipField,
    pub reason: String,
}

impl ValidationError {
    pub(crate) fn new(field: ClipField, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Failures of the persisted profile.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("profile I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("profile is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The index is stale, usually because an earlier entry was deleted.
    #[error("no clip at index {index} (store holds {len})")]
    NotFound { index: usize, len: usize },

    #[error("failed to persist clips: {0}")]
    Storage(#[from] StorageError),
}

/// Playback could not start. Prior playback state is left as it was.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("cannot play {}: {source}", .path.display())]
    Audio {
        path: PathBuf,
        #[source]
        source: AudioError,
    },

    #[error("start offset {start:.2}s is beyond the clip duration {duration:.2}s")]
    StartBeyondEnd { start: f64, duration: f64 },

    #[error("end offset {end:.2}s must be after start offset {start:.2}s")]
    InvalidTrim { start: f64, end: f64 },

    #[error("audio backend is unavailable")]
    BackendUnavailable,

    #[error("failed to schedule auto-stop: {0}")]
    Scheduler(#[source] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ModeError {
    #[error("cannot switch from {from} mode to {to} mode")]
    IllegalTransition { from: Mode, to: Mode },
}

/// Errors surfaced by [`Soundboard`](crate::soundboard::Soundboard) operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The UI should drop the action and re-render from the refreshed grid.
    #[error("no clip at index {index} (store holds {len})")]
    NotFound { index: usize, len: usize },

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error(transparent)]
    Mode(#[from] ModeError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("\"{name}\" is playing; stop it before saving changes")]
    ClipSounding { name: String },

    #[error("no clip editor is open")]
    NoEditor,

    #[error("no delete is awaiting confirmation")]
    NothingToConfirm,
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(err) => EngineError::Validation(err),
            StoreError::NotFound { index, len } => EngineError::NotFound { index, len },
            StoreError::Storage(err) => EngineError::Storage(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_field() {
        let err = ValidationError::new(ClipField::Volume, "must be between 0 and 100");
        assert_eq!(err.to_string(), "invalid volume: must be between 0 and 100");
    }

    #[test]
    fn test_store_errors_flatten_into_engine_errors() {
        let err: EngineError = StoreError::NotFound { index: 3, len: 2 }.into();
        assert!(matches!(err, EngineError::NotFound { index: 3, len: 2 }));
    }

    #[test]
    fn test_illegal_transition_message() {
        let err = ModeError::IllegalTransition {
            from: Mode::Play,
            to: Mode::Trash,
        };
        assert_eq!(err.to_string(), "cannot switch from Play mode to Trash mode");
    }
}
