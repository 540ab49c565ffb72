//! Audio-specific error types.

use thiserror::Error;

/// Failures of the audio collaborator: reading and decoding sound files, or talking to the mixer.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("cannot read sound file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot decode sound file: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    #[error("sound file contains no playable track")]
    NoDefaultTrack,

    #[error("sound file does not declare a sample rate")]
    MissingSampleRate,

    #[error("sound file does not declare its channels")]
    MissingChannels,

    /// Only mono and stereo can be converted into each other.
    #[error("cannot play {file_channels}-channel audio on a {output_channels}-channel output")]
    UnsupportedChannels {
        file_channels: usize,
        output_channels: usize,
    },

    /// `play` or `seek` was issued before any sound was loaded.
    #[error("no sound loaded")]
    NothingLoaded,

    /// The command ring buffer to the audio thread is full.
    #[error("mixer command queue is full")]
    QueueFull,

    #[error("audio output unavailable: {0}")]
    Device(String),
}
