//! Audio Engine Module
//!
//! This module is the audio collaborator of the soundboard. It is organized into sub-modules, each
//! with a specific responsibility:
//!
//! - [`audio_stream`]: CPAL audio stream management and the owner-side mixer handle
//! - [`constants`]: Configuration constants and limits
//! - [`conversion`]: Channel mapping and resampling of decoded audio
//! - [`errors`]: Audio-specific error types
//! - [`mixer`]: Real-time single-clip mixer
//! - [`sample_loader`]: Audio file decoding and duration probing
//!
//! The soundboard only talks to audio through the [`AudioBackend`] trait, so the playback logic
//! can be exercised without an output device.

use std::path::Path;

pub mod audio_stream;
pub mod constants;
pub mod conversion;
pub mod errors;
pub mod mixer;
pub mod sample_loader;

pub use audio_stream::{AudioOutput, MixerHandle, setup_logger, start_output};
pub use errors::AudioError;

/// Mixer commands the playback controller relies on.
///
/// Implementations must be cheap to call: decoding may happen in `load`, but nothing here may
/// wait for audio to finish.
pub trait AudioBackend: Send {
    /// Loads the sound file at `path` as the current clip, replacing any previous one.
    fn load(&mut self, path: &Path) -> Result<(), AudioError>;

    /// Sets output gain, `0.0..=1.0`.
    fn set_volume(&mut self, volume: f32) -> Result<(), AudioError>;

    /// Moves the playhead of the loaded clip to `seconds`.
    fn seek(&mut self, seconds: f64) -> Result<(), AudioError>;

    /// Starts playback of the loaded clip from the playhead.
    fn play(&mut self) -> Result<(), AudioError>;

    /// Halts output immediately.
    fn stop(&mut self) -> Result<(), AudioError>;

    /// Whether the loaded clip is still sounding.
    fn is_playing(&self) -> bool;

    /// Duration of the sound file at `path`, in seconds.
    fn duration(&self, path: &Path) -> Result<f64, AudioError>;
}
