//! Message definitions for communication between the engine and the real-time audio thread.
//!
//! This module defines the enums that serve as the wire format for messages passed through the
//! ring buffer between the owner thread and the audio callback.

use std::sync::Arc;

/// Decoded, interleaved audio at the output sample rate.
#[derive(Debug, Clone)]
pub(crate) struct SampleBuffer {
    pub channels: usize,
    pub samples: Arc<[f32]>,
}

impl SampleBuffer {
    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels
    }
}

/// Message that is sent to the audio thread.
#[derive(Debug, Clone)]
pub(crate) enum ControlMessage {
    /// Replace the loaded clip. Stops whatever was sounding.
    Load(SampleBuffer),

    /// Set the clip gain.
    ///
    /// # Parameters
    /// * `volume` - Volume level (0.0 to 1.0)
    SetVolume(f32),

    /// Move the playhead to an absolute frame of the loaded clip.
    Seek(usize),

    /// Start (or restart) playback from the current playhead.
    Play,

    /// Halt playback. The playhead is kept.
    Stop,
}
