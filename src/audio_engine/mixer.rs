//! Real-time single-clip mixer.
//!
//! A soundboard only ever has one clip audible, so the mixer owns exactly one voice. It runs inside
//! the cpal callback and is driven by [`ControlMessage`]s; all operations are allocation-free.

use crate::audio_engine::constants::{VOLUME_MAX, VOLUME_MIN};
use crate::messages::{ControlMessage, SampleBuffer};
use cpal::Sample;

/// Real-time mixer holding the currently loaded clip.
pub struct ClipMixer {
    /// Number of output channels (1 for mono, 2 for stereo).
    channels: usize,

    /// Loaded clip, if any.
    sample: Option<SampleBuffer>,

    /// Playhead in frames.
    frame_pos: usize,

    /// Clip gain.
    volume: f32,

    /// Whether the voice is rendering.
    active: bool,
}

impl ClipMixer {
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            sample: None,
            frame_pos: 0,
            volume: VOLUME_MAX,
            active: false,
        }
    }

    /// Applies a control message from the owner thread.
    pub(crate) fn handle(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::Load(sample) => self.load(sample),
            ControlMessage::SetVolume(volume) => self.set_volume(volume),
            ControlMessage::Seek(frame) => self.seek(frame),
            ControlMessage::Play => self.play(),
            ControlMessage::Stop => self.stop(),
        }
    }

    /// Replaces the loaded clip. Buffers with a mismatched channel count are ignored.
    pub(crate) fn load(&mut self, sample: SampleBuffer) {
        if sample.channels != self.channels {
            return;
        }

        self.active = false;
        self.frame_pos = 0;
        self.sample = Some(sample);
    }

    /// Invalid values (NaN, infinite, or out of range) are silently ignored.
    pub fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() || !(VOLUME_MIN..=VOLUME_MAX).contains(&volume) {
            return;
        }

        self.volume = volume;
    }

    /// Moves the playhead, clamped to the end of the loaded clip.
    pub fn seek(&mut self, frame: usize) {
        let frames = self.sample.as_ref().map_or(0, SampleBuffer::frames);
        self.frame_pos = frame.min(frames);
    }

    pub fn play(&mut self) {
        if self.sample.is_some() {
            self.active = true;
        }
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Renders the next block into `output` (interleaved, `channels` per frame).
    ///
    /// The voice deactivates itself once the playhead reaches the end of the clip.
    pub fn render(&mut self, output: &mut [f32]) {
        output.fill(Sample::EQUILIBRIUM);

        if !self.active || self.channels == 0 {
            return;
        }

        let Some(sample) = self.sample.as_ref() else {
            self.active = false;
            return;
        };

        let sample_frames = sample.frames();
        let frames = output.len() / self.channels;
        let remaining = sample_frames.saturating_sub(self.frame_pos);
        let to_copy = frames.min(remaining);

        for frame in 0..to_copy {
            let src = (self.frame_pos + frame) * self.channels;
            let dst = frame * self.channels;
            for channel in 0..self.channels {
                output[dst + channel] = sample.samples[src + channel] * self.volume;
            }
        }

        self.frame_pos += to_copy;
        if self.frame_pos >= sample_frames {
            self.active = false;
        }
    }

    /// Gets the number of channels configured for this mixer.
    pub fn channels(&self) -> usize {
        self.channels
    }
}
