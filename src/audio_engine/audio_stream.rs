//! Audio Stream Module
//!
//! This module handles CPAL audio stream management including:
//! - Stream initialization and configuration
//! - The real-time callback feeding the [`ClipMixer`]
//! - The owner-side [`MixerHandle`] that implements [`AudioBackend`]

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Stream, StreamConfig};
use env_logger::{Builder, Env};
use rtrb::{Producer, RingBuffer};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::audio_engine::AudioBackend;
use crate::audio_engine::constants::{COMMAND_QUEUE_CAPACITY, DECODE_CACHE_CAPACITY};
use crate::audio_engine::errors::AudioError;
use crate::audio_engine::mixer::ClipMixer;
use crate::audio_engine::sample_loader::{decode_audio_file, probe_duration};
use crate::messages::{ControlMessage, SampleBuffer};

/// Setup and configure the logger
pub fn setup_logger() {
    // Users can override via `RUST_LOG`, e.g. `RUST_LOG=debug` when troubleshooting.
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .try_init()
        .unwrap_or(()); // Ignore initialization errors
}

/// Keeps the cpal output stream alive. Dropping it silences the device.
pub struct AudioOutput {
    _stream: Stream,
}

/// Packs the callback's view of the voice into one word: `(plays_seen << 1) | active`.
///
/// Publishing both halves together lets the owner tell "not started yet" apart from "finished".
fn pack_status(plays_seen: u64, active: bool) -> u64 {
    (plays_seen << 1) | u64::from(active)
}

/// Owner-side handle to the mixer running on the audio thread.
pub struct MixerHandle {
    producer: Producer<ControlMessage>,
    status: Arc<AtomicU64>,
    plays_sent: u64,
    loaded: bool,
    output_channels: usize,
    output_sample_rate: u32,
    cache: HashMap<PathBuf, SampleBuffer>,
}

impl MixerHandle {
    fn new(
        producer: Producer<ControlMessage>,
        status: Arc<AtomicU64>,
        output_channels: usize,
        output_sample_rate: u32,
    ) -> Self {
        Self {
            producer,
            status,
            plays_sent: 0,
            loaded: false,
            output_channels,
            output_sample_rate,
            cache: HashMap::new(),
        }
    }

    fn send(&mut self, message: ControlMessage) -> Result<(), AudioError> {
        self.producer
            .push(message)
            .map_err(|_| AudioError::QueueFull)
    }

    fn decoded(&mut self, path: &Path) -> Result<SampleBuffer, AudioError> {
        if let Some(sample) = self.cache.get(path) {
            return Ok(sample.clone());
        }

        let sample = decode_audio_file(path, self.output_channels, self.output_sample_rate)?;
        if self.cache.len() >= DECODE_CACHE_CAPACITY {
            self.cache.clear();
        }
        self.cache.insert(path.to_path_buf(), sample.clone());
        Ok(sample)
    }
}

impl AudioBackend for MixerHandle {
    fn load(&mut self, path: &Path) -> Result<(), AudioError> {
        let sample = self.decoded(path)?;
        self.send(ControlMessage::Load(sample))?;
        self.loaded = true;
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), AudioError> {
        self.send(ControlMessage::SetVolume(volume))
    }

    fn seek(&mut self, seconds: f64) -> Result<(), AudioError> {
        if !self.loaded {
            return Err(AudioError::NothingLoaded);
        }
        let frame = (seconds.max(0.0) * f64::from(self.output_sample_rate)).round() as usize;
        self.send(ControlMessage::Seek(frame))
    }

    fn play(&mut self) -> Result<(), AudioError> {
        if !self.loaded {
            return Err(AudioError::NothingLoaded);
        }
        self.send(ControlMessage::Play)?;
        self.plays_sent += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.send(ControlMessage::Stop)
    }

    fn is_playing(&self) -> bool {
        let status = self.status.load(Ordering::Acquire);
        (status >> 1) < self.plays_sent || status & 1 == 1
    }

    fn duration(&self, path: &Path) -> Result<f64, AudioError> {
        if let Some(sample) = self.cache.get(path) {
            return Ok(sample.frames() as f64 / f64::from(self.output_sample_rate));
        }
        probe_duration(path)
    }
}

/// Opens the default output device and starts the mixer callback.
///
/// This function:
/// 1. Sets up the default audio device
/// 2. Creates the command ring buffer
/// 3. Builds and starts an f32 output stream driving a [`ClipMixer`]
pub fn start_output() -> Result<(AudioOutput, MixerHandle), AudioError> {
    setup_logger();

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AudioError::Device("no default output device".to_string()))?;

    let config = device
        .default_output_config()
        .map_err(|e| AudioError::Device(e.to_string()))?;
    if config.sample_format() != cpal::SampleFormat::F32 {
        return Err(AudioError::Device(format!(
            "unsupported sample format {:?} (only f32 supported)",
            config.sample_format()
        )));
    }

    let sample_rate = config.sample_rate();
    let channels = config.channels();

    log::info!("Starting audio output... ({} ch@{} Hz)", channels, sample_rate);

    let (producer, mut consumer) = RingBuffer::<ControlMessage>::new(COMMAND_QUEUE_CAPACITY);
    let status = Arc::new(AtomicU64::new(0));
    let callback_status = Arc::clone(&status);

    let mut mixer = ClipMixer::new(channels as usize);
    let mut plays_seen: u64 = 0;

    let stream_config = StreamConfig {
        channels,
        sample_rate,
        buffer_size: BufferSize::Default,
    };

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                while let Ok(message) = consumer.pop() {
                    if matches!(message, ControlMessage::Play) {
                        plays_seen += 1;
                    }
                    mixer.handle(message);
                }

                mixer.render(data);
                callback_status.store(pack_status(plays_seen, mixer.is_active()), Ordering::Release);
            },
            |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::Device(e.to_string()))?;

    stream
        .play()
        .map_err(|e| AudioError::Device(e.to_string()))?;

    let handle = MixerHandle::new(producer, status, channels as usize, sample_rate);
    Ok((AudioOutput { _stream: stream }, handle))
}
