//! Test-only audio backend that records mixer commands instead of producing sound.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::audio_engine::{AudioBackend, AudioError};

#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    Load(PathBuf),
    SetVolume(f32),
    Seek(f64),
    Play,
    Stop,
}

/// Clones share state, so a test keeps one clone while the controller owns another.
#[derive(Clone, Default)]
pub struct FakeBackend {
    calls: Arc<Mutex<Vec<BackendCall>>>,
    durations: Arc<Mutex<HashMap<PathBuf, f64>>>,
    playing: Arc<AtomicBool>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `path` a loadable file of `seconds` length. Unknown paths fail to load.
    pub fn with_sound(self, path: impl AsRef<Path>, seconds: f64) -> Self {
        self.durations
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), seconds);
        self
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &BackendCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Simulates the clip reaching its natural end.
    pub fn finish(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn lookup(&self, path: &Path) -> Result<f64, AudioError> {
        self.durations
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .ok_or_else(|| {
                AudioError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} not found", path.display()),
                ))
            })
    }
}

impl AudioBackend for FakeBackend {
    fn load(&mut self, path: &Path) -> Result<(), AudioError> {
        self.lookup(path)?;
        self.record(BackendCall::Load(path.to_path_buf()));
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), AudioError> {
        self.record(BackendCall::SetVolume(volume));
        Ok(())
    }

    fn seek(&mut self, seconds: f64) -> Result<(), AudioError> {
        self.record(BackendCall::Seek(seconds));
        Ok(())
    }

    fn play(&mut self) -> Result<(), AudioError> {
        self.playing.store(true, Ordering::SeqCst);
        self.record(BackendCall::Play);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.playing.store(false, Ordering::SeqCst);
        self.record(BackendCall::Stop);
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn duration(&self, path: &Path) -> Result<f64, AudioError> {
        self.lookup(path)
    }
}
