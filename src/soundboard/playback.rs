//! Playback controller: owns the single live session and the only path to the mixer.
//!
//! A session ends exactly once. Manual stop, auto-stop and reaping all flip the session's
//! [`CancelToken`] while holding the backend mutex and only the caller that flipped it sends
//! `stop` to the mixer.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::audio_engine::{AudioBackend, AudioError};
use crate::soundboard::clip::{ClipEntry, ClipId};
use crate::soundboard::errors::PlaybackError;
use crate::soundboard::schedule::{CancelToken, ElapsedDisplay, ScheduledTask};

/// What a session is playing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionSource {
    Clip(ClipId),
    /// Unsaved clip test-played from the editor.
    Preview,
}

#[derive(Clone, Debug)]
pub struct SessionHandle {
    id: u64,
    source: SessionSource,
    token: CancelToken,
    started_at: Instant,
    deadline: Option<Instant>,
}

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn source(&self) -> SessionSource {
        self.source
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// When auto-stop fires, for trimmed clips.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

struct LiveSession {
    handle: SessionHandle,
    auto_stop: Option<ScheduledTask>,
    ticker: Option<ScheduledTask>,
}

impl LiveSession {
    /// Wakes and joins the session's tasks. Must not be called with the backend locked.
    fn retire(self) {
        if let Some(task) = self.auto_stop {
            task.join();
        }
        if let Some(task) = self.ticker {
            task.join();
        }
    }
}

pub struct PlaybackController<B: AudioBackend + 'static> {
    backend: Arc<Mutex<B>>,
    tick_interval: Duration,
    elapsed: ElapsedDisplay,
    next_session: u64,
    current: Option<LiveSession>,
}

impl<B: AudioBackend + 'static> PlaybackController<B> {
    pub fn new(backend: B, tick_interval: Duration) -> Self {
        Self {
            backend: Arc::new(Mutex::new(backend)),
            tick_interval,
            elapsed: ElapsedDisplay::default(),
            next_session: 0,
            current: None,
        }
    }

    /// Shared elapsed-time readout of the current session.
    pub fn elapsed(&self) -> &ElapsedDisplay {
        &self.elapsed
    }

    /// Length of the sound file at `path` in seconds.
    pub fn duration_of(&self, path: &Path) -> Result<f64, PlaybackError> {
        let backend = self.lock_checked()?;
        backend.duration(path).map_err(|source| PlaybackError::Audio {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Starts `entry`, replacing whatever is sounding.
    ///
    /// The file is probed and the trim checked before the previous session is touched, so these
    /// failures leave current playback alone.
    pub fn play(
        &mut self,
        entry: &ClipEntry,
        path: &Path,
        source: SessionSource,
    ) -> Result<SessionHandle, PlaybackError> {
        let duration = self.duration_of(path)?;
        if entry.start_offset > duration {
            return Err(PlaybackError::StartBeyondEnd {
                start: entry.start_offset,
                duration,
            });
        }
        if entry.end_offset > 0.0 && entry.end_offset <= entry.start_offset {
            return Err(PlaybackError::InvalidTrim {
                start: entry.start_offset,
                end: entry.end_offset,
            });
        }

        let backend = Arc::clone(&self.backend);
        let mut guard = backend
            .lock()
            .map_err(|_| PlaybackError::BackendUnavailable)?;
        let previous = self.current.take();
        if let Some(previous) = &previous {
            end_session(&mut *guard, &previous.handle.token);
        }
        let started = start_backend(&mut *guard, entry, path);
        drop(guard);

        // Joining the old tasks can wait on the backend lock, so it happens after releasing it.
        if let Some(previous) = previous {
            previous.retire();
        }
        started.map_err(|source| PlaybackError::Audio {
            path: path.to_path_buf(),
            source,
        })?;

        let started_at = Instant::now();
        let trim = entry.trimmed_length().map(Duration::from_secs_f64);
        let handle = SessionHandle {
            id: self.next_session,
            source,
            token: CancelToken::new(),
            started_at,
            deadline: trim.map(|length| started_at + length),
        };
        self.next_session += 1;
        self.elapsed.reset();

        let tasks = self.spawn_tasks(&handle, trim);
        let (auto_stop, ticker) = match tasks {
            Ok(tasks) => tasks,
            Err(err) => {
                end_session(&mut *self.lock(), &handle.token);
                return Err(PlaybackError::Scheduler(err));
            }
        };

        info!(
            "Playing {} (volume {:.2}, {:.2}s..{})",
            path.display(),
            entry.volume,
            entry.start_offset,
            match trim {
                Some(_) => format!("{:.2}s", entry.end_offset),
                None => "end".to_string(),
            }
        );

        self.current = Some(LiveSession {
            handle: handle.clone(),
            auto_stop,
            ticker,
        });
        Ok(handle)
    }

    /// Stops `session`. Returns `false` when it had already stopped; unknown sessions are a no-op.
    pub fn stop(&mut self, session: &SessionHandle) -> bool {
        let stopped = end_session(&mut *self.lock(), &session.token);

        if let Some(live) = self.current.take_if(|live| live.handle.id == session.id) {
            live.retire();
        }

        if stopped {
            info!("Stopped session {}", session.id);
        }
        stopped
    }

    /// Stops whatever is sounding. Returns whether anything was stopped.
    pub fn stop_current(&mut self) -> bool {
        match self.current.as_ref().map(|live| live.handle.clone()) {
            Some(handle) => self.stop(&handle),
            None => false,
        }
    }

    /// The live session, if it has not ended.
    pub fn current(&self) -> Option<&SessionHandle> {
        self.current
            .as_ref()
            .map(|live| &live.handle)
            .filter(|handle| !handle.is_stopped())
    }

    pub fn is_sounding(&self, source: SessionSource) -> bool {
        self.current().is_some_and(|handle| handle.source == source)
    }

    /// Closes a session that ended on its own, either by auto-stop or by running out of audio.
    pub fn reap_finished(&mut self) -> Option<SessionHandle> {
        let live = self.current.as_ref()?;
        let finished = live.handle.is_stopped() || !self.lock().is_playing();
        if !finished {
            return None;
        }

        let handle = live.handle.clone();
        if self.stop(&handle) {
            debug!("Session {} reached the end of its audio", handle.id);
        }
        Some(handle)
    }

    fn spawn_tasks(
        &self,
        handle: &SessionHandle,
        trim: Option<Duration>,
    ) -> std::io::Result<(Option<ScheduledTask>, Option<ScheduledTask>)> {
        let auto_stop = match trim {
            Some(length) => {
                let backend = Arc::clone(&self.backend);
                let token = handle.token.clone();
                let id = handle.id;
                Some(ScheduledTask::after("pisound-auto-stop", length, move || {
                    let mut backend = backend.lock().unwrap_or_else(PoisonError::into_inner);
                    if end_session(&mut *backend, &token) {
                        info!("Auto-stopped session {id}");
                    }
                })?)
            }
            None => None,
        };

        let elapsed = self.elapsed.clone();
        let token = handle.token.clone();
        let started_at = handle.started_at;
        let ticker = ScheduledTask::every("pisound-elapsed", self.tick_interval, move || {
            if token.is_cancelled() {
                return false;
            }
            elapsed.set(started_at.elapsed());
            true
        })?;

        Ok((auto_stop, Some(ticker)))
    }

    fn lock(&self) -> MutexGuard<'_, B> {
        self.backend.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_checked(&self) -> Result<MutexGuard<'_, B>, PlaybackError> {
        self.backend
            .lock()
            .map_err(|_| PlaybackError::BackendUnavailable)
    }
}

impl<B: AudioBackend + 'static> Drop for PlaybackController<B> {
    fn drop(&mut self) {
        if let Some(live) = self.current.take() {
            end_session(&mut *self.lock(), &live.handle.token);
            live.retire();
        }
    }
}

/// Ends the session behind `token`. Call with the backend locked.
fn end_session<B: AudioBackend + ?Sized>(backend: &mut B, token: &CancelToken) -> bool {
    if !token.cancel() {
        return false;
    }
    if let Err(err) = backend.stop() {
        warn!("Mixer refused stop: {err}");
    }
    true
}

fn start_backend<B: AudioBackend + ?Sized>(
    backend: &mut B,
    entry: &ClipEntry,
    path: &Path,
) -> Result<(), AudioError> {
    backend.load(path)?;
    backend.set_volume(entry.volume as f32)?;
    backend.seek(entry.start_offset)?;
    backend.play()
}
