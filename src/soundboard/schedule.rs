//! Cancelable background tasks for auto-stop and the elapsed-time display.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Sender, after, bounded, select, tick};

/// One-shot flag shared between a session's owner and its background tasks.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag. Only the first caller gets `true`.
    pub fn cancel(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Background thread that waits on a timer and can be woken early.
///
/// Dropping the task wakes it without waiting for the thread to exit.
pub struct ScheduledTask {
    wake: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    /// Runs `task` once after `delay`, unless woken first.
    pub fn after<F>(name: &str, delay: Duration, task: F) -> io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let (wake, woken) = bounded::<()>(1);
        let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            select! {
                recv(woken) -> _ => {},
                recv(after(delay)) -> _ => task(),
            }
        })?;

        Ok(Self {
            wake: Some(wake),
            handle: Some(handle),
        })
    }

    /// Runs `task` every `interval` until it returns `false` or the task is woken.
    pub fn every<F>(name: &str, interval: Duration, mut task: F) -> io::Result<Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (wake, woken) = bounded::<()>(1);
        let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            let ticker = tick(interval);
            loop {
                select! {
                    recv(woken) -> _ => break,
                    recv(ticker) -> _ => {
                        if !task() {
                            break;
                        }
                    }
                }
            }
        })?;

        Ok(Self {
            wake: Some(wake),
            handle: Some(handle),
        })
    }

    /// Wakes the thread. A pending one-shot task that has not started will not run.
    pub fn cancel(&mut self) {
        // Disconnecting the channel wakes the select.
        self.wake.take();
    }

    /// Cancels and waits for the thread to exit.
    pub fn join(mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Seconds the current session has been sounding, for display. Cheap to clone and read.
#[derive(Clone, Debug, Default)]
pub struct ElapsedDisplay(Arc<AtomicU64>);

impl ElapsedDisplay {
    pub fn seconds(&self) -> f64 {
        self.0.load(Ordering::Relaxed) as f64 / 1000.0
    }

    pub(crate) fn set(&self, elapsed: Duration) {
        self.0.store(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub(crate) fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    #[test]
    fn test_cancel_reports_first_caller_only() {
        let token = CancelToken::new();
        let shared = token.clone();

        assert!(!token.is_cancelled());
        assert!(shared.cancel());
        assert!(!token.cancel());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_after_runs_once_past_delay() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let start = Instant::now();

        let task = ScheduledTask::after("test-after", Duration::from_millis(30), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        task.join_after_completion();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_cancelled_after_never_runs() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();

        let task = ScheduledTask::after("test-cancel", Duration::from_millis(50), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        task.join();
        thread::sleep(Duration::from_millis(100));

        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_every_stops_when_task_returns_false() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();

        let task = ScheduledTask::every("test-every", Duration::from_millis(5), move || {
            counter.fetch_add(1, Ordering::SeqCst) + 1 < 3
        })
        .unwrap();
        task.join_after_completion();

        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_elapsed_display_in_seconds() {
        let elapsed = ElapsedDisplay::default();
        elapsed.clone().set(Duration::from_millis(1500));
        assert_eq!(elapsed.seconds(), 1.5);

        elapsed.reset();
        assert_eq!(elapsed.seconds(), 0.0);
    }

    impl ScheduledTask {
        /// Waits for the thread to finish on its own.
        fn join_after_completion(mut self) {
            if let Some(handle) = self.handle.take() {
                handle.join().unwrap();
            }
        }
    }
}
