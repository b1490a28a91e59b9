//! Timed epoch playback.
//!
//! A [`Playback`] owns at most one background worker. The worker sleeps on a
//! condition variable for one interval, advances the shared epoch cursor
//! modulo the epoch count and reports the new epoch to a callback. Stopping
//! signals the condition variable and joins the worker, so no tick is
//! delivered after [`Playback::stop`] returns.

use crate::error::{CapmapError, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

impl StopSignal {
    /// Sleeps until `interval` has elapsed or the signal fires.
    /// Returns `false` once stopped.
    fn wait(&self, interval: Duration) -> bool {
        let deadline = Instant::now() + interval;
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.condvar.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        !*stopped
    }

    fn fire(&self) {
        *self.stopped.lock() = true;
        self.condvar.notify_all();
    }
}

struct Worker {
    signal: Arc<StopSignal>,
    handle: JoinHandle<()>,
}

/// Cancellable periodic epoch advance.
///
/// ```rust
/// use capmap::playback::Playback;
/// use std::sync::mpsc;
/// use std::time::Duration;
///
/// let (tx, rx) = mpsc::channel();
/// let mut playback = Playback::new(0);
/// playback.start(Duration::from_millis(5), 24, move |epoch| {
///     let _ = tx.send(epoch);
/// })?;
/// assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1);
/// playback.stop();
/// # Ok::<(), capmap::CapmapError>(())
/// ```
pub struct Playback {
    cursor: Arc<AtomicU32>,
    worker: Option<Worker>,
}

impl Playback {
    pub fn new(epoch: u32) -> Self {
        Self {
            cursor: Arc::new(AtomicU32::new(epoch)),
            worker: None,
        }
    }

    /// Current epoch.
    pub fn epoch(&self) -> u32 {
        self.cursor.load(Ordering::Acquire)
    }

    /// Moves the cursor; a running worker continues from the new epoch.
    pub fn set_epoch(&self, epoch: u32) {
        self.cursor.store(epoch, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }

    /// Starts ticking every `interval`, replacing any running worker.
    ///
    /// `on_tick` receives each new epoch on the worker thread.
    pub fn start<F>(&mut self, interval: Duration, epoch_count: u32, mut on_tick: F) -> Result<()>
    where
        F: FnMut(u32) + Send + 'static,
    {
        if epoch_count == 0 {
            return Err(CapmapError::InvalidInput(
                "epoch_count must be greater than zero".to_string(),
            ));
        }
        if interval.is_zero() {
            return Err(CapmapError::InvalidInput(
                "playback interval must be greater than zero".to_string(),
            ));
        }

        self.stop();

        let signal = Arc::new(StopSignal::default());
        let cursor = Arc::clone(&self.cursor);
        let worker_signal = Arc::clone(&signal);

        let handle = thread::Builder::new()
            .name("capmap-playback".to_string())
            .spawn(move || {
                while worker_signal.wait(interval) {
                    let next = (cursor.load(Ordering::Acquire) % epoch_count + 1) % epoch_count;
                    cursor.store(next, Ordering::Release);
                    on_tick(next);
                }
                log::debug!("Playback worker stopped");
            })?;

        log::debug!(
            "Playback started: {} epochs every {:?}",
            epoch_count,
            interval
        );

        self.worker = Some(Worker { signal, handle });
        Ok(())
    }

    /// Signals the worker and waits for it to exit. No-op when idle.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        worker.signal.fire();

        // A callback stopping its own playback cannot join itself.
        if worker.handle.thread().id() == thread::current().id() {
            return;
        }
        if worker.handle.join().is_err() {
            log::error!("Playback worker panicked");
        }
    }
}

impl Default for Playback {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Playback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Playback")
            .field("epoch", &self.epoch())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    const TICK: Duration = Duration::from_millis(5);
    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_ticks_wrap_around() {
        let (tx, rx) = mpsc::channel();
        let mut playback = Playback::new(0);
        playback
            .start(TICK, 3, move |epoch| {
                let _ = tx.send(epoch);
            })
            .unwrap();

        let epochs: Vec<u32> = (0..4).map(|_| rx.recv_timeout(TIMEOUT).unwrap()).collect();
        assert_eq!(epochs, vec![1, 2, 0, 1]);
        playback.stop();
    }

    #[test]
    fn test_cursor_outside_window_wraps_into_it() {
        let (tx, rx) = mpsc::channel();
        let mut playback = Playback::new(0);
        playback.set_epoch(u32::MAX);
        playback
            .start(TICK, 24, move |epoch| {
                let _ = tx.send(epoch);
            })
            .unwrap();

        let first = rx.recv_timeout(TIMEOUT).unwrap();
        let second = rx.recv_timeout(TIMEOUT).unwrap();
        playback.stop();

        assert_eq!(first, u32::MAX % 24 + 1);
        assert_eq!(second, (first + 1) % 24);
    }

    #[test]
    fn test_stop_halts_advance() {
        let (tx, rx) = mpsc::channel();
        let mut playback = Playback::new(5);
        playback
            .start(TICK, 24, move |epoch| {
                let _ = tx.send(epoch);
            })
            .unwrap();
        rx.recv_timeout(TIMEOUT).unwrap();

        playback.stop();
        assert!(!playback.is_running());
        let frozen = playback.epoch();
        thread::sleep(TICK * 10);
        assert_eq!(playback.epoch(), frozen);
    }

    #[test]
    fn test_restart_replaces_worker() {
        let first = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();
        let mut playback = Playback::new(0);

        let counter = Arc::clone(&first);
        playback
            .start(TICK, 24, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        playback
            .start(TICK, 24, move |epoch| {
                let _ = tx.send(epoch);
            })
            .unwrap();

        let after_restart = first.load(Ordering::SeqCst);
        rx.recv_timeout(TIMEOUT).unwrap();
        rx.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(first.load(Ordering::SeqCst), after_restart);
        assert!(playback.is_running());
    }

    #[test]
    fn test_drop_stops_worker() {
        let ticks = Arc::new(AtomicUsize::new(0));
        {
            let counter = Arc::clone(&ticks);
            let mut playback = Playback::new(0);
            playback
                .start(TICK, 24, move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
            thread::sleep(TICK * 3);
        }
        let after_drop = ticks.load(Ordering::SeqCst);
        thread::sleep(TICK * 10);
        assert_eq!(ticks.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn test_invalid_arguments() {
        let mut playback = Playback::default();
        assert!(playback.start(TICK, 0, |_| {}).is_err());
        assert!(playback.start(Duration::ZERO, 24, |_| {}).is_err());
        assert!(!playback.is_running());
    }

    #[test]
    fn test_stop_when_idle() {
        let mut playback = Playback::new(3);
        playback.stop();
        playback.set_epoch(7);
        assert_eq!(playback.epoch(), 7);
    }
}
