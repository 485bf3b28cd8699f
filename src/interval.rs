//! The shared recurring check timer

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Owns the single recurring tick that drives evaluation of every
/// configuration
///
/// At most one timer exists at a time: starting while a timer is already
/// running is a no-op, and [`stop`][IntervalMultiplexer::stop] releases the
/// timer deterministically. Stopping prevents any further tick from being
/// observed but never aborts tick work already in progress; that work runs
/// to its terminal outcome.
#[derive(Debug, Default)]
pub struct IntervalMultiplexer {
    running: Mutex<Option<RunningCheck>>,
}

#[derive(Debug)]
struct RunningCheck {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl IntervalMultiplexer {
    /// Constructs a multiplexer with no timer running
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the recurring tick is currently scheduled
    pub fn is_running(&self) -> bool {
        self.lock().is_some()
    }

    /// Starts the recurring tick, invoking `on_tick` once per period
    ///
    /// The first tick fires one full `period` after starting. Returns
    /// `false` without scheduling anything if a timer is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F, Fut>(&self, period: Duration, mut on_tick: F) -> bool
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let mut running = self.lock();
        if running.is_some() {
            return false;
        }

        let (stop, mut stopped) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the interval yields immediately; consume that so the first
            // real tick lands one period from now
            ticker.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = stopped.changed() => break,
                    _ = ticker.tick() => on_tick().await,
                }
            }
            tracing::debug!("periodic check timer released");
        });
        *running = Some(RunningCheck { stop, task });
        true
    }

    /// Cancels the recurring tick and releases the timer
    ///
    /// No tick is observable after this returns.
    pub fn stop(&self) {
        if let Some(check) = self.lock().take() {
            if check.stop.send(true).is_err() {
                // the task already exited on its own
                check.task.abort();
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<RunningCheck>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
