//! The self-scheduling diagnostic loop.
//!
//! The loop is a cancellable tokio task driven by an interval ticker and a
//! watch-channel stop signal, so a stop request never races a scan already
//! in flight: the in-flight cycle finishes, then the task exits.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::engine::DiagnosticRecoveryEngine;
use crate::module::DiagnosticError;

/// Default interval between diagnostic cycles.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(300);

struct LoopHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Drives periodic diagnostic cycles over a [`DiagnosticRecoveryEngine`].
pub struct DiagnosticLoop {
    engine: DiagnosticRecoveryEngine,
    handle: Mutex<Option<LoopHandle>>,
}

impl std::fmt::Debug for DiagnosticLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticLoop")
            .field("running", &self.is_running())
            .finish()
    }
}

impl DiagnosticLoop {
    /// Creates a stopped loop over the engine.
    #[must_use]
    pub const fn new(engine: DiagnosticRecoveryEngine) -> Self {
        Self {
            engine,
            handle: Mutex::new(None),
        }
    }

    /// The engine the loop drives.
    #[must_use]
    pub const fn engine(&self) -> &DiagnosticRecoveryEngine {
        &self.engine
    }

    /// True while the background task is scheduled.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Starts the loop with the default five-minute interval.
    pub fn start_diagnostic_loop(&self) -> Result<(), DiagnosticError> {
        self.start_with_interval(DEFAULT_SCAN_INTERVAL)
    }

    /// Starts the loop with a custom interval. The first cycle runs
    /// immediately; later cycles follow the ticker.
    pub fn start_with_interval(&self, interval: Duration) -> Result<(), DiagnosticError> {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            return Err(DiagnosticError::LoopAlreadyRunning);
        }
        let engine = self.engine.clone();
        let (stop, mut stopped) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = stopped.changed() => break,
                    _ = ticker.tick() => engine.run_diagnostic_cycle().await,
                }
            }
        });
        *handle = Some(LoopHandle { stop, task });
        Ok(())
    }

    /// Signals the loop to stop and waits for the task to exit. A cycle in
    /// flight completes first. A no-op when the loop is not running.
    pub async fn stop_diagnostic_loop(&self) {
        let handle = self.handle.lock().take();
        if let Some(LoopHandle { stop, task }) = handle {
            let _ = stop.send(true);
            let _ = task.await;
        }
    }
}
