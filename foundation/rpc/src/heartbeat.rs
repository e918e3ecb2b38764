use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Callback fired on every heartbeat. A failure is logged and does not stop
/// the heartbeater.
pub type HeartbeatFn = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// A periodic timer whose firing can be suppressed by resetting it.
///
/// The worker waits up to `period`; when the wait elapses without a reset
/// the callback fires and the next wait begins immediately. Any `reset`
/// restarts the wait from zero, so the next callback is at least `period`
/// after the most recent reset. Used to keep heartbeats quiet while an
/// authoritative event stream is healthy.
pub struct Heartbeater {
    name: String,
    period: Duration,
    callback: HeartbeatFn,
    worker: Mutex<Option<Worker>>,
}

struct Worker {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
    reset: Arc<Notify>,
}

impl Heartbeater {
    pub fn new(name: impl Into<String>, period: Duration, callback: HeartbeatFn) -> Self {
        Heartbeater {
            name: name.into(),
            period,
            callback,
            worker: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Launches the worker. Fails if the heartbeater is already running.
    pub fn start(&self) -> Result<()> {
        let mut slot = self.worker.lock();
        if slot.is_some() {
            return Err(Error::IllegalState(format!(
                "heartbeater {} already started",
                self.name
            )));
        }

        let cancel = CancellationToken::new();
        let reset = Arc::new(Notify::new());
        let handle = tokio::spawn(run_worker(
            self.name.clone(),
            self.period,
            Arc::clone(&self.callback),
            cancel.clone(),
            Arc::clone(&reset),
        ));
        *slot = Some(Worker { handle, cancel, reset });
        Ok(())
    }

    /// Restarts the current wait without blocking. Safe from any task,
    /// including concurrently with `stop` (stop wins the race).
    pub fn reset(&self) {
        if let Some(worker) = &*self.worker.lock() {
            worker.reset.notify_one();
        }
    }

    /// Stops the worker and waits for it to finish, including any callback
    /// already in flight. Idempotent.
    pub async fn stop(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            worker.cancel.cancel();
            if worker.handle.await.is_err() {
                tracing::warn!("heartbeater {} worker panicked", self.name);
            }
        }
    }
}

async fn run_worker(
    name: String,
    period: Duration,
    callback: HeartbeatFn,
    cancel: CancellationToken,
    reset: Arc<Notify>,
) {
    tracing::debug!("heartbeater {name} started, period {period:?}");
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            // A reset permit restarts the wait from zero; only the latest
            // reset matters, so a single permit suffices.
            _ = reset.notified() => continue,
            _ = tokio::time::sleep(period) => {}
        }
        if let Err(e) = (callback)().await {
            tracing::warn!("heartbeater {name} callback failed: {e}");
        }
    }
    tracing::debug!("heartbeater {name} stopped");
}
