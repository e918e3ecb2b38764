use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use strata_rpc::{Error, Result};

use crate::batcher::{Batcher, FlushAwaiter, WriteBatcher};
use crate::client::Client;
use crate::error::{ErrorCollector, OpError, DEFAULT_MAX_ERRORS};
use crate::mutation::Insert;

/// When to send buffered mutations to the tablet servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
    /// Every `apply` flushes and waits for the batch to complete.
    AutoFlushSync,
    /// Reserved: background flushing is not implemented.
    AutoFlushBackground,
    /// Mutations accumulate until `flush` / `flush_async`.
    ManualFlush,
}

const DEFAULT_TIMEOUT_MILLIS: u64 = 10_000;

/// A write session: buffers mutations into batches and flushes them to the
/// tablet servers.
///
/// Cheap to clone and safe for concurrent use. Mutations applied between
/// two flushes belong to the same batch; batches flush independently and
/// may complete in any order. Per-mutation failures are reported through
/// [`Session::get_pending_errors`], not from `apply` or `flush`.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

pub(crate) struct SessionInner {
    #[allow(dead_code)] // Keeps the client (and its messenger) alive for in-flight batches.
    client: Client,
    errors: Arc<ErrorCollector>,
    state: Mutex<SessionState>,
}

struct SessionState {
    initted: bool,
    flush_mode: FlushMode,
    timeout_millis: u64,
    current: Option<Arc<dyn Batcher>>,
    flushing: HashMap<u64, Arc<dyn Batcher>>,
    next_batcher_id: u64,
}

impl Session {
    pub(crate) fn new(client: Client) -> Session {
        Session {
            inner: Arc::new(SessionInner {
                client,
                errors: Arc::new(ErrorCollector::new(DEFAULT_MAX_ERRORS)),
                state: Mutex::new(SessionState {
                    initted: false,
                    flush_mode: FlushMode::AutoFlushSync,
                    timeout_millis: DEFAULT_TIMEOUT_MILLIS,
                    current: None,
                    flushing: HashMap::new(),
                    next_batcher_id: 0,
                }),
            }),
        }
    }

    /// Prepares the session for use. Must be called exactly once.
    pub fn init(&self) {
        let mut state = self.inner.state.lock();
        assert!(!state.initted, "session already initialized");
        state.initted = true;
        let batcher = self.make_batcher(&mut state);
        state.current = Some(batcher);
    }

    /// Changes the flush policy. Fails with `IllegalState` while mutations
    /// are buffered in the current batch.
    pub fn set_flush_mode(&self, mode: FlushMode) -> Result<()> {
        if mode == FlushMode::AutoFlushBackground {
            return Err(Error::InvalidArgument(
                "flush mode AutoFlushBackground is not supported".to_string(),
            ));
        }
        if mode == self.inner.state.lock().flush_mode {
            return Ok(());
        }
        let current = self.current();
        if current.has_pending_operations() {
            return Err(Error::IllegalState(
                "cannot change flush mode while writes are buffered".to_string(),
            ));
        }
        self.inner.state.lock().flush_mode = mode;
        Ok(())
    }

    pub fn flush_mode(&self) -> FlushMode {
        self.inner.state.lock().flush_mode
    }

    /// Sets the per-operation timeout, in milliseconds, for this session's
    /// batches.
    pub fn set_timeout_millis(&self, millis: i64) -> Result<()> {
        if millis < 0 {
            return Err(Error::InvalidArgument(format!(
                "timeout must not be negative: {millis}"
            )));
        }
        let current = {
            let mut state = self.inner.state.lock();
            state.timeout_millis = millis as u64;
            state.current.clone()
        };
        if let Some(batcher) = current {
            batcher.set_timeout_millis(millis as u64);
        }
        Ok(())
    }

    /// Hands a mutation to the current batch. The mutation's key columns
    /// must be set. In `AutoFlushSync` mode this flushes and returns the
    /// batch status.
    pub async fn apply(&self, insert: Insert) -> Result<()> {
        if !insert.row().key_is_set() {
            return Err(Error::IllegalState("key not specified for mutation".to_string()));
        }
        let (batcher, mode) = {
            let state = self.inner.state.lock();
            assert!(state.initted, "session not initialized");
            (state.current.clone().unwrap(), state.flush_mode)
        };
        batcher.add(insert);
        if mode == FlushMode::AutoFlushSync {
            return self.flush().await;
        }
        Ok(())
    }

    /// Flushes the current batch and waits for it to complete.
    pub async fn flush(&self) -> Result<()> {
        self.flush_async().wait().await
    }

    /// Seals the current batch and flushes it in the background; a fresh
    /// batch becomes current immediately. The returned awaiter resolves
    /// with the batch status.
    pub fn flush_async(&self) -> FlushAwaiter {
        let previous = {
            let mut state = self.inner.state.lock();
            assert!(state.initted, "session not initialized");
            let fresh = self.make_batcher(&mut state);
            let previous = state.current.replace(fresh).unwrap();
            state.flushing.insert(previous.id(), Arc::clone(&previous));
            previous
        };
        // Outside the lock: a batch failing inline re-enters the session
        // through flush_finished.
        previous.flush_async()
    }

    /// True while the current batch or any in-flight batch holds
    /// unfinished mutations.
    pub fn has_pending_operations(&self) -> bool {
        let (current, flushing) = {
            let state = self.inner.state.lock();
            (state.current.clone(), state.flushing.values().cloned().collect::<Vec<_>>())
        };
        current.map(|b| b.has_pending_operations()).unwrap_or(false)
            || flushing.iter().any(|b| b.has_pending_operations())
    }

    /// Number of mutations buffered in the current batch. Only meaningful
    /// under `ManualFlush`.
    pub fn count_buffered_operations(&self) -> usize {
        let (current, mode) = {
            let state = self.inner.state.lock();
            assert!(state.initted, "session not initialized");
            (state.current.clone().unwrap(), state.flush_mode)
        };
        assert_eq!(mode, FlushMode::ManualFlush, "count_buffered_operations requires ManualFlush");
        current.count_buffered_operations()
    }

    pub fn count_pending_errors(&self) -> usize {
        self.inner.errors.count_errors()
    }

    /// Transfers collected mutation failures to the caller; the flag
    /// reports whether the collector dropped entries due to its cap.
    pub fn get_pending_errors(&self) -> (Vec<OpError>, bool) {
        self.inner.errors.drain()
    }

    fn current(&self) -> Arc<dyn Batcher> {
        let state = self.inner.state.lock();
        assert!(state.initted, "session not initialized");
        state.current.clone().unwrap()
    }

    fn make_batcher(&self, state: &mut SessionState) -> Arc<dyn Batcher> {
        let id = state.next_batcher_id;
        state.next_batcher_id += 1;
        Arc::new(WriteBatcher::new(
            id,
            Arc::downgrade(&self.inner),
            Arc::clone(&self.inner.errors),
            state.timeout_millis,
        ))
    }
}

impl SessionInner {
    /// Called by a batcher when its flush completes.
    pub(crate) fn flush_finished(&self, batcher_id: u64) {
        let removed = self.state.lock().flushing.remove(&batcher_id);
        assert!(removed.is_some(), "unknown batch {batcher_id} reported finished");
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        // In-flight batches keep running against the shared collector; only
        // never-flushed buffered mutations are dropped here.
        if let Some(current) = self.state.get_mut().current.take() {
            if current.has_pending_operations() {
                tracing::warn!(
                    "closing session with {} buffered operations; aborting them",
                    current.count_buffered_operations()
                );
                current.abort();
            }
        }
    }
}
