use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::mutation::Insert;

pub use strata_rpc::{Error, Result};

/// A failed mutation together with the status the batch reported for it.
#[derive(Debug)]
pub struct OpError {
    pub op: Insert,
    pub error: Error,
}

/// Collects per-mutation failures from flushed batches.
///
/// Shared between a session and every batcher the session created, so a
/// batch still in flight when its session is dropped has somewhere to
/// record its failures. Holds at most `max_errors` entries; beyond that
/// new entries are dropped and the overflow is reported on drain.
pub(crate) struct ErrorCollector {
    max_errors: usize,
    state: Mutex<CollectorState>,
}

#[derive(Default)]
struct CollectorState {
    errors: VecDeque<OpError>,
    dropped: bool,
}

pub(crate) const DEFAULT_MAX_ERRORS: usize = 1024;

impl ErrorCollector {
    pub fn new(max_errors: usize) -> ErrorCollector {
        ErrorCollector { max_errors, state: Mutex::new(CollectorState::default()) }
    }

    pub fn count_errors(&self) -> usize {
        self.state.lock().errors.len()
    }

    pub fn record(&self, op: Insert, error: Error) {
        let mut state = self.state.lock();
        if state.errors.len() >= self.max_errors {
            state.dropped = true;
            return;
        }
        state.errors.push_back(OpError { op, error });
    }

    /// Transfers the collected errors to the caller; the second element
    /// reports whether any entry was dropped since the last drain.
    pub fn drain(&self) -> (Vec<OpError>, bool) {
        let mut state = self.state.lock();
        let overflowed = std::mem::take(&mut state.dropped);
        (std::mem::take(&mut state.errors).into(), overflowed)
    }
}
