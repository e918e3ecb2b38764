use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use strata_protos::tserver::{RowOperationTypePb, RowOperationsPb, WriteRequestPb};
use strata_rpc::{Error, Result};

use crate::error::ErrorCollector;
use crate::mutation::Insert;
use crate::row;
use crate::session::SessionInner;
use crate::table::Table;

/// Completion handle for an asynchronous flush: a one-shot latch carrying
/// the batch status.
pub struct FlushAwaiter {
    consumer: oneshot::Receiver<Result<()>>,
}

impl FlushAwaiter {
    pub(crate) fn new(consumer: oneshot::Receiver<Result<()>>) -> FlushAwaiter {
        FlushAwaiter { consumer }
    }

    pub(crate) fn ready(result: Result<()>) -> FlushAwaiter {
        let (producer, consumer) = oneshot::channel();
        let _ = producer.send(result);
        FlushAwaiter { consumer }
    }

    pub async fn wait(self) -> Result<()> {
        match self.consumer.await {
            Ok(result) => result,
            Err(_) => Err(Error::Aborted("flush was aborted".to_string())),
        }
    }
}

/// A bounded accumulator of mutations flushed as one unit.
///
/// The session owns the lifecycle: mutations go to the current batcher,
/// `flush_async` seals it while a fresh one takes its place, and the sealed
/// batch drains on a background task that reports back through
/// [`SessionInner::flush_finished`].
pub trait Batcher: Send + Sync {
    fn id(&self) -> u64;

    fn add(&self, op: Insert);

    fn has_pending_operations(&self) -> bool;

    fn count_buffered_operations(&self) -> usize;

    fn set_timeout_millis(&self, millis: u64);

    fn flush_async(&self) -> FlushAwaiter;

    fn abort(&self);
}

pub(crate) struct WriteBatcher {
    id: u64,
    session: Weak<SessionInner>,
    errors: Arc<ErrorCollector>,
    state: Arc<Mutex<BatcherState>>,
}

struct BatcherState {
    ops: Vec<Insert>,
    timeout_millis: u64,
    in_flight: usize,
    flushed: bool,
}

impl WriteBatcher {
    pub fn new(
        id: u64,
        session: Weak<SessionInner>,
        errors: Arc<ErrorCollector>,
        timeout_millis: u64,
    ) -> WriteBatcher {
        WriteBatcher {
            id,
            session,
            errors,
            state: Arc::new(Mutex::new(BatcherState {
                ops: Vec::new(),
                timeout_millis,
                in_flight: 0,
                flushed: false,
            })),
        }
    }
}

impl Batcher for WriteBatcher {
    fn id(&self) -> u64 {
        self.id
    }

    fn add(&self, op: Insert) {
        let mut state = self.state.lock();
        debug_assert!(!state.flushed, "mutation added to a sealed batch");
        state.ops.push(op);
    }

    fn has_pending_operations(&self) -> bool {
        let state = self.state.lock();
        !state.ops.is_empty() || state.in_flight > 0
    }

    fn count_buffered_operations(&self) -> usize {
        self.state.lock().ops.len()
    }

    fn set_timeout_millis(&self, millis: u64) {
        self.state.lock().timeout_millis = millis;
    }

    fn flush_async(&self) -> FlushAwaiter {
        let (ops, timeout_millis) = {
            let mut state = self.state.lock();
            if state.flushed {
                return FlushAwaiter::ready(Err(Error::IllegalState(
                    "batch already flushed".to_string(),
                )));
            }
            state.flushed = true;
            state.in_flight = state.ops.len();
            (std::mem::take(&mut state.ops), state.timeout_millis)
        };

        let (producer, consumer) = oneshot::channel();
        let id = self.id;
        let session = self.session.clone();
        let errors = Arc::clone(&self.errors);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let result = flush_ops(ops, timeout_millis, &errors).await;
            state.lock().in_flight = 0;
            if let Some(session) = session.upgrade() {
                session.flush_finished(id);
            }
            // The awaiter may have been dropped; the batch outcome is
            // already in the error collector either way.
            let _ = producer.send(result);
        });
        FlushAwaiter::new(consumer)
    }

    fn abort(&self) {
        let dropped = {
            let mut state = self.state.lock();
            state.flushed = true;
            std::mem::take(&mut state.ops)
        };
        if !dropped.is_empty() {
            tracing::debug!("aborted batch dropped {} buffered operations", dropped.len());
        }
    }
}

/// Writes the batch, one request per tablet, recording failed mutations in
/// the collector. Mutation-level failures do not fail the batch; a
/// request-level failure fails every mutation it carried and the batch.
async fn flush_ops(ops: Vec<Insert>, timeout_millis: u64, errors: &ErrorCollector) -> Result<()> {
    if ops.is_empty() {
        return Ok(());
    }

    let mut groups: Vec<(Table, Vec<Insert>)> = Vec::new();
    for op in ops {
        match groups.iter_mut().find(|(table, _)| table.tablet_id() == op.table().tablet_id()) {
            Some((_, group)) => group.push(op),
            None => groups.push((op.table().clone(), vec![op])),
        }
    }

    let mut batch_status = Ok(());
    for (table, group) in groups {
        if let Err(e) = write_group(&table, group, timeout_millis, errors).await {
            if batch_status.is_ok() {
                batch_status = Err(e);
            }
        }
    }
    batch_status
}

async fn write_group(
    table: &Table,
    ops: Vec<Insert>,
    timeout_millis: u64,
    errors: &ErrorCollector,
) -> Result<()> {
    let tablet_id = table.tablet_id().to_string();
    let schema = table.schema();

    let attempt = async {
        let proxy = table.tablet_proxy().await?;
        let (count, rows) = row::encode_rows(schema, ops.iter().map(Insert::row));
        let req = WriteRequestPb {
            tablet_id: tablet_id.clone(),
            schema: Some(schema.to_pb()),
            row_operations: Some(RowOperationsPb {
                r#type: RowOperationTypePb::Insert as i32,
                count,
                rows,
            }),
        };
        let resp = match tokio::time::timeout(Duration::from_millis(timeout_millis), proxy.write(req))
            .await
        {
            Ok(resp) => resp?,
            Err(_) => {
                return Err(Error::TimedOut(format!("write to tablet {tablet_id} timed out")))
            }
        };
        if let Some(error) = resp.error {
            return Err(error.into());
        }
        Ok(resp.per_row_errors)
    };

    match attempt.await {
        Ok(per_row_errors) => {
            if per_row_errors.is_empty() {
                return Ok(());
            }
            let mut ops: Vec<Option<Insert>> = ops.into_iter().map(Some).collect();
            for row_error in per_row_errors {
                let error = row_error
                    .error
                    .map(Error::from)
                    .unwrap_or_else(|| Error::RuntimeError("write failed".to_string()));
                match ops.get_mut(row_error.row_index as usize).and_then(Option::take) {
                    Some(op) => errors.record(op, error),
                    None => tracing::warn!(
                        "write response for tablet {tablet_id} names unknown row {}",
                        row_error.row_index
                    ),
                }
            }
            // Per-mutation failures surface through the collector only.
            Ok(())
        }
        Err(e) => {
            tracing::debug!("batch write to tablet {tablet_id} failed: {e}");
            for op in ops {
                errors.record(op, e.clone());
            }
            Err(e)
        }
    }
}
