use std::sync::Arc;
use std::time::Duration;

use strata_protos::tserver::{ColumnRangePredicatePb, NewScanRequestPb, ScanRequestPb, ScanResponsePb};
use strata_rpc::{Error, Result, TabletServerService};

use crate::row::{self, Row};
use crate::schema::Schema;
use crate::table::Table;
use crate::value::Value;

// TODO: expose as a scanner option.
const SCAN_RPC_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_BATCH_SIZE_BYTES: u32 = 1024 * 1024;

/// A one-column range constraint, AND-ed with the scanner's other
/// predicates. Bounds are inclusive; an absent bound is unbounded.
#[derive(Debug, Clone)]
pub struct ColumnRangePredicate {
    pub column: String,
    pub lower_bound: Option<Value>,
    pub upper_bound: Option<Value>,
}

impl ColumnRangePredicate {
    pub fn new(column: impl Into<String>, lower_bound: Option<Value>, upper_bound: Option<Value>) -> Self {
        ColumnRangePredicate { column: column.into(), lower_bound, upper_bound }
    }
}

/// A streaming cursor over a table's rows.
///
/// Configure before [`open`](Scanner::open), then page with
/// [`next_batch`](Scanner::next_batch) while [`has_more_rows`](Scanner::has_more_rows).
/// Dropping the scanner releases the server-side cursor best-effort.
pub struct Scanner {
    table: Table,
    projection: Schema,
    batch_size_bytes: u32,
    predicates: Vec<ColumnRangePredicatePb>,
    proxy: Option<Arc<dyn TabletServerService>>,
    open: bool,
    data_in_open: bool,
    scanner_id: Vec<u8>,
    last_response: Option<ScanResponsePb>,
}

impl Scanner {
    pub(crate) fn new(table: Table) -> Scanner {
        let projection = table.schema().clone();
        Scanner {
            table,
            projection,
            batch_size_bytes: DEFAULT_BATCH_SIZE_BYTES,
            predicates: Vec::new(),
            proxy: None,
            open: false,
            data_in_open: false,
            scanner_id: Vec::new(),
            last_response: None,
        }
    }

    /// Restricts the scan to the named columns, in the given order.
    pub fn set_projection(&mut self, columns: &[&str]) -> Result<()> {
        assert!(!self.open, "cannot reconfigure a scanner after open");
        self.projection = self.table.schema().projection(columns)?;
        Ok(())
    }

    pub fn set_batch_size_bytes(&mut self, batch_size_bytes: u32) {
        assert!(!self.open, "cannot reconfigure a scanner after open");
        self.batch_size_bytes = batch_size_bytes;
    }

    pub fn add_conjunct_predicate(&mut self, predicate: ColumnRangePredicate) -> Result<()> {
        assert!(!self.open, "cannot reconfigure a scanner after open");
        let schema = self.table.schema();
        let index = schema.column_index(&predicate.column).ok_or_else(|| {
            Error::InvalidArgument(format!("unknown predicate column {}", predicate.column))
        })?;
        let column = schema.column(index);
        let encode_bound = |bound: &Option<Value>| -> Result<Option<Vec<u8>>> {
            match bound {
                None => Ok(None),
                Some(value) => {
                    if value.data_type() != column.data_type {
                        return Err(Error::InvalidArgument(format!(
                            "predicate bound type mismatch on column {}",
                            predicate.column
                        )));
                    }
                    let mut buf = Vec::new();
                    row::encode_value(value, &mut buf);
                    Ok(Some(buf))
                }
            }
        };
        self.predicates.push(ColumnRangePredicatePb {
            column: Some(column.to_pb()),
            lower_bound: encode_bound(&predicate.lower_bound)?,
            upper_bound: encode_bound(&predicate.upper_bound)?,
        });
        Ok(())
    }

    pub fn projection(&self) -> &Schema {
        &self.projection
    }

    /// Opens a server-side cursor on the table's tablet. On failure the
    /// scanner stays un-opened and can be retried or dropped.
    pub async fn open(&mut self) -> Result<()> {
        assert!(!self.open, "scanner already open");
        let proxy = self.table.tablet_proxy().await?;
        let req = ScanRequestPb {
            new_scan_request: Some(NewScanRequestPb {
                tablet_id: self.table.tablet_id().to_string(),
                projected_columns: self.projection.columns().iter().map(|c| c.to_pb()).collect(),
                range_predicates: self.predicates.clone(),
            }),
            scanner_id: Vec::new(),
            batch_size_bytes: Some(self.batch_size_bytes),
            close_scanner: false,
        };
        let resp = Self::send(&proxy, req).await?;

        self.data_in_open = resp.data.is_some();
        if resp.has_more_results {
            // The server allocated a cursor; an inline-complete scan leaves
            // the id empty and nothing to close.
            self.scanner_id = resp.scanner_id.clone();
        }
        self.last_response = Some(resp);
        self.proxy = Some(proxy);
        self.open = true;
        Ok(())
    }

    pub fn has_more_rows(&self) -> bool {
        assert!(self.open, "scanner not open");
        self.data_in_open
            || self.last_response.as_ref().map(|r| r.has_more_results).unwrap_or(false)
    }

    /// Fetches the next batch of rows into `rows`, replacing its contents.
    pub async fn next_batch(&mut self, rows: &mut Vec<Row>) -> Result<()> {
        assert!(self.open, "scanner not open");
        rows.clear();

        // The opening response may already carry the first batch.
        if self.data_in_open {
            self.data_in_open = false;
            if let Some(block) = self.last_response.as_ref().and_then(|r| r.data.as_ref()) {
                *rows = row::decode_rows(&self.projection, block)?;
            }
            return Ok(());
        }

        if self.scanner_id.is_empty() {
            return Ok(());
        }
        let proxy = Arc::clone(self.proxy.as_ref().unwrap());
        let req = ScanRequestPb {
            new_scan_request: None,
            scanner_id: self.scanner_id.clone(),
            batch_size_bytes: Some(self.batch_size_bytes),
            close_scanner: false,
        };
        let resp = Self::send(&proxy, req).await?;
        if let Some(block) = resp.data.as_ref() {
            *rows = row::decode_rows(&self.projection, block)?;
        }
        self.last_response = Some(resp);
        Ok(())
    }

    /// Releases the server-side cursor, if one was allocated, without
    /// blocking: the close RPC runs on a detached task owning its own
    /// request and proxy handle, so the scanner may be dropped before it
    /// completes. A close failure is logged only.
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        self.data_in_open = false;
        self.last_response = None;
        let scanner_id = std::mem::take(&mut self.scanner_id);
        let proxy = self.proxy.take();

        if scanner_id.is_empty() {
            return;
        }
        let Some(proxy) = proxy else { return };
        let req = ScanRequestPb {
            new_scan_request: None,
            scanner_id,
            batch_size_bytes: Some(0),
            close_scanner: true,
        };
        let close = async move {
            match tokio::time::timeout(SCAN_RPC_TIMEOUT, proxy.scan(req)).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::warn!("failed to close scanner: {e}"),
                Err(_) => tracing::warn!("scanner close RPC timed out"),
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(close);
            }
            Err(_) => {
                tracing::warn!("no runtime to close scanner; the server cursor will expire on its own")
            }
        }
    }

    async fn send(proxy: &Arc<dyn TabletServerService>, req: ScanRequestPb) -> Result<ScanResponsePb> {
        let mut resp = match tokio::time::timeout(SCAN_RPC_TIMEOUT, proxy.scan(req)).await {
            Ok(resp) => resp?,
            Err(_) => return Err(Error::TimedOut("scan RPC timed out".to_string())),
        };
        if let Some(error) = resp.error.take() {
            return Err(error.into());
        }
        Ok(resp)
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        self.close();
    }
}
