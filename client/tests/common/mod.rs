//! In-memory master and tablet server installed through the messenger and
//! resolver seams.

// Each test binary uses its own subset of the fixture.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use strata_client::{row, Client, ClientConfig, Row, Schema};
use strata_protos::common::{AppStatusPb, HostPortPb, RowBlockPb, SchemaPb, StatusCodePb};
use strata_protos::master::*;
use strata_protos::tserver::*;
use strata_rpc::{DnsResolver, Error, HostPort, MasterService, Messenger, Result, TabletServerService};

fn app_status(code: StatusCodePb, message: impl Into<String>) -> AppStatusPb {
    AppStatusPb { code: code as i32, message: message.into() }
}

pub struct FakeCluster {
    pub master: Arc<FakeMaster>,
    pub tserver: Arc<FakeTabletServer>,
}

impl FakeCluster {
    pub fn new() -> FakeCluster {
        FakeCluster { master: Arc::new(FakeMaster::new()), tserver: Arc::new(FakeTabletServer::new()) }
    }

    pub async fn client(&self) -> Client {
        self.client_with_admin_timeout(std::time::Duration::from_secs(5)).await
    }

    pub async fn client_with_admin_timeout(&self, timeout: std::time::Duration) -> Client {
        let config = ClientConfig {
            master_address: "master.example.com".to_string(),
            default_admin_timeout: timeout,
            messenger: Some(Arc::new(FakeMessenger {
                master: Arc::clone(&self.master),
                tserver: Arc::clone(&self.tserver),
            })),
            resolver: Some(Arc::new(FakeResolver)),
        };
        Client::new(config).await.expect("client")
    }
}

struct FakeResolver;

#[async_trait]
impl DnsResolver for FakeResolver {
    async fn resolve(&self, _host_port: &HostPort) -> Result<Vec<SocketAddr>> {
        Ok(vec!["127.0.0.1:7051".parse().unwrap()])
    }
}

struct FakeMessenger {
    master: Arc<FakeMaster>,
    tserver: Arc<FakeTabletServer>,
}

#[async_trait]
impl Messenger for FakeMessenger {
    async fn master_proxy(&self, _addr: SocketAddr) -> Result<Arc<dyn MasterService>> {
        Ok(Arc::clone(&self.master) as Arc<dyn MasterService>)
    }

    async fn tablet_proxy(&self, _addr: SocketAddr) -> Result<Arc<dyn TabletServerService>> {
        Ok(Arc::clone(&self.tserver) as Arc<dyn TabletServerService>)
    }
}

struct FakeTable {
    schema: SchemaPb,
    tablets: Vec<TabletLocationsPb>,
}

#[derive(Default)]
struct MasterState {
    tables: HashMap<String, FakeTable>,
    /// Number of upcoming RPCs to fail with a transport error.
    outages: usize,
    /// Number of upcoming completion probes to fail with a transport
    /// error, simulating a master restarting between accepting an
    /// operation and finishing it.
    probe_outages: usize,
    /// Remaining "not done" answers per table for IsCreateTableDone.
    create_pending_polls: HashMap<String, usize>,
    /// Remaining "not done" answers per table for IsAlterTableDone.
    alter_pending_polls: HashMap<String, usize>,
    /// Remaining location polls per table answered with no tablets.
    assignment_pending_polls: HashMap<String, usize>,
    is_alter_done_probes: Vec<String>,
}

pub struct FakeMaster {
    state: Mutex<MasterState>,
}

impl FakeMaster {
    fn new() -> FakeMaster {
        FakeMaster { state: Mutex::new(MasterState::default()) }
    }

    /// Fails the next `n` master RPCs with a transport error, simulating a
    /// restarting master.
    pub fn fail_next(&self, n: usize) {
        self.state.lock().outages = n;
    }

    /// Fails the next `n` completion probes with a transport error.
    pub fn fail_probes(&self, n: usize) {
        self.state.lock().probe_outages = n;
    }

    /// Makes IsCreateTableDone answer "not done" `n` times.
    pub fn delay_create_done(&self, table: &str, n: usize) {
        self.state.lock().create_pending_polls.insert(table.to_string(), n);
    }

    pub fn delay_alter_done(&self, table: &str, n: usize) {
        self.state.lock().alter_pending_polls.insert(table.to_string(), n);
    }

    /// Makes GetTableLocations answer with no tablets `n` times.
    pub fn delay_assignment(&self, table: &str, n: usize) {
        self.state.lock().assignment_pending_polls.insert(table.to_string(), n);
    }

    pub fn is_alter_done_probes(&self) -> Vec<String> {
        self.state.lock().is_alter_done_probes.clone()
    }

    fn check_outage(state: &mut MasterState) -> Result<()> {
        if state.outages > 0 {
            state.outages -= 1;
            return Err(Error::NetworkError("master is restarting".to_string()));
        }
        Ok(())
    }

    fn check_probe_outage(state: &mut MasterState) -> Result<()> {
        Self::check_outage(state)?;
        if state.probe_outages > 0 {
            state.probe_outages -= 1;
            return Err(Error::NetworkError("master is restarting".to_string()));
        }
        Ok(())
    }

    fn tile_tablets(table: &str, mut split_keys: Vec<Vec<u8>>) -> Vec<TabletLocationsPb> {
        split_keys.sort();
        split_keys.dedup();
        let mut boundaries = vec![Vec::new()];
        boundaries.extend(split_keys);
        boundaries.push(Vec::new());

        boundaries
            .windows(2)
            .enumerate()
            .map(|(i, bounds)| TabletLocationsPb {
                tablet_id: format!("{table}-tablet-{i:05}"),
                start_key: bounds[0].clone(),
                end_key: bounds[1].clone(),
                replicas: vec![ReplicaPb {
                    ts_info: Some(TsInfoPb {
                        permanent_uuid: "ts-0".to_string(),
                        rpc_addresses: vec![HostPortPb { host: "ts-0.example.com".to_string(), port: 7050 }],
                    }),
                    role: ReplicaRolePb::Leader as i32,
                }],
            })
            .collect()
    }
}

#[async_trait]
impl MasterService for FakeMaster {
    async fn create_table(&self, req: CreateTableRequestPb) -> Result<CreateTableResponsePb> {
        let mut state = self.state.lock();
        Self::check_outage(&mut state)?;
        if state.tables.contains_key(&req.name) {
            return Ok(CreateTableResponsePb {
                error: Some(app_status(
                    StatusCodePb::AlreadyPresent,
                    format!("table {} already exists", req.name),
                )),
                table_id: None,
            });
        }
        let Some(mut schema) = req.schema else {
            return Ok(CreateTableResponsePb {
                error: Some(app_status(StatusCodePb::InvalidArgument, "no schema specified")),
                table_id: None,
            });
        };
        for (i, column) in schema.columns.iter_mut().enumerate() {
            column.id = Some(i as u32);
        }
        let tablets = Self::tile_tablets(&req.name, req.pre_split_keys);
        state.tables.insert(req.name.clone(), FakeTable { schema, tablets });
        Ok(CreateTableResponsePb { error: None, table_id: Some(format!("id-{}", req.name)) })
    }

    async fn is_create_table_done(
        &self,
        req: IsCreateTableDoneRequestPb,
    ) -> Result<IsCreateTableDoneResponsePb> {
        let mut state = self.state.lock();
        Self::check_probe_outage(&mut state)?;
        let name = req.table.map(|t| t.table_name).unwrap_or_default();
        if !state.tables.contains_key(&name) {
            return Ok(IsCreateTableDoneResponsePb {
                error: Some(app_status(StatusCodePb::NotFound, format!("table {name} not found"))),
                done: false,
            });
        }
        let done = match state.create_pending_polls.get_mut(&name) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                false
            }
            _ => true,
        };
        Ok(IsCreateTableDoneResponsePb { error: None, done })
    }

    async fn alter_table(&self, req: AlterTableRequestPb) -> Result<AlterTableResponsePb> {
        let mut state = self.state.lock();
        Self::check_outage(&mut state)?;
        let name = req.table.map(|t| t.table_name).unwrap_or_default();
        let Some(mut table) = state.tables.remove(&name) else {
            return Ok(AlterTableResponsePb {
                error: Some(app_status(StatusCodePb::NotFound, format!("table {name} not found"))),
            });
        };

        for step in &req.steps {
            match AlterStepTypePb::try_from(step.r#type) {
                Ok(AlterStepTypePb::AddColumn) => {
                    if let Some(schema) = step.add_column.as_ref().and_then(|s| s.schema.clone()) {
                        table.schema.columns.push(schema);
                    }
                }
                Ok(AlterStepTypePb::DropColumn) => {
                    if let Some(drop) = &step.drop_column {
                        table.schema.columns.retain(|c| c.name != drop.name);
                    }
                }
                Ok(AlterStepTypePb::RenameColumn) => {
                    if let Some(rename) = &step.rename_column {
                        for column in &mut table.schema.columns {
                            if column.name == rename.old_name {
                                column.name = rename.new_name.clone();
                            }
                        }
                    }
                }
                _ => {
                    state.tables.insert(name, table);
                    return Ok(AlterTableResponsePb {
                        error: Some(app_status(StatusCodePb::InvalidArgument, "unknown alter step")),
                    });
                }
            }
        }

        let final_name = req.new_table_name.unwrap_or(name);
        state.tables.insert(final_name, table);
        Ok(AlterTableResponsePb { error: None })
    }

    async fn is_alter_table_done(
        &self,
        req: IsAlterTableDoneRequestPb,
    ) -> Result<IsAlterTableDoneResponsePb> {
        let mut state = self.state.lock();
        Self::check_probe_outage(&mut state)?;
        let name = req.table.map(|t| t.table_name).unwrap_or_default();
        state.is_alter_done_probes.push(name.clone());
        if !state.tables.contains_key(&name) {
            return Ok(IsAlterTableDoneResponsePb {
                error: Some(app_status(StatusCodePb::NotFound, format!("table {name} not found"))),
                done: false,
            });
        }
        let done = match state.alter_pending_polls.get_mut(&name) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                false
            }
            _ => true,
        };
        Ok(IsAlterTableDoneResponsePb { error: None, done })
    }

    async fn delete_table(&self, req: DeleteTableRequestPb) -> Result<DeleteTableResponsePb> {
        let mut state = self.state.lock();
        Self::check_outage(&mut state)?;
        let name = req.table.map(|t| t.table_name).unwrap_or_default();
        if state.tables.remove(&name).is_none() {
            return Ok(DeleteTableResponsePb {
                error: Some(app_status(StatusCodePb::NotFound, format!("table {name} not found"))),
            });
        }
        Ok(DeleteTableResponsePb { error: None })
    }

    async fn get_table_schema(
        &self,
        req: GetTableSchemaRequestPb,
    ) -> Result<GetTableSchemaResponsePb> {
        let mut state = self.state.lock();
        Self::check_outage(&mut state)?;
        let name = req.table.map(|t| t.table_name).unwrap_or_default();
        match state.tables.get(&name) {
            Some(table) => Ok(GetTableSchemaResponsePb { error: None, schema: Some(table.schema.clone()) }),
            None => Ok(GetTableSchemaResponsePb {
                error: Some(app_status(StatusCodePb::NotFound, format!("table {name} not found"))),
                schema: None,
            }),
        }
    }

    async fn list_tables(&self, req: ListTablesRequestPb) -> Result<ListTablesResponsePb> {
        let mut state = self.state.lock();
        Self::check_outage(&mut state)?;
        let mut tables: Vec<String> = state
            .tables
            .keys()
            .filter(|name| req.name_filter.as_deref().map(|f| name.starts_with(f)).unwrap_or(true))
            .cloned()
            .collect();
        tables.sort();
        Ok(ListTablesResponsePb { error: None, tables })
    }

    async fn get_table_locations(
        &self,
        req: GetTableLocationsRequestPb,
    ) -> Result<GetTableLocationsResponsePb> {
        let mut state = self.state.lock();
        Self::check_outage(&mut state)?;
        if req.max_returned_locations == Some(0) {
            return Ok(GetTableLocationsResponsePb {
                error: Some(app_status(
                    StatusCodePb::InvalidArgument,
                    "max_returned_locations must be greater than 0",
                )),
                tablet_locations: Vec::new(),
            });
        }
        let name = req.table.map(|t| t.table_name).unwrap_or_default();
        let Some(table) = state.tables.get(&name) else {
            return Ok(GetTableLocationsResponsePb {
                error: Some(app_status(StatusCodePb::NotFound, format!("table {name} not found"))),
                tablet_locations: Vec::new(),
            });
        };
        let tablets = table.tablets.clone();
        if let Some(remaining) = state.assignment_pending_polls.get_mut(&name) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(GetTableLocationsResponsePb { error: None, tablet_locations: Vec::new() });
            }
        }

        let start = req.partition_key_start.unwrap_or_default();
        let max = req.max_returned_locations.map(|m| m as usize).unwrap_or(usize::MAX);
        let locations = tablets
            .into_iter()
            .filter(|t| t.end_key.is_empty() || t.end_key > start)
            .take(max)
            .collect();
        Ok(GetTableLocationsResponsePb { error: None, tablet_locations: locations })
    }
}

struct ScanCursor {
    projection: Schema,
    rows: Vec<Row>,
    pos: usize,
}

#[derive(Default)]
struct TsState {
    /// tablet id → (table schema, stored rows).
    tablets: HashMap<String, (Schema, Vec<Row>)>,
    write_requests: Vec<WriteRequestPb>,
    scanners: HashMap<Vec<u8>, ScanCursor>,
    next_scanner_id: u64,
    close_calls: usize,
    scan_calls: usize,
    /// Number of upcoming scan RPCs to fail with a transport error.
    scan_outages: usize,
    last_predicates: Vec<ColumnRangePredicatePb>,
    rows_per_batch: usize,
}

pub struct FakeTabletServer {
    state: Mutex<TsState>,
}

impl FakeTabletServer {
    fn new() -> FakeTabletServer {
        FakeTabletServer {
            state: Mutex::new(TsState { rows_per_batch: 2, ..TsState::default() }),
        }
    }

    pub fn set_rows_per_batch(&self, n: usize) {
        self.state.lock().rows_per_batch = n;
    }

    /// Fails the next `n` scan RPCs with a transport error.
    pub fn fail_scans(&self, n: usize) {
        self.state.lock().scan_outages = n;
    }

    /// Raw write requests, in arrival order.
    pub fn write_requests(&self) -> Vec<WriteRequestPb> {
        self.state.lock().write_requests.clone()
    }

    pub fn rows_in(&self, tablet_id: &str) -> Vec<Row> {
        self.state
            .lock()
            .tablets
            .get(tablet_id)
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default()
    }

    pub fn row_count(&self) -> usize {
        self.state.lock().tablets.values().map(|(_, rows)| rows.len()).sum()
    }

    pub fn scan_calls(&self) -> usize {
        self.state.lock().scan_calls
    }

    pub fn close_calls(&self) -> usize {
        self.state.lock().close_calls
    }

    pub fn open_scanners(&self) -> usize {
        self.state.lock().scanners.len()
    }

    pub fn last_predicates(&self) -> Vec<ColumnRangePredicatePb> {
        self.state.lock().last_predicates.clone()
    }

    fn page(cursor: &mut ScanCursor, rows_per_batch: usize) -> (RowBlockPb, bool) {
        let end = (cursor.pos + rows_per_batch).min(cursor.rows.len());
        let batch = &cursor.rows[cursor.pos..end];
        let (num_rows, bytes) = row::encode_rows(&cursor.projection, batch.iter());
        cursor.pos = end;
        (RowBlockPb { num_rows, rows: bytes }, cursor.pos < cursor.rows.len())
    }
}

#[async_trait]
impl TabletServerService for FakeTabletServer {
    async fn write(&self, req: WriteRequestPb) -> Result<WriteResponsePb> {
        let mut state = self.state.lock();
        state.write_requests.push(req.clone());

        let Some(schema_pb) = req.schema else {
            return Ok(WriteResponsePb {
                error: Some(app_status(StatusCodePb::InvalidArgument, "write carries no schema")),
                per_row_errors: Vec::new(),
            });
        };
        let schema = Schema::from_pb(&schema_pb)?;
        let ops = req.row_operations.unwrap_or_default();
        let block = RowBlockPb { num_rows: ops.count, rows: ops.rows };
        let rows = row::decode_rows(&schema, &block)?;

        let (_, stored) = state
            .tablets
            .entry(req.tablet_id.clone())
            .or_insert_with(|| (schema.clone(), Vec::new()));

        let mut per_row_errors = Vec::new();
        for (i, new_row) in rows.into_iter().enumerate() {
            let key = schema.column(0).name.clone();
            let duplicate = stored.iter().any(|r| r.get(&key) == new_row.get(&key));
            if duplicate {
                per_row_errors.push(PerRowErrorPb {
                    row_index: i as u32,
                    error: Some(app_status(StatusCodePb::AlreadyPresent, "key already present")),
                });
            } else {
                stored.push(new_row);
            }
        }
        Ok(WriteResponsePb { error: None, per_row_errors })
    }

    async fn scan(&self, req: ScanRequestPb) -> Result<ScanResponsePb> {
        let mut state = self.state.lock();
        state.scan_calls += 1;
        if state.scan_outages > 0 {
            state.scan_outages -= 1;
            return Err(Error::NetworkError("tablet server unreachable".to_string()));
        }

        if req.close_scanner {
            state.close_calls += 1;
            state.scanners.remove(&req.scanner_id);
            return Ok(ScanResponsePb {
                error: None,
                scanner_id: Vec::new(),
                has_more_results: false,
                data: None,
            });
        }

        if let Some(new_scan) = req.new_scan_request {
            state.last_predicates = new_scan.range_predicates.clone();
            // A tablet nothing was written to yet simply has no rows.
            let rows = state
                .tablets
                .get(&new_scan.tablet_id)
                .map(|(_, rows)| rows.clone())
                .unwrap_or_default();
            let projection =
                Schema::from_pb(&SchemaPb { columns: new_scan.projected_columns.clone() })?;
            let projected: Vec<Row> = rows
                .iter()
                .map(|stored| {
                    let mut projected_row = Row::new(projection.clone());
                    for column in projection.columns() {
                        if let Some(value) = stored.get(&column.name) {
                            projected_row.set(&column.name, value.clone()).expect("projection");
                        }
                    }
                    projected_row
                })
                .collect();

            if projected.is_empty() {
                return Ok(ScanResponsePb {
                    error: None,
                    scanner_id: Vec::new(),
                    has_more_results: false,
                    data: None,
                });
            }

            let mut cursor = ScanCursor { projection, rows: projected, pos: 0 };
            let (block, has_more) = Self::page(&mut cursor, state.rows_per_batch);
            let mut scanner_id = Vec::new();
            if has_more {
                scanner_id = format!("scanner-{}", state.next_scanner_id).into_bytes();
                state.next_scanner_id += 1;
                state.scanners.insert(scanner_id.clone(), cursor);
            }
            return Ok(ScanResponsePb {
                error: None,
                scanner_id,
                has_more_results: has_more,
                data: Some(block),
            });
        }

        let rows_per_batch = state.rows_per_batch;
        let Some(cursor) = state.scanners.get_mut(&req.scanner_id) else {
            return Ok(ScanResponsePb {
                error: Some(app_status(StatusCodePb::NotFound, "unknown scanner")),
                scanner_id: Vec::new(),
                has_more_results: false,
                data: None,
            });
        };
        let (block, has_more) = Self::page(cursor, rows_per_batch);
        if !has_more {
            state.scanners.remove(&req.scanner_id);
        }
        Ok(ScanResponsePb {
            error: None,
            scanner_id: req.scanner_id,
            has_more_results: has_more,
            data: Some(block),
        })
    }
}
