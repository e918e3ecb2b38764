use std::sync::Arc;
use std::time::Duration;

use tokio::time::{timeout, Instant};

use strata_protos::master::{
    AlterTableRequestPb, CreateTableRequestPb, DeleteTableRequestPb, GetTableLocationsRequestPb,
    GetTableSchemaRequestPb, IsAlterTableDoneRequestPb, IsCreateTableDoneRequestPb,
    ListTablesRequestPb, TableIdentifierPb, TabletLocationsPb,
};
use strata_rpc::{
    retry_until_deadline, DnsResolver, Error, HostPort, MasterService, Messenger, Result,
    RpcMessenger, SystemResolver,
};

use crate::meta_cache::MetaCache;
use crate::schema::Schema;
use crate::session::Session;
use crate::table::{AlterTableBuilder, Table};

const DEFAULT_MASTER_PORT: u16 = 7051;
const DEFAULT_ADMIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for a waited `create_table` to finish tablet assignment.
const CREATE_TABLE_DEADLINE: Duration = Duration::from_secs(15);
/// Deadline for a waited `alter_table` to be applied.
const ALTER_TABLE_DEADLINE: Duration = Duration::from_secs(60);

/// Configuration for [`Client::new`].
pub struct ClientConfig {
    /// Address of the master, `host` or `host:port`. Required.
    pub master_address: String,
    /// Budget for a single administrative RPC.
    pub default_admin_timeout: Duration,
    /// Injected transport; the framed-TCP messenger is built when absent.
    pub messenger: Option<Arc<dyn Messenger>>,
    /// Injected resolver; the system resolver is used when absent.
    pub resolver: Option<Arc<dyn DnsResolver>>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            master_address: String::new(),
            default_admin_timeout: DEFAULT_ADMIN_TIMEOUT,
            messenger: None,
            resolver: None,
        }
    }
}

/// A client for one Strata cluster.
///
/// Encapsulates the master proxy, metadata cache, and transport; cheap to
/// clone and shared by any number of sessions and tables. Create one per
/// application per cluster.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

struct ClientInner {
    default_admin_timeout: Duration,
    master: Arc<dyn MasterService>,
    meta_cache: MetaCache,
    initted: bool,
}

impl Client {
    /// Connects to the cluster named by `config` and initializes the
    /// client.
    pub async fn new(config: ClientConfig) -> Result<Client> {
        if config.master_address.is_empty() {
            return Err(Error::InvalidArgument("no master address specified".to_string()));
        }
        let messenger: Arc<dyn Messenger> =
            config.messenger.unwrap_or_else(|| Arc::new(RpcMessenger::new()));
        let resolver: Arc<dyn DnsResolver> =
            config.resolver.unwrap_or_else(|| Arc::new(SystemResolver));

        let host_port = HostPort::parse(&config.master_address, DEFAULT_MASTER_PORT)?;
        let addrs = resolver.resolve(&host_port).await?;
        if addrs.len() > 1 {
            tracing::warn!(
                "master address {host_port} resolved to {} addresses; using {}",
                addrs.len(),
                addrs[0]
            );
        }
        let master = messenger.master_proxy(addrs[0]).await?;
        let meta_cache = MetaCache::new(Arc::clone(&master), messenger, resolver);

        Ok(Client {
            inner: Arc::new(ClientInner {
                default_admin_timeout: config.default_admin_timeout,
                master,
                meta_cache,
                initted: true,
            }),
        })
    }

    /// Creates a table split into `split_keys.len() + 1` tablets. With
    /// `wait_for_assignment`, blocks until the master reports the creation
    /// complete.
    pub async fn create_table(
        &self,
        name: &str,
        schema: &Schema,
        split_keys: Vec<Vec<u8>>,
        wait_for_assignment: bool,
    ) -> Result<()> {
        let req = CreateTableRequestPb {
            name: name.to_string(),
            schema: Some(schema.to_pb()),
            pre_split_keys: split_keys,
        };
        let resp = self.admin_rpc("CreateTable", self.inner.master.create_table(req)).await?;
        if let Some(error) = resp.error {
            return Err(error.into());
        }
        if wait_for_assignment {
            self.wait_for_create_table_done(name).await?;
        }
        Ok(())
    }

    /// Applies the accumulated schema changes to `name`. With `wait`,
    /// blocks until the master reports the alteration complete, polling
    /// under the new name when the builder renames the table.
    pub async fn alter_table(&self, name: &str, alter: &AlterTableBuilder, wait: bool) -> Result<()> {
        if !alter.has_changes() {
            return Err(Error::InvalidArgument(
                "alter has no steps and no table rename".to_string(),
            ));
        }
        let req = AlterTableRequestPb {
            table: Some(TableIdentifierPb::from_name(name)),
            steps: alter.steps().to_vec(),
            new_table_name: alter.new_table_name().map(str::to_string),
        };
        let resp = self.admin_rpc("AlterTable", self.inner.master.alter_table(req)).await?;
        if let Some(error) = resp.error {
            return Err(error.into());
        }
        if wait {
            let poll_name = alter.new_table_name().unwrap_or(name);
            self.wait_for_alter_table_done(poll_name).await?;
        }
        Ok(())
    }

    pub async fn delete_table(&self, name: &str) -> Result<()> {
        let req = DeleteTableRequestPb { table: Some(TableIdentifierPb::from_name(name)) };
        let resp = self.admin_rpc("DeleteTable", self.inner.master.delete_table(req)).await?;
        if let Some(error) = resp.error {
            return Err(error.into());
        }
        Ok(())
    }

    /// The table's schema, with server-assigned column ids stripped.
    pub async fn get_table_schema(&self, name: &str) -> Result<Schema> {
        let req = GetTableSchemaRequestPb { table: Some(TableIdentifierPb::from_name(name)) };
        let resp = self.admin_rpc("GetTableSchema", self.inner.master.get_table_schema(req)).await?;
        if let Some(error) = resp.error {
            return Err(error.into());
        }
        let pb = resp.schema.ok_or_else(|| {
            Error::Corruption(format!("GetTableSchema response for {name} carries no schema"))
        })?;
        Ok(Schema::from_pb(&pb)?.without_column_ids())
    }

    /// Names of all tables, optionally filtered to a name prefix.
    pub async fn list_tables(&self, name_filter: Option<&str>) -> Result<Vec<String>> {
        let req = ListTablesRequestPb { name_filter: name_filter.map(str::to_string) };
        let resp = self.admin_rpc("ListTables", self.inner.master.list_tables(req)).await?;
        if let Some(error) = resp.error {
            return Err(error.into());
        }
        Ok(resp.tables)
    }

    /// The table's tablet locations, optionally starting at a partition
    /// key and capped at `max_returned_locations`.
    pub async fn get_table_locations(
        &self,
        name: &str,
        partition_key_start: Option<Vec<u8>>,
        max_returned_locations: Option<u32>,
    ) -> Result<Vec<TabletLocationsPb>> {
        let req = GetTableLocationsRequestPb {
            table: Some(TableIdentifierPb::from_name(name)),
            partition_key_start,
            max_returned_locations,
        };
        let resp =
            self.admin_rpc("GetTableLocations", self.inner.master.get_table_locations(req)).await?;
        if let Some(error) = resp.error {
            return Err(error.into());
        }
        Ok(resp.tablet_locations)
    }

    /// Opens a table: fetches its schema and waits for its tablet to be
    /// assigned.
    pub async fn open_table(&self, name: &str) -> Result<Table> {
        assert!(self.inner.initted, "client not initialized");
        let schema = self.get_table_schema(name).await?;
        let table = Table::new(self.clone(), name, schema);
        table.open().await?;
        Ok(table)
    }

    /// A new, uninitialized write session against this cluster.
    pub fn new_session(&self) -> Session {
        assert!(self.inner.initted, "client not initialized");
        Session::new(self.clone())
    }

    pub(crate) fn meta_cache(&self) -> &MetaCache {
        &self.inner.meta_cache
    }

    pub(crate) fn default_admin_timeout(&self) -> Duration {
        self.inner.default_admin_timeout
    }

    async fn wait_for_create_table_done(&self, name: &str) -> Result<()> {
        let deadline = Instant::now() + CREATE_TABLE_DEADLINE;
        let timeout_msg = format!("timed out waiting for creation of table {name}");
        retry_until_deadline(deadline, "table creation", &timeout_msg, |_| {
            let master = Arc::clone(&self.inner.master);
            let admin_timeout = self.inner.default_admin_timeout;
            let req = IsCreateTableDoneRequestPb {
                table: Some(TableIdentifierPb::from_name(name)),
            };
            async move {
                let resp = match timeout(admin_timeout, master.is_create_table_done(req)).await {
                    Ok(Ok(resp)) => resp,
                    // Transport failures are retried so the poll rides out
                    // master restarts.
                    Ok(Err(e)) => return (Err(e), true),
                    Err(_) => {
                        return (
                            Err(Error::TimedOut("IsCreateTableDone RPC timed out".to_string())),
                            true,
                        )
                    }
                };
                match resp.error {
                    Some(error) => (Err(error.into()), false),
                    None => (Ok(()), !resp.done),
                }
            }
        })
        .await
    }

    async fn wait_for_alter_table_done(&self, name: &str) -> Result<()> {
        let deadline = Instant::now() + ALTER_TABLE_DEADLINE;
        let timeout_msg = format!("timed out waiting for alteration of table {name}");
        retry_until_deadline(deadline, "table alteration", &timeout_msg, |_| {
            let master = Arc::clone(&self.inner.master);
            let admin_timeout = self.inner.default_admin_timeout;
            let req = IsAlterTableDoneRequestPb {
                table: Some(TableIdentifierPb::from_name(name)),
            };
            async move {
                let resp = match timeout(admin_timeout, master.is_alter_table_done(req)).await {
                    Ok(Ok(resp)) => resp,
                    Ok(Err(e)) => return (Err(e), true),
                    Err(_) => {
                        return (
                            Err(Error::TimedOut("IsAlterTableDone RPC timed out".to_string())),
                            true,
                        )
                    }
                };
                match resp.error {
                    Some(error) => (Err(error.into()), false),
                    None => (Ok(()), !resp.done),
                }
            }
        })
        .await
    }

    async fn admin_rpc<T>(
        &self,
        what: &str,
        call: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        match timeout(self.inner.default_admin_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(Error::TimedOut(format!("{what} RPC timed out"))),
        }
    }

    #[cfg(test)]
    pub(crate) fn stub_for_tests() -> Client {
        use async_trait::async_trait;
        use std::net::SocketAddr;
        use strata_rpc::TabletServerService;

        struct Unreachable;

        #[async_trait]
        impl MasterService for Unreachable {
            async fn create_table(
                &self,
                _: CreateTableRequestPb,
            ) -> Result<strata_protos::master::CreateTableResponsePb> {
                unreachable!("stub master")
            }
            async fn is_create_table_done(
                &self,
                _: IsCreateTableDoneRequestPb,
            ) -> Result<strata_protos::master::IsCreateTableDoneResponsePb> {
                unreachable!("stub master")
            }
            async fn alter_table(
                &self,
                _: AlterTableRequestPb,
            ) -> Result<strata_protos::master::AlterTableResponsePb> {
                unreachable!("stub master")
            }
            async fn is_alter_table_done(
                &self,
                _: IsAlterTableDoneRequestPb,
            ) -> Result<strata_protos::master::IsAlterTableDoneResponsePb> {
                unreachable!("stub master")
            }
            async fn delete_table(
                &self,
                _: DeleteTableRequestPb,
            ) -> Result<strata_protos::master::DeleteTableResponsePb> {
                unreachable!("stub master")
            }
            async fn get_table_schema(
                &self,
                _: GetTableSchemaRequestPb,
            ) -> Result<strata_protos::master::GetTableSchemaResponsePb> {
                unreachable!("stub master")
            }
            async fn list_tables(
                &self,
                _: ListTablesRequestPb,
            ) -> Result<strata_protos::master::ListTablesResponsePb> {
                unreachable!("stub master")
            }
            async fn get_table_locations(
                &self,
                _: GetTableLocationsRequestPb,
            ) -> Result<strata_protos::master::GetTableLocationsResponsePb> {
                unreachable!("stub master")
            }
        }

        #[async_trait]
        impl Messenger for Unreachable {
            async fn master_proxy(&self, _: SocketAddr) -> Result<Arc<dyn MasterService>> {
                unreachable!("stub messenger")
            }
            async fn tablet_proxy(&self, _: SocketAddr) -> Result<Arc<dyn TabletServerService>> {
                unreachable!("stub messenger")
            }
        }

        let master: Arc<dyn MasterService> = Arc::new(Unreachable);
        let meta_cache =
            MetaCache::new(Arc::clone(&master), Arc::new(Unreachable), Arc::new(SystemResolver));
        Client {
            inner: Arc::new(ClientInner {
                default_admin_timeout: DEFAULT_ADMIN_TIMEOUT,
                master,
                meta_cache,
                initted: true,
            }),
        }
    }
}
