use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use strata_protos::master::{
    AddColumnPb, AlterStepTypePb, AlterTableStepPb, DropColumnPb, RenameColumnPb,
};
use strata_rpc::{Error, Result, TabletServerService};

use crate::client::Client;
use crate::mutation::Insert;
use crate::scanner::Scanner;
use crate::schema::{DataType, Schema};

/// Pause between location polls while a new table's tablet is assigned.
const OPEN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// An open table. Cheap to clone; holds a strong reference to its client.
#[derive(Clone)]
pub struct Table {
    inner: Arc<TableInner>,
}

struct TableInner {
    client: Client,
    name: String,
    schema: Schema,
    tablet_id: OnceLock<String>,
    /// Lazily materialized proxy to the tablet's server.
    proxy: Mutex<Option<Arc<dyn TabletServerService>>>,
}

impl Table {
    pub(crate) fn new(client: Client, name: &str, schema: Schema) -> Table {
        Table {
            inner: Arc::new(TableInner {
                client,
                name: name.to_string(),
                schema,
                tablet_id: OnceLock::new(),
                proxy: Mutex::new(None),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// A new insert against this table.
    pub fn new_insert(&self) -> Insert {
        Insert::new(self.clone())
    }

    /// A scanner over this table, configured before `open`.
    pub fn scanner(&self) -> Scanner {
        Scanner::new(self.clone())
    }

    pub(crate) fn tablet_id(&self) -> &str {
        self.inner.tablet_id.get().expect("table not opened")
    }

    /// Waits for the table's tablet to be assigned and records it.
    ///
    /// The master returns no locations until assignment completes, so this
    /// polls on a fixed cadence, bounded by the client's admin timeout.
    pub(crate) async fn open(&self) -> Result<()> {
        let deadline = Instant::now() + self.inner.client.default_admin_timeout();
        loop {
            let locations = self.inner.client.get_table_locations(&self.inner.name, None, None).await?;
            if !locations.is_empty() {
                assert_eq!(
                    locations.len(),
                    1,
                    "table {} has {} tablets; only single-tablet tables are supported",
                    self.inner.name,
                    locations.len()
                );
                let location = &locations[0];
                self.inner.client.meta_cache().update(&self.inner.name, location);
                let _ = self.inner.tablet_id.set(location.tablet_id.clone());
                return Ok(());
            }
            if Instant::now() + OPEN_POLL_INTERVAL >= deadline {
                return Err(Error::TimedOut(format!(
                    "timed out waiting for tablet assignment of table {}",
                    self.inner.name
                )));
            }
            tokio::time::sleep(OPEN_POLL_INTERVAL).await;
        }
    }

    /// Proxy to the server hosting this table's tablet.
    pub(crate) async fn tablet_proxy(&self) -> Result<Arc<dyn TabletServerService>> {
        if let Some(proxy) = self.inner.proxy.lock().clone() {
            return Ok(proxy);
        }
        let proxy = self.inner.client.meta_cache().tablet_proxy(self.tablet_id()).await?;
        *self.inner.proxy.lock() = Some(Arc::clone(&proxy));
        Ok(proxy)
    }

    #[cfg(test)]
    pub(crate) fn detached_for_tests(name: &str, schema: Schema) -> Table {
        Table::new(Client::stub_for_tests(), name, schema)
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.inner.name)
            .field("tablet_id", &self.inner.tablet_id.get())
            .finish()
    }
}

/// Accumulates schema-change steps for [`Client::alter_table`].
#[derive(Default)]
pub struct AlterTableBuilder {
    steps: Vec<AlterTableStepPb>,
    new_table_name: Option<String>,
}

impl AlterTableBuilder {
    pub fn new() -> AlterTableBuilder {
        AlterTableBuilder::default()
    }

    pub fn rename_table(&mut self, new_name: impl Into<String>) -> &mut AlterTableBuilder {
        self.new_table_name = Some(new_name.into());
        self
    }

    pub fn add_column(&mut self, name: impl Into<String>, data_type: DataType) -> &mut AlterTableBuilder {
        self.push_add_column(name.into(), data_type, false)
    }

    pub fn add_nullable_column(
        &mut self,
        name: impl Into<String>,
        data_type: DataType,
    ) -> &mut AlterTableBuilder {
        self.push_add_column(name.into(), data_type, true)
    }

    pub fn drop_column(&mut self, name: impl Into<String>) -> &mut AlterTableBuilder {
        self.steps.push(AlterTableStepPb {
            r#type: AlterStepTypePb::DropColumn as i32,
            add_column: None,
            drop_column: Some(DropColumnPb { name: name.into() }),
            rename_column: None,
        });
        self
    }

    pub fn rename_column(
        &mut self,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
    ) -> &mut AlterTableBuilder {
        self.steps.push(AlterTableStepPb {
            r#type: AlterStepTypePb::RenameColumn as i32,
            add_column: None,
            drop_column: None,
            rename_column: Some(RenameColumnPb {
                old_name: old_name.into(),
                new_name: new_name.into(),
            }),
        });
        self
    }

    /// True when there is anything to send: a table rename or at least one
    /// step.
    pub fn has_changes(&self) -> bool {
        self.new_table_name.is_some() || !self.steps.is_empty()
    }

    pub(crate) fn steps(&self) -> &[AlterTableStepPb] {
        &self.steps
    }

    pub(crate) fn new_table_name(&self) -> Option<&str> {
        self.new_table_name.as_deref()
    }

    fn push_add_column(
        &mut self,
        name: String,
        data_type: DataType,
        is_nullable: bool,
    ) -> &mut AlterTableBuilder {
        let column = crate::schema::ColumnSchema {
            name,
            data_type,
            is_key: false,
            is_nullable,
            id: None,
        };
        self.steps.push(AlterTableStepPb {
            r#type: AlterStepTypePb::AddColumn as i32,
            add_column: Some(AddColumnPb { schema: Some(column.to_pb()) }),
            drop_column: None,
            rename_column: None,
        });
        self
    }
}
