//! The RPC contracts the client consumes.
//!
//! The master and tablet servers are external collaborators; the client
//! only depends on these traits, so tests install in-memory fakes and the
//! default implementation speaks the framed wire protocol.

use async_trait::async_trait;

use strata_protos::master::*;
use strata_protos::tserver::*;

use crate::error::Result;

/// Catalog and tablet-location authority.
#[async_trait]
pub trait MasterService: Send + Sync {
    async fn create_table(&self, req: CreateTableRequestPb) -> Result<CreateTableResponsePb>;

    async fn is_create_table_done(
        &self,
        req: IsCreateTableDoneRequestPb,
    ) -> Result<IsCreateTableDoneResponsePb>;

    async fn alter_table(&self, req: AlterTableRequestPb) -> Result<AlterTableResponsePb>;

    async fn is_alter_table_done(
        &self,
        req: IsAlterTableDoneRequestPb,
    ) -> Result<IsAlterTableDoneResponsePb>;

    async fn delete_table(&self, req: DeleteTableRequestPb) -> Result<DeleteTableResponsePb>;

    async fn get_table_schema(
        &self,
        req: GetTableSchemaRequestPb,
    ) -> Result<GetTableSchemaResponsePb>;

    async fn list_tables(&self, req: ListTablesRequestPb) -> Result<ListTablesResponsePb>;

    async fn get_table_locations(
        &self,
        req: GetTableLocationsRequestPb,
    ) -> Result<GetTableLocationsResponsePb>;
}

/// Data-plane service hosting tablet replicas.
#[async_trait]
pub trait TabletServerService: Send + Sync {
    async fn write(&self, req: WriteRequestPb) -> Result<WriteResponsePb>;

    async fn scan(&self, req: ScanRequestPb) -> Result<ScanResponsePb>;
}
