use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use strata_protos::master::*;
use strata_protos::rpc::{MASTER_SERVICE_NAME, TABLET_SERVER_SERVICE_NAME};
use strata_protos::tserver::*;

use crate::connection::Connection;
use crate::error::Result;
use crate::service::{MasterService, TabletServerService};

/// Transport seam: hands out typed proxies for resolved endpoints.
///
/// The client builds an [`RpcMessenger`] when none is injected; tests
/// install an implementation returning in-memory fakes.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn master_proxy(&self, addr: SocketAddr) -> Result<Arc<dyn MasterService>>;

    async fn tablet_proxy(&self, addr: SocketAddr) -> Result<Arc<dyn TabletServerService>>;
}

/// Default messenger speaking the framed wire protocol, with one shared
/// multiplexed connection per endpoint.
pub struct RpcMessenger {
    connections: Mutex<HashMap<SocketAddr, Connection>>,
}

impl RpcMessenger {
    pub fn new() -> RpcMessenger {
        RpcMessenger { connections: Mutex::new(HashMap::new()) }
    }

    async fn connection(&self, addr: SocketAddr) -> Result<Connection> {
        if let Some(conn) = self.connections.lock().get(&addr) {
            return Ok(conn.clone());
        }
        let conn = Connection::connect(addr).await?;
        // A concurrent connect to the same address may have won; keep the
        // registered connection and let the extra one drop.
        Ok(self.connections.lock().entry(addr).or_insert(conn).clone())
    }
}

impl Default for RpcMessenger {
    fn default() -> Self {
        RpcMessenger::new()
    }
}

#[async_trait]
impl Messenger for RpcMessenger {
    async fn master_proxy(&self, addr: SocketAddr) -> Result<Arc<dyn MasterService>> {
        Ok(Arc::new(MasterProxy { conn: self.connection(addr).await? }))
    }

    async fn tablet_proxy(&self, addr: SocketAddr) -> Result<Arc<dyn TabletServerService>> {
        Ok(Arc::new(TabletProxy { conn: self.connection(addr).await? }))
    }
}

struct MasterProxy {
    conn: Connection,
}

#[async_trait]
impl MasterService for MasterProxy {
    async fn create_table(&self, req: CreateTableRequestPb) -> Result<CreateTableResponsePb> {
        self.conn.call(MASTER_SERVICE_NAME, "CreateTable", &req).await
    }

    async fn is_create_table_done(
        &self,
        req: IsCreateTableDoneRequestPb,
    ) -> Result<IsCreateTableDoneResponsePb> {
        self.conn.call(MASTER_SERVICE_NAME, "IsCreateTableDone", &req).await
    }

    async fn alter_table(&self, req: AlterTableRequestPb) -> Result<AlterTableResponsePb> {
        self.conn.call(MASTER_SERVICE_NAME, "AlterTable", &req).await
    }

    async fn is_alter_table_done(
        &self,
        req: IsAlterTableDoneRequestPb,
    ) -> Result<IsAlterTableDoneResponsePb> {
        self.conn.call(MASTER_SERVICE_NAME, "IsAlterTableDone", &req).await
    }

    async fn delete_table(&self, req: DeleteTableRequestPb) -> Result<DeleteTableResponsePb> {
        self.conn.call(MASTER_SERVICE_NAME, "DeleteTable", &req).await
    }

    async fn get_table_schema(
        &self,
        req: GetTableSchemaRequestPb,
    ) -> Result<GetTableSchemaResponsePb> {
        self.conn.call(MASTER_SERVICE_NAME, "GetTableSchema", &req).await
    }

    async fn list_tables(&self, req: ListTablesRequestPb) -> Result<ListTablesResponsePb> {
        self.conn.call(MASTER_SERVICE_NAME, "ListTables", &req).await
    }

    async fn get_table_locations(
        &self,
        req: GetTableLocationsRequestPb,
    ) -> Result<GetTableLocationsResponsePb> {
        self.conn.call(MASTER_SERVICE_NAME, "GetTableLocations", &req).await
    }
}

struct TabletProxy {
    conn: Connection,
}

#[async_trait]
impl TabletServerService for TabletProxy {
    async fn write(&self, req: WriteRequestPb) -> Result<WriteResponsePb> {
        self.conn.call(TABLET_SERVER_SERVICE_NAME, "Write", &req).await
    }

    async fn scan(&self, req: ScanRequestPb) -> Result<ScanResponsePb> {
        self.conn.call(TABLET_SERVER_SERVICE_NAME, "Scan", &req).await
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use futures_util::{SinkExt, StreamExt};
    use prost::Message;
    use tokio::net::TcpListener;
    use tokio_util::codec::{Framed, LengthDelimitedCodec};

    use strata_protos::rpc::{ErrorStatusPb, RequestHeader, ResponseHeader};

    use super::*;
    use crate::error::Error;

    #[ctor::ctor]
    fn init() {
        let filter = tracing_subscriber::filter::EnvFilter::from_default_env()
            .add_directive("strata_rpc=trace".parse().unwrap());
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }

    fn encode_reply<M: Message>(call_id: i32, is_error: bool, msg: &M) -> bytes::Bytes {
        let header = ResponseHeader { call_id, is_error };
        let mut frame = BytesMut::new();
        header.encode_length_delimited(&mut frame).unwrap();
        msg.encode_length_delimited(&mut frame).unwrap();
        frame.freeze()
    }

    /// A one-connection master that answers ListTables and rejects
    /// everything else with a transport-level error.
    async fn spawn_list_tables_server() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
            while let Some(Ok(frame)) = framed.next().await {
                let mut frame = frame.freeze();
                let header = RequestHeader::decode_length_delimited(&mut frame).unwrap();
                let reply = match header.method.as_str() {
                    "ListTables" => {
                        let req = ListTablesRequestPb::decode_length_delimited(&mut frame).unwrap();
                        let tables = vec!["events".to_string(), "metrics".to_string()]
                            .into_iter()
                            .filter(|t| {
                                req.name_filter.as_deref().map(|f| t.starts_with(f)).unwrap_or(true)
                            })
                            .collect();
                        encode_reply(
                            header.call_id,
                            false,
                            &ListTablesResponsePb { error: None, tables },
                        )
                    }
                    other => encode_reply(
                        header.call_id,
                        true,
                        &ErrorStatusPb { message: format!("unknown method {other}") },
                    ),
                };
                framed.send(reply).await.unwrap();
            }
        });
        addr
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn round_trip_over_tcp() {
        let addr = spawn_list_tables_server().await;
        let messenger = RpcMessenger::new();
        let master = messenger.master_proxy(addr).await.unwrap();

        let resp = master.list_tables(ListTablesRequestPb { name_filter: None }).await.unwrap();
        assert_eq!(resp.tables, vec!["events".to_string(), "metrics".to_string()]);

        let resp = master
            .list_tables(ListTablesRequestPb { name_filter: Some("ev".to_string()) })
            .await
            .unwrap();
        assert_eq!(resp.tables, vec!["events".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_calls_share_one_connection() {
        let addr = spawn_list_tables_server().await;
        let messenger = Arc::new(RpcMessenger::new());
        let master = messenger.master_proxy(addr).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let master = Arc::clone(&master);
            handles.push(tokio::spawn(async move {
                master.list_tables(ListTablesRequestPb { name_filter: None }).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().tables.len(), 2);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn remote_error_is_surfaced() {
        let addr = spawn_list_tables_server().await;
        let messenger = RpcMessenger::new();
        let master = messenger.master_proxy(addr).await.unwrap();

        let err = master
            .delete_table(DeleteTableRequestPb { table: Some(TableIdentifierPb::from_name("t")) })
            .await
            .unwrap_err();
        match err {
            Error::RuntimeError(message) => assert!(message.contains("unknown method")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn peer_hangup_fails_pending_calls() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and immediately drop the connection.
            let _ = listener.accept().await.unwrap();
        });

        let messenger = RpcMessenger::new();
        let master = messenger.master_proxy(addr).await.unwrap();
        let err = master.list_tables(ListTablesRequestPb { name_filter: None }).await.unwrap_err();
        assert!(err.is_network_error(), "unexpected error: {err:?}");
    }
}
