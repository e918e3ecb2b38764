use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use strata_protos::master::{GetTableLocationsRequestPb, TableIdentifierPb, TabletLocationsPb};
use strata_rpc::{DnsResolver, Error, HostPort, MasterService, Messenger, Result, TabletServerService};

/// Cache of tablet locations, refreshed from the master on lookup.
///
/// Process-wide from the client's point of view and safe for concurrent
/// use; tables register their tablet on open and route writes and scans
/// through [`MetaCache::tablet_proxy`].
#[derive(Clone)]
pub(crate) struct MetaCache {
    inner: Arc<MetaCacheInner>,
}

struct MetaCacheInner {
    master: Arc<dyn MasterService>,
    messenger: Arc<dyn Messenger>,
    resolver: Arc<dyn DnsResolver>,
    tablets: Mutex<HashMap<String, Arc<RemoteTablet>>>,
}

/// Client-side view of one tablet and its replicas.
struct RemoteTablet {
    tablet_id: String,
    table_name: String,
    replicas: Mutex<Vec<RemoteReplica>>,
}

struct RemoteReplica {
    uuid: String,
    addr: HostPort,
    proxy: Option<Arc<dyn TabletServerService>>,
}

impl MetaCache {
    pub fn new(
        master: Arc<dyn MasterService>,
        messenger: Arc<dyn Messenger>,
        resolver: Arc<dyn DnsResolver>,
    ) -> MetaCache {
        MetaCache {
            inner: Arc::new(MetaCacheInner {
                master,
                messenger,
                resolver,
                tablets: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Installs or updates the cache entry for one tablet.
    pub fn update(&self, table_name: &str, location: &TabletLocationsPb) {
        let mut tablets = self.inner.tablets.lock();
        let tablet = tablets
            .entry(location.tablet_id.clone())
            .or_insert_with(|| {
                Arc::new(RemoteTablet {
                    tablet_id: location.tablet_id.clone(),
                    table_name: table_name.to_string(),
                    replicas: Mutex::new(Vec::new()),
                })
            })
            .clone();
        drop(tablets);

        let mut replicas = tablet.replicas.lock();
        let fresh: Vec<RemoteReplica> = location
            .replicas
            .iter()
            .filter_map(|replica| replica.ts_info.as_ref())
            .filter_map(|ts| {
                let addr = ts.rpc_addresses.first()?;
                // Keep an existing proxy when the replica did not move.
                let existing = replicas
                    .iter()
                    .find(|r| r.uuid == ts.permanent_uuid && r.addr == HostPort::from_pb(addr))
                    .and_then(|r| r.proxy.clone());
                Some(RemoteReplica {
                    uuid: ts.permanent_uuid.clone(),
                    addr: HostPort::from_pb(addr),
                    proxy: existing,
                })
            })
            .collect();
        *replicas = fresh;
    }

    /// Resolves a tablet id to a proxy for its first replica's server.
    pub async fn tablet_proxy(&self, tablet_id: &str) -> Result<Arc<dyn TabletServerService>> {
        let tablet = self
            .inner
            .tablets
            .lock()
            .get(tablet_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("unknown tablet {tablet_id}")))?;

        self.refresh(&tablet).await?;

        let (uuid, addr, cached) = {
            let replicas = tablet.replicas.lock();
            let first = replicas.first().ok_or_else(|| {
                Error::NotFound(format!("tablet {tablet_id} has no replicas"))
            })?;
            (first.uuid.clone(), first.addr.clone(), first.proxy.clone())
        };
        if let Some(proxy) = cached {
            return Ok(proxy);
        }

        let addrs = self.inner.resolver.resolve(&addr).await?;
        let socket_addr = *addrs.first().ok_or_else(|| {
            Error::NetworkError(format!("no addresses for tablet server {addr}"))
        })?;
        let proxy = self.inner.messenger.tablet_proxy(socket_addr).await?;

        let mut replicas = tablet.replicas.lock();
        if let Some(replica) = replicas.iter_mut().find(|r| r.uuid == uuid) {
            replica.proxy = Some(Arc::clone(&proxy));
        }
        Ok(proxy)
    }

    /// Re-fetches the owning table's locations and folds them in.
    async fn refresh(&self, tablet: &Arc<RemoteTablet>) -> Result<()> {
        let req = GetTableLocationsRequestPb {
            table: Some(TableIdentifierPb::from_name(&tablet.table_name)),
            partition_key_start: None,
            max_returned_locations: None,
        };
        let resp = self.inner.master.get_table_locations(req).await?;
        if let Some(error) = resp.error {
            return Err(error.into());
        }
        for location in &resp.tablet_locations {
            self.update(&tablet.table_name, location);
        }
        Ok(())
    }
}
