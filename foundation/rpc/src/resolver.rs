use std::net::SocketAddr;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::host_port::HostPort;

/// Name resolution seam. The client resolves the master address once at
/// startup and replica addresses on metadata refresh; tests substitute a
/// fixed-answer resolver.
#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn resolve(&self, host_port: &HostPort) -> Result<Vec<SocketAddr>>;
}

/// Resolver backed by the operating system's name service.
pub struct SystemResolver;

#[async_trait]
impl DnsResolver for SystemResolver {
    async fn resolve(&self, host_port: &HostPort) -> Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host_port.host.as_str(), host_port.port))
            .await
            .map_err(|e| Error::NetworkError(format!("failed to resolve {host_port}: {e}")))?
            .collect();
        if addrs.is_empty() {
            return Err(Error::NetworkError(format!("no addresses for {host_port}")));
        }
        Ok(addrs)
    }
}
