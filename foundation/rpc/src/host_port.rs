use std::fmt;

use strata_protos::common::HostPortPb;

use crate::error::{Error, Result};

/// An unresolved network endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostPort {
    pub host: String,
    pub port: u16,
}

impl HostPort {
    pub fn new(host: impl Into<String>, port: u16) -> HostPort {
        HostPort { host: host.into(), port }
    }

    /// Parses `"host"` or `"host:port"`, falling back to `default_port`
    /// when no port is given.
    pub fn parse(s: &str, default_port: u16) -> Result<HostPort> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidArgument("empty address".to_string()));
        }
        match s.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    Error::InvalidArgument(format!("invalid port in address '{s}'"))
                })?;
                if host.is_empty() {
                    return Err(Error::InvalidArgument(format!("invalid address '{s}'")));
                }
                Ok(HostPort::new(host, port))
            }
            None => Ok(HostPort::new(s, default_port)),
        }
    }

    pub fn from_pb(pb: &HostPortPb) -> HostPort {
        HostPort::new(pb.host.clone(), pb.port as u16)
    }

    pub fn to_pb(&self) -> HostPortPb {
        HostPortPb { host: self.host.clone(), port: self.port as u32 }
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
