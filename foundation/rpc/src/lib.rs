//! Foundation layer of the Strata client: the status type shared by every
//! call, the deadline-bounded retry driver, the resettable heartbeater, and
//! the messenger that speaks the framed wire protocol.

pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod host_port;
pub mod messenger;
pub mod resolver;
pub mod retry;
pub mod service;

pub use error::{Error, Result};
pub use heartbeat::{HeartbeatFn, Heartbeater};
pub use host_port::HostPort;
pub use messenger::{Messenger, RpcMessenger};
pub use resolver::{DnsResolver, SystemResolver};
pub use retry::retry_until_deadline;
pub use service::{MasterService, TabletServerService};
