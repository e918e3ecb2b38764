//! Client library for the Strata distributed columnar tablet store.
//!
//! A [`Client`] talks to the cluster's master for catalog operations and
//! tablet locations; writes go through a [`Session`] that batches
//! mutations, and reads stream through a [`Scanner`]. The RPC services,
//! transport, and name resolution sit behind traits (see `strata_rpc`) so
//! deployments and tests can substitute their own.

pub mod batcher;
pub mod client;
pub mod error;
mod meta_cache;
pub mod mutation;
pub mod row;
pub mod scanner;
pub mod schema;
pub mod session;
pub mod table;
pub mod value;

pub use batcher::{Batcher, FlushAwaiter};
pub use client::{Client, ClientConfig};
pub use error::{Error, OpError, Result};
pub use mutation::Insert;
pub use row::Row;
pub use scanner::{ColumnRangePredicate, Scanner};
pub use schema::{ColumnSchema, DataType, Schema, SchemaBuilder};
pub use session::{FlushMode, Session};
pub use table::{AlterTableBuilder, Table};
pub use value::Value;
