//! Catalog RPCs served by the master.

use crate::common::{AppStatusPb, HostPortPb, SchemaPb};

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TableIdentifierPb {
    #[prost(string, tag = "1")]
    pub table_name: ::prost::alloc::string::String,
}

impl TableIdentifierPb {
    pub fn from_name(name: impl Into<String>) -> Self {
        TableIdentifierPb { table_name: name.into() }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateTableRequestPb {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub schema: ::core::option::Option<SchemaPb>,
    /// Encoded keys splitting the table into `len() + 1` tablets.
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub pre_split_keys: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateTableResponsePb {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<AppStatusPb>,
    #[prost(string, optional, tag = "2")]
    pub table_id: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IsCreateTableDoneRequestPb {
    #[prost(message, optional, tag = "1")]
    pub table: ::core::option::Option<TableIdentifierPb>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IsCreateTableDoneResponsePb {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<AppStatusPb>,
    #[prost(bool, tag = "2")]
    pub done: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum AlterStepTypePb {
    UnknownStep = 0,
    AddColumn = 1,
    DropColumn = 2,
    RenameColumn = 3,
}

impl AlterStepTypePb {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            AlterStepTypePb::UnknownStep => "UNKNOWN_STEP",
            AlterStepTypePb::AddColumn => "ADD_COLUMN",
            AlterStepTypePb::DropColumn => "DROP_COLUMN",
            AlterStepTypePb::RenameColumn => "RENAME_COLUMN",
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AddColumnPb {
    #[prost(message, optional, tag = "1")]
    pub schema: ::core::option::Option<crate::common::ColumnSchemaPb>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DropColumnPb {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RenameColumnPb {
    #[prost(string, tag = "1")]
    pub old_name: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub new_name: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AlterTableStepPb {
    #[prost(enumeration = "AlterStepTypePb", tag = "1")]
    pub r#type: i32,
    #[prost(message, optional, tag = "2")]
    pub add_column: ::core::option::Option<AddColumnPb>,
    #[prost(message, optional, tag = "3")]
    pub drop_column: ::core::option::Option<DropColumnPb>,
    #[prost(message, optional, tag = "4")]
    pub rename_column: ::core::option::Option<RenameColumnPb>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AlterTableRequestPb {
    #[prost(message, optional, tag = "1")]
    pub table: ::core::option::Option<TableIdentifierPb>,
    #[prost(message, repeated, tag = "2")]
    pub steps: ::prost::alloc::vec::Vec<AlterTableStepPb>,
    #[prost(string, optional, tag = "3")]
    pub new_table_name: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AlterTableResponsePb {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<AppStatusPb>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IsAlterTableDoneRequestPb {
    #[prost(message, optional, tag = "1")]
    pub table: ::core::option::Option<TableIdentifierPb>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IsAlterTableDoneResponsePb {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<AppStatusPb>,
    #[prost(bool, tag = "2")]
    pub done: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteTableRequestPb {
    #[prost(message, optional, tag = "1")]
    pub table: ::core::option::Option<TableIdentifierPb>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteTableResponsePb {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<AppStatusPb>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetTableSchemaRequestPb {
    #[prost(message, optional, tag = "1")]
    pub table: ::core::option::Option<TableIdentifierPb>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetTableSchemaResponsePb {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<AppStatusPb>,
    #[prost(message, optional, tag = "2")]
    pub schema: ::core::option::Option<SchemaPb>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListTablesRequestPb {
    /// When present, only tables whose name starts with the filter are
    /// returned.
    #[prost(string, optional, tag = "1")]
    pub name_filter: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListTablesResponsePb {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<AppStatusPb>,
    #[prost(string, repeated, tag = "2")]
    pub tables: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetTableLocationsRequestPb {
    #[prost(message, optional, tag = "1")]
    pub table: ::core::option::Option<TableIdentifierPb>,
    /// Return only tablets whose range contains or follows this key.
    #[prost(bytes = "vec", optional, tag = "2")]
    pub partition_key_start: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
    #[prost(uint32, optional, tag = "3")]
    pub max_returned_locations: ::core::option::Option<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetTableLocationsResponsePb {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<AppStatusPb>,
    #[prost(message, repeated, tag = "2")]
    pub tablet_locations: ::prost::alloc::vec::Vec<TabletLocationsPb>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ReplicaRolePb {
    UnknownRole = 0,
    Leader = 1,
    Follower = 2,
    Learner = 3,
}

impl ReplicaRolePb {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            ReplicaRolePb::UnknownRole => "UNKNOWN_ROLE",
            ReplicaRolePb::Leader => "LEADER",
            ReplicaRolePb::Follower => "FOLLOWER",
            ReplicaRolePb::Learner => "LEARNER",
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TsInfoPb {
    #[prost(string, tag = "1")]
    pub permanent_uuid: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "2")]
    pub rpc_addresses: ::prost::alloc::vec::Vec<HostPortPb>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReplicaPb {
    #[prost(message, optional, tag = "1")]
    pub ts_info: ::core::option::Option<TsInfoPb>,
    #[prost(enumeration = "ReplicaRolePb", tag = "2")]
    pub role: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TabletLocationsPb {
    #[prost(string, tag = "1")]
    pub tablet_id: ::prost::alloc::string::String,
    /// Inclusive start of the tablet's key range; empty on the first tablet.
    #[prost(bytes = "vec", tag = "2")]
    pub start_key: ::prost::alloc::vec::Vec<u8>,
    /// Exclusive end of the tablet's key range; empty on the last tablet.
    #[prost(bytes = "vec", tag = "3")]
    pub end_key: ::prost::alloc::vec::Vec<u8>,
    #[prost(message, repeated, tag = "4")]
    pub replicas: ::prost::alloc::vec::Vec<ReplicaPb>,
}
