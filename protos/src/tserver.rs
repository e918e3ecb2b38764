//! Data-plane RPCs served by tablet servers.

use crate::common::{AppStatusPb, ColumnSchemaPb, RowBlockPb, SchemaPb};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum RowOperationTypePb {
    UnknownOp = 0,
    Insert = 1,
}

impl RowOperationTypePb {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            RowOperationTypePb::UnknownOp => "UNKNOWN_OP",
            RowOperationTypePb::Insert => "INSERT",
        }
    }
}

/// A batch of encoded row mutations of a single type. Row encoding follows
/// the schema carried by the enclosing `WriteRequestPb`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RowOperationsPb {
    #[prost(enumeration = "RowOperationTypePb", tag = "1")]
    pub r#type: i32,
    #[prost(uint32, tag = "2")]
    pub count: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub rows: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WriteRequestPb {
    #[prost(string, tag = "1")]
    pub tablet_id: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub schema: ::core::option::Option<SchemaPb>,
    #[prost(message, optional, tag = "3")]
    pub row_operations: ::core::option::Option<RowOperationsPb>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PerRowErrorPb {
    /// Index of the failed row within the request's operations.
    #[prost(uint32, tag = "1")]
    pub row_index: u32,
    #[prost(message, optional, tag = "2")]
    pub error: ::core::option::Option<AppStatusPb>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WriteResponsePb {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<AppStatusPb>,
    #[prost(message, repeated, tag = "2")]
    pub per_row_errors: ::prost::alloc::vec::Vec<PerRowErrorPb>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ColumnRangePredicatePb {
    #[prost(message, optional, tag = "1")]
    pub column: ::core::option::Option<ColumnSchemaPb>,
    /// Inclusive, encoded with the single-value codec; absent = unbounded.
    #[prost(bytes = "vec", optional, tag = "2")]
    pub lower_bound: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
    /// Inclusive, encoded with the single-value codec; absent = unbounded.
    #[prost(bytes = "vec", optional, tag = "3")]
    pub upper_bound: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NewScanRequestPb {
    #[prost(string, tag = "1")]
    pub tablet_id: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "2")]
    pub projected_columns: ::prost::alloc::vec::Vec<ColumnSchemaPb>,
    #[prost(message, repeated, tag = "3")]
    pub range_predicates: ::prost::alloc::vec::Vec<ColumnRangePredicatePb>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScanRequestPb {
    /// Present on the first request of a scan only.
    #[prost(message, optional, tag = "1")]
    pub new_scan_request: ::core::option::Option<NewScanRequestPb>,
    /// Cursor id of an open scan; empty together with `new_scan_request`
    /// only on a close of a never-opened scanner, which is not sent.
    #[prost(bytes = "vec", tag = "2")]
    pub scanner_id: ::prost::alloc::vec::Vec<u8>,
    #[prost(uint32, optional, tag = "3")]
    pub batch_size_bytes: ::core::option::Option<u32>,
    #[prost(bool, tag = "4")]
    pub close_scanner: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScanResponsePb {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<AppStatusPb>,
    /// Assigned by the server when the scan has more results than fit in
    /// this response; empty when the scan completed inline.
    #[prost(bytes = "vec", tag = "2")]
    pub scanner_id: ::prost::alloc::vec::Vec<u8>,
    #[prost(bool, tag = "3")]
    pub has_more_results: bool,
    #[prost(message, optional, tag = "4")]
    pub data: ::core::option::Option<RowBlockPb>,
}
