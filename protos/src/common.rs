/// Column types supported by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DataTypePb {
    UnknownType = 0,
    Bool = 1,
    Int8 = 2,
    Int16 = 3,
    Int32 = 4,
    Int64 = 5,
    Uint32 = 6,
    Uint64 = 7,
    Float = 8,
    Double = 9,
    String = 10,
    Binary = 11,
}

impl DataTypePb {
    /// String value of the enum field names used in the ProtoBuf definition.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            DataTypePb::UnknownType => "UNKNOWN_TYPE",
            DataTypePb::Bool => "BOOL",
            DataTypePb::Int8 => "INT8",
            DataTypePb::Int16 => "INT16",
            DataTypePb::Int32 => "INT32",
            DataTypePb::Int64 => "INT64",
            DataTypePb::Uint32 => "UINT32",
            DataTypePb::Uint64 => "UINT64",
            DataTypePb::Float => "FLOAT",
            DataTypePb::Double => "DOUBLE",
            DataTypePb::String => "STRING",
            DataTypePb::Binary => "BINARY",
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ColumnSchemaPb {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(enumeration = "DataTypePb", tag = "2")]
    pub r#type: i32,
    #[prost(bool, tag = "3")]
    pub is_key: bool,
    #[prost(bool, tag = "4")]
    pub is_nullable: bool,
    /// Server-assigned column id; absent on client-built schemas.
    #[prost(uint32, optional, tag = "5")]
    pub id: ::core::option::Option<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SchemaPb {
    #[prost(message, repeated, tag = "1")]
    pub columns: ::prost::alloc::vec::Vec<ColumnSchemaPb>,
}

/// Status codes carried in `AppStatusPb`. Mirrors the client-side status
/// kinds so that a status survives a round trip over the wire unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum StatusCodePb {
    UnknownError = 0,
    Ok = 1,
    NotFound = 2,
    InvalidArgument = 3,
    IllegalState = 4,
    TimedOut = 5,
    AlreadyPresent = 6,
    ServiceUnavailable = 7,
    Aborted = 8,
    Corruption = 9,
    NetworkError = 10,
    RuntimeError = 11,
}

impl StatusCodePb {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            StatusCodePb::UnknownError => "UNKNOWN_ERROR",
            StatusCodePb::Ok => "OK",
            StatusCodePb::NotFound => "NOT_FOUND",
            StatusCodePb::InvalidArgument => "INVALID_ARGUMENT",
            StatusCodePb::IllegalState => "ILLEGAL_STATE",
            StatusCodePb::TimedOut => "TIMED_OUT",
            StatusCodePb::AlreadyPresent => "ALREADY_PRESENT",
            StatusCodePb::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            StatusCodePb::Aborted => "ABORTED",
            StatusCodePb::Corruption => "CORRUPTION",
            StatusCodePb::NetworkError => "NETWORK_ERROR",
            StatusCodePb::RuntimeError => "RUNTIME_ERROR",
        }
    }
}

/// An application-level status embedded in a response when the service
/// processed the request but the operation itself failed.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AppStatusPb {
    #[prost(enumeration = "StatusCodePb", tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HostPortPb {
    #[prost(string, tag = "1")]
    pub host: ::prost::alloc::string::String,
    #[prost(uint32, tag = "2")]
    pub port: u32,
}

/// A block of rows in the row-wise client codec. The encoding of `rows` is
/// defined by the projection schema the request carried.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RowBlockPb {
    #[prost(uint32, tag = "1")]
    pub num_rows: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub rows: ::prost::alloc::vec::Vec<u8>,
}
