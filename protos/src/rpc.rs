//! Framing headers for the Strata RPC transport.
//!
//! A frame on the wire is a length-prefixed concatenation of a
//! varint-delimited `RequestHeader` (or `ResponseHeader`) and a
//! varint-delimited message body.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestHeader {
    #[prost(int32, tag = "1")]
    pub call_id: i32,
    #[prost(string, tag = "2")]
    pub service: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub method: ::prost::alloc::string::String,
    /// Advisory server-side budget for the call.
    #[prost(uint32, optional, tag = "4")]
    pub timeout_millis: ::core::option::Option<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponseHeader {
    #[prost(int32, tag = "1")]
    pub call_id: i32,
    /// When set, the body is an `ErrorStatusPb` instead of the response
    /// message of the called method.
    #[prost(bool, tag = "2")]
    pub is_error: bool,
}

/// Transport-level failure (unknown method, decode failure, shedding);
/// distinct from the application-level `AppStatusPb` embedded in responses.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ErrorStatusPb {
    #[prost(string, tag = "1")]
    pub message: ::prost::alloc::string::String,
}

pub const MASTER_SERVICE_NAME: &str = "strata.master.MasterService";
pub const TABLET_SERVER_SERVICE_NAME: &str = "strata.tserver.TabletServerService";
