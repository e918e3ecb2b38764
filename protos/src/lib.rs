#![allow(clippy::large_enum_variant)]

//! Message definitions for the Strata wire protocol.
//!
//! The layout follows prost codegen conventions so that the types can be
//! regenerated from `.proto` sources once the wire contract is frozen.

pub mod common;
pub mod master;
pub mod rpc;
pub mod tserver;
