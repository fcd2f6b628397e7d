//! Core traits for dnsdash
//!
//! This module defines the abstract interfaces that implementations must follow.
//!
//! - [`RemoteGateway`]: relay a call to the remote record API

pub mod gateway;

pub use gateway::{
    Credentials, GatewayMessage, GatewayRequest, GatewayResponse, Method, PageInfo,
    RemoteGateway, RemoteGatewayFactory,
};
