//! Common reusable types for the hostpipe metrics agent.
//!
//! This crate contains the pure data model shared by the agent: endpoint
//! resolution (turning a raw endpoint url or discrete host/port inputs into a
//! fully specified transport target) and the static header set sent with
//! every export request. Nothing in here performs I/O.

#![warn(missing_docs)]

mod auth;
mod endpoint;

pub use auth::{AuthPolicy, HeaderSet, AUTHORIZATION_HEADER, DATABASE_HEADER};
pub use endpoint::{
    ConfigError, EndpointInput, TlsPolicy, TransportTarget, DEFAULT_INGEST_PATH,
};
