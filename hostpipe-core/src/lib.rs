//! Core pipeline of the hostpipe metrics agent.
//!
//! This crate turns resolved configuration into a running export pipeline:
//! an OTLP/HTTP metric exporter, a periodic reader that owns the flush
//! cadence, a meter provider carrying the service identity, and the host
//! metric collectors feeding it. It also owns the ordered, deadline-bounded
//! shutdown of that pipeline.

#![warn(missing_docs)]

mod config;
mod constants;
mod error;
mod options;
mod pipeline;

mod collector;
pub mod collectors;

pub use collector::{AttachError, HostCollector, StopFlag};
pub use config::{ExporterConfig, FLUSH_INTERVAL, REQUEST_TIMEOUT};
pub use constants::{SERVICE_NAME, VERSION};
pub use error::{ShutdownError, StartError};
pub use options::AgentOptions;
pub use pipeline::Pipeline;

// Re-exported so the binary only needs to depend on the core crate for the
// common case.
pub use hostpipe_types::{
    AuthPolicy, ConfigError, EndpointInput, HeaderSet, TlsPolicy, TransportTarget,
};
