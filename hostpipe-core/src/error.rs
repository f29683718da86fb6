use std::time::Duration;

use thiserror::Error;

/// Raised when the export pipeline cannot be brought up.
///
/// Always fatal: the process reports the error and exits non-zero before
/// the interrupt wait begins.
#[derive(Debug, Error)]
pub enum StartError {
    /// The OTLP exporter could not be constructed.
    #[error("failed to construct the metrics exporter: {0}")]
    ExporterInit(String),
    /// Host metrics collection could not attach.
    #[error("failed to start host metrics collection: {0}")]
    CollectionStart(String),
}

/// Raised when a step of the shutdown sequence fails.
///
/// Best-effort only: shutdown errors are logged and never change the exit
/// status.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Flushing pending metric data failed.
    #[error("failed to flush pending metrics: {0}")]
    Flush(String),
    /// Closing the meter provider failed.
    #[error("failed to close the meter provider: {0}")]
    Provider(String),
    /// The shutdown worker could not be spawned.
    #[error("could not spawn the shutdown worker: {0}")]
    Worker(String),
    /// Shutdown did not complete within the deadline.
    #[error("shutdown did not complete within {0:?}")]
    DeadlineExceeded(Duration),
}
