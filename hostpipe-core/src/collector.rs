use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use opentelemetry::metrics::Meter;
use thiserror::Error;

/// Raised when a collector cannot attach on this host.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct AttachError(
    /// Why the collector could not attach.
    pub String,
);

/// Shared stop signal for collector callbacks.
///
/// The meter provider owns the observation callbacks for its whole
/// lifetime, so collectors check this flag instead and go quiet once
/// shutdown has begun.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    /// Creates a new, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals all collectors to stop observing.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether stop has been signalled.
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A source of host metrics.
///
/// Implementations register observable instruments on the meter; the
/// periodic reader then drives observation on its flush cadence. Callbacks
/// must be fast, non-blocking, and honor the stop flag.
pub trait HostCollector: Send + Sync + 'static {
    /// Name of this collector for logging.
    fn name(&self) -> &'static str;

    /// Registers this collector's instruments on the meter.
    ///
    /// Returns an error when the metrics source is unavailable on this
    /// host; the pipeline skips the collector in that case.
    fn attach(&self, meter: &Meter, stop: &StopFlag) -> Result<(), AttachError>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stop_flag() {
        let flag = StopFlag::new();
        let shared = flag.clone();
        assert!(!shared.is_stopped());
        flag.stop();
        assert!(shared.is_stopped());
    }
}
