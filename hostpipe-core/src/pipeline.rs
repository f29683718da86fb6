use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use opentelemetry::metrics::MeterProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{MetricExporter, Protocol, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::Resource;

use crate::collector::StopFlag;
use crate::collectors;
use crate::config::ExporterConfig;
use crate::constants::{SERVICE_NAME, VERSION};
use crate::error::{ShutdownError, StartError};

/// A running export pipeline.
///
/// Owns the meter provider (which in turn owns the periodic reader and the
/// exporter) and the stop signal shared with the attached collectors. From
/// construction onward, exports happen on the reader's background flush
/// cadence, independent of the caller's thread.
pub struct Pipeline {
    provider: SdkMeterProvider,
    stop: StopFlag,
    attached: Vec<&'static str>,
    shutdown_timeout: Duration,
}

impl Pipeline {
    /// Builds the exporter, reader and provider for `config` and attaches
    /// the default host collectors.
    ///
    /// Fails fatally when the exporter cannot be constructed or when no
    /// collector can attach on this host.
    pub fn start(config: &ExporterConfig, shutdown_timeout: Duration) -> Result<Self, StartError> {
        let exporter = MetricExporter::builder()
            .with_http()
            .with_protocol(Protocol::HttpBinary)
            .with_endpoint(config.endpoint_url())
            .with_timeout(config.request_timeout)
            .with_headers(config.headers.to_map())
            .build()
            .map_err(|err| StartError::ExporterInit(err.to_string()))?;

        let reader = PeriodicReader::builder(exporter)
            .with_interval(config.flush_interval)
            .build();

        let resource = Resource::builder()
            .with_service_name(SERVICE_NAME)
            .with_attribute(KeyValue::new("service.version", VERSION))
            .build();

        let provider = SdkMeterProvider::builder()
            .with_reader(reader)
            .with_resource(resource)
            .build();

        let meter = provider.meter(SERVICE_NAME);
        let stop = StopFlag::new();
        let mut attached = Vec::new();
        for collector in collectors::default_collectors() {
            match collector.attach(&meter, &stop) {
                Ok(()) => {
                    debug!("attached collector `{}`", collector.name());
                    attached.push(collector.name());
                }
                Err(err) => warn!("collector `{}` unavailable: {err}", collector.name()),
            }
        }
        if attached.is_empty() {
            // Nothing will ever be observed; tear the provider down again
            // before reporting the failure.
            if let Err(err) = provider.shutdown() {
                debug!("provider teardown after failed start: {err}");
            }
            return Err(StartError::CollectionStart(
                "no host collector could attach on this host".into(),
            ));
        }

        info!(
            "sending metrics to {} every {:?}",
            config.endpoint_url(),
            config.flush_interval
        );

        Ok(Pipeline {
            provider,
            stop,
            attached,
            shutdown_timeout,
        })
    }

    /// Names of the collectors that attached successfully.
    pub fn collectors(&self) -> &[&'static str] {
        &self.attached
    }

    /// Performs the ordered shutdown sequence under the configured deadline.
    ///
    /// Collectors are stopped first, pending data is flushed, then the
    /// provider is closed (closing the reader and exporter with it). Every
    /// step runs even when an earlier one fails; the first failure is
    /// reported. If the deadline is exceeded the sequence is abandoned and
    /// the caller proceeds.
    pub fn shutdown(self) -> Result<(), ShutdownError> {
        let Pipeline {
            provider,
            stop,
            attached: _,
            shutdown_timeout,
        } = self;
        run_with_deadline(shutdown_timeout, move || {
            run_shutdown(&mut SdkParts { provider, stop })
        })
    }
}

/// The ordered steps of pipeline teardown.
///
/// Split out as a trait so the ordering and error-tolerance invariants are
/// testable without a live provider.
trait PipelineShutdown {
    fn stop_collectors(&mut self);
    fn flush(&mut self) -> Result<(), ShutdownError>;
    fn close_provider(&mut self) -> Result<(), ShutdownError>;
}

struct SdkParts {
    provider: SdkMeterProvider,
    stop: StopFlag,
}

impl PipelineShutdown for SdkParts {
    fn stop_collectors(&mut self) {
        self.stop.stop();
        debug!("collectors stopped");
    }

    fn flush(&mut self) -> Result<(), ShutdownError> {
        self.provider
            .force_flush()
            .map_err(|err| ShutdownError::Flush(err.to_string()))
    }

    fn close_provider(&mut self) -> Result<(), ShutdownError> {
        self.provider
            .shutdown()
            .map_err(|err| ShutdownError::Provider(err.to_string()))
    }
}

/// Runs the teardown steps in order. All steps are attempted; the first
/// error is returned.
fn run_shutdown<P: PipelineShutdown>(parts: &mut P) -> Result<(), ShutdownError> {
    parts.stop_collectors();
    let flushed = parts.flush();
    if let Err(ref err) = flushed {
        warn!("flush during shutdown failed: {err}");
    }
    let closed = parts.close_provider();
    flushed.and(closed)
}

/// Runs `f` on a worker thread and waits at most `deadline` for it.
///
/// On timeout the worker is abandoned and the caller proceeds; the process
/// must never hang in shutdown.
fn run_with_deadline<F>(deadline: Duration, f: F) -> Result<(), ShutdownError>
where
    F: FnOnce() -> Result<(), ShutdownError> + Send + 'static,
{
    let (sender, receiver) = mpsc::sync_channel(1);
    thread::Builder::new()
        .name("hostpipe-shutdown".into())
        .spawn(move || {
            let _ = sender.send(f());
        })
        .map_err(|err| ShutdownError::Worker(err.to_string()))?;

    match receiver.recv_timeout(deadline) {
        Ok(result) => result,
        Err(_) => Err(ShutdownError::DeadlineExceeded(deadline)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Default)]
    struct Recorder {
        steps: Arc<Mutex<Vec<&'static str>>>,
        fail_flush: bool,
        fail_close: bool,
    }

    impl Recorder {
        fn record(&self, step: &'static str) {
            self.steps.lock().unwrap().push(step);
        }
    }

    impl PipelineShutdown for Recorder {
        fn stop_collectors(&mut self) {
            self.record("stop");
        }

        fn flush(&mut self) -> Result<(), ShutdownError> {
            self.record("flush");
            if self.fail_flush {
                Err(ShutdownError::Flush("boom".into()))
            } else {
                Ok(())
            }
        }

        fn close_provider(&mut self) -> Result<(), ShutdownError> {
            self.record("close");
            if self.fail_close {
                Err(ShutdownError::Provider("boom".into()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_shutdown_order() {
        let mut recorder = Recorder::default();
        let steps = recorder.steps.clone();
        run_shutdown(&mut recorder).unwrap();
        assert_eq!(*steps.lock().unwrap(), vec!["stop", "flush", "close"]);
    }

    #[test]
    fn test_shutdown_continues_past_flush_failure() {
        let mut recorder = Recorder {
            fail_flush: true,
            ..Default::default()
        };
        let steps = recorder.steps.clone();
        let err = run_shutdown(&mut recorder).unwrap_err();
        assert!(matches!(err, ShutdownError::Flush(_)));
        // The provider is still closed after a failed flush.
        assert_eq!(*steps.lock().unwrap(), vec!["stop", "flush", "close"]);
    }

    #[test]
    fn test_shutdown_reports_close_failure() {
        let mut recorder = Recorder {
            fail_close: true,
            ..Default::default()
        };
        let err = run_shutdown(&mut recorder).unwrap_err();
        assert!(matches!(err, ShutdownError::Provider(_)));
    }

    #[test]
    fn test_deadline_passes_result_through() {
        assert!(run_with_deadline(Duration::from_secs(1), || Ok(())).is_ok());
        let err = run_with_deadline(Duration::from_secs(1), || {
            Err(ShutdownError::Flush("boom".into()))
        })
        .unwrap_err();
        assert!(matches!(err, ShutdownError::Flush(_)));
    }

    #[test]
    fn test_deadline_abandons_slow_shutdown() {
        let err = run_with_deadline(Duration::from_millis(20), || {
            thread::sleep(Duration::from_millis(500));
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, ShutdownError::DeadlineExceeded(_)));
    }
}
