//! Agent process collector.

use std::time::Instant;

use opentelemetry::metrics::Meter;
use opentelemetry::KeyValue;

use crate::collector::{AttachError, HostCollector, StopFlag};

/// Collects metrics about the agent process itself.
///
/// Metrics collected:
/// - `process.uptime` - seconds since the collector was created
/// - `process.memory.rss` - resident set size in bytes (Linux)
/// - `process.cpu.time` - cumulative CPU seconds, split by `state` (Unix)
/// - `process.open_file_descriptors` (Linux)
pub struct ProcessCollector {
    start_time: Instant,
}

impl ProcessCollector {
    /// Creates a new process collector.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }
}

impl Default for ProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl HostCollector for ProcessCollector {
    fn name(&self) -> &'static str {
        "process"
    }

    fn attach(&self, meter: &Meter, stop: &StopFlag) -> Result<(), AttachError> {
        let start_time = self.start_time;
        let stop_uptime = stop.clone();
        let _ = meter
            .u64_observable_gauge("process.uptime")
            .with_unit("s")
            .with_description("Seconds since the agent started.")
            .with_callback(move |observer| {
                if stop_uptime.is_stopped() {
                    return;
                }
                observer.observe(start_time.elapsed().as_secs(), &[]);
            })
            .build();

        if get_rss_bytes().is_some() {
            let stop_rss = stop.clone();
            let _ = meter
                .u64_observable_gauge("process.memory.rss")
                .with_unit("By")
                .with_description("Resident set size of the agent process.")
                .with_callback(move |observer| {
                    if stop_rss.is_stopped() {
                        return;
                    }
                    if let Some(rss) = get_rss_bytes() {
                        observer.observe(rss, &[]);
                    }
                })
                .build();
        }

        if get_cpu_times().is_some() {
            let stop_cpu = stop.clone();
            let _ = meter
                .f64_observable_counter("process.cpu.time")
                .with_unit("s")
                .with_description("Cumulative CPU time of the agent process.")
                .with_callback(move |observer| {
                    if stop_cpu.is_stopped() {
                        return;
                    }
                    if let Some((user, system)) = get_cpu_times() {
                        observer.observe(user, &[KeyValue::new("state", "user")]);
                        observer.observe(system, &[KeyValue::new("state", "system")]);
                    }
                })
                .build();
        }

        if get_open_fds().is_some() {
            let stop_fds = stop.clone();
            let _ = meter
                .u64_observable_gauge("process.open_file_descriptors")
                .with_description("Open file descriptors of the agent process.")
                .with_callback(move |observer| {
                    if stop_fds.is_stopped() {
                        return;
                    }
                    if let Some(count) = get_open_fds() {
                        observer.observe(count, &[]);
                    }
                })
                .build();
        }

        Ok(())
    }
}

/// Gets the resident set size in bytes.
#[cfg(target_os = "linux")]
fn get_rss_bytes() -> Option<u64> {
    // /proc/self/statm: size resident shared text lib data dt, in pages.
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let resident_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page_size <= 0 {
        return None;
    }
    Some(resident_pages * page_size as u64)
}

/// Fallback for unsupported platforms.
#[cfg(not(target_os = "linux"))]
fn get_rss_bytes() -> Option<u64> {
    None
}

/// Gets cumulative (user, system) CPU time in seconds.
#[cfg(unix)]
fn get_cpu_times() -> Option<(f64, f64)> {
    use std::mem;

    unsafe {
        let mut usage: libc::rusage = mem::zeroed();
        if libc::getrusage(libc::RUSAGE_SELF, &mut usage) == 0 {
            let user =
                usage.ru_utime.tv_sec as f64 + usage.ru_utime.tv_usec as f64 / 1_000_000.0;
            let system =
                usage.ru_stime.tv_sec as f64 + usage.ru_stime.tv_usec as f64 / 1_000_000.0;
            Some((user, system))
        } else {
            None
        }
    }
}

/// Fallback for unsupported platforms.
#[cfg(not(unix))]
fn get_cpu_times() -> Option<(f64, f64)> {
    None
}

/// Gets the number of open file descriptors.
#[cfg(target_os = "linux")]
fn get_open_fds() -> Option<u64> {
    let entries = std::fs::read_dir("/proc/self/fd").ok()?;
    Some(entries.count() as u64)
}

/// Fallback for unsupported platforms.
#[cfg(not(target_os = "linux"))]
fn get_open_fds() -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_cpu_times() {
        let (user, system) = get_cpu_times().unwrap();
        assert!(user >= 0.0);
        assert!(system >= 0.0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_rss() {
        assert!(get_rss_bytes().unwrap() > 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_open_fds() {
        assert!(get_open_fds().unwrap() > 0);
    }
}
