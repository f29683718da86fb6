//! Host memory collector.

use opentelemetry::metrics::Meter;

use crate::collector::{AttachError, HostCollector, StopFlag};

/// Collects host-wide memory usage.
///
/// Metrics collected:
/// - `host.memory.total` - total physical memory in bytes
/// - `host.memory.available` - memory available for new workloads
/// - `host.memory.used` - total minus available
pub struct MemoryCollector {
    _private: (),
}

impl MemoryCollector {
    /// Creates a new memory collector.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for MemoryCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl HostCollector for MemoryCollector {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn attach(&self, meter: &Meter, stop: &StopFlag) -> Result<(), AttachError> {
        // Probe once so an unsupported host fails at attach time instead of
        // silently observing nothing.
        read_meminfo().ok_or_else(|| AttachError("host memory statistics unavailable".into()))?;

        let stop_total = stop.clone();
        let _ = meter
            .u64_observable_gauge("host.memory.total")
            .with_unit("By")
            .with_description("Total physical memory of the host.")
            .with_callback(move |observer| {
                if stop_total.is_stopped() {
                    return;
                }
                if let Some(info) = read_meminfo() {
                    observer.observe(info.total, &[]);
                }
            })
            .build();

        let stop_available = stop.clone();
        let _ = meter
            .u64_observable_gauge("host.memory.available")
            .with_unit("By")
            .with_description("Memory available for new workloads.")
            .with_callback(move |observer| {
                if stop_available.is_stopped() {
                    return;
                }
                if let Some(info) = read_meminfo() {
                    observer.observe(info.available, &[]);
                }
            })
            .build();

        let stop_used = stop.clone();
        let _ = meter
            .u64_observable_gauge("host.memory.used")
            .with_unit("By")
            .with_description("Memory in use on the host.")
            .with_callback(move |observer| {
                if stop_used.is_stopped() {
                    return;
                }
                if let Some(info) = read_meminfo() {
                    observer.observe(info.total.saturating_sub(info.available), &[]);
                }
            })
            .build();

        Ok(())
    }
}

struct MemInfo {
    /// Total physical memory in bytes.
    total: u64,
    /// Available memory in bytes.
    available: u64,
}

/// Reads host memory statistics.
#[cfg(target_os = "linux")]
fn read_meminfo() -> Option<MemInfo> {
    let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
    parse_meminfo(&meminfo)
}

/// Fallback for unsupported platforms.
#[cfg(not(target_os = "linux"))]
fn read_meminfo() -> Option<MemInfo> {
    None
}

/// Parses `/proc/meminfo` content. Values there are in kB.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_meminfo(content: &str) -> Option<MemInfo> {
    let mut total = None;
    let mut available = None;
    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let Some(kb) = rest.split_whitespace().next().and_then(|v| v.parse::<u64>().ok()) else {
            continue;
        };
        match key {
            "MemTotal" => total = Some(kb * 1024),
            "MemAvailable" => available = Some(kb * 1024),
            _ => {}
        }
        if total.is_some() && available.is_some() {
            break;
        }
    }
    Some(MemInfo {
        total: total?,
        available: available?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meminfo() {
        let content = "MemTotal:       16384256 kB\n\
                       MemFree:         1038244 kB\n\
                       MemAvailable:    8123412 kB\n\
                       Buffers:          517092 kB\n";
        let info = parse_meminfo(content).unwrap();
        assert_eq!(info.total, 16384256 * 1024);
        assert_eq!(info.available, 8123412 * 1024);
    }

    #[test]
    fn test_parse_meminfo_incomplete() {
        assert!(parse_meminfo("MemTotal: 1 kB\n").is_none());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_read_meminfo_live() {
        let info = read_meminfo().unwrap();
        assert!(info.total > 0);
        assert!(info.available <= info.total);
    }
}
