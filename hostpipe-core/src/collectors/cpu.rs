//! Host CPU collector.

use std::sync::{Arc, Mutex};

use opentelemetry::metrics::Meter;

use crate::collector::{AttachError, HostCollector, StopFlag};

/// Collects host-wide CPU usage.
///
/// Metrics collected:
/// - `host.cpu.utilization` - busy fraction (0..1) since the last flush
/// - `host.cpu.load_average.1m` / `.5m` / `.15m` - load averages
pub struct CpuCollector {
    _private: (),
}

impl CpuCollector {
    /// Creates a new CPU collector.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for CpuCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl HostCollector for CpuCollector {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn attach(&self, meter: &Meter, stop: &StopFlag) -> Result<(), AttachError> {
        let baseline =
            read_cpu_times().ok_or_else(|| AttachError("host CPU statistics unavailable".into()))?;

        // Utilization is a delta against the previous observation, seeded
        // with the attach-time sample.
        let previous = Arc::new(Mutex::new(baseline));
        let stop_util = stop.clone();
        let _ = meter
            .f64_observable_gauge("host.cpu.utilization")
            .with_unit("1")
            .with_description("Busy fraction of all CPUs since the last observation.")
            .with_callback(move |observer| {
                if stop_util.is_stopped() {
                    return;
                }
                let Some(current) = read_cpu_times() else {
                    return;
                };
                let Ok(mut previous) = previous.lock() else {
                    return;
                };
                if let Some(utilization) = previous.utilization_since(&current) {
                    observer.observe(utilization, &[]);
                }
                *previous = current;
            })
            .build();

        if read_loadavg().is_some() {
            for (suffix, index) in [("1m", 0), ("5m", 1), ("15m", 2)] {
                let stop_load = stop.clone();
                let _ = meter
                    .f64_observable_gauge(format!("host.cpu.load_average.{suffix}"))
                    .with_unit("1")
                    .with_description("Host load average.")
                    .with_callback(move |observer| {
                        if stop_load.is_stopped() {
                            return;
                        }
                        if let Some(load) = read_loadavg() {
                            observer.observe(load[index], &[]);
                        }
                    })
                    .build();
            }
        }

        Ok(())
    }
}

/// Aggregate CPU tick counters since boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CpuTimes {
    busy: u64,
    total: u64,
}

impl CpuTimes {
    /// Busy fraction between `self` and a later sample. `None` when no time
    /// has passed or the counters went backwards.
    fn utilization_since(&self, current: &CpuTimes) -> Option<f64> {
        let total = current.total.checked_sub(self.total)?;
        let busy = current.busy.checked_sub(self.busy)?;
        if total == 0 {
            return None;
        }
        Some(busy as f64 / total as f64)
    }
}

/// Reads the aggregate CPU counters.
#[cfg(target_os = "linux")]
fn read_cpu_times() -> Option<CpuTimes> {
    let stat = std::fs::read_to_string("/proc/stat").ok()?;
    parse_cpu_times(&stat)
}

/// Fallback for unsupported platforms.
#[cfg(not(target_os = "linux"))]
fn read_cpu_times() -> Option<CpuTimes> {
    None
}

/// Parses the aggregate `cpu` line of `/proc/stat`.
///
/// Fields: user nice system idle iowait irq softirq steal; idle time is
/// idle plus iowait.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_cpu_times(content: &str) -> Option<CpuTimes> {
    let line = content.lines().find(|line| line.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map_while(|field| field.parse().ok())
        .collect();
    if fields.len() < 5 {
        return None;
    }
    let total: u64 = fields.iter().sum();
    let idle = fields[3] + fields[4];
    Some(CpuTimes {
        busy: total - idle,
        total,
    })
}

/// Reads the 1/5/15 minute load averages.
#[cfg(target_os = "linux")]
fn read_loadavg() -> Option<[f64; 3]> {
    let loadavg = std::fs::read_to_string("/proc/loadavg").ok()?;
    parse_loadavg(&loadavg)
}

/// Fallback for unsupported platforms.
#[cfg(not(target_os = "linux"))]
fn read_loadavg() -> Option<[f64; 3]> {
    None
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_loadavg(content: &str) -> Option<[f64; 3]> {
    let mut fields = content.split_whitespace();
    let one = fields.next()?.parse().ok()?;
    let five = fields.next()?.parse().ok()?;
    let fifteen = fields.next()?.parse().ok()?;
    Some([one, five, fifteen])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpu_times() {
        let content = "cpu  100 0 50 800 50 0 0 0 0 0\ncpu0 50 0 25 400 25 0 0 0 0 0\n";
        let times = parse_cpu_times(content).unwrap();
        assert_eq!(times.total, 1000);
        assert_eq!(times.busy, 150);
    }

    #[test]
    fn test_utilization_since() {
        let before = CpuTimes {
            busy: 150,
            total: 1000,
        };
        let after = CpuTimes {
            busy: 250,
            total: 1400,
        };
        assert_eq!(before.utilization_since(&after), Some(0.25));
        // No elapsed time or counter regression yields no observation.
        assert_eq!(before.utilization_since(&before), None);
        assert_eq!(after.utilization_since(&before), None);
    }

    #[test]
    fn test_parse_loadavg() {
        let load = parse_loadavg("0.52 0.41 0.30 2/1463 12345\n").unwrap();
        assert_eq!(load, [0.52, 0.41, 0.30]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_read_cpu_times_live() {
        let times = read_cpu_times().unwrap();
        assert!(times.total >= times.busy);
    }
}
