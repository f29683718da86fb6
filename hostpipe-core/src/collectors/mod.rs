//! Built-in host metric collectors.
//!
//! Each collector registers observable instruments on the pipeline's meter
//! and is driven by the periodic reader's flush cadence. Collectors that
//! cannot find their metrics source on the current host fail to attach and
//! are skipped.

mod cpu;
mod memory;
mod process;

pub use cpu::CpuCollector;
pub use memory::MemoryCollector;
pub use process::ProcessCollector;

use crate::HostCollector;

/// The default collector set started by the pipeline.
pub fn default_collectors() -> Vec<Box<dyn HostCollector>> {
    vec![
        Box::new(MemoryCollector::new()),
        Box::new(CpuCollector::new()),
        Box::new(ProcessCollector::new()),
    ]
}
