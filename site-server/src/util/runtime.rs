//! Process runtime metrics reported by the health endpoint.

use std::time::Instant;

use serde::Serialize;
use sysinfo::System;

/// Memory figures in megabytes.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryUsage {
    /// Resident memory of this process
    pub used: u64,
    /// Total system memory
    pub total: u64,
    pub unit: &'static str,
}

/// Seconds since `start_time`, fractional.
pub fn uptime_seconds(start_time: Instant) -> f64 {
    start_time.elapsed().as_secs_f64()
}

/// Snapshot process and system memory.
pub fn memory_usage() -> MemoryUsage {
    let mut sys = System::new();
    sys.refresh_memory();

    let used = sysinfo::get_current_pid()
        .ok()
        .and_then(|pid| {
            sys.refresh_process(pid);
            sys.process(pid).map(|p| p.memory())
        })
        .unwrap_or(0);

    MemoryUsage {
        used: used / 1024 / 1024,
        total: sys.total_memory() / 1024 / 1024,
        unit: "MB",
    }
}
