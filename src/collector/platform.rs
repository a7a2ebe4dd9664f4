//! The seam between the portable samplers and the per-kernel adapters.
//!
//! Exactly one adapter is compiled as [`NativePlatform`] for the build
//! target. The Linux adapter ([`ProcFs`](super::ProcFs)) is compiled on every
//! target because it only needs a [`FileSystem`](super::FileSystem), which is
//! how its decoding is tested with [`MockFs`](super::MockFs).

use crate::collector::error::CollectError;
use crate::model::{MemoryUsage, PowerStatus, ProcessSnapshot};

/// Cumulative tick counters of one core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTicks {
    /// Kernel core index, stable across readings.
    pub cpu_id: u32,
    /// Sum of the user, nice, system and idle ticks.
    pub total: u64,
    pub idle: u64,
}

/// Cumulative byte counters summed over all counted interfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Raw access to one kernel's process table and resource counters.
///
/// Adapters decode native records into the canonical model and never keep
/// state between calls, except whatever their constructor resolved once
/// (MIB numbers, paths). `Sync` is required so the collector can run the CPU
/// and network windows on two scoped threads.
pub trait Platform: Sync {
    /// Whatever power discovery found: battery and AC sources that can be
    /// re-read cheaply.
    type PowerHandles: Send;

    /// Every process visible right now, in scan order.
    ///
    /// Processes that vanish or cannot be read mid-scan are skipped.
    fn processes(&self) -> Vec<ProcessSnapshot>;

    /// One process, or [`CollectError::ProcessGone`] if it does not exist.
    fn process(&self, pid: u32) -> Result<ProcessSnapshot, CollectError>;

    /// Per-core tick counters of the online cores, ordered by core index.
    fn cpu_ticks(&self) -> Result<Vec<CpuTicks>, CollectError>;

    /// Memory and swap totals in KiB. Unreadable parts are zero.
    fn memory(&self) -> MemoryUsage;

    /// Byte counters over every non-loopback interface.
    fn net_counters(&self) -> Result<NetCounters, CollectError>;

    /// Finds battery and AC sources. Runs once per
    /// [`PowerSampler`](super::PowerSampler) cache fill.
    fn discover_power(&self) -> Self::PowerHandles;

    /// Reads current power state from previously discovered handles.
    fn read_power(&self, handles: &Self::PowerHandles) -> PowerStatus;

    /// CPU package temperature in whole degrees Celsius.
    fn temperature(&self) -> Option<i32>;

    /// Units of [`ProcessSnapshot::cpu_time`] per second.
    fn cpu_time_per_second(&self) -> u64;
}

#[cfg(target_os = "linux")]
pub type NativePlatform = crate::collector::procfs::ProcFs<crate::collector::traits::RealFs>;

#[cfg(target_os = "freebsd")]
pub type NativePlatform = crate::collector::sysctl::freebsd::FreeBsd;

#[cfg(target_os = "macos")]
pub type NativePlatform = crate::collector::sysctl::macos::Darwin;

#[cfg(target_os = "openbsd")]
pub type NativePlatform = crate::collector::sysctl::openbsd::OpenBsd;

#[cfg(not(any(
    target_os = "linux",
    target_os = "freebsd",
    target_os = "macos",
    target_os = "openbsd"
)))]
pub type NativePlatform = crate::collector::unsupported::Unsupported;

/// Builds the adapter for the running kernel with default settings.
#[cfg(target_os = "linux")]
pub fn native() -> Result<NativePlatform, CollectError> {
    use crate::collector::traits::RealFs;
    Ok(crate::collector::procfs::ProcFs::new(RealFs::new(), "/proc"))
}

/// Builds the adapter for the running kernel with default settings.
#[cfg(target_os = "freebsd")]
pub fn native() -> Result<NativePlatform, CollectError> {
    crate::collector::sysctl::freebsd::FreeBsd::new()
}

/// Builds the adapter for the running kernel with default settings.
#[cfg(target_os = "macos")]
pub fn native() -> Result<NativePlatform, CollectError> {
    Ok(crate::collector::sysctl::macos::Darwin::new())
}

/// Builds the adapter for the running kernel with default settings.
#[cfg(target_os = "openbsd")]
pub fn native() -> Result<NativePlatform, CollectError> {
    Ok(crate::collector::sysctl::openbsd::OpenBsd::new())
}

/// Builds the adapter for the running kernel with default settings.
#[cfg(not(any(
    target_os = "linux",
    target_os = "freebsd",
    target_os = "macos",
    target_os = "openbsd"
)))]
pub fn native() -> Result<NativePlatform, CollectError> {
    Ok(crate::collector::unsupported::Unsupported)
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use crate::collector::Collector;
    use std::collections::HashSet;
    use std::time::Duration;

    /// Above `PID_MAX_LIMIT`, so never assigned.
    const UNUSED_PID: u32 = i32::MAX as u32;

    #[test]
    fn test_live_enumeration() {
        let platform = native().unwrap();
        let processes = platform.processes();

        assert!(!processes.is_empty());
        let pids: HashSet<u32> = processes.iter().map(|p| p.pid).collect();
        assert_eq!(pids.len(), processes.len());
        assert!(processes.iter().all(|p| p.pid > 0));
        assert!(processes.iter().all(|p| !p.command.is_empty()));
        assert!(pids.contains(&std::process::id()));
    }

    #[test]
    fn test_live_single_process() {
        let platform = native().unwrap();

        let me = platform.process(std::process::id()).unwrap();
        assert_eq!(me.pid, std::process::id());
        assert!(me.thread_count >= 1);
        assert!(me.mem_resident_size > 0);

        assert!(matches!(
            platform.process(UNUSED_PID),
            Err(CollectError::ProcessGone(UNUSED_PID))
        ));
    }

    #[test]
    fn test_live_cpu_sample_in_range() {
        let mut collector =
            Collector::new(native().unwrap()).with_sample_window(Duration::from_millis(100));
        let sample = collector.sample_system();

        assert_eq!(sample.cpu_count, sample.cores.len());
        assert!(sample.cpu_count > 0);
        for core in &sample.cores {
            assert!((0.0..=100.0).contains(&core.utilization_percent));
        }
        assert!((0.0..=100.0).contains(&sample.cpu_percent));
        assert!(sample.memory.total > 0);
    }
}
