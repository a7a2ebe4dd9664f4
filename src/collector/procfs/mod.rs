//! Linux adapter over the `/proc` and `/sys` pseudo-filesystems.
//!
//! This module provides parsers and collectors for reading process and host
//! information. Everything goes through a [`FileSystem`], so the adapter is
//! compiled on every target and tested against [`MockFs`](super::MockFs).

pub mod parser;
pub mod power;
pub mod process;
pub mod system;

pub use power::{PowerCollector, SysfsPower};
pub use process::ProcessCollector;
pub use system::SystemCollector;

use crate::collector::error::CollectError;
use crate::collector::platform::{CpuTicks, NetCounters, Platform};
use crate::collector::traits::FileSystem;
use crate::model::{MemoryUsage, PowerStatus, ProcessSnapshot};
use crate::util;
use std::path::PathBuf;
use tracing::warn;

/// Default sysfs mount point.
const DEFAULT_SYS_PATH: &str = "/sys";

/// [`Platform`] implementation for Linux.
///
/// Combines the process, system and power collectors over one filesystem.
pub struct ProcFs<F: FileSystem + Clone> {
    fs: F,
    processes: ProcessCollector<F>,
    system: SystemCollector<F>,
    power: PowerCollector<F>,
    clock_ticks: u64,
}

impl<F: FileSystem + Clone> ProcFs<F> {
    /// Creates the adapter.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    ///
    /// sysfs defaults to `/sys` and the page size to the host's.
    pub fn new(fs: F, proc_path: impl Into<PathBuf>) -> Self {
        let proc_path = proc_path.into();
        Self {
            processes: ProcessCollector::new(fs.clone(), &proc_path, util::page_size()),
            system: SystemCollector::new(fs.clone(), &proc_path),
            power: PowerCollector::new(fs.clone(), DEFAULT_SYS_PATH),
            clock_ticks: util::clock_ticks(),
            fs,
        }
    }

    /// Reads power supplies and thermal zones from a different sysfs root.
    pub fn with_sys_path(mut self, sys_path: impl Into<PathBuf>) -> Self {
        self.power = PowerCollector::new(self.fs.clone(), sys_path);
        self
    }

    /// Overrides the page size used to convert resident pages to bytes.
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.processes.set_page_size(page_size);
        self
    }
}

impl<F: FileSystem + Clone> Platform for ProcFs<F> {
    type PowerHandles = SysfsPower;

    fn processes(&self) -> Vec<ProcessSnapshot> {
        self.processes.collect_all_processes()
    }

    fn process(&self, pid: u32) -> Result<ProcessSnapshot, CollectError> {
        self.processes.collect_process(pid)
    }

    fn cpu_ticks(&self) -> Result<Vec<CpuTicks>, CollectError> {
        self.system.collect_cpu_ticks()
    }

    fn memory(&self) -> MemoryUsage {
        self.system.collect_memory().unwrap_or_else(|e| {
            warn!(error = %e, "failed to read meminfo");
            MemoryUsage::default()
        })
    }

    fn net_counters(&self) -> Result<NetCounters, CollectError> {
        self.system.collect_net_counters()
    }

    fn discover_power(&self) -> SysfsPower {
        self.power.discover()
    }

    fn read_power(&self, handles: &SysfsPower) -> PowerStatus {
        self.power.read(handles)
    }

    fn temperature(&self) -> Option<i32> {
        self.power.temperature()
    }

    fn cpu_time_per_second(&self) -> u64 {
        self.clock_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    #[test]
    fn test_platform_over_mock_fs() {
        let platform = ProcFs::new(MockFs::typical_system(), "/proc").with_page_size(4096);

        assert_eq!(platform.processes().len(), 3);
        assert_eq!(platform.process(1).unwrap().command, "systemd");
        assert_eq!(platform.cpu_ticks().unwrap().len(), 4);
        assert_eq!(platform.memory().total, 16384000);
        assert!(platform.net_counters().unwrap().rx_bytes > 0);
        assert!(platform.cpu_time_per_second() > 0);
    }

    #[test]
    fn test_memory_falls_back_to_zero() {
        let platform = ProcFs::new(MockFs::new(), "/proc");
        assert_eq!(platform.memory(), MemoryUsage::default());
    }

    #[test]
    fn test_custom_sys_path() {
        let mut fs = MockFs::with_thermal_zones();
        fs.add_thermal_zone_at("/host/sys", 0, "x86_pkg_temp", "71000");

        let default_root = ProcFs::new(fs.clone(), "/proc");
        assert_eq!(default_root.temperature(), Some(52));

        let custom_root = ProcFs::new(fs, "/proc").with_sys_path("/host/sys");
        assert_eq!(custom_root.temperature(), Some(71));
    }

    #[test]
    fn test_power_through_platform() {
        let platform = ProcFs::new(MockFs::with_batteries(), "/proc");

        let handles = platform.discover_power();
        let status = platform.read_power(&handles);

        assert_eq!(status.battery_count, 2);
        assert!(status.has_ac);
    }
}
