//! System collector for host-wide counters from `/proc/`.

use crate::collector::error::CollectError;
use crate::collector::platform::{CpuTicks, NetCounters};
use crate::collector::procfs::parser::{
    CpuTimes, MemInfo, parse_cpu_times, parse_meminfo, parse_net_dev,
};
use crate::collector::traits::FileSystem;
use crate::model::MemoryUsage;
use std::path::PathBuf;

/// Interface excluded from network totals.
const LOOPBACK: &str = "lo";

/// Collects system-wide counters from `/proc/`.
pub struct SystemCollector<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
}

impl<F: FileSystem> SystemCollector<F> {
    /// Creates a new system collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    /// Collects per-core tick counters from the `cpuN` lines of `/proc/stat`.
    pub fn collect_cpu_ticks(&self) -> Result<Vec<CpuTicks>, CollectError> {
        let content = self.fs.read_to_string(&self.proc_path.join("stat"))?;
        let cores = parse_cpu_times(&content)?;
        Ok(cores.iter().map(cpu_ticks).collect())
    }

    /// Collects memory and swap totals from `/proc/meminfo`.
    pub fn collect_memory(&self) -> Result<MemoryUsage, CollectError> {
        let content = self.fs.read_to_string(&self.proc_path.join("meminfo"))?;
        let info = parse_meminfo(&content)?;
        Ok(memory_usage(&info))
    }

    /// Sums the byte counters of every interface in `/proc/net/dev` except
    /// loopback.
    pub fn collect_net_counters(&self) -> Result<NetCounters, CollectError> {
        let content = self.fs.read_to_string(&self.proc_path.join("net/dev"))?;
        let devices = parse_net_dev(&content)?;

        Ok(devices
            .iter()
            .filter(|dev| dev.interface != LOOPBACK)
            .fold(NetCounters::default(), |acc, dev| NetCounters {
                rx_bytes: acc.rx_bytes.saturating_add(dev.rx_bytes),
                tx_bytes: acc.tx_bytes.saturating_add(dev.tx_bytes),
            }))
    }
}

fn cpu_ticks(times: &CpuTimes) -> CpuTicks {
    CpuTicks {
        cpu_id: times.cpu_id,
        total: times.user + times.nice + times.system + times.idle,
        idle: times.idle,
    }
}

/// Slab is reported as cache; `used` is whatever is neither free, cache nor
/// buffers.
fn memory_usage(info: &MemInfo) -> MemoryUsage {
    let cached = info.cached + info.slab;
    MemoryUsage {
        total: info.mem_total,
        used: info
            .mem_total
            .saturating_sub(info.mem_free)
            .saturating_sub(cached)
            .saturating_sub(info.buffers),
        cached,
        buffered: info.buffers,
        shared: info.shmem,
        swap_total: info.swap_total,
        swap_used: info.swap_total.saturating_sub(info.swap_free),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    #[test]
    fn test_collect_cpu_ticks() {
        let fs = MockFs::typical_system();
        let collector = SystemCollector::new(fs, "/proc");

        let ticks = collector.collect_cpu_ticks().unwrap();

        // typical_system has 4 cores, the aggregate line is skipped
        assert_eq!(ticks.len(), 4);
        assert_eq!(
            ticks[0],
            CpuTicks {
                cpu_id: 0,
                total: 2500 + 125 + 750 + 20000,
                idle: 20000
            }
        );
        let ids: Vec<u32> = ticks.iter().map(|t| t.cpu_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_collect_memory() {
        let fs = MockFs::typical_system();
        let collector = SystemCollector::new(fs, "/proc");

        let mem = collector.collect_memory().unwrap();

        assert_eq!(mem.total, 16384000);
        assert_eq!(mem.cached, 2048000 + 512000);
        assert_eq!(mem.buffered, 512000);
        assert_eq!(mem.used, 16384000 - 8192000 - 2560000 - 512000);
        assert_eq!(mem.shared, 262144);
        assert_eq!(mem.swap_total, 4096000);
        assert_eq!(mem.swap_used, 1024000);
    }

    #[test]
    fn test_memory_used_never_underflows() {
        let info = MemInfo {
            mem_total: 1000,
            mem_free: 900,
            cached: 200,
            buffers: 100,
            swap_total: 10,
            swap_free: 20,
            ..Default::default()
        };
        let mem = memory_usage(&info);
        assert_eq!(mem.used, 0);
        assert_eq!(mem.swap_used, 0);
    }

    #[test]
    fn test_collect_net_counters_excludes_loopback() {
        let fs = MockFs::typical_system();
        let collector = SystemCollector::new(fs, "/proc");

        let counters = collector.collect_net_counters().unwrap();

        assert_eq!(counters.rx_bytes, 123456789 + 5000);
        assert_eq!(counters.tx_bytes, 98765432 + 7000);
    }

    #[test]
    fn test_missing_files_are_errors() {
        let collector = SystemCollector::new(MockFs::new(), "/proc");

        assert!(matches!(
            collector.collect_cpu_ticks(),
            Err(CollectError::Io(_))
        ));
        assert!(collector.collect_memory().is_err());
        assert!(collector.collect_net_counters().is_err());
    }
}
