//! Adapter for operating systems without a backend.

use crate::collector::error::CollectError;
use crate::collector::platform::{CpuTicks, NetCounters, Platform};
use crate::model::{MemoryUsage, PowerStatus, ProcessSnapshot};

/// Sees no processes and reads no counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unsupported;

impl Platform for Unsupported {
    type PowerHandles = ();

    fn processes(&self) -> Vec<ProcessSnapshot> {
        Vec::new()
    }

    fn process(&self, _pid: u32) -> Result<ProcessSnapshot, CollectError> {
        Err(CollectError::Unsupported("process"))
    }

    fn cpu_ticks(&self) -> Result<Vec<CpuTicks>, CollectError> {
        Err(CollectError::Unsupported("cpu ticks"))
    }

    fn memory(&self) -> MemoryUsage {
        MemoryUsage::default()
    }

    fn net_counters(&self) -> Result<NetCounters, CollectError> {
        Err(CollectError::Unsupported("network counters"))
    }

    fn discover_power(&self) {}

    fn read_power(&self, _handles: &()) -> PowerStatus {
        PowerStatus::default()
    }

    fn temperature(&self) -> Option<i32> {
        None
    }

    fn cpu_time_per_second(&self) -> u64 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Collector;
    use std::time::Duration;

    #[test]
    fn test_everything_is_empty() {
        let mut collector = Collector::new(Unsupported).with_sample_window(Duration::ZERO);

        assert!(collector.processes().is_empty());
        // A lookup that cannot happen is not a vanished process.
        assert!(matches!(
            collector.process(1),
            Err(CollectError::Unsupported("process"))
        ));

        let sample = collector.sample_system();
        assert_eq!(sample.cpu_count, 0);
        assert_eq!(sample.cpu_percent, 0.0);
        assert_eq!(sample.memory, MemoryUsage::default());
        assert_eq!(sample.power, PowerStatus::default());
        assert_eq!(sample.temperature, None);
    }
}
