//! Per-process CPU usage from successive `cpu_time` readings.
//!
//! The collector reports cumulative CPU time only; the percentage needs two
//! polls. [`ProcessCpuRates`] keeps the previous poll and fills
//! [`ProcessSnapshot::cpu_usage`] on the next one.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::model::ProcessSnapshot;

/// Compute u64 delta, returning `None` on counter regression (pid reuse).
pub fn du64(curr: u64, prev: u64) -> Option<u64> {
    curr.checked_sub(prev)
}

/// CPU percentage of one process over `elapsed`.
///
/// 100% means one core fully busy for the whole interval.
pub fn cpu_percent(delta: u64, units_per_second: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if units_per_second == 0 || secs <= 0.0 {
        return 0.0;
    }
    delta as f64 / units_per_second as f64 / secs * 100.0
}

/// Rate tracking state for process CPU time.
#[derive(Debug, Default)]
pub struct ProcessCpuRates {
    prev_sample: HashMap<u32, u64>,
    prev_ts: Option<Instant>,
    units_per_second: u64,
}

impl ProcessCpuRates {
    /// # Arguments
    /// * `units_per_second` - `cpu_time` units per second of the platform
    ///   (clock ticks on Linux, microseconds on the BSDs and macOS)
    pub fn new(units_per_second: u64) -> Self {
        Self {
            units_per_second,
            ..Default::default()
        }
    }

    /// Fills `cpu_usage` of every snapshot, using the time elapsed since the
    /// previous call.
    pub fn update(&mut self, processes: &mut [ProcessSnapshot]) {
        let now = Instant::now();
        let elapsed = self
            .prev_ts
            .map(|prev| now.duration_since(prev))
            .unwrap_or_default();
        self.update_with_elapsed(processes, elapsed);
        self.prev_ts = Some(now);
    }

    /// Like [`update`](Self::update) with an explicit interval.
    ///
    /// A pid without a previous reading, or whose `cpu_time` went backwards,
    /// gets 0. Readings of pids not present in `processes` are dropped.
    pub fn update_with_elapsed(&mut self, processes: &mut [ProcessSnapshot], elapsed: Duration) {
        let mut current = HashMap::with_capacity(processes.len());

        for process in processes.iter_mut() {
            process.cpu_usage = self
                .prev_sample
                .get(&process.pid)
                .and_then(|&prev| du64(process.cpu_time, prev))
                .map(|delta| cpu_percent(delta, self.units_per_second, elapsed))
                .unwrap_or(0.0);
            current.insert(process.pid, process.cpu_time);
        }

        self.prev_sample = current;
    }

    pub fn reset(&mut self) {
        self.prev_sample.clear();
        self.prev_ts = None;
    }

    /// Number of pids with a remembered reading.
    pub fn tracked(&self) -> usize {
        self.prev_sample.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(pid: u32, cpu_time: u64) -> ProcessSnapshot {
        ProcessSnapshot {
            pid,
            cpu_time,
            ..Default::default()
        }
    }

    #[test]
    fn test_du64() {
        assert_eq!(du64(10, 4), Some(6));
        assert_eq!(du64(4, 4), Some(0));
        assert_eq!(du64(3, 4), None);
        assert_eq!(du64(0, u64::MAX), None);
    }

    #[test]
    fn test_cpu_percent() {
        // 50 ticks at 100 Hz over 1 s: half a core.
        assert_eq!(cpu_percent(50, 100, Duration::from_secs(1)), 50.0);
        // 2 s of microseconds over 1 s: two cores.
        assert_eq!(cpu_percent(2_000_000, 1_000_000, Duration::from_secs(1)), 200.0);
        assert_eq!(cpu_percent(50, 100, Duration::ZERO), 0.0);
        assert_eq!(cpu_percent(50, 0, Duration::from_secs(1)), 0.0);
    }

    #[test]
    fn test_first_update_is_zero() {
        let mut rates = ProcessCpuRates::new(100);
        let mut procs = vec![process(1, 500)];

        rates.update_with_elapsed(&mut procs, Duration::from_secs(2));

        assert_eq!(procs[0].cpu_usage, 0.0);
        assert_eq!(rates.tracked(), 1);
    }

    #[test]
    fn test_second_update_computes_rate() {
        let mut rates = ProcessCpuRates::new(100);
        rates.update_with_elapsed(&mut [process(1, 500), process(2, 10)], Duration::ZERO);

        let mut procs = vec![process(1, 600), process(2, 10)];
        rates.update_with_elapsed(&mut procs, Duration::from_secs(2));

        assert_eq!(procs[0].cpu_usage, 50.0);
        assert_eq!(procs[1].cpu_usage, 0.0);
    }

    #[test]
    fn test_regression_and_vanished_pids() {
        let mut rates = ProcessCpuRates::new(100);
        rates.update_with_elapsed(&mut [process(1, 500), process(2, 10)], Duration::ZERO);

        // pid 1 was reused by a new process, pid 2 exited
        let mut procs = vec![process(1, 20)];
        rates.update_with_elapsed(&mut procs, Duration::from_secs(1));

        assert_eq!(procs[0].cpu_usage, 0.0);
        assert_eq!(rates.tracked(), 1);

        // The reused pid is measured from its own reading from now on.
        let mut procs = vec![process(1, 70)];
        rates.update_with_elapsed(&mut procs, Duration::from_secs(1));
        assert_eq!(procs[0].cpu_usage, 50.0);
    }

    #[test]
    fn test_reset() {
        let mut rates = ProcessCpuRates::new(100);
        rates.update(&mut [process(1, 5)]);
        rates.reset();
        assert_eq!(rates.tracked(), 0);

        let mut procs = vec![process(1, 50)];
        rates.update(&mut procs);
        assert_eq!(procs[0].cpu_usage, 0.0);
    }
}
