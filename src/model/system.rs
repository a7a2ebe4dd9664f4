//! Host-wide measurements: CPU, memory, power, temperature and network.

use serde::{Deserialize, Serialize};

/// Utilization of one core over a sampling window.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct CoreUsage {
    /// Busy percentage in `[0, 100]`.
    pub utilization_percent: f32,
}

/// Result of one CPU sampling window.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct CpuUsage {
    /// Per-core utilization, ordered by core index.
    pub cores: Vec<CoreUsage>,
    /// Unweighted mean of `cores`, 0 when no cores were read.
    pub percent: f32,
}

/// Memory and swap totals.
///
/// All values are in kilobytes.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct MemoryUsage {
    pub total: u64,
    pub used: u64,
    pub cached: u64,
    pub buffered: u64,
    pub shared: u64,
    pub swap_total: u64,
    pub swap_used: u64,
}

/// Battery and AC line status.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct PowerStatus {
    /// AC adapter is connected.
    pub has_ac: bool,
    /// Combined charge of all batteries, `0..=100`.
    pub battery_percent: u8,
    /// Number of batteries found during discovery.
    pub battery_count: usize,
}

/// Bytes moved over all non-loopback interfaces during one sampling window.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct NetworkTransfer {
    pub bytes_in: u64,
    pub bytes_out: u64,
}

/// One host-wide measurement.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct SystemSample {
    /// Unix timestamp (seconds) taken when sampling finished.
    pub timestamp: i64,
    pub cpu_count: usize,
    /// Mean utilization over all cores.
    pub cpu_percent: f32,
    pub cores: Vec<CoreUsage>,
    pub memory: MemoryUsage,
    /// Package temperature in whole degrees Celsius, `None` when unavailable.
    pub temperature: Option<i32>,
    pub power: PowerStatus,
    pub network: NetworkTransfer,
}
