//! Two-point delta samplers for CPU utilization and network throughput.
//!
//! Both read a cumulative counter, wait one window, read it again and
//! report the difference. They block the calling thread for the window.

use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::collector::error::CollectError;
use crate::collector::platform::{CpuTicks, Platform};
use crate::model::{CoreUsage, CpuUsage, NetworkTransfer};

/// Default time between the two readings.
pub const DEFAULT_SAMPLE_WINDOW: Duration = Duration::from_secs(1);

/// Reads `read` twice, `window` apart.
pub fn measure_over<T>(
    window: Duration,
    mut read: impl FnMut() -> Result<T, CollectError>,
) -> Result<(T, T), CollectError> {
    let before = read()?;
    if !window.is_zero() {
        thread::sleep(window);
    }
    let after = read()?;
    Ok((before, after))
}

/// Busy percentage of one core between two readings, clamped to `[0, 100]`.
///
/// A window with no elapsed ticks is treated as one tick long.
pub fn core_utilization(before: CpuTicks, after: CpuTicks) -> f32 {
    let total_diff = match after.total.saturating_sub(before.total) {
        0 => 1,
        n => n,
    };
    let idle_diff = after.idle.saturating_sub(before.idle);

    let ratio = total_diff as f64 / 100.0;
    let percent = (total_diff as f64 - idle_diff as f64) / ratio;
    percent.clamp(0.0, 100.0) as f32
}

/// Unweighted mean of per-core utilization, 0 for no cores.
pub fn mean_utilization(cores: &[CoreUsage]) -> f32 {
    if cores.is_empty() {
        return 0.0;
    }
    let sum: f32 = cores.iter().map(|c| c.utilization_percent).sum();
    sum / cores.len() as f32
}

/// Per-core CPU utilization over a sampling window.
#[derive(Debug, Clone, Copy)]
pub struct CpuSampler {
    window: Duration,
}

impl Default for CpuSampler {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_WINDOW)
    }
}

impl CpuSampler {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Blocks for one window and returns per-core and mean utilization.
    ///
    /// If either reading fails the result has no cores and 0%. Readings are
    /// matched by core id; a core missing from either reading is left out.
    pub fn sample<P: Platform + ?Sized>(&self, platform: &P) -> CpuUsage {
        let (before, after) = match measure_over(self.window, || platform.cpu_ticks()) {
            Ok(readings) => readings,
            Err(e) => {
                warn!(error = %e, "cpu counters unavailable");
                return CpuUsage::default();
            }
        };

        let cores: Vec<CoreUsage> = after
            .iter()
            .filter_map(|a| {
                let b = before.iter().find(|b| b.cpu_id == a.cpu_id)?;
                Some(CoreUsage {
                    utilization_percent: core_utilization(*b, *a),
                })
            })
            .collect();

        CpuUsage {
            percent: mean_utilization(&cores),
            cores,
        }
    }
}

/// Bytes moved over non-loopback interfaces during a sampling window.
#[derive(Debug, Clone, Copy)]
pub struct NetworkSampler {
    window: Duration,
}

impl Default for NetworkSampler {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_WINDOW)
    }
}

impl NetworkSampler {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Blocks for one window and returns the bytes received and sent.
    ///
    /// Counters that went backwards (interface reset) count as zero.
    pub fn sample<P: Platform + ?Sized>(&self, platform: &P) -> NetworkTransfer {
        match measure_over(self.window, || platform.net_counters()) {
            Ok((before, after)) => NetworkTransfer {
                bytes_in: after.rx_bytes.saturating_sub(before.rx_bytes),
                bytes_out: after.tx_bytes.saturating_sub(before.tx_bytes),
            },
            Err(e) => {
                warn!(error = %e, "network counters unavailable");
                NetworkTransfer::default()
            }
        }
    }
}
