//! Main collector that combines the platform adapter and the samplers.
//!
//! The `Collector` struct provides the public call shapes: full process
//! enumeration, single-process lookup and one host-wide [`SystemSample`].

use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::debug;

use crate::collector::error::CollectError;
use crate::collector::platform::Platform;
use crate::collector::power::PowerSampler;
use crate::collector::sampler::{CpuSampler, DEFAULT_SAMPLE_WINDOW, NetworkSampler};
use crate::model::{ProcessSnapshot, SystemSample};

/// Timing information for each phase of [`Collector::sample_system`].
///
/// Used for debugging and performance monitoring.
#[derive(Debug, Clone, Default)]
pub struct CollectorTiming {
    /// Total sample time.
    pub total: Duration,
    /// CPU and network windows (run concurrently).
    pub windows: Duration,
    /// Time to read memory totals.
    pub memory: Duration,
    /// Time to read power state and temperature.
    pub power: Duration,
}

/// Main collector over one platform adapter.
///
/// Holds no snapshot between calls. The only state is the power discovery
/// cache and the timing of the last system sample.
pub struct Collector<P: Platform> {
    platform: P,
    cpu: CpuSampler,
    network: NetworkSampler,
    power: PowerSampler<P>,
    /// Timing information from the last sample_system call.
    last_timing: Option<CollectorTiming>,
}

impl<P: Platform> Collector<P> {
    /// Creates a collector with a one-second sampling window.
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            cpu: CpuSampler::new(DEFAULT_SAMPLE_WINDOW),
            network: NetworkSampler::new(DEFAULT_SAMPLE_WINDOW),
            power: PowerSampler::new(),
            last_timing: None,
        }
    }

    /// Sets the time between the two readings of the CPU and network
    /// counters.
    pub fn with_sample_window(mut self, window: Duration) -> Self {
        self.cpu = CpuSampler::new(window);
        self.network = NetworkSampler::new(window);
        self
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Units of `cpu_time` per second on this platform.
    pub fn cpu_time_per_second(&self) -> u64 {
        self.platform.cpu_time_per_second()
    }

    /// Returns timing information from the last sample_system call.
    pub fn last_timing(&self) -> Option<&CollectorTiming> {
        self.last_timing.as_ref()
    }

    /// Every process visible right now. Never fails as a whole.
    pub fn processes(&self) -> Vec<ProcessSnapshot> {
        let start = Instant::now();
        let processes = self.platform.processes();
        debug!(
            count = processes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "processes enumerated"
        );
        processes
    }

    /// One process by pid.
    ///
    /// Returns [`CollectError::ProcessGone`] if the pid does not exist.
    pub fn process(&self, pid: u32) -> Result<ProcessSnapshot, CollectError> {
        self.platform.process(pid)
    }

    /// Forgets discovered power sources.
    pub fn reset_power(&mut self) {
        self.power.reset();
    }

    /// Takes one host-wide sample.
    ///
    /// Blocks for one sampling window: CPU and network counters are sampled
    /// on two scoped threads over the same window.
    pub fn sample_system(&mut self) -> SystemSample {
        let total_start = Instant::now();
        let mut timing = CollectorTiming::default();

        let platform = &self.platform;
        let (cpu_sampler, net_sampler) = (self.cpu, self.network);

        let start = Instant::now();
        let (cpu, network) = thread::scope(|s| {
            let net = s.spawn(|| net_sampler.sample(platform));
            let cpu = cpu_sampler.sample(platform);
            // A panic in the sampler thread resurfaces here.
            let network = match net.join() {
                Ok(network) => network,
                Err(panic) => std::panic::resume_unwind(panic),
            };
            (cpu, network)
        });
        timing.windows = start.elapsed();

        let start = Instant::now();
        let memory = self.platform.memory();
        timing.memory = start.elapsed();

        let start = Instant::now();
        let power = self.power.sample(&self.platform);
        let temperature = self.power.temperature(&self.platform);
        timing.power = start.elapsed();

        timing.total = total_start.elapsed();
        self.last_timing = Some(timing);

        SystemSample {
            timestamp: Utc::now().timestamp(),
            cpu_count: cpu.cores.len(),
            cpu_percent: cpu.percent,
            cores: cpu.cores,
            memory,
            temperature,
            power,
            network,
        }
    }
}
