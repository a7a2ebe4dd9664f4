//! A [`Platform`] that replays pre-recorded readings.
//!
//! Drives the samplers and the collector through exact counter sequences,
//! which a live kernel cannot be made to produce.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::collector::error::CollectError;
use crate::collector::platform::{CpuTicks, NetCounters, Platform};
use crate::model::{MemoryUsage, PowerStatus, ProcessSnapshot};

type Script<T> = Mutex<VecDeque<Result<T, CollectError>>>;

/// Scripted platform for tests. Readings are consumed in order; an exhausted
/// script reports the category as unsupported.
#[derive(Default)]
pub struct ScriptedPlatform {
    processes: Vec<ProcessSnapshot>,
    cpu: Script<Vec<CpuTicks>>,
    net: Script<NetCounters>,
    memory: MemoryUsage,
    power: PowerStatus,
    temperature: Option<i32>,
    discoveries: AtomicUsize,
}

impl ScriptedPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_processes(mut self, processes: Vec<ProcessSnapshot>) -> Self {
        self.processes = processes;
        self
    }

    pub fn with_cpu_readings(self, readings: Vec<Result<Vec<CpuTicks>, CollectError>>) -> Self {
        *lock(&self.cpu) = readings.into();
        self
    }

    pub fn with_net_readings(self, readings: Vec<Result<NetCounters, CollectError>>) -> Self {
        *lock(&self.net) = readings.into();
        self
    }

    pub fn with_memory(mut self, memory: MemoryUsage) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_power(mut self, power: PowerStatus) -> Self {
        self.power = power;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<i32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// How many times power discovery ran.
    pub fn discoveries(&self) -> usize {
        self.discoveries.load(Ordering::SeqCst)
    }
}

fn lock<T>(script: &Script<T>) -> std::sync::MutexGuard<'_, VecDeque<Result<T, CollectError>>> {
    script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn next<T>(script: &Script<T>, what: &'static str) -> Result<T, CollectError> {
    lock(script)
        .pop_front()
        .unwrap_or(Err(CollectError::Unsupported(what)))
}

impl Platform for ScriptedPlatform {
    /// Discovery generation, so tests can tell cached handles from fresh ones.
    type PowerHandles = usize;

    fn processes(&self) -> Vec<ProcessSnapshot> {
        self.processes.clone()
    }

    fn process(&self, pid: u32) -> Result<ProcessSnapshot, CollectError> {
        self.processes
            .iter()
            .find(|p| p.pid == pid)
            .cloned()
            .ok_or(CollectError::ProcessGone(pid))
    }

    fn cpu_ticks(&self) -> Result<Vec<CpuTicks>, CollectError> {
        next(&self.cpu, "cpu ticks")
    }

    fn memory(&self) -> MemoryUsage {
        self.memory.clone()
    }

    fn net_counters(&self) -> Result<NetCounters, CollectError> {
        next(&self.net, "net counters")
    }

    fn discover_power(&self) -> usize {
        self.discoveries.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn read_power(&self, _handles: &usize) -> PowerStatus {
        self.power.clone()
    }

    fn temperature(&self) -> Option<i32> {
        self.temperature
    }

    fn cpu_time_per_second(&self) -> u64 {
        100
    }
}
