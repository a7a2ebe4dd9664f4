//! FreeBSD adapter: `kinfo_proc` per pid plus named sysctls.

use std::io;
use std::time::Instant;

use libc::{c_int, c_long, c_uint, c_ulong};
use tracing::{debug, warn};

use super::raw::Pod;
use super::{
    deci_kelvin_to_celsius, fixed_c_str, ifmib, micros, online_cores, pages_to_kb, raw,
    ticks_from_states,
};
use crate::collector::error::CollectError;
use crate::collector::platform::{CpuTicks, NetCounters, Platform};
use crate::collector::state::ProcessState;
use crate::model::{MemoryUsage, PowerStatus, ProcessSnapshot, bounded_command};
use crate::util;

/// Used when `kern.pid_max` cannot be read.
pub const DEFAULT_PID_MAX: u32 = 99_999;

/// `CPUSTATES`: user, nice, sys, intr, idle.
const CPU_STATES: usize = 5;
const CP_IDLE: usize = 4;

/// `NOCPU` in `ki_oncpu`.
const NO_CPU: c_int = -1;

/// `struct xswdev` from `<vm/vm_param.h>`.
#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
struct XswDev {
    xsw_version: c_uint,
    xsw_dev: u64,
    xsw_flags: c_int,
    xsw_nblks: c_int,
    xsw_used: c_int,
}

// SAFETY: repr(C) integers.
unsafe impl Pod for XswDev {}
// SAFETY: integers, char arrays, timevals and raw pointers, no enums.
unsafe impl Pod for libc::kinfo_proc {}

/// ACPI battery and AC line MIBs, each absent if the machine has none.
#[derive(Debug, Default)]
pub struct AcpiPower {
    battery_life: Option<Vec<c_int>>,
    acline: Option<Vec<c_int>>,
}

/// FreeBSD adapter.
pub struct FreeBsd {
    /// `kern.proc.pid`, without the trailing pid.
    proc_mib: Vec<c_int>,
    pid_max: u32,
    page_size: u64,
}

impl FreeBsd {
    /// Resolves the process MIB and `kern.pid_max`.
    pub fn new() -> Result<Self, CollectError> {
        let proc_mib = raw::name_to_mib("kern.proc.pid")?;
        let pid_max = match raw::by_name::<c_int>("kern.pid_max") {
            Ok(max) if max > 0 => max as u32,
            Ok(_) | Err(_) => DEFAULT_PID_MAX,
        };
        Ok(Self {
            proc_mib,
            pid_max,
            page_size: util::page_size(),
        })
    }

    fn decode(&self, kp: &libc::kinfo_proc) -> ProcessSnapshot {
        let pid = kp.ki_pid as u32;
        let cpu_id = if kp.ki_oncpu != NO_CPU {
            kp.ki_oncpu
        } else {
            kp.ki_lastcpu
        };
        let rusage = &kp.ki_rusage;

        ProcessSnapshot {
            pid,
            uid: kp.ki_ruid,
            command: bounded_command(&fixed_c_str(&kp.ki_comm), pid),
            cpu_id,
            cpu_time: micros(rusage.ru_utime.tv_sec as i64, rusage.ru_utime.tv_usec as i64)
                .saturating_add(micros(
                    rusage.ru_stime.tv_sec as i64,
                    rusage.ru_stime.tv_usec as i64,
                )),
            priority: kp.ki_pri.pri_level as i32,
            nice: kp.ki_nice as i32,
            thread_count: kp.ki_numthreads.max(0) as u32,
            mem_virtual_size: kp.ki_size as u64,
            mem_resident_size: (kp.ki_rssize.max(0) as u64).saturating_mul(self.page_size),
            state: ProcessState::from_freebsd_stat(kp.ki_stat as i32),
            cpu_usage: 0.0,
        }
    }

    fn swap_used_kb(&self) -> io::Result<u64> {
        let mut mib = raw::name_to_mib("vm.swap_info")?;
        mib.push(0);
        let last = mib.len() - 1;

        let mut pages = 0u64;
        for dev in 0.. {
            mib[last] = dev;
            match raw::read::<XswDev>(&mib) {
                Ok(xsw) => pages += xsw.xsw_used.max(0) as u64,
                // ENOENT past the last device
                Err(_) => break,
            }
        }
        Ok(pages_to_kb(pages, self.page_size))
    }
}

/// Reads one `vm.stats.vm.*` page counter.
fn vm_pages(name: &str) -> io::Result<u64> {
    raw::by_name::<c_uint>(name).map(u64::from)
}

/// Logs and zeroes one unreadable memory field.
fn or_zero(value: io::Result<u64>, field: &'static str) -> u64 {
    value.unwrap_or_else(|e| {
        debug!(field, error = %e, "memory field unavailable");
        0
    })
}

impl Platform for FreeBsd {
    type PowerHandles = AcpiPower;

    fn processes(&self) -> Vec<ProcessSnapshot> {
        let start = Instant::now();
        let processes: Vec<ProcessSnapshot> = (1..=self.pid_max)
            .filter_map(|pid| self.process(pid).ok())
            .collect();
        debug!(
            pid_max = self.pid_max,
            count = processes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "kinfo_proc scan finished"
        );
        processes
    }

    fn process(&self, pid: u32) -> Result<ProcessSnapshot, CollectError> {
        let mut mib = self.proc_mib.clone();
        mib.push(pid as c_int);

        match raw::read::<libc::kinfo_proc>(&mib) {
            Ok(kp) => Ok(self.decode(&kp)),
            Err(e)
                if e.kind() == io::ErrorKind::NotFound
                    || e.raw_os_error() == Some(libc::ESRCH) =>
            {
                Err(CollectError::ProcessGone(pid))
            }
            Err(e) => Err(CollectError::Io(e)),
        }
    }

    fn cpu_ticks(&self) -> Result<Vec<CpuTicks>, CollectError> {
        let states: Vec<c_long> = raw::vec_by_name("kern.cp_times")?;
        let states: Vec<u64> = states.into_iter().map(|v| v.max(0) as u64).collect();
        Ok(online_cores(ticks_from_states(&states, CPU_STATES, CP_IDLE)))
    }

    fn memory(&self) -> MemoryUsage {
        let page = self.page_size;
        let page_count = or_zero(vm_pages("vm.stats.vm.v_page_count"), "v_page_count");
        let free = or_zero(vm_pages("vm.stats.vm.v_free_count"), "v_free_count");
        let inactive = or_zero(vm_pages("vm.stats.vm.v_inactive_count"), "v_inactive_count");
        let active = or_zero(vm_pages("vm.stats.vm.v_active_count"), "v_active_count");
        let wired = or_zero(vm_pages("vm.stats.vm.v_wire_count"), "v_wire_count");

        MemoryUsage {
            total: or_zero(
                raw::by_name::<c_ulong>("hw.physmem").map(|b| b as u64 >> 10),
                "hw.physmem",
            ),
            used: pages_to_kb(
                page_count.saturating_sub(free).saturating_sub(inactive),
                page,
            ),
            cached: pages_to_kb(active, page),
            buffered: or_zero(
                raw::by_name::<c_long>("vfs.bufspace").map(|b| b.max(0) as u64 >> 10),
                "vfs.bufspace",
            ),
            shared: pages_to_kb(wired, page),
            swap_total: or_zero(
                raw::by_name::<u64>("vm.swap_total").map(|b| b >> 10),
                "vm.swap_total",
            ),
            swap_used: or_zero(self.swap_used_kb(), "vm.swap_info"),
        }
    }

    fn net_counters(&self) -> Result<NetCounters, CollectError> {
        ifmib::net_counters()
    }

    fn discover_power(&self) -> AcpiPower {
        let power = AcpiPower {
            battery_life: raw::name_to_mib("hw.acpi.battery.life").ok(),
            acline: raw::name_to_mib("hw.acpi.acline").ok(),
        };
        debug!(
            battery = power.battery_life.is_some(),
            acline = power.acline.is_some(),
            "acpi power sources"
        );
        power
    }

    fn read_power(&self, handles: &AcpiPower) -> PowerStatus {
        let mut status = PowerStatus::default();

        if let Some(mib) = &handles.battery_life {
            status.battery_count = 1;
            match raw::read::<c_int>(mib) {
                // -1 while the state is unknown
                Ok(life) => status.battery_percent = life.clamp(0, 100) as u8,
                Err(e) => warn!(error = %e, "failed to read hw.acpi.battery.life"),
            }
        }
        if let Some(mib) = &handles.acline {
            status.has_ac = matches!(raw::read::<c_int>(mib), Ok(v) if v != 0);
        }
        status
    }

    fn temperature(&self) -> Option<i32> {
        raw::by_name::<c_int>("hw.acpi.thermal.tz0.temperature")
            .ok()
            .map(|dk| deci_kelvin_to_celsius(dk as i64))
    }

    fn cpu_time_per_second(&self) -> u64 {
        1_000_000
    }
}
