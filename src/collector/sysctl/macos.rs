//! macOS adapter: `proc_pidinfo` through libproc, Mach host statistics and
//! a few sysctls.

#![allow(deprecated)] // libc marks its Mach bindings deprecated in favour of mach2

use std::io;
use std::mem::{self, MaybeUninit};
use std::ptr;
use std::slice;
use std::time::Instant;

use libproc::libproc::bsd_info::BSDInfo;
use libproc::libproc::proc_pid::pidinfo;
use libproc::libproc::task_info::TaskInfo;
use libproc::libproc::work_queue_info::WorkQueueInfo;
use libproc::processes::{ProcFilter, pids_by_type};
use tracing::{debug, warn};

use super::raw::Pod;
use super::{fixed_c_str, ifmib, pages_to_kb, raw, ticks_from_states};
use crate::collector::error::CollectError;
use crate::collector::platform::{CpuTicks, NetCounters, Platform};
use crate::collector::state::ProcessState;
use crate::model::{MemoryUsage, PowerStatus, ProcessSnapshot, bounded_command};
use crate::util;

/// `CPU_STATE_MAX`: user, system, idle, nice.
const CPU_STATES: usize = 4;
const CPU_STATE_IDLE: usize = 2;

// SAFETY: three u64 totals, a u32 page size and a boolean_t integer.
unsafe impl Pod for libc::xsw_usage {}

/// macOS adapter.
pub struct Darwin {
    page_size: u64,
    /// Mach absolute time to nanoseconds.
    timebase: (u32, u32),
}

impl Default for Darwin {
    fn default() -> Self {
        Self::new()
    }
}

impl Darwin {
    pub fn new() -> Self {
        let mut info = libc::mach_timebase_info_data_t { numer: 0, denom: 0 };
        // SAFETY: info is a valid out-pointer.
        let kr = unsafe { libc::mach_timebase_info(&mut info) };
        let timebase = if kr == libc::KERN_SUCCESS && info.denom != 0 {
            (info.numer, info.denom)
        } else {
            (1, 1)
        };
        Self {
            page_size: util::page_size(),
            timebase,
        }
    }

    /// Task times are Mach absolute time; `cpu_time` is microseconds.
    fn mach_to_micros(&self, ticks: u64) -> u64 {
        let (numer, denom) = self.timebase;
        let nanos = ticks as u128 * numer as u128 / denom as u128;
        (nanos / 1_000).min(u64::MAX as u128) as u64
    }

    fn decode(
        &self,
        bsd: &BSDInfo,
        task: &TaskInfo,
        wq: Option<&WorkQueueInfo>,
    ) -> ProcessSnapshot {
        let pid = bsd.pbi_pid;
        let name = fixed_c_str(&bsd.pbi_name);
        let name = if name.is_empty() {
            fixed_c_str(&bsd.pbi_comm)
        } else {
            name
        };
        let threads = task.pti_threadnum.max(0) as u32;
        let wq_threads = wq.map(|wq| wq.pwq_nthreads).unwrap_or(0);

        ProcessSnapshot {
            pid,
            uid: bsd.pbi_ruid,
            command: bounded_command(&name, pid),
            cpu_id: -1,
            cpu_time: self
                .mach_to_micros(task.pti_total_user)
                .saturating_add(self.mach_to_micros(task.pti_total_system)),
            priority: task.pti_priority,
            nice: bsd.pbi_nice,
            thread_count: threads.max(wq_threads),
            mem_virtual_size: task.pti_virtual_size,
            mem_resident_size: task.pti_resident_size,
            state: ProcessState::from_darwin_status(bsd.pbi_status),
            cpu_usage: 0.0,
        }
    }
}

/// Whether `pid` names a live process, permitted to signal or not.
fn process_exists(pid: u32) -> bool {
    // kill(2) treats 0 and negative pids as process groups.
    if pid == 0 || pid > i32::MAX as u32 {
        return false;
    }
    // SAFETY: signal 0 only performs the existence and permission checks.
    if unsafe { libc::kill(pid as libc::pid_t, 0) } == 0 {
        return true;
    }
    io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
}

/// libproc reports failures as text only; ESRCH from `kill(pid, 0)` decides
/// whether the process is gone or just unreadable (EPERM as non-root).
fn pidinfo_error(pid: u32, message: String) -> CollectError {
    if process_exists(pid) {
        CollectError::Io(io::Error::other(format!("proc_pidinfo({pid}): {message}")))
    } else {
        CollectError::ProcessGone(pid)
    }
}

impl Platform for Darwin {
    type PowerHandles = ();

    fn processes(&self) -> Vec<ProcessSnapshot> {
        let start = Instant::now();
        let pids = match pids_by_type(ProcFilter::All) {
            Ok(pids) => pids,
            Err(e) => {
                warn!(error = %e, "proc_listpids failed");
                return Vec::new();
            }
        };

        let processes: Vec<ProcessSnapshot> = pids
            .into_iter()
            .filter(|&pid| pid > 0)
            .filter_map(|pid| match self.process(pid) {
                Ok(process) => Some(process),
                Err(e) => {
                    debug!(pid, error = %e, "skipping process");
                    None
                }
            })
            .collect();
        debug!(
            count = processes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "proc_pidinfo scan finished"
        );
        processes
    }

    fn process(&self, pid: u32) -> Result<ProcessSnapshot, CollectError> {
        let ipid = pid as i32;
        let bsd = pidinfo::<BSDInfo>(ipid, 0).map_err(|e| pidinfo_error(pid, e))?;
        let task = pidinfo::<TaskInfo>(ipid, 0).map_err(|e| pidinfo_error(pid, e))?;
        let wq = pidinfo::<WorkQueueInfo>(ipid, 0).ok();
        Ok(self.decode(&bsd, &task, wq.as_ref()))
    }

    fn cpu_ticks(&self) -> Result<Vec<CpuTicks>, CollectError> {
        let mut cpu_count: libc::natural_t = 0;
        let mut info: libc::processor_info_array_t = ptr::null_mut();
        let mut info_count: libc::mach_msg_type_number_t = 0;

        // SAFETY: all out-pointers are valid; the kernel allocates `info`.
        let kr = unsafe {
            libc::host_processor_info(
                libc::mach_host_self(),
                libc::PROCESSOR_CPU_LOAD_INFO,
                &mut cpu_count,
                &mut info,
                &mut info_count,
            )
        };
        if kr != libc::KERN_SUCCESS || info.is_null() {
            return Err(CollectError::Io(io::Error::other(format!(
                "host_processor_info failed: {kr}"
            ))));
        }

        // SAFETY: the kernel returned info_count integers at info.
        let states: Vec<u64> = unsafe { slice::from_raw_parts(info, info_count as usize) }
            .iter()
            .map(|&v| v as u32 as u64)
            .collect();

        // SAFETY: info was allocated by host_processor_info in our task.
        unsafe {
            let size = info_count as usize * mem::size_of::<libc::integer_t>();
            libc::vm_deallocate(
                libc::mach_task_self(),
                info as libc::vm_address_t,
                size as libc::vm_size_t,
            );
        }

        let mut ticks = ticks_from_states(&states, CPU_STATES, CPU_STATE_IDLE);
        ticks.truncate(cpu_count as usize);
        Ok(ticks)
    }

    fn memory(&self) -> MemoryUsage {
        let mut usage = MemoryUsage {
            total: raw::by_name::<u64>("hw.memsize")
                .map(|b| b >> 10)
                .unwrap_or_else(|e| {
                    debug!(error = %e, "hw.memsize unavailable");
                    0
                }),
            ..Default::default()
        };

        let mut stats = MaybeUninit::<libc::vm_statistics64>::zeroed();
        let mut count = libc::HOST_VM_INFO64_COUNT;
        // SAFETY: stats holds HOST_VM_INFO64_COUNT integers.
        let kr = unsafe {
            libc::host_statistics64(
                libc::mach_host_self(),
                libc::HOST_VM_INFO64,
                stats.as_mut_ptr().cast(),
                &mut count,
            )
        };
        if kr == libc::KERN_SUCCESS {
            // SAFETY: zero-initialised and filled by the kernel.
            let stats = unsafe { stats.assume_init() };
            let page = self.page_size;
            let active = stats.active_count as u64;
            let inactive = stats.inactive_count as u64;
            let wired = stats.wire_count as u64;

            usage.used = pages_to_kb(active + inactive + wired, page);
            usage.cached = pages_to_kb(active, page);
            usage.buffered = pages_to_kb(inactive, page);
            usage.shared = pages_to_kb(wired, page);
        } else {
            debug!(kr, "host_statistics64 failed");
        }

        match raw::by_name::<libc::xsw_usage>("vm.swapusage") {
            Ok(swap) => {
                usage.swap_total = swap.xsu_total >> 10;
                usage.swap_used = swap.xsu_used >> 10;
            }
            Err(e) => debug!(error = %e, "vm.swapusage unavailable"),
        }
        usage
    }

    fn net_counters(&self) -> Result<NetCounters, CollectError> {
        ifmib::net_counters()
    }

    fn discover_power(&self) {}

    fn read_power(&self, _handles: &()) -> PowerStatus {
        PowerStatus::default()
    }

    fn temperature(&self) -> Option<i32> {
        None
    }

    fn cpu_time_per_second(&self) -> u64 {
        1_000_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mach_to_micros() {
        let darwin = Darwin {
            page_size: 16384,
            timebase: (125, 3),
        };
        // 24 ticks * 125/3 = 1000 ns
        assert_eq!(darwin.mach_to_micros(24_000), 1_000);

        let intel = Darwin {
            page_size: 4096,
            timebase: (1, 1),
        };
        assert_eq!(intel.mach_to_micros(5_000_000), 5_000);
    }

    #[test]
    fn test_own_process_is_visible() {
        let darwin = Darwin::new();
        let me = darwin.process(std::process::id()).unwrap();
        assert_eq!(me.pid, std::process::id());
        assert!(me.mem_resident_size > 0);
    }

    #[test]
    fn test_missing_process_is_gone() {
        let darwin = Darwin::new();
        assert!(matches!(
            darwin.process(i32::MAX as u32),
            Err(CollectError::ProcessGone(_))
        ));
        assert!(!process_exists(0));
        assert!(!process_exists(u32::MAX));
    }

    #[test]
    fn test_unreadable_process_is_not_gone() {
        // launchd belongs to root: readable as root, EPERM otherwise.
        assert!(process_exists(1));
        match Darwin::new().process(1) {
            Ok(launchd) => assert_eq!(launchd.pid, 1),
            Err(e) => assert!(matches!(e, CollectError::Io(_)), "{e}"),
        }
        assert!(matches!(
            pidinfo_error(1, "Operation not permitted".to_string()),
            CollectError::Io(_)
        ));
    }
}
