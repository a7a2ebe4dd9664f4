//! OpenBSD adapter: `KERN_PROC` table snapshots, `hw.sensors` and
//! per-interface ioctls.

use std::collections::{HashMap, HashSet};
use std::ffi::CStr;
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::ptr;
use std::time::Instant;

use libc::{c_char, c_int, c_void};
use tracing::{debug, warn};

use super::raw::Pod;
use super::{
    blocks_to_kb, core_ticks, fixed_c_str, micro_kelvin_to_celsius, micros, pages_to_kb, raw,
    sensors, ticks_from_states,
};
use crate::collector::error::CollectError;
use crate::collector::platform::{CpuTicks, NetCounters, Platform};
use crate::collector::power::battery_percent;
use crate::collector::state::ProcessState;
use crate::model::{MemoryUsage, PowerStatus, ProcessSnapshot, bounded_command};

const CTL_KERN: c_int = 1;
const CTL_VM: c_int = 2;
const CTL_HW: c_int = 6;
const CTL_VFS: c_int = 10;

const KERN_PROC: c_int = 66;
const KERN_PROC_ALL: c_int = 0;
const KERN_PROC_PID: c_int = 1;
const KERN_PROC_SHOW_THREADS: c_int = 0x4000_0000;
const KERN_CPTIME: c_int = 40;
const KERN_CPTIME2: c_int = 71;

const HW_NCPU: c_int = 3;
const HW_SENSORS: c_int = 11;
const HW_PHYSMEM64: c_int = 19;

const VM_UVMEXP: c_int = 4;
const VFS_GENERIC: c_int = 0;
const VFS_BCACHESTAT: c_int = 3;

/// `CPUSTATES`: user, nice, sys, spin, intr, idle.
const CPU_STATES: usize = 6;
const CP_IDLE: usize = 5;

/// `p_nice` is stored offset by `NZERO`.
const NZERO: i32 = 20;

const SENSOR_TEMP: c_int = 0;
const SENSOR_INDICATOR: c_int = 9;
const SENSOR_FINVALID: c_int = 0x0001;

const SWAP_NSWAP: c_int = 3;
const SWAP_STATS: c_int = 4;
const SWF_ENABLE: c_int = 0x0002;

const SIOCGIFDATA: libc::c_ulong = 0xc020_691b;
const IFT_ETHER: u8 = 0x06;
const IFT_FASTETHER: u8 = 0x3e;
const IFT_GIGABITETHERNET: u8 = 0x75;
const IFT_IEEE80211: u8 = 0x47;

/// Highest `acpibatN` looked at during discovery.
const MAX_BATTERIES: usize = 5;

/// Leading fields of `struct uvmexp`; the padding covers the rest.
#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
struct UvmExp {
    pagesize: c_int,
    pagemask: c_int,
    pageshift: c_int,
    npages: c_int,
    free: c_int,
    active: c_int,
    inactive: c_int,
    paging: c_int,
    wired: c_int,
    rest: [c_int; 256],
}

/// Leading fields of `struct bcachestats`.
#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
struct BcacheStats {
    numbufs: i64,
    numbufpages: i64,
    rest: [i64; 64],
}

/// `struct sensordev`; `maxnumt` is oversized across releases.
#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
struct SensorDev {
    num: c_int,
    xname: [c_char; 16],
    maxnumt: [c_int; 32],
    sensors_count: c_int,
}

/// `struct sensor`.
#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
struct Sensor {
    desc: [c_char; 32],
    tv_sec: i64,
    tv_usec: i64,
    value: i64,
    kind: c_int,
    status: c_int,
    numt: c_int,
    flags: c_int,
}

/// `struct swapent`.
#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
struct SwapEnt {
    se_dev: libc::dev_t,
    se_flags: c_int,
    se_nblks: c_int,
    se_inuse: c_int,
    se_priority: c_int,
    se_path: [c_char; libc::PATH_MAX as usize],
}

/// `struct ifreq` with the `ifr_data` member of its union.
#[repr(C)]
struct IfReqData {
    ifr_name: [c_char; libc::IFNAMSIZ],
    ifr_data: *mut c_void,
    _pad: [u8; 8],
}

// SAFETY: repr(C) records of integers and char arrays.
unsafe impl Pod for UvmExp {}
unsafe impl Pod for BcacheStats {}
unsafe impl Pod for SensorDev {}
unsafe impl Pod for Sensor {}

unsafe extern "C" {
    fn swapctl(cmd: c_int, arg: *const c_void, misc: c_int) -> c_int;
}

/// Sensor device numbers found by power discovery.
#[derive(Debug, Default)]
pub struct SensorPower {
    batteries: Vec<c_int>,
    ac: Option<c_int>,
}

/// OpenBSD adapter.
#[derive(Debug, Default)]
pub struct OpenBsd;

impl OpenBsd {
    pub fn new() -> Self {
        Self
    }
}

/// Outcome of looking at one `hw.sensors.N` slot.
enum SensorSlot {
    Device(SensorDev),
    /// ENXIO: hole in the numbering.
    Empty,
    /// ENOENT: past the last device.
    End,
}

fn sensor_device(devn: c_int) -> io::Result<SensorSlot> {
    match raw::read::<SensorDev>(&[CTL_HW, HW_SENSORS, devn]) {
        Ok(dev) => Ok(SensorSlot::Device(dev)),
        Err(e) if e.raw_os_error() == Some(libc::ENXIO) => Ok(SensorSlot::Empty),
        Err(e) if e.raw_os_error() == Some(libc::ENOENT) => Ok(SensorSlot::End),
        Err(e) => Err(e),
    }
}

/// Walks `hw.sensors`, calling `visit` with each device number and name.
fn for_each_sensor_device(mut visit: impl FnMut(c_int, &str, &SensorDev) -> bool) {
    for devn in 0.. {
        match sensor_device(devn) {
            Ok(SensorSlot::Device(dev)) => {
                if !visit(devn, &fixed_c_str(&dev.xname), &dev) {
                    return;
                }
            }
            Ok(SensorSlot::Empty) => continue,
            Ok(SensorSlot::End) => return,
            Err(e) => {
                debug!(devn, error = %e, "sensor walk stopped");
                return;
            }
        }
    }
}

fn sensor_value(devn: c_int, kind: c_int, index: c_int) -> Option<i64> {
    raw::read::<Sensor>(&[CTL_HW, HW_SENSORS, devn, kind, index])
        .ok()
        .map(|s| s.value)
}

/// `(remaining, full)` of one battery, in whichever unit the firmware fills.
fn battery_charge(devn: c_int) -> (i64, i64) {
    sensors::battery_charge(|kind, index| sensor_value(devn, kind, index))
}

/// Thread records of one `KERN_PROC` request counted by owning pid.
fn count_threads(threads: &[libc::kinfo_proc]) -> HashMap<u32, u32> {
    let mut counts = HashMap::new();
    for kp in threads.iter().filter(|kp| kp.p_tid != -1) {
        *counts.entry(kp.p_pid as u32).or_insert(0) += 1;
    }
    counts
}

/// Reads a `KERN_PROC` table. The element size and count are part of the MIB.
fn proc_table(op: c_int, arg: c_int) -> io::Result<Vec<libc::kinfo_proc>> {
    let elem = mem::size_of::<libc::kinfo_proc>();
    let mut mib = [CTL_KERN, KERN_PROC, op, arg, elem as c_int, 0];

    let mut last = io::Error::from_raw_os_error(libc::ENOMEM);
    for _ in 0..4 {
        mib[5] = 0;
        let mut len = 0usize;
        // SAFETY: a null buffer only queries the size.
        unsafe { raw::sysctl_into(&mib, ptr::null_mut(), &mut len)? };

        let count = len / elem + len / elem / 8 + 1;
        mib[5] = count as c_int;
        let mut table: Vec<libc::kinfo_proc> = Vec::with_capacity(count);
        let mut len = count * elem;
        // SAFETY: table has count * elem writable bytes.
        match unsafe { raw::sysctl_into(&mib, table.as_mut_ptr().cast(), &mut len) } {
            Ok(()) => {
                // SAFETY: the kernel initialised len bytes of plain old data.
                unsafe { table.set_len(len / elem) };
                return Ok(table);
            }
            Err(e) if e.raw_os_error() == Some(libc::ENOMEM) => last = e,
            Err(e) => return Err(e),
        }
    }
    Err(last)
}

fn decode(kp: &libc::kinfo_proc, threads: u32, page_size: u64) -> ProcessSnapshot {
    let pid = kp.p_pid as u32;
    let vm_pages = (kp.p_vm_tsize.max(0) as u64)
        + (kp.p_vm_dsize.max(0) as u64)
        + (kp.p_vm_ssize.max(0) as u64);

    ProcessSnapshot {
        pid,
        uid: kp.p_ruid,
        command: bounded_command(&fixed_c_str(&kp.p_comm), pid),
        // KI_NOCPU (all ones) becomes -1
        cpu_id: kp.p_cpuid as i32,
        cpu_time: micros(kp.p_uutime_sec as i64, kp.p_uutime_usec as i64)
            .saturating_add(micros(kp.p_ustime_sec as i64, kp.p_ustime_usec as i64)),
        priority: kp.p_priority as i32,
        nice: kp.p_nice as i32 - NZERO,
        thread_count: threads,
        mem_virtual_size: vm_pages.saturating_mul(page_size),
        mem_resident_size: (kp.p_vm_rssize.max(0) as u64).saturating_mul(page_size),
        state: ProcessState::from_openbsd_stat(kp.p_stat as i32),
        cpu_usage: 0.0,
    }
}

fn uvmexp() -> io::Result<UvmExp> {
    raw::read(&[CTL_VM, VM_UVMEXP])
}

fn swap_kb() -> io::Result<(u64, u64)> {
    // SAFETY: SWAP_NSWAP takes no buffer.
    let nswap = unsafe { swapctl(SWAP_NSWAP, ptr::null(), 0) };
    if nswap < 0 {
        return Err(io::Error::last_os_error());
    }
    if nswap == 0 {
        return Ok((0, 0));
    }

    let mut entries: Vec<SwapEnt> = Vec::with_capacity(nswap as usize);
    // SAFETY: entries has room for nswap records.
    let filled = unsafe { swapctl(SWAP_STATS, entries.as_mut_ptr().cast(), nswap) };
    if filled < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: the kernel wrote `filled` records.
    unsafe { entries.set_len((filled as usize).min(nswap as usize)) };

    let (total, used) = entries
        .iter()
        .filter(|se| se.se_flags & SWF_ENABLE != 0)
        .fold((0u64, 0u64), |(total, used), se| {
            (
                total + se.se_nblks.max(0) as u64,
                used + se.se_inuse.max(0) as u64,
            )
        });
    Ok((blocks_to_kb(total), blocks_to_kb(used)))
}

/// Interface types whose traffic is counted.
fn is_counted_type(ifi_type: u8) -> bool {
    matches!(
        ifi_type,
        IFT_ETHER | IFT_FASTETHER | IFT_GIGABITETHERNET | IFT_IEEE80211
    )
}

/// Distinct interface names from `getifaddrs`, in first-seen order.
fn interface_names() -> io::Result<Vec<Vec<c_char>>> {
    let mut addrs: *mut libc::ifaddrs = ptr::null_mut();
    // SAFETY: addrs is a valid out-pointer.
    if unsafe { libc::getifaddrs(&mut addrs) } == -1 {
        return Err(io::Error::last_os_error());
    }

    let mut seen = HashSet::new();
    let mut names = Vec::new();
    let mut cursor = addrs;
    while !cursor.is_null() {
        // SAFETY: cursor walks the list returned by getifaddrs.
        let ifa = unsafe { &*cursor };
        if !ifa.ifa_name.is_null() {
            // SAFETY: ifa_name is NUL-terminated.
            let name = unsafe { CStr::from_ptr(ifa.ifa_name) };
            if seen.insert(name.to_bytes().to_vec()) {
                names.push(name.to_bytes().iter().map(|&b| b as c_char).collect());
            }
        }
        cursor = ifa.ifa_next;
    }
    // SAFETY: addrs came from getifaddrs and is freed once.
    unsafe { libc::freeifaddrs(addrs) };
    Ok(names)
}

impl Platform for OpenBsd {
    type PowerHandles = SensorPower;

    fn processes(&self) -> Vec<ProcessSnapshot> {
        let start = Instant::now();
        let table = match proc_table(KERN_PROC_ALL, 0) {
            Ok(table) => table,
            Err(e) => {
                warn!(error = %e, "KERN_PROC_ALL failed");
                return Vec::new();
            }
        };
        let threads = match proc_table(KERN_PROC_ALL | KERN_PROC_SHOW_THREADS, 0) {
            Ok(threads) => count_threads(&threads),
            Err(e) => {
                debug!(error = %e, "thread table unavailable");
                HashMap::new()
            }
        };

        let page_size = crate::util::page_size();
        let processes: Vec<ProcessSnapshot> = table
            .iter()
            .filter(|kp| kp.p_pid > 0)
            .map(|kp| {
                let count = threads.get(&(kp.p_pid as u32)).copied().unwrap_or(0);
                decode(kp, count, page_size)
            })
            .collect();
        debug!(
            count = processes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "process table read"
        );
        processes
    }

    fn process(&self, pid: u32) -> Result<ProcessSnapshot, CollectError> {
        let table = proc_table(KERN_PROC_PID, pid as c_int)?;
        let kp = table
            .iter()
            .find(|kp| kp.p_pid as u32 == pid)
            .ok_or(CollectError::ProcessGone(pid))?;
        let threads = proc_table(KERN_PROC_PID | KERN_PROC_SHOW_THREADS, pid as c_int)
            .map(|t| count_threads(&t).get(&pid).copied().unwrap_or(0))
            .unwrap_or(0);
        Ok(decode(kp, threads, crate::util::page_size()))
    }

    fn cpu_ticks(&self) -> Result<Vec<CpuTicks>, CollectError> {
        let ncpu: c_int = raw::read(&[CTL_HW, HW_NCPU])?;

        if ncpu <= 1 {
            let states: [libc::c_long; CPU_STATES] = raw::read(&[CTL_KERN, KERN_CPTIME])?;
            let states: Vec<u64> = states.iter().map(|&v| v.max(0) as u64).collect();
            return Ok(ticks_from_states(&states, CPU_STATES, CP_IDLE));
        }

        let mut ticks = Vec::with_capacity(ncpu as usize);
        for cpu in 0..ncpu {
            match raw::read::<[u64; CPU_STATES]>(&[CTL_KERN, KERN_CPTIME2, cpu]) {
                Ok(states) => ticks.push(core_ticks(cpu as u32, &states, CP_IDLE)),
                // Offline cores, e.g. SMT siblings while hw.smt=0.
                Err(e) if e.raw_os_error() == Some(libc::ENODEV) => {
                    debug!(cpu, "core offline")
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(ticks)
    }

    fn memory(&self) -> MemoryUsage {
        let mut usage = MemoryUsage::default();

        match raw::read::<i64>(&[CTL_HW, HW_PHYSMEM64]) {
            Ok(bytes) => usage.total = bytes.max(0) as u64 >> 10,
            Err(e) => debug!(error = %e, "hw.physmem64 unavailable"),
        }

        match uvmexp() {
            Ok(uvm) => {
                let page = uvm.pagesize.max(0) as u64;
                usage.used = pages_to_kb(uvm.active.max(0) as u64, page);
                usage.buffered = pages_to_kb((uvm.npages - uvm.free).max(0) as u64, page);
                usage.shared = pages_to_kb(uvm.wired.max(0) as u64, page);

                match raw::read::<BcacheStats>(&[CTL_VFS, VFS_GENERIC, VFS_BCACHESTAT]) {
                    Ok(bc) => usage.cached = pages_to_kb(bc.numbufpages.max(0) as u64, page),
                    Err(e) => debug!(error = %e, "bcachestats unavailable"),
                }
            }
            Err(e) => debug!(error = %e, "vm.uvmexp unavailable"),
        }

        match swap_kb() {
            Ok((total, used)) => {
                usage.swap_total = total;
                usage.swap_used = used;
            }
            Err(e) => debug!(error = %e, "swapctl failed"),
        }
        usage
    }

    fn net_counters(&self) -> Result<NetCounters, CollectError> {
        let names = interface_names()?;

        // SAFETY: plain socket(2) call; the fd is owned below.
        let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
        if fd == -1 {
            return Err(io::Error::last_os_error().into());
        }
        // SAFETY: fd is a fresh descriptor nobody else owns.
        let sock = unsafe { OwnedFd::from_raw_fd(fd) };

        let mut counters = NetCounters::default();
        for name in names {
            // SAFETY: if_data is plain old data.
            let mut data: libc::if_data = unsafe { mem::zeroed() };
            let mut req = IfReqData {
                ifr_name: [0; libc::IFNAMSIZ],
                ifr_data: (&mut data as *mut libc::if_data).cast(),
                _pad: [0; 8],
            };
            let len = name.len().min(libc::IFNAMSIZ - 1);
            req.ifr_name[..len].copy_from_slice(&name[..len]);

            // SAFETY: req is a valid ifreq whose ifr_data points at data.
            let rc = unsafe {
                libc::ioctl(sock.as_raw_fd(), SIOCGIFDATA, &mut req as *mut IfReqData)
            };
            if rc == -1 {
                debug!(
                    interface = %fixed_c_str(&name),
                    error = %io::Error::last_os_error(),
                    "SIOCGIFDATA failed"
                );
                continue;
            }
            if !is_counted_type(data.ifi_type) {
                continue;
            }
            counters.rx_bytes = counters.rx_bytes.saturating_add(data.ifi_ibytes);
            counters.tx_bytes = counters.tx_bytes.saturating_add(data.ifi_obytes);
        }
        Ok(counters)
    }

    fn discover_power(&self) -> SensorPower {
        let battery_names: Vec<String> =
            (0..MAX_BATTERIES).map(|i| format!("acpibat{i}")).collect();
        let mut power = SensorPower::default();

        for_each_sensor_device(|devn, name, _| {
            if battery_names.iter().any(|b| b == name) {
                power.batteries.push(devn);
            } else if name == "acpiac0" {
                power.ac = Some(devn);
            }
            true
        });
        debug!(
            batteries = power.batteries.len(),
            ac = power.ac.is_some(),
            "sensor power sources"
        );
        power
    }

    fn read_power(&self, handles: &SensorPower) -> PowerStatus {
        let (now, full) =
            sensors::total_charge(handles.batteries.iter().map(|&devn| battery_charge(devn)));

        PowerStatus {
            has_ac: handles
                .ac
                .and_then(|devn| sensor_value(devn, SENSOR_INDICATOR, 0))
                .is_some_and(|v| v != 0),
            battery_percent: battery_percent(now as f64, full as f64),
            battery_count: handles.batteries.len(),
        }
    }

    fn temperature(&self) -> Option<i32> {
        let mut found = None;
        for_each_sensor_device(|devn, name, dev| {
            if name != "cpu0" && name != "km0" {
                return true;
            }
            found = (0..dev.maxnumt[SENSOR_TEMP as usize])
                .filter_map(|i| {
                    raw::read::<Sensor>(&[CTL_HW, HW_SENSORS, devn, SENSOR_TEMP, i]).ok()
                })
                .find(|s| s.flags & SENSOR_FINVALID == 0)
                .map(|s| micro_kelvin_to_celsius(s.value));
            found.is_none()
        });
        found
    }

    fn cpu_time_per_second(&self) -> u64 {
        1_000_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counted_interface_types() {
        assert!(is_counted_type(IFT_ETHER));
        assert!(is_counted_type(IFT_IEEE80211));
        // IFT_LOOP
        assert!(!is_counted_type(0x18));
    }

    #[test]
    fn test_nice_is_unbiased() {
        // SAFETY: kinfo_proc is plain old data.
        let mut kp: libc::kinfo_proc = unsafe { mem::zeroed() };
        kp.p_pid = 42;
        kp.p_nice = NZERO as u8;
        assert_eq!(decode(&kp, 1, 4096).nice, 0);

        kp.p_nice = (NZERO + 5) as u8;
        assert_eq!(decode(&kp, 1, 4096).nice, 5);

        kp.p_nice = 0;
        assert_eq!(decode(&kp, 1, 4096).nice, -20);
    }

    #[test]
    fn test_online_cores_have_distinct_ids() {
        let ticks = OpenBsd::new().cpu_ticks().unwrap();
        assert!(!ticks.is_empty());
        let mut ids: Vec<u32> = ticks.iter().map(|t| t.cpu_id).collect();
        ids.dedup();
        assert_eq!(ids.len(), ticks.len());
        assert!(ticks.iter().all(|t| t.total > 0));
    }

    #[test]
    fn test_own_process_is_visible() {
        let me = OpenBsd::new().process(std::process::id()).unwrap();
        assert_eq!(me.pid, std::process::id());
        assert!(me.thread_count >= 1);
    }
}
