//! Adapters built on `sysctl(3)`: FreeBSD, macOS and OpenBSD.
//!
//! Each adapter decodes kernel structs into the canonical model right after
//! the call returns. The unit conversions and buffer decoding below are pure
//! and compiled on every target.

#[cfg(target_os = "freebsd")]
pub mod freebsd;
#[cfg(any(target_os = "freebsd", target_os = "macos"))]
mod ifmib;
#[cfg(target_os = "macos")]
pub mod macos;
#[cfg(target_os = "openbsd")]
pub mod openbsd;
#[cfg(any(target_os = "freebsd", target_os = "macos", target_os = "openbsd"))]
mod raw;
pub mod sensors;

use std::ffi::c_char;

use crate::collector::platform::CpuTicks;

/// Decodes a fixed-size, NUL-padded C char array.
pub fn fixed_c_str(raw: &[c_char]) -> String {
    let bytes: Vec<u8> = raw
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Ticks of one core from its state counters.
pub fn core_ticks(cpu_id: u32, states: &[u64], idle_index: usize) -> CpuTicks {
    CpuTicks {
        cpu_id,
        total: states.iter().fold(0u64, |acc, v| acc.saturating_add(*v)),
        idle: states.get(idle_index).copied().unwrap_or(0),
    }
}

/// Splits a flat array of per-core state counters into [`CpuTicks`].
///
/// `states` holds `per_cpu` counters for each core back to back, core 0
/// first; a trailing partial group is ignored.
pub fn ticks_from_states(states: &[u64], per_cpu: usize, idle_index: usize) -> Vec<CpuTicks> {
    if per_cpu == 0 || idle_index >= per_cpu {
        return Vec::new();
    }
    states
        .chunks_exact(per_cpu)
        .enumerate()
        .map(|(id, core)| core_ticks(id as u32, core, idle_index))
        .collect()
}

/// Drops cores whose counters never moved since boot.
///
/// `kern.cp_times` has a row for every id up to the highest CPU id, and the
/// rows of ids with no CPU behind them stay zero.
pub fn online_cores(mut ticks: Vec<CpuTicks>) -> Vec<CpuTicks> {
    ticks.retain(|t| t.total > 0);
    ticks
}

/// Seconds plus microseconds to microseconds.
pub fn micros(sec: i64, usec: i64) -> u64 {
    (sec.max(0) as u64)
        .saturating_mul(1_000_000)
        .saturating_add(usec.max(0) as u64)
}

/// ACPI thermal zones report tenths of a Kelvin.
pub fn deci_kelvin_to_celsius(value: i64) -> i32 {
    ((value - 2732) / 10) as i32
}

/// OpenBSD temperature sensors report micro-Kelvin.
pub fn micro_kelvin_to_celsius(value: i64) -> i32 {
    ((value - 273_150_000) / 1_000_000) as i32
}

/// Pages to KiB.
pub fn pages_to_kb(pages: u64, page_size: u64) -> u64 {
    pages.saturating_mul(page_size) >> 10
}

/// 512-byte disk blocks to KiB.
pub fn blocks_to_kb(blocks: u64) -> u64 {
    blocks / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::ScriptedPlatform;
    use crate::collector::sampler::CpuSampler;
    use std::time::Duration;

    #[test]
    fn test_fixed_c_str() {
        let raw: Vec<c_char> = b"sshd\0\0garbage"
            .iter()
            .map(|&b| b as c_char)
            .collect();
        assert_eq!(fixed_c_str(&raw), "sshd");

        let full: Vec<c_char> = b"abc".iter().map(|&b| b as c_char).collect();
        assert_eq!(fixed_c_str(&full), "abc");
        assert_eq!(fixed_c_str(&[]), "");
    }

    #[test]
    fn test_ticks_from_freebsd_cp_times() {
        // Two cores, CPUSTATES = 5: user nice sys intr idle
        let states = [10, 0, 5, 1, 84, 20, 1, 9, 0, 70];
        let ticks = ticks_from_states(&states, 5, 4);

        assert_eq!(
            ticks,
            vec![
                CpuTicks {
                    cpu_id: 0,
                    total: 100,
                    idle: 84
                },
                CpuTicks {
                    cpu_id: 1,
                    total: 100,
                    idle: 70
                },
            ]
        );
    }

    #[test]
    fn test_core_ticks_out_of_range_idle() {
        assert_eq!(
            core_ticks(3, &[5, 5], 4),
            CpuTicks {
                cpu_id: 3,
                total: 10,
                idle: 0
            }
        );
    }

    #[test]
    fn test_online_cores_keeps_ids() {
        // cp_times with a hole at id 1
        let states = [10, 0, 5, 1, 84, 0, 0, 0, 0, 0, 20, 1, 9, 0, 70];
        let ticks = online_cores(ticks_from_states(&states, 5, 4));

        let ids: Vec<u32> = ticks.iter().map(|t| t.cpu_id).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn test_idle_host_with_absent_core_reads_idle() {
        let before = [0, 0, 0, 0, 1000, 0, 0, 0, 0, 0];
        let after = [0, 0, 0, 0, 1100, 0, 0, 0, 0, 0];
        let platform = ScriptedPlatform::new().with_cpu_readings(vec![
            Ok(online_cores(ticks_from_states(&before, 5, 4))),
            Ok(online_cores(ticks_from_states(&after, 5, 4))),
        ]);

        let usage = CpuSampler::new(Duration::ZERO).sample(&platform);

        assert_eq!(usage.cores.len(), 1);
        assert_eq!(usage.percent, 0.0);
    }

    #[test]
    fn test_ticks_ignore_partial_group() {
        let states = [1, 2, 3, 4, 5, 6, 7];
        assert_eq!(ticks_from_states(&states, 6, 5).len(), 1);
        assert!(ticks_from_states(&states, 0, 0).is_empty());
        assert!(ticks_from_states(&states, 5, 5).is_empty());
    }

    #[test]
    fn test_micros() {
        assert_eq!(micros(2, 500), 2_000_500);
        assert_eq!(micros(-1, 10), 10);
    }

    #[test]
    fn test_temperature_conversions() {
        // 3232 dK = 50.0 C
        assert_eq!(deci_kelvin_to_celsius(3232), 50);
        // 318.15 K = 45 C
        assert_eq!(micro_kelvin_to_celsius(318_150_000), 45);
    }

    #[test]
    fn test_size_conversions() {
        assert_eq!(pages_to_kb(3, 4096), 12);
        assert_eq!(pages_to_kb(1, 16384), 16);
        assert_eq!(blocks_to_kb(2048), 1024);
    }
}
