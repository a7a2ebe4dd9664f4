//! Per-process snapshot produced by the process enumerator.
//!
//! One [`ProcessSnapshot`] describes one live process at scan time. The core
//! never keeps snapshots between calls; anything that needs history (CPU usage
//! deltas) lives with the caller, see [`crate::rates`].

use serde::{Deserialize, Serialize};

use crate::collector::state::ProcessState;

/// Maximum length of [`ProcessSnapshot::command`] in bytes.
pub const COMMAND_MAX_LEN: usize = 255;

/// One process at scan time.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct ProcessSnapshot {
    /// Process ID. Always positive and unique within one enumeration.
    pub pid: u32,

    /// Real user ID of the owner.
    pub uid: u32,

    /// Short executable name, at most [`COMMAND_MAX_LEN`] bytes.
    pub command: String,

    /// Core the process last ran on, `-1` if the platform does not say.
    pub cpu_id: i32,

    /// Cumulative user + system CPU time since process start.
    ///
    /// The unit is platform-defined (clock ticks on Linux, microseconds on the
    /// BSDs and macOS); see `Platform::cpu_time_per_second`.
    pub cpu_time: u64,

    /// Scheduling priority as reported by the kernel.
    pub priority: i32,

    /// Nice value.
    pub nice: i32,

    /// Number of threads, 0 when unknown.
    pub thread_count: u32,

    /// Virtual memory size in bytes.
    pub mem_virtual_size: u64,

    /// Resident set size in bytes.
    pub mem_resident_size: u64,

    /// Canonical scheduler state.
    pub state: ProcessState,

    /// CPU usage percentage. Never computed by the collector; callers fill it
    /// in from successive `cpu_time` readings.
    pub cpu_usage: f64,
}

/// Truncates a raw command name to [`COMMAND_MAX_LEN`] bytes on a char boundary.
///
/// Empty names are replaced with the pid so the display name is never blank.
pub fn bounded_command(raw: &str, pid: u32) -> String {
    let raw = raw.trim_end_matches('\0').trim();
    if raw.is_empty() {
        return pid.to_string();
    }
    if raw.len() <= COMMAND_MAX_LEN {
        return raw.to_string();
    }
    let mut end = COMMAND_MAX_LEN;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    raw[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_command_is_kept() {
        assert_eq!(bounded_command("bash", 1), "bash");
    }

    #[test]
    fn empty_command_falls_back_to_pid() {
        assert_eq!(bounded_command("", 42), "42");
        assert_eq!(bounded_command("\0\0", 43), "43");
    }

    #[test]
    fn long_command_is_truncated_on_char_boundary() {
        let name = "é".repeat(200); // 400 bytes
        let bounded = bounded_command(&name, 1);
        assert!(bounded.len() <= COMMAND_MAX_LEN);
        assert_eq!(bounded.len(), 254);
        assert!(bounded.chars().all(|c| c == 'é'));
    }
}
