//! Canonical process states and the per-platform code mappings.
//!
//! Every backend reports scheduler state differently: Linux uses a single
//! character in `/proc/[pid]/stat`, the BSDs and macOS use small integer
//! constants from `<sys/proc.h>`. All of them end up as a [`ProcessState`].
//! The mapping functions are pure and compiled on every target so they can be
//! tested anywhere.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical scheduler state of a process.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Default)]
pub enum ProcessState {
    #[serde(rename = "RUN")]
    Run,
    #[serde(rename = "SLEEP")]
    Sleep,
    /// Uninterruptible sleep, usually disk I/O.
    #[serde(rename = "DSLEEP")]
    DiskSleep,
    #[serde(rename = "IDLE")]
    Idle,
    #[serde(rename = "STOP")]
    Stop,
    #[serde(rename = "ZOMB")]
    Zombie,
    #[serde(rename = "DEAD")]
    Dead,
    #[serde(rename = "WAIT")]
    Wait,
    #[serde(rename = "LOCK")]
    Lock,
    /// Currently running on a CPU (OpenBSD).
    #[serde(rename = "ONPROC")]
    OnProc,
    #[default]
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl ProcessState {
    /// Canonical display name.
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessState::Run => "RUN",
            ProcessState::Sleep => "SLEEP",
            ProcessState::DiskSleep => "DSLEEP",
            ProcessState::Idle => "IDLE",
            ProcessState::Stop => "STOP",
            ProcessState::Zombie => "ZOMB",
            ProcessState::Dead => "DEAD",
            ProcessState::Wait => "WAIT",
            ProcessState::Lock => "LOCK",
            ProcessState::OnProc => "ONPROC",
            ProcessState::Unknown => "UNKNOWN",
        }
    }

    /// Maps the state character of `/proc/[pid]/stat` (see proc(5)).
    pub fn from_linux_code(code: char) -> Self {
        match code {
            'R' => ProcessState::Run,
            'S' => ProcessState::Sleep,
            'D' => ProcessState::DiskSleep,
            'I' | 'P' => ProcessState::Idle,
            'T' | 't' => ProcessState::Stop,
            'Z' => ProcessState::Zombie,
            'X' | 'x' => ProcessState::Dead,
            'W' => ProcessState::Wait,
            _ => ProcessState::Unknown,
        }
    }

    /// Maps FreeBSD `ki_stat` (`SIDL` .. `SLOCK`).
    pub fn from_freebsd_stat(stat: i32) -> Self {
        match stat {
            1 => ProcessState::Idle,
            2 => ProcessState::Run,
            3 => ProcessState::Sleep,
            4 => ProcessState::Stop,
            5 => ProcessState::Zombie,
            6 => ProcessState::Wait,
            7 => ProcessState::Lock,
            _ => ProcessState::Unknown,
        }
    }

    /// Maps OpenBSD `p_stat` (`SIDL` .. `SONPROC`).
    pub fn from_openbsd_stat(stat: i32) -> Self {
        match stat {
            1 => ProcessState::Idle,
            2 => ProcessState::Run,
            3 => ProcessState::Sleep,
            4 => ProcessState::Stop,
            5 => ProcessState::Zombie,
            6 => ProcessState::Dead,
            7 => ProcessState::OnProc,
            _ => ProcessState::Unknown,
        }
    }

    /// Maps Darwin `pbi_status` (`SIDL` .. `SZOMB`).
    pub fn from_darwin_status(status: u32) -> Self {
        match status {
            1 => ProcessState::Idle,
            2 => ProcessState::Run,
            3 => ProcessState::Sleep,
            4 => ProcessState::Stop,
            5 => ProcessState::Zombie,
            _ => ProcessState::Unknown,
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linux_codes_are_all_mapped() {
        for code in ['R', 'S', 'D', 'I', 'P', 'T', 't', 'Z', 'X', 'x', 'W'] {
            assert_ne!(
                ProcessState::from_linux_code(code),
                ProcessState::Unknown,
                "code {code}"
            );
        }
        assert_eq!(ProcessState::from_linux_code('D').as_str(), "DSLEEP");
        assert_eq!(ProcessState::from_linux_code('Z').as_str(), "ZOMB");
    }

    #[test]
    fn bsd_constants_are_all_mapped() {
        for stat in 1..=7 {
            assert_ne!(ProcessState::from_freebsd_stat(stat), ProcessState::Unknown);
            assert_ne!(ProcessState::from_openbsd_stat(stat), ProcessState::Unknown);
        }
        for status in 1..=5 {
            assert_ne!(ProcessState::from_darwin_status(status), ProcessState::Unknown);
        }
        assert_eq!(ProcessState::from_freebsd_stat(7), ProcessState::Lock);
        assert_eq!(ProcessState::from_openbsd_stat(7), ProcessState::OnProc);
    }

    #[test]
    fn undefined_codes_map_to_unknown() {
        assert_eq!(ProcessState::from_linux_code('?'), ProcessState::Unknown);
        assert_eq!(ProcessState::from_freebsd_stat(0), ProcessState::Unknown);
        assert_eq!(ProcessState::from_freebsd_stat(-3), ProcessState::Unknown);
        assert_eq!(ProcessState::from_openbsd_stat(99), ProcessState::Unknown);
        assert_eq!(ProcessState::from_darwin_status(6), ProcessState::Unknown);
        assert_eq!(ProcessState::Unknown.to_string(), "UNKNOWN");
    }
}
