//! Host constants read once from the C library.

use std::sync::LazyLock;

const FALLBACK_PAGE_SIZE: u64 = 4096;
const FALLBACK_CLOCK_TICKS: u64 = 100;

static PAGE_SIZE: LazyLock<u64> =
    LazyLock::new(|| sysconf(libc_names::PAGE_SIZE).unwrap_or(FALLBACK_PAGE_SIZE));

static CLOCK_TICKS: LazyLock<u64> =
    LazyLock::new(|| sysconf(libc_names::CLK_TCK).unwrap_or(FALLBACK_CLOCK_TICKS));

/// Size of a virtual memory page in bytes.
///
/// The result is cached after the first call.
pub fn page_size() -> u64 {
    *PAGE_SIZE
}

/// Scheduler clock ticks per second (`USER_HZ` on Linux).
///
/// The result is cached after the first call.
pub fn clock_ticks() -> u64 {
    *CLOCK_TICKS
}

#[cfg(unix)]
mod libc_names {
    pub const PAGE_SIZE: libc::c_int = libc::_SC_PAGESIZE;
    pub const CLK_TCK: libc::c_int = libc::_SC_CLK_TCK;
}

#[cfg(not(unix))]
mod libc_names {
    pub const PAGE_SIZE: i32 = 0;
    pub const CLK_TCK: i32 = 1;
}

#[cfg(unix)]
fn sysconf(name: libc::c_int) -> Option<u64> {
    // SAFETY: sysconf has no memory-safety preconditions.
    let value = unsafe { libc::sysconf(name) };
    (value > 0).then_some(value as u64)
}

#[cfg(not(unix))]
fn sysconf(_name: i32) -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        let size = page_size();
        assert!(size >= 4096);
        assert!(size.is_power_of_two());
    }

    #[test]
    fn test_clock_ticks_positive() {
        assert!(clock_ticks() > 0);
    }
}
