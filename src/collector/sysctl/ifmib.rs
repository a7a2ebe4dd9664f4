//! Interface byte counters through the `net.link.generic` MIB.

use libc::{c_char, c_int};
use tracing::debug;

use super::fixed_c_str;
use super::raw::{self, Pod};
use crate::collector::error::CollectError;
use crate::collector::platform::NetCounters;

const NETLINK_GENERIC: c_int = 0;
const IFMIB_SYSTEM: c_int = 1;
const IFMIB_IFCOUNT: c_int = 1;
const IFMIB_IFDATA: c_int = 2;
const IFDATA_GENERAL: c_int = 1;

/// `struct ifmibdata` from `<net/if_mib.h>`.
#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
struct IfMibData {
    ifmd_name: [c_char; libc::IFNAMSIZ],
    ifmd_pcount: c_int,
    ifmd_flags: c_int,
    ifmd_snd_len: c_int,
    ifmd_snd_maxlen: c_int,
    ifmd_snd_drops: c_int,
    ifmd_filler: [c_int; 4],
    #[cfg(target_os = "freebsd")]
    ifmd_data: libc::if_data,
    #[cfg(target_os = "macos")]
    ifmd_data: libc::if_data64,
}

// SAFETY: integers, a char array and the integer-only `if_data` record.
unsafe impl Pod for IfMibData {}

/// Sums input/output bytes over every interface except `lo0`.
///
/// Rows that fail to read are skipped; only a failure to read the interface
/// count is an error.
pub fn net_counters() -> Result<NetCounters, CollectError> {
    let count: c_int = raw::read(&[
        libc::CTL_NET,
        libc::PF_LINK,
        NETLINK_GENERIC,
        IFMIB_SYSTEM,
        IFMIB_IFCOUNT,
    ])?;

    let mut counters = NetCounters::default();
    // Row indices are 1-based.
    for row in 1..=count {
        let mib = [
            libc::CTL_NET,
            libc::PF_LINK,
            NETLINK_GENERIC,
            IFMIB_IFDATA,
            row,
            IFDATA_GENERAL,
        ];
        let data: IfMibData = match raw::read(&mib) {
            Ok(data) => data,
            Err(e) => {
                debug!(row, error = %e, "skipping interface row");
                continue;
            }
        };
        if fixed_c_str(&data.ifmd_name) == "lo0" {
            continue;
        }
        counters.rx_bytes = counters
            .rx_bytes
            .saturating_add(data.ifmd_data.ifi_ibytes as u64);
        counters.tx_bytes = counters
            .tx_bytes
            .saturating_add(data.ifmd_data.ifi_obytes as u64);
    }
    Ok(counters)
}
