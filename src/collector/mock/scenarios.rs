//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` and `/sys` states for testing
//! the Linux adapter under various host conditions.

use super::filesystem::MockFs;

impl MockFs {
    /// Creates a typical 4-core host with a few processes.
    ///
    /// Includes: init (PID 1), a bash shell and a `cat` child of that shell.
    /// Network has loopback, one wired and one wireless interface.
    pub fn typical_system() -> Self {
        let mut fs = Self::new();

        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
Active:          4096000 kB
Inactive:        2048000 kB
SwapTotal:       4096000 kB
SwapFree:        3072000 kB
Dirty:              1024 kB
Writeback:             0 kB
Shmem:            262144 kB
Slab:             512000 kB
SReclaimable:     256000 kB
",
        );

        fs.add_file(
            "/proc/stat",
            "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 2500 125 750 20000 250 50 25 0 0 0
cpu1 2500 125 750 20000 250 50 25 0 0 0
cpu2 2500 125 750 20000 250 50 25 0 0 0
cpu3 2500 125 750 20000 250 50 25 0 0 0
intr 1000000 50 0 0 0 0 0 0 0 1 0 0 0 100 0 0 1000
ctxt 500000
btime 1700000000
processes 10000
procs_running 2
procs_blocked 0
",
        );

        fs.add_file(
            "/proc/net/dev",
            "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 12345678     9876    0    0    0     0          0         0 12345678     9876    0    0    0     0       0          0
  eth0: 123456789   654321    5   10    0     0          0       100 98765432   456789    2    5    0     0       0          0
 wlan0:    5000       50    0    0    0     0          0         0     7000       70    0    0    0     0       0          0
",
        );

        // PID 1 - init/systemd
        fs.add_process(
            1,
            "1 (systemd) S 0 1 1 0 -1 4194560 50000 1000000 100 500 1000 500 2000 1000 20 0 1 0 1 170000000 3000 18446744073709551615 0 0 0 0 0 0 0 0 1073745152 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "\
Name:\tsystemd
Pid:\t1
PPid:\t0
Uid:\t0\t0\t0\t0
Gid:\t0\t0\t0\t0
VmSize:\t  170000 kB
VmRSS:\t    12000 kB
",
        );

        // PID 1000 - bash shell
        fs.add_process(
            1000,
            "1000 (bash) S 999 1000 1000 34816 1001 4194304 5000 50000 0 0 100 50 200 100 20 0 1 0 100000 25000000 2000 18446744073709551615 0 0 0 0 0 0 65536 3670020 1266777851 0 0 0 17 2 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "\
Name:\tbash
Pid:\t1000
PPid:\t999
Uid:\t1000\t1000\t1000\t1000
Gid:\t1000\t1000\t1000\t1000
VmSize:\t   25000 kB
VmRSS:\t    8000 kB
",
        );

        // PID 1001 - cat command (child of bash)
        fs.add_process(
            1001,
            "1001 (cat) R 1000 1000 1000 34816 1001 4194304 100 0 0 0 5 2 0 0 20 0 1 0 100100 5000000 500 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 1 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "\
Name:\tcat
Pid:\t1001
PPid:\t1000
Uid:\t1000\t1000\t1000\t1000
Gid:\t1000\t1000\t1000\t1000
",
        );

        fs
    }

    /// Creates a host with only the files every kernel provides and no
    /// processes, power supplies or thermal zones.
    pub fn minimal() -> Self {
        let mut fs = Self::new();

        fs.add_dir("/proc");
        fs.add_file("/proc/stat", "cpu  1 0 1 10\ncpu0 1 0 1 10\n");
        fs.add_file(
            "/proc/meminfo",
            "MemTotal:        1024000 kB\nMemFree:          512000 kB\n",
        );
        fs.add_file(
            "/proc/net/dev",
            "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:     100        1    0    0    0     0          0         0      100        1    0    0    0     0       0          0
",
        );
        fs.add_dir("/sys/class");

        fs
    }

    /// Creates a system with a zombie process.
    pub fn with_zombie_process() -> Self {
        let mut fs = Self::typical_system();

        // Zombies keep their stat record but lose their address space.
        fs.add_process(
            4000,
            "4000 (defunct) Z 1000 4000 1000 0 -1 4194308 0 0 0 0 0 0 0 0 20 0 1 0 400000 0 0 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 -1 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "\
Name:\tdefunct
State:\tZ (zombie)
Pid:\t4000
PPid:\t1000
Uid:\t1000\t1000\t1000\t1000
Gid:\t1000\t1000\t1000\t1000
",
        );

        fs
    }

    /// Creates a system with processes that have special characters in names.
    pub fn with_special_names() -> Self {
        let mut fs = Self::typical_system();

        // Process with spaces in name (like Firefox's "Web Content")
        fs.add_process(
            5000,
            "5000 (Web Content) S 4999 5000 4999 0 -1 4194304 100000 0 500 0 5000 1000 0 0 20 0 20 0 500000 2000000000 50000 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "\
Name:\tWeb Content
Pid:\t5000
PPid:\t4999
Uid:\t1000\t1000\t1000\t1000
Gid:\t1000\t1000\t1000\t1000
",
        );

        // Process with parentheses in name
        fs.add_process(
            5001,
            "5001 (test(1)) S 1 5001 5001 0 -1 4194304 1000 0 0 0 10 5 0 0 20 0 1 0 500100 10000000 1000 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "\
Name:\ttest(1)
Pid:\t5001
PPid:\t1
Uid:\t1000\t1000\t1000\t1000
Gid:\t1000\t1000\t1000\t1000
",
        );

        fs
    }

    /// Creates a laptop with two batteries and a mains adapter.
    ///
    /// BAT0 reports `energy_*` (µWh), BAT1 reports `charge_*` (µAh); the
    /// adapter is `ADP1` with type `Mains`. A USB-C source is present too and
    /// must not be mistaken for the adapter.
    pub fn with_batteries() -> Self {
        let mut fs = Self::typical_system();

        fs.add_power_supply(
            "BAT0",
            &[
                ("type", "Battery\n"),
                ("energy_full", "50000\n"),
                ("energy_now", "40000\n"),
            ],
        );
        fs.add_power_supply(
            "BAT1",
            &[
                ("type", "Battery\n"),
                ("charge_full", "3000\n"),
                ("charge_now", "1500\n"),
            ],
        );
        fs.add_power_supply("ADP1", &[("type", "Mains\n"), ("online", "1\n")]);
        fs.add_power_supply(
            "ucsi-source-psy-USBC000:001",
            &[("type", "USB\n"), ("online", "0\n")],
        );

        fs
    }

    /// Creates a host with several thermal zones; zone 1 is the CPU package
    /// at 52 °C.
    pub fn with_thermal_zones() -> Self {
        let mut fs = Self::typical_system();

        fs.add_thermal_zone(0, "acpitz", "45000");
        fs.add_thermal_zone(1, "x86_pkg_temp", "52000");
        fs.add_thermal_zone(2, "iwlwifi_1", "40000");
        fs.add_dir("/sys/class/thermal/cooling_device0");

        fs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::traits::FileSystem;
    use std::path::Path;

    #[test]
    fn test_typical_system_has_required_files() {
        let fs = MockFs::typical_system();

        assert!(fs.exists(Path::new("/proc/meminfo")));
        assert!(fs.exists(Path::new("/proc/stat")));
        assert!(fs.exists(Path::new("/proc/net/dev")));

        assert!(fs.exists(Path::new("/proc/1")));
        assert!(fs.exists(Path::new("/proc/1000")));
        assert!(fs.exists(Path::new("/proc/1001")));
    }

    #[test]
    fn test_minimal_has_no_processes() {
        let fs = MockFs::minimal();
        let entries = fs.read_dir(Path::new("/proc")).unwrap();
        assert!(entries.iter().all(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_none_or(|n| n.parse::<u32>().is_err())
        }));
    }

    #[test]
    fn test_zombie_process() {
        let fs = MockFs::with_zombie_process();
        let stat = fs.read_to_string(Path::new("/proc/4000/stat")).unwrap();
        assert!(stat.contains(") Z ")); // Zombie state
    }

    #[test]
    fn test_special_names() {
        let fs = MockFs::with_special_names();

        // Process with spaces
        let stat = fs.read_to_string(Path::new("/proc/5000/stat")).unwrap();
        assert!(stat.contains("(Web Content)"));

        // Process with parentheses
        let stat = fs.read_to_string(Path::new("/proc/5001/stat")).unwrap();
        assert!(stat.contains("(test(1))"));
    }

    #[test]
    fn test_batteries_scenario() {
        let fs = MockFs::with_batteries();
        let supplies = fs
            .read_dir(Path::new("/sys/class/power_supply"))
            .unwrap();
        assert_eq!(supplies.len(), 4);
    }
}
