//! Battery, AC adapter and package temperature from `/sys/class`.

use crate::collector::power::battery_percent;
use crate::collector::traits::FileSystem;
use crate::model::PowerStatus;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Attribute families a battery may expose, in order of preference.
const BATTERY_FAMILIES: [&str; 3] = ["energy", "charge", "capacity"];

/// One battery: the pair of files holding its full and current charge.
#[derive(Debug, Clone, PartialEq)]
struct BatterySource {
    full: PathBuf,
    now: PathBuf,
}

/// Power sources found under `<sys>/class/power_supply`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SysfsPower {
    batteries: Vec<BatterySource>,
    /// `online` attribute of the mains adapter.
    ac_online: Option<PathBuf>,
}

impl SysfsPower {
    pub fn battery_count(&self) -> usize {
        self.batteries.len()
    }
}

/// Reads power supply and thermal zone attributes from sysfs.
pub struct PowerCollector<F: FileSystem> {
    fs: F,
    sys_path: PathBuf,
}

impl<F: FileSystem> PowerCollector<F> {
    /// Creates a new power collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `sys_path` - Base path to sysfs (usually "/sys")
    pub fn new(fs: F, sys_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            sys_path: sys_path.into(),
        }
    }

    /// Lists `power_supply` once and remembers which files to read.
    ///
    /// Entries named `BAT*` are batteries; the AC adapter is the first
    /// supply of type `Mains`, or an entry named `AC`.
    pub fn discover(&self) -> SysfsPower {
        let root = self.sys_path.join("class/power_supply");
        let mut entries = match self.fs.read_dir(&root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(path = %root.display(), error = %e, "no power supplies");
                return SysfsPower::default();
            }
        };
        entries.sort();

        let mut power = SysfsPower::default();
        let mut fallback_ac = None;

        for entry in &entries {
            let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if name.starts_with("BAT") {
                match self.battery_source(entry) {
                    Some(source) => power.batteries.push(source),
                    None => debug!(battery = name, "battery exposes no charge attributes"),
                }
                continue;
            }

            let is_mains = self.read_trimmed(&entry.join("type")).as_deref() == Some("Mains");
            if power.ac_online.is_none() && is_mains {
                power.ac_online = Some(entry.join("online"));
            } else if name == "AC" {
                fallback_ac = Some(entry.join("online"));
            }
        }

        if power.ac_online.is_none() {
            power.ac_online = fallback_ac;
        }

        debug!(
            batteries = power.batteries.len(),
            ac = power.ac_online.is_some(),
            "power supplies discovered"
        );
        power
    }

    /// Re-reads the files found by [`discover`](Self::discover).
    pub fn read(&self, power: &SysfsPower) -> PowerStatus {
        let mut full = 0.0;
        let mut now = 0.0;
        for battery in &power.batteries {
            full += self.read_number(&battery.full).unwrap_or(0) as f64;
            now += self.read_number(&battery.now).unwrap_or(0) as f64;
        }

        let has_ac = power
            .ac_online
            .as_deref()
            .and_then(|path| self.read_number(path))
            .is_some_and(|online| online != 0);

        PowerStatus {
            has_ac,
            battery_percent: battery_percent(now, full),
            battery_count: power.batteries.len(),
        }
    }

    /// Temperature of the first thermal zone whose type mentions `pkg_temp`.
    ///
    /// Zone temperatures are in millidegrees Celsius.
    pub fn temperature(&self) -> Option<i32> {
        let root = self.sys_path.join("class/thermal");
        let mut zones = self.fs.read_dir(&root).ok()?;
        zones.sort();

        zones
            .iter()
            .filter(|zone| {
                zone.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("thermal_zone"))
            })
            .filter(|zone| {
                self.read_trimmed(&zone.join("type"))
                    .is_some_and(|kind| kind.contains("pkg_temp"))
            })
            .find_map(|zone| {
                let millis: i64 = self.read_trimmed(&zone.join("temp"))?.parse().ok()?;
                Some((millis / 1000) as i32)
            })
    }

    fn battery_source(&self, dir: &Path) -> Option<BatterySource> {
        BATTERY_FAMILIES.iter().find_map(|family| {
            let full = dir.join(format!("{}_full", family));
            self.fs.exists(&full).then(|| BatterySource {
                full,
                now: dir.join(format!("{}_now", family)),
            })
        })
    }

    fn read_trimmed(&self, path: &Path) -> Option<String> {
        self.fs
            .read_to_string(path)
            .ok()
            .map(|s| s.trim().to_string())
    }

    fn read_number(&self, path: &Path) -> Option<u64> {
        self.read_trimmed(path)?.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    #[test]
    fn test_discover_batteries_and_ac() {
        let collector = PowerCollector::new(MockFs::with_batteries(), "/sys");

        let power = collector.discover();

        assert_eq!(power.battery_count(), 2);
        assert_eq!(
            power.ac_online,
            Some(PathBuf::from("/sys/class/power_supply/ADP1/online"))
        );
        assert_eq!(
            power.batteries[0].full,
            PathBuf::from("/sys/class/power_supply/BAT0/energy_full")
        );
        assert_eq!(
            power.batteries[1].now,
            PathBuf::from("/sys/class/power_supply/BAT1/charge_now")
        );
    }

    #[test]
    fn test_read_combines_batteries() {
        let collector = PowerCollector::new(MockFs::with_batteries(), "/sys");
        let power = collector.discover();

        let status = collector.read(&power);

        // (40000 + 1500) / (50000 + 3000) = 78.3%
        assert_eq!(status.battery_percent, 78);
        assert_eq!(status.battery_count, 2);
        assert!(status.has_ac);
    }

    #[test]
    fn test_ac_falls_back_to_entry_named_ac() {
        let mut fs = MockFs::new();
        fs.add_power_supply("AC", &[("online", "0\n")]);
        fs.add_power_supply("BAT0", &[("capacity_full", "100\n"), ("capacity_now", "55\n")]);

        let collector = PowerCollector::new(fs, "/sys");
        let power = collector.discover();
        let status = collector.read(&power);

        assert!(!status.has_ac);
        assert_eq!(status.battery_percent, 55);
    }

    #[test]
    fn test_no_power_supply_directory() {
        let collector = PowerCollector::new(MockFs::minimal(), "/sys");
        let power = collector.discover();

        assert_eq!(collector.read(&power), PowerStatus::default());
    }

    #[test]
    fn test_battery_without_attributes_is_ignored() {
        let mut fs = MockFs::new();
        fs.add_power_supply("BAT0", &[("status", "Unknown\n")]);

        let collector = PowerCollector::new(fs, "/sys");
        assert_eq!(collector.discover().battery_count(), 0);
    }

    #[test]
    fn test_temperature_from_pkg_zone() {
        let collector = PowerCollector::new(MockFs::with_thermal_zones(), "/sys");
        assert_eq!(collector.temperature(), Some(52));
    }

    #[test]
    fn test_temperature_unavailable() {
        let mut fs = MockFs::new();
        fs.add_thermal_zone(0, "acpitz", "45000");

        assert_eq!(PowerCollector::new(fs, "/sys").temperature(), None);
        assert_eq!(
            PowerCollector::new(MockFs::new(), "/sys").temperature(),
            None
        );
    }
}
