//! Battery arithmetic over OpenBSD `hw.sensors` readings.
//!
//! Kept apart from the sysctl calls so the firmware fallbacks can be
//! exercised with canned sensor values.

/// `SENSOR_WATTHOUR`.
pub const WATT_HOUR: i32 = 7;
/// `SENSOR_AMPHOUR`.
pub const AMP_HOUR: i32 = 8;

/// Sensor index of the last full capacity.
pub const FULL_INDEX: i32 = 0;
/// Sensor index of the remaining capacity.
pub const REMAINING_INDEX: i32 = 3;

/// `(remaining, full)` of one battery.
///
/// `read(kind, index)` returns a sensor value, `None` when the sensor is
/// missing. Watt-hours are preferred; when either watt-hour figure is zero
/// or missing the amp-hour pair is used, since some firmware fills only
/// those.
pub fn battery_charge(mut read: impl FnMut(i32, i32) -> Option<i64>) -> (i64, i64) {
    let mut pair = |kind| {
        (
            read(kind, REMAINING_INDEX).unwrap_or(0),
            read(kind, FULL_INDEX).unwrap_or(0),
        )
    };
    match pair(WATT_HOUR) {
        (now, full) if now != 0 && full != 0 => (now, full),
        _ => pair(AMP_HOUR),
    }
}

/// Sums `(remaining, full)` over every battery.
pub fn total_charge(batteries: impl IntoIterator<Item = (i64, i64)>) -> (i64, i64) {
    batteries
        .into_iter()
        .fold((0i64, 0i64), |(now, full), (n, f)| {
            (now.saturating_add(n), full.saturating_add(f))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::power::battery_percent;
    use std::collections::HashMap;

    fn sensors(values: &[((i32, i32), i64)]) -> HashMap<(i32, i32), i64> {
        values.iter().copied().collect()
    }

    #[test]
    fn test_watt_hours_preferred() {
        let values = sensors(&[
            ((WATT_HOUR, REMAINING_INDEX), 30_000_000),
            ((WATT_HOUR, FULL_INDEX), 40_000_000),
            ((AMP_HOUR, REMAINING_INDEX), 1),
            ((AMP_HOUR, FULL_INDEX), 2),
        ]);
        let mut amp_reads = 0;
        let charge = battery_charge(|kind, index| {
            if kind == AMP_HOUR {
                amp_reads += 1;
            }
            values.get(&(kind, index)).copied()
        });

        assert_eq!(charge, (30_000_000, 40_000_000));
        assert_eq!(amp_reads, 0);
    }

    #[test]
    fn test_zero_watt_hours_fall_back_to_amp_hours() {
        let values = sensors(&[
            ((WATT_HOUR, REMAINING_INDEX), 0),
            ((WATT_HOUR, FULL_INDEX), 40_000_000),
            ((AMP_HOUR, REMAINING_INDEX), 2_500_000),
            ((AMP_HOUR, FULL_INDEX), 5_000_000),
        ]);

        let charge = battery_charge(|kind, index| values.get(&(kind, index)).copied());
        assert_eq!(charge, (2_500_000, 5_000_000));
    }

    #[test]
    fn test_missing_sensors_read_as_zero() {
        let values = sensors(&[((AMP_HOUR, FULL_INDEX), 5_000_000)]);

        let charge = battery_charge(|kind, index| values.get(&(kind, index)).copied());
        assert_eq!(charge, (0, 5_000_000));
        assert_eq!(battery_charge(|_, _| None), (0, 0));
    }

    #[test]
    fn test_total_charge_across_batteries() {
        // One battery reports watt-hours, the other only amp-hours.
        let (now, full) = total_charge([(30, 40), (10, 60)]);
        assert_eq!((now, full), (40, 100));
        assert_eq!(battery_percent(now as f64, full as f64), 40);

        assert_eq!(total_charge(Vec::<(i64, i64)>::new()), (0, 0));
    }
}
