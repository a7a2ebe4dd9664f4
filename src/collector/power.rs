//! Power and thermal sampling with a discovery cache.

use tracing::debug;

use crate::collector::platform::Platform;
use crate::model::PowerStatus;

/// Combined battery charge as a percentage of combined capacity.
///
/// Returns 0 when no capacity is known; never exceeds 100.
pub fn battery_percent(charge_now: f64, charge_full: f64) -> u8 {
    if charge_full <= 0.0 || !charge_now.is_finite() {
        return 0;
    }
    (100.0 * charge_now / charge_full).clamp(0.0, 100.0) as u8
}

/// Reads battery and AC state, discovering the sources on first use.
///
/// Discovery walks the platform's device lists and is comparatively
/// expensive; its result is kept until [`reset`](Self::reset).
pub struct PowerSampler<P: Platform + ?Sized> {
    handles: Option<P::PowerHandles>,
}

impl<P: Platform + ?Sized> Default for PowerSampler<P> {
    fn default() -> Self {
        Self { handles: None }
    }
}

impl<P: Platform + ?Sized> PowerSampler<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current battery and AC state.
    pub fn sample(&mut self, platform: &P) -> PowerStatus {
        let handles = self.handles.get_or_insert_with(|| {
            debug!("discovering power sources");
            platform.discover_power()
        });
        platform.read_power(handles)
    }

    /// Forgets discovered sources; the next [`sample`](Self::sample)
    /// discovers again (e.g. after a battery was hot-plugged).
    pub fn reset(&mut self) {
        self.handles = None;
    }

    pub fn is_discovered(&self) -> bool {
        self.handles.is_some()
    }

    /// Package temperature in whole °C. Not cached.
    pub fn temperature(&self, platform: &P) -> Option<i32> {
        platform.temperature()
    }
}
