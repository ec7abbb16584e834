use tracing::debug;

use crate::decode::ImuSample;

/// Rates beyond this are treated as garbage (bad timestamp, corrupted sample).
pub const DEFAULT_MAX_RATE_DPS: f64 = 2000.0;

/// Sample gaps longer than this give no rate. Also catches the sensor clock
/// jumping backwards after a reboot, which `wrapping_sub` turns into ~4295 s.
pub const MAX_RATE_GAP_US: u32 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnwrappedYaw {
    pub yaw_deg: f64,
    pub rate_dps: Option<f64>,
}

/// Turns wrapped (±180°) yaw readings into a continuous heading.
///
/// State lives for the lifetime of the sensor connection; build a new filter
/// to start over.
#[derive(Debug, Clone)]
pub struct YawUnwrapper {
    prev_wrapped: Option<f64>,
    prev_unwrapped: Option<f64>,
    prev_time_us: Option<u32>,
    offset: f64,
    current: f64,
    max_rate_dps: f64,
}

impl YawUnwrapper {
    pub fn new(max_rate_dps: f64) -> Self {
        Self {
            prev_wrapped: None,
            prev_unwrapped: None,
            prev_time_us: None,
            offset: 0.0,
            current: 0.0,
            max_rate_dps,
        }
    }

    pub fn accept(&mut self, sample: &ImuSample) -> UnwrappedYaw {
        // sensor clock is 32 bits on the wire
        self.accept_wrapped(sample.timestamp_us as u32, sample.yaw_deg())
    }

    /// A non-finite reading leaves the state untouched and reports the
    /// current heading without a rate.
    pub fn accept_wrapped(&mut self, time_us: u32, wrapped: f64) -> UnwrappedYaw {
        if !wrapped.is_finite() {
            debug!("imu: non-finite yaw {} ignored", wrapped);
            return UnwrappedYaw { yaw_deg: self.current, rate_dps: None };
        }
        if let Some(prev) = self.prev_wrapped {
            let delta = wrapped - prev;
            if delta < -180.0 {
                self.offset += 360.0;
            } else if delta > 180.0 {
                self.offset -= 360.0;
            }
        }
        self.prev_wrapped = Some(wrapped);
        self.current = wrapped + self.offset;

        let rate_dps = match (self.prev_unwrapped, self.prev_time_us) {
            (Some(prev_yaw), Some(prev_t)) => self.rate(prev_yaw, prev_t, time_us),
            _ => None,
        };

        self.prev_unwrapped = Some(self.current);
        self.prev_time_us = Some(time_us);
        UnwrappedYaw { yaw_deg: self.current, rate_dps }
    }

    fn rate(&self, prev_yaw: f64, prev_t: u32, t: u32) -> Option<f64> {
        let dt_us = t.wrapping_sub(prev_t);
        if dt_us == 0 || dt_us > MAX_RATE_GAP_US {
            debug!("imu: no rate over {}us gap", dt_us);
            return None;
        }
        let rate = (self.current - prev_yaw) / (dt_us as f64 / 1_000_000.0);
        if !rate.is_finite() || rate.abs() > self.max_rate_dps {
            debug!("imu: rate {:.1} deg/s over {}us rejected", rate, dt_us);
            return None;
        }
        Some(rate)
    }

    pub fn yaw_deg(&self) -> f64 {
        self.current
    }

    /// Net correction currently added to the wrapped reading (multiple of 360).
    pub fn offset_deg(&self) -> f64 {
        self.offset
    }
}

impl Default for YawUnwrapper {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RATE_DPS)
    }
}
