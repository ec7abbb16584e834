use gear_proto::heading::GearMeasurement;
use serde::Deserialize;

/// What a correction does when no measurement arrived since the last one it used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StalePolicy {
    /// Fault the run.
    #[default]
    Reject,
    /// Log and reuse the old value.
    Warn,
}

/// Values written by MeasureGear and read by YawCorrect / DistanceCorrect.
///
/// Each field carries its own freshness flag: a measurement makes both
/// fresh, and each correction consumes only the field it uses.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    distance_in: f64,
    yaw_deg: f64,
    distance_fresh: bool,
    yaw_fresh: bool,
    measurements: u32,
}

impl ExecutionContext {
    pub fn record(&mut self, m: GearMeasurement) {
        self.distance_in = m.distance_in;
        self.yaw_deg = m.yaw_deg;
        self.distance_fresh = true;
        self.yaw_fresh = true;
        self.measurements += 1;
    }

    /// Measured yaw, if nothing has consumed it since it was written.
    pub fn take_yaw(&mut self) -> Option<f64> {
        std::mem::take(&mut self.yaw_fresh).then_some(self.yaw_deg)
    }

    pub fn take_distance(&mut self) -> Option<f64> {
        std::mem::take(&mut self.distance_fresh).then_some(self.distance_in)
    }

    pub fn yaw_deg(&self) -> f64 {
        self.yaw_deg
    }

    pub fn distance_in(&self) -> f64 {
        self.distance_in
    }

    pub fn measurements(&self) -> u32 {
        self.measurements
    }
}
