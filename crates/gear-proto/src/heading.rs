use serde::{Deserialize, Serialize};

/// Latest continuous heading published by the IMU reader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    /// Unwrapped yaw, degrees, + is CCW viewed from above.
    pub yaw_deg: f64,
    /// Omitted on the first sample and when the rate fails the sanity bound.
    pub rate_dps: Option<f64>,
    /// Sensor-side clock, microseconds (wraps at 32 bits).
    pub imu_time_us: u64,
    pub fusion_ok: bool,
}

/// Distance and yaw of the robot relative to the gear peg, as reported by vision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GearMeasurement {
    pub distance_in: f64,
    // +val means robot sitting CCW of the peg axis (viewed from top)
    pub yaw_deg: f64,
}
