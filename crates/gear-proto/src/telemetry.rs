use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventKind {
    Heading,
    Instruction,
    Finished,
    Fault,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub ts_unix_ms: i64,
    pub kind: EventKind,
    pub msg: String,
    // IMU
    pub yaw_deg: Option<f64>,
    pub rate_dps: Option<f64>,
    pub frames_ok: Option<u64>,
    pub frames_rejected: Option<u64>,
    // Scripter
    pub pc: Option<usize>,
}

impl TelemetryEvent {
    pub fn new(ts_unix_ms: i64, kind: EventKind, msg: impl Into<String>) -> Self {
        Self {
            ts_unix_ms,
            kind,
            msg: msg.into(),
            yaw_deg: None,
            rate_dps: None,
            frames_ok: None,
            frames_rejected: None,
            pc: None,
        }
    }
}
