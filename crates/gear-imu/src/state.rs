use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct ImuStatus {
    pub connected: bool,
    pub port: Option<String>,
    pub baud: Option<u32>,
    pub last_sample: Option<Instant>,
    pub frames_ok: u64,
    pub frames_rejected: u64,
    pub fragments_dropped: u64,
    pub overflows: u64,
    pub read_errors: u64,
}

impl ImuStatus {
    pub fn sample_age(&self) -> Option<Duration> {
        self.last_sample.map(|t| t.elapsed())
    }
}
