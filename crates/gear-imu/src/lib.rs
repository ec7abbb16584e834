pub mod autodetect;
pub mod decode;
pub mod doctor;
pub mod framing;
pub mod probe;
pub mod reader;
pub mod state;
pub mod unwrap;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ImuConfig {
    pub enable: bool,

    /// If true, probe candidate serial ports and pick the first that shows
    /// the IMU ident banner or a well-formed record.
    pub autodetect: bool,

    /// When autodetect=false: fixed port
    pub serial_dev: Option<String>,
    pub baud: Option<u32>,

    /// Autodetect candidates (paths). Example:
    /// ["/dev/ttyACM0","/dev/ttyACM1","/dev/ttyUSB0"]
    pub candidate_devs: Option<Vec<String>>,

    /// Input accumulation window per candidate. Default 1000ms.
    pub probe_timeout_ms: Option<u64>,

    /// Sleep between serial reads. Default 50ms.
    pub poll_interval_ms: Option<u64>,

    /// Yaw rates above this are dropped as implausible. Default 2000 deg/s.
    pub max_rate_dps: Option<f64>,

    /// Line reassembly buffer cap. Default 4096.
    pub max_buffer_bytes: Option<usize>,
}

pub const DEFAULT_BAUD: u32 = 115200;

impl ImuConfig {
    pub fn baud(&self) -> u32 {
        self.baud.unwrap_or(DEFAULT_BAUD)
    }

    pub fn reader_config(&self) -> reader::ReaderConfig {
        reader::ReaderConfig {
            poll_interval: std::time::Duration::from_millis(self.poll_interval_ms.unwrap_or(50)),
            max_buffer_bytes: self.max_buffer_bytes.unwrap_or(framing::DEFAULT_MAX_BUFFER_BYTES),
            max_rate_dps: self.max_rate_dps.unwrap_or(unwrap::DEFAULT_MAX_RATE_DPS),
        }
    }
}
