use anyhow::Result;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_serial::SerialPortBuilderExt;
use tracing::{info, warn};

use crate::probe::PortTester;

#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub dev: String,
    pub matched: bool,
    pub bytes_seen: usize,
    pub elapsed_ms: u64,
    pub note: String,
}

#[derive(Debug, Clone)]
pub struct AutodetectResult {
    pub chosen: Option<String>,
    pub probes: Vec<ProbeResult>,
}

pub fn default_candidate_devs() -> Vec<String> {
    vec![
        "/dev/ttyACM0".into(),
        "/dev/ttyACM1".into(),
        "/dev/ttyUSB0".into(),
        "/dev/ttyUSB1".into(),
        "/dev/serial0".into(),
    ]
}

/// Opens each candidate in turn and keeps the first one whose input
/// satisfies `tester` within `window`. Ports are closed again after probing.
pub async fn autodetect_port<T: PortTester>(
    candidate_devs: Vec<String>,
    baud: u32,
    tester: &T,
    window: Duration,
) -> Result<AutodetectResult> {
    let mut probes = Vec::new();

    for dev in candidate_devs {
        let start = Instant::now();

        let (matched, bytes_seen, note) = match tokio_serial::new(&dev, baud).open_native_async() {
            Ok(mut port) => match probe_stream(&mut port, tester, window).await {
                Ok((true, n)) => (true, n, "matched".to_string()),
                Ok((false, n)) => (false, n, "no match".to_string()),
                Err(e) => (false, 0, format!("read failed: {}", e)),
            },
            Err(e) => {
                warn!("imu autodetect probe failed dev={} baud={} err={}", dev, baud, e);
                (false, 0, format!("open failed: {}", e))
            }
        };

        probes.push(ProbeResult {
            dev: dev.clone(),
            matched,
            bytes_seen,
            elapsed_ms: start.elapsed().as_millis() as u64,
            note,
        });

        if matched {
            info!("imu autodetect: OK {} @ {}", dev, baud);
            return Ok(AutodetectResult { chosen: Some(dev), probes });
        }
    }

    Ok(AutodetectResult { chosen: None, probes })
}

/// Accumulates input from `stream` until `tester` accepts it or `window`
/// runs out. Returns whether it matched and how many bytes were seen.
pub async fn probe_stream<R, T>(stream: &mut R, tester: &T, window: Duration) -> Result<(bool, usize)>
where
    R: AsyncRead + Unpin,
    T: PortTester + ?Sized,
{
    let deadline = tokio::time::Instant::now() + window;
    let mut seen = Vec::new();
    let mut buf = [0u8; 256];

    loop {
        let n = match tokio::time::timeout_at(deadline, stream.read(&mut buf)).await {
            Ok(r) => r?,
            Err(_) => break,
        };
        if n == 0 {
            break;
        }
        seen.extend_from_slice(&buf[..n]);
        if tester.test(&String::from_utf8_lossy(&seen)) {
            return Ok((true, seen.len()));
        }
    }
    Ok((false, seen.len()))
}
