use anyhow::Result;

use crate::ImuConfig;

pub fn check_imu(cfg: &ImuConfig) -> Result<()> {
    if !cfg.autodetect {
        anyhow::ensure!(cfg.serial_dev.as_ref().map(|s| !s.is_empty()).unwrap_or(false), "imu.serial_dev missing");
    }
    anyhow::ensure!(cfg.baud() > 0, "imu.baud invalid");
    if let Some(devs) = &cfg.candidate_devs {
        anyhow::ensure!(!devs.is_empty(), "imu.candidate_devs is empty");
    }
    let probe_ms = cfg.probe_timeout_ms.unwrap_or(1000);
    anyhow::ensure!((100..=10_000).contains(&probe_ms), "imu.probe_timeout_ms should be 100..10000");
    let poll_ms = cfg.poll_interval_ms.unwrap_or(50);
    anyhow::ensure!((1..=1000).contains(&poll_ms), "imu.poll_interval_ms should be 1..1000");
    if let Some(r) = cfg.max_rate_dps {
        anyhow::ensure!(r > 0.0, "imu.max_rate_dps must be positive");
    }
    if let Some(b) = cfg.max_buffer_bytes {
        // must hold at least one full record plus terminator
        anyhow::ensure!(b >= crate::decode::IMU_MESSAGE_LEN + 2, "imu.max_buffer_bytes too small");
    }
    Ok(())
}
