use gear_imu::probe::{PortTester, TeensyProbe};
use gear_imu::reader::ImuPipeline;

fn record(time_us: u32, sensor_yaw_rad: f32) -> String {
    format!("{:08X},01,00000000,00000000,{:08X},\r\n", time_us, sensor_yaw_rad.to_bits())
}

/// Three CCW revolutions sampled at 100Hz, 12 degrees per sample.
fn spin_stream() -> (String, f64) {
    let mut s = String::from("TeensyIMU\r\n");
    let mut truth = 0.0f64;
    for i in 0..=90u32 {
        let wrapped = (truth + 180.0).rem_euclid(360.0) - 180.0;
        // sensor reports the opposite sign
        let sensor = -(wrapped.to_radians()) as f32;
        s.push_str(&record(i * 10_000, sensor));
        truth += 12.0;
    }
    (s, truth - 12.0)
}

#[test]
fn chunked_stream_recovers_total_rotation() {
    let (stream, truth) = spin_stream();
    let bytes = stream.as_bytes();

    for chunk in [1usize, 7, 41, 64, 500] {
        let mut p = ImuPipeline::new(4096, 5000.0);
        let mut last = None;
        for c in bytes.chunks(chunk) {
            if let Some(h) = p.feed(c) {
                last = Some(h);
            }
        }
        let h = last.expect("heading");
        assert!((h.yaw_deg - truth).abs() < 1e-2, "chunk={} yaw={} truth={}", chunk, h.yaw_deg, truth);
        assert!((h.rate_dps.unwrap() - 1200.0).abs() < 1.0);
        assert_eq!(p.stats().accepted, 91);
        // the banner line is framed but rejected by the decoder
        assert_eq!(p.stats().rejected, 1);
    }
}

#[test]
fn probe_accepts_start_of_stream() {
    let (stream, _) = spin_stream();
    assert!(TeensyProbe.test(&stream[..15]));
    // banner missed, records still identify the device
    assert!(TeensyProbe.test(&stream[11..11 + 41]));
}

#[test]
fn corrupted_middle_of_stream_is_skipped() {
    let mut p = ImuPipeline::new(4096, 5000.0);
    let mut raw = record(0, 0.0);
    raw.push_str("00000A,01,000");
    raw.push('\n'); // lost \r: fragment dropped
    raw.push_str(&record(10_000, -(10.0f32.to_radians())));
    let h = p.feed(raw.as_bytes()).unwrap();
    assert!((h.yaw_deg - 10.0).abs() < 1e-4);
    assert_eq!(p.frame_sync().stats().fragments_dropped, 1);
}
