use crate::decode::IMU_MESSAGE_LEN;

/// Identification banner the IMU firmware prints once after boot.
pub const IDENT_TOKEN: &str = "TeensyIMU";

/// Decides, from everything read so far on a candidate port, whether the
/// port is the device we are looking for. Must be side-effect free: the
/// autodetect driver calls it repeatedly with a growing input.
pub trait PortTester {
    fn test(&self, input: &str) -> bool;
}

/// Spotting the IMU is a bit tricky. Opening the port does not reset it, so
/// a freshly powered board prints its ident banner once while a board that
/// stayed powered across a controller restart just keeps streaming records.
/// Either one seen within the probe window identifies the port.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeensyProbe;

impl PortTester for TeensyProbe {
    fn test(&self, input: &str) -> bool {
        if input.contains(IDENT_TOKEN) {
            return true;
        }
        input
            .split('\n')
            .any(|line| line.ends_with('\r') && line.len() == IMU_MESSAGE_LEN + 1)
    }
}

impl<F> PortTester for F
where
    F: Fn(&str) -> bool,
{
    fn test(&self, input: &str) -> bool {
        self(input)
    }
}
