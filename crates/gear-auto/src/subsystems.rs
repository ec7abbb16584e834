use std::time::Duration;

use gear_proto::heading::GearMeasurement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionMode {
    Off,
    Gear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ejector {
    A,
    B,
}

/// Long-running actions the scripter waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Delay,
    Turn,
    Drive,
    Measure,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionPoll {
    Running,
    Complete,
    /// A measurement action finished with a result.
    Measured(GearMeasurement),
}

/// Everything the scripter drives. Start methods return immediately; the
/// action then runs until `poll_action` stops reporting `Running`. Only one
/// action is ever started before the previous one has completed.
pub trait Subsystems {
    fn turn_by(&mut self, degrees: f64);
    fn drive_straight(&mut self, inches: f64);
    fn delay(&mut self, duration: Duration);
    fn set_vision_mode(&mut self, mode: VisionMode);
    fn start_measurement(&mut self);
    fn pulse_ejector(&mut self, ejector: Ejector);
    fn stop_all(&mut self);
    fn poll_action(&mut self) -> ActionPoll;
}
