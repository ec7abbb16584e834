//! Dead-reckoning stand-in for the drive, vision and gear subsystems.
//!
//! Used for dry runs of a script on the bench and in tests. Motion and
//! measurement take a fixed number of polls to finish; delays last their
//! duration in scheduler ticks. Measurements replay a configured list.

use gear_proto::heading::GearMeasurement;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::subsystems::{ActionPoll, Ejector, Subsystems, VisionMode};

#[derive(Debug, Clone, Deserialize)]
pub struct SimConfig {
    /// Polls each action reports Running before completing.
    #[serde(default = "default_ticks_per_action")]
    pub ticks_per_action: u32,
    /// Replayed in order by MeasureGear, last one repeats.
    #[serde(default = "default_measurements")]
    pub measurements: Vec<GearMeasurement>,
}

fn default_ticks_per_action() -> u32 {
    3
}

fn default_measurements() -> Vec<GearMeasurement> {
    vec![
        GearMeasurement { distance_in: 46.0, yaw_deg: 4.0 },
        GearMeasurement { distance_in: 24.5, yaw_deg: 0.5 },
    ]
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { ticks_per_action: default_ticks_per_action(), measurements: default_measurements() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pose {
    pub x_in: f64,
    pub y_in: f64,
    /// + is CCW viewed from above
    pub heading_deg: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimAction {
    Turn(f64),
    Drive(f64),
    Delay(Duration),
    Vision(VisionMode),
    Measure,
    Pulse(Ejector),
    Stop,
}

#[derive(Debug, Clone, Copy)]
enum Pending {
    Turn(f64),
    Drive(f64),
    Delay,
    Measure,
}

const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(20);

#[derive(Debug)]
pub struct SimRobot {
    cfg: SimConfig,
    tick_period: Duration,
    pose: Pose,
    vision: VisionMode,
    pending: Option<(Pending, u32)>,
    next_measurement: usize,
    actions: Vec<SimAction>,
    stopped: bool,
}

impl SimRobot {
    pub fn new(cfg: SimConfig) -> Self {
        Self {
            cfg,
            tick_period: DEFAULT_TICK_PERIOD,
            pose: Pose::default(),
            vision: VisionMode::Off,
            pending: None,
            next_measurement: 0,
            actions: Vec::new(),
            stopped: false,
        }
    }

    /// Scheduler period the robot is polled at; sets how long delays last.
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    fn begin(&mut self, p: Pending, action: SimAction) {
        let polls = self.cfg.ticks_per_action;
        self.begin_for(p, action, polls);
    }

    fn begin_for(&mut self, p: Pending, action: SimAction, running_polls: u32) {
        debug!("sim: start {:?}", action);
        self.actions.push(action);
        self.pending = Some((p, running_polls));
    }

    /// Polls reporting Running before a delay of `d` completes.
    fn delay_polls(&self, d: Duration) -> u32 {
        let period = self.tick_period.as_micros().max(1);
        let ticks = d.as_micros().div_ceil(period);
        u32::try_from(ticks.saturating_sub(1)).unwrap_or(u32::MAX)
    }

    fn finish(&mut self, p: Pending) -> ActionPoll {
        match p {
            Pending::Turn(deg) => {
                self.pose.heading_deg += deg;
                ActionPoll::Complete
            }
            Pending::Drive(d) => {
                let h = self.pose.heading_deg.to_radians();
                self.pose.x_in += d * h.cos();
                self.pose.y_in += d * h.sin();
                ActionPoll::Complete
            }
            Pending::Delay => ActionPoll::Complete,
            Pending::Measure => {
                // no target lock unless the camera is in gear mode
                if self.vision != VisionMode::Gear || self.cfg.measurements.is_empty() {
                    return ActionPoll::Complete;
                }
                let i = self.next_measurement.min(self.cfg.measurements.len() - 1);
                self.next_measurement += 1;
                ActionPoll::Measured(self.cfg.measurements[i])
            }
        }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn actions(&self) -> &[SimAction] {
        &self.actions
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl Subsystems for SimRobot {
    fn turn_by(&mut self, degrees: f64) {
        self.begin(Pending::Turn(degrees), SimAction::Turn(degrees));
    }

    fn drive_straight(&mut self, inches: f64) {
        self.begin(Pending::Drive(inches), SimAction::Drive(inches));
    }

    fn delay(&mut self, duration: Duration) {
        let polls = self.delay_polls(duration);
        self.begin_for(Pending::Delay, SimAction::Delay(duration), polls);
    }

    fn set_vision_mode(&mut self, mode: VisionMode) {
        self.vision = mode;
        self.actions.push(SimAction::Vision(mode));
    }

    fn start_measurement(&mut self) {
        self.begin(Pending::Measure, SimAction::Measure);
    }

    fn pulse_ejector(&mut self, ejector: Ejector) {
        self.actions.push(SimAction::Pulse(ejector));
    }

    fn stop_all(&mut self) {
        self.pending = None;
        self.stopped = true;
        self.actions.push(SimAction::Stop);
        info!("sim: stopped at x={:.1}in y={:.1}in heading={:.1}deg", self.pose.x_in, self.pose.y_in, self.pose.heading_deg);
    }

    fn poll_action(&mut self) -> ActionPoll {
        match self.pending.take() {
            None => ActionPoll::Complete,
            Some((p, 0)) => self.finish(p),
            Some((p, n)) => {
                self.pending = Some((p, n - 1));
                ActionPoll::Running
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn robot(ticks: u32) -> SimRobot {
        SimRobot::new(SimConfig { ticks_per_action: ticks, ..SimConfig::default() })
    }

    #[test]
    fn action_runs_for_configured_polls() {
        let mut r = robot(2);
        r.drive_straight(10.0);
        assert_eq!(r.poll_action(), ActionPoll::Running);
        assert_eq!(r.poll_action(), ActionPoll::Running);
        assert_eq!(r.poll_action(), ActionPoll::Complete);
        assert!((r.pose().x_in - 10.0).abs() < 1e-9);
    }

    #[test]
    fn turn_then_drive_dead_reckons() {
        let mut r = robot(0);
        r.turn_by(90.0);
        r.poll_action();
        r.drive_straight(-12.0);
        r.poll_action();
        let p = r.pose();
        assert!(p.x_in.abs() < 1e-9);
        assert!((p.y_in + 12.0).abs() < 1e-9);
        assert_eq!(p.heading_deg, 90.0);
    }

    #[test]
    fn delay_lasts_its_duration_in_ticks() {
        let mut r = robot(0).with_tick_period(Duration::from_millis(20));
        r.delay(Duration::from_millis(100));
        for _ in 0..4 {
            assert_eq!(r.poll_action(), ActionPoll::Running);
        }
        assert_eq!(r.poll_action(), ActionPoll::Complete);

        // partial ticks round up
        r.delay(Duration::from_millis(30));
        assert_eq!(r.poll_action(), ActionPoll::Running);
        assert_eq!(r.poll_action(), ActionPoll::Complete);

        r.delay(Duration::ZERO);
        assert_eq!(r.poll_action(), ActionPoll::Complete);
    }

    #[test]
    fn measurement_needs_gear_mode() {
        let mut r = robot(0);
        r.start_measurement();
        assert_eq!(r.poll_action(), ActionPoll::Complete);

        r.set_vision_mode(VisionMode::Gear);
        r.start_measurement();
        assert_eq!(r.poll_action(), ActionPoll::Measured(GearMeasurement { distance_in: 46.0, yaw_deg: 4.0 }));
        r.start_measurement();
        r.poll_action();
        r.start_measurement();
        // last measurement repeats
        assert_eq!(r.poll_action(), ActionPoll::Measured(GearMeasurement { distance_in: 24.5, yaw_deg: 0.5 }));
    }
}
