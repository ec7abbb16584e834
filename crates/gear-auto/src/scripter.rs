use thiserror::Error;
use tracing::{debug, info, warn};

use crate::context::{ExecutionContext, StalePolicy};
use crate::script::{Instruction, Program};
use crate::subsystems::{ActionKind, ActionPoll, Ejector, Subsystems, VisionMode};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("label {label} not found")]
    LabelNotFound { label: String },
    #[error("unknown start position {0}")]
    UnknownPosition(u8),
    #[error("pc {pc} is out of bounds (did you forget End in the script?)")]
    ProgramOverrun { pc: usize },
    #[error("{field} correction without a fresh measurement")]
    StaleMeasurement { field: &'static str },
    #[error("step requested while an action is still running (pc {pc})")]
    Busy { pc: usize },
    #[error("script already faulted")]
    Faulted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// End executed; the scripter stays parked.
    Finished,
    Faulted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// An action is still in flight, nothing dispatched.
    Busy,
    /// Dispatched an instruction that started a long-running action.
    Started(ActionKind),
    /// Dispatched an instruction that completed on the spot.
    Immediate,
    /// Dispatched End.
    Finished,
    /// Already finished, nothing to do.
    Parked,
}

/// Executes a [`Program`] one instruction at a time.
///
/// The program counter is the only state that matters for sequencing. Each
/// `step` reads the row at pc, advances pc, then dispatches. Only one action
/// may be outstanding; `tick` polls it and steps again once it completes.
#[derive(Debug)]
pub struct Scripter {
    program: Program,
    pc: usize,
    position: u8,
    ctx: ExecutionContext,
    stale_policy: StalePolicy,
    in_flight: Option<ActionKind>,
    state: RunState,
    last_pc: Option<usize>,
}

impl Scripter {
    pub fn new(program: Program, position: u8, stale_policy: StalePolicy) -> Self {
        Self {
            program,
            pc: 0,
            position,
            ctx: ExecutionContext::default(),
            stale_policy,
            in_flight: None,
            state: RunState::Running,
            last_pc: None,
        }
    }

    /// Back to the first row. The execution context survives.
    pub fn restart(&mut self) {
        self.pc = 0;
        self.in_flight = None;
        self.state = RunState::Running;
        self.last_pc = None;
    }

    /// Scheduler entry point: call once per tick.
    pub fn tick<S: Subsystems + ?Sized>(&mut self, hw: &mut S) -> Result<Step, ScriptError> {
        match self.state {
            RunState::Finished => return Ok(Step::Parked),
            RunState::Faulted => return Err(ScriptError::Faulted),
            RunState::Running => {}
        }

        if let Some(kind) = self.in_flight {
            match hw.poll_action() {
                ActionPoll::Running => return Ok(Step::Busy),
                ActionPoll::Complete => {
                    if kind == ActionKind::Measure {
                        warn!("scripter: measurement finished without a result");
                    }
                }
                ActionPoll::Measured(m) => {
                    if kind == ActionKind::Measure {
                        debug!("scripter: measured distance={:.1}in yaw={:.1}deg", m.distance_in, m.yaw_deg);
                        self.ctx.record(m);
                    } else {
                        warn!("scripter: ignoring measurement from {:?} action", kind);
                    }
                }
            }
            self.in_flight = None;
        }

        self.step(hw)
    }

    /// Executes the next instruction. Refuses while an action is in flight.
    pub fn step<S: Subsystems + ?Sized>(&mut self, hw: &mut S) -> Result<Step, ScriptError> {
        match self.state {
            RunState::Finished => {
                debug!("scripter: parked in End");
                return Ok(Step::Parked);
            }
            RunState::Faulted => return Err(ScriptError::Faulted),
            RunState::Running => {}
        }
        if self.in_flight.is_some() {
            return Err(ScriptError::Busy { pc: self.pc });
        }

        match self.dispatch(hw) {
            Ok(step) => Ok(step),
            Err(e) => {
                warn!("scripter: fault at pc {}: {}", self.last_pc.unwrap_or(self.pc), e);
                self.state = RunState::Faulted;
                Err(e)
            }
        }
    }

    fn dispatch<S: Subsystems + ?Sized>(&mut self, hw: &mut S) -> Result<Step, ScriptError> {
        let pc = self.pc;
        let instruction = match self.program.get(pc) {
            Some(entry) => entry.instruction.clone(),
            None => return Err(ScriptError::ProgramOverrun { pc }),
        };
        self.pc += 1;
        self.last_pc = Some(pc);
        debug!("scripter: [{}] {}", pc, instruction);

        let step = match instruction {
            Instruction::Goto(label) => {
                self.goto(&label)?;
                Step::Immediate
            }
            Instruction::Delay(d) => {
                hw.delay(d);
                self.start(ActionKind::Delay)
            }
            Instruction::BranchOnLocation([l1, l2, l3]) => {
                let label = match self.position {
                    1 => l1,
                    2 => l2,
                    3 => l3,
                    other => return Err(ScriptError::UnknownPosition(other)),
                };
                self.goto(&label)?;
                Step::Immediate
            }
            Instruction::TurnBy(deg) => {
                hw.turn_by(deg);
                self.start(ActionKind::Turn)
            }
            Instruction::DriveStraight(inches) => {
                hw.drive_straight(inches);
                self.start(ActionKind::Drive)
            }
            Instruction::EnableVisionGear => {
                hw.set_vision_mode(VisionMode::Gear);
                Step::Immediate
            }
            Instruction::MeasureGear => {
                hw.start_measurement();
                self.start(ActionKind::Measure)
            }
            Instruction::YawCorrect => {
                let yaw = match self.ctx.take_yaw() {
                    Some(v) => v,
                    None => self.stale("yaw", self.ctx.yaw_deg())?,
                };
                hw.turn_by(-yaw);
                self.start(ActionKind::Turn)
            }
            Instruction::DistanceCorrect(standoff) => {
                let dist = match self.ctx.take_distance() {
                    Some(v) => v,
                    None => self.stale("distance", self.ctx.distance_in())?,
                };
                hw.drive_straight(dist - standoff);
                self.start(ActionKind::Drive)
            }
            Instruction::DeliverGear => {
                hw.pulse_ejector(Ejector::A);
                hw.pulse_ejector(Ejector::B);
                Step::Immediate
            }
            Instruction::End => {
                hw.stop_all();
                self.state = RunState::Finished;
                info!("scripter: End reached at pc {}", pc);
                Step::Finished
            }
        };
        Ok(step)
    }

    fn goto(&mut self, label: &str) -> Result<(), ScriptError> {
        match self.program.find_label(label) {
            Some(i) => {
                self.pc = i;
                Ok(())
            }
            None => Err(ScriptError::LabelNotFound { label: label.to_string() }),
        }
    }

    fn start(&mut self, kind: ActionKind) -> Step {
        self.in_flight = Some(kind);
        Step::Started(kind)
    }

    fn stale(&self, field: &'static str, old: f64) -> Result<f64, ScriptError> {
        match self.stale_policy {
            StalePolicy::Reject => Err(ScriptError::StaleMeasurement { field }),
            StalePolicy::Warn => {
                warn!("scripter: {} correction reusing stale measurement {:.1}", field, old);
                Ok(old)
            }
        }
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Row of the most recently dispatched instruction.
    pub fn last_pc(&self) -> Option<usize> {
        self.last_pc
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    pub fn program(&self) -> &Program {
        &self.program
    }
}
