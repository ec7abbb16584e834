pub mod context;
pub mod doctor;
pub mod runner;
pub mod script;
pub mod scripter;
pub mod sim;
pub mod subsystems;

use serde::Deserialize;

use crate::context::StalePolicy;
use crate::script::{ParseError, Program};

/// Gear delivery mission.
///
/// Dead reckoning assumes start positions 1 and 3 are 7' left and right of
/// the center line and position 2 is on the center line facing the peg.
pub const GEAR_MISSION: &[(&str, &str)] = &[
    ("", "BranchOnLocation Loc1 Loc2 Loc3"),
    ("Loc1", "DriveStraight 84.0"),
    ("", "TurnBy -60.0"),
    ("", "Goto Vis"),
    ("Loc2", "DriveStraight 29.0"),
    ("", "Goto Vis"),
    ("Loc3", "DriveStraight 84.0"),
    ("", "TurnBy 60.0"),
    ("Vis", "EnableVisionGear"), // ~4' from the airship wall, facing it
    ("", "MeasureGear"),
    ("", "YawCorrect"),
    ("", "DistanceCorrect 21.0"),
    ("", "MeasureGear"),
    ("", "YawCorrect"),
    ("", "DistanceCorrect 15.0"),
    ("", "DeliverGear"),
    ("", "DriveStraight -12.0"),
    ("", "End"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptRow {
    #[serde(default)]
    pub label: String,
    pub op: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutoConfig {
    /// Operator start position: 1, 2 or 3.
    pub position: u8,

    /// Scheduler period. Default 20ms.
    pub tick_ms: Option<u64>,

    /// Default "reject".
    pub stale_measurement: Option<StalePolicy>,

    /// Abort if End is not reached within this many ticks.
    pub max_ticks: Option<u64>,

    /// Script rows; the built-in gear mission when absent.
    pub script: Option<Vec<ScriptRow>>,
}

impl AutoConfig {
    pub fn program(&self) -> Result<Program, ParseError> {
        match &self.script {
            Some(rows) => Program::parse(rows.iter().map(|r| (r.label.as_str(), r.op.as_str()))),
            None => Program::parse(GEAR_MISSION.iter().copied()),
        }
    }

    pub fn tick_period(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_ms.unwrap_or(20))
    }

    pub fn stale_policy(&self) -> StalePolicy {
        self.stale_measurement.unwrap_or_default()
    }
}
