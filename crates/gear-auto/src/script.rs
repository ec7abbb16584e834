//! Autonomous script programs.
//!
//! A script is a table of `(label, instruction)` rows. The label column is
//! optional (empty means none); the instruction is a space-delimited line
//! whose first token is the opcode. Rows are parsed once, at load time, into
//! typed [`Instruction`]s so a bad opcode or argument never reaches the
//! field. Label references are resolved when they execute.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Continue at the row carrying this label.
    Goto(String),
    /// Pause for the given time.
    Delay(Duration),
    /// Goto one of three labels depending on the operator start position (1, 2, 3).
    BranchOnLocation([String; 3]),
    /// Turn in place, degrees, + is CCW viewed from above.
    TurnBy(f64),
    /// Drive straight, inches, negative backs up.
    DriveStraight(f64),
    EnableVisionGear,
    /// Sample vision; on completion the measured distance and yaw are stored.
    MeasureGear,
    /// Turn by minus the measured yaw.
    YawCorrect,
    /// Drive the measured distance less this standoff (inches).
    DistanceCorrect(f64),
    /// Pulse both gear ejectors.
    DeliverGear,
    /// Stop everything. Scripts must finish here.
    End,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("row {row}: empty instruction")]
    Empty { row: usize },
    #[error("row {row}: unknown instruction: {opcode}")]
    UnknownOpcode { row: usize, opcode: String },
    #[error("row {row}: {opcode} takes {expected} argument(s), got {got}")]
    ArgCount { row: usize, opcode: String, expected: usize, got: usize },
    #[error("row {row}: bad numeric argument {arg:?}")]
    BadNumber { row: usize, arg: String },
}

impl Instruction {
    pub fn opcode(&self) -> &'static str {
        match self {
            Instruction::Goto(_) => "Goto",
            Instruction::Delay(_) => "Delay",
            Instruction::BranchOnLocation(_) => "BranchOnLocation",
            Instruction::TurnBy(_) => "TurnBy",
            Instruction::DriveStraight(_) => "DriveStraight",
            Instruction::EnableVisionGear => "EnableVisionGear",
            Instruction::MeasureGear => "MeasureGear",
            Instruction::YawCorrect => "YawCorrect",
            Instruction::DistanceCorrect(_) => "DistanceCorrect",
            Instruction::DeliverGear => "DeliverGear",
            Instruction::End => "End",
        }
    }

    /// Parses one instruction line. `row` is only used for error reporting.
    pub fn parse(row: usize, text: &str) -> Result<Self, ParseError> {
        let mut tokens = text.split_whitespace();
        let opcode = tokens.next().ok_or(ParseError::Empty { row })?;
        let args: Vec<&str> = tokens.collect();

        let expect = |n: usize| {
            if args.len() == n {
                Ok(())
            } else {
                Err(ParseError::ArgCount { row, opcode: opcode.to_string(), expected: n, got: args.len() })
            }
        };
        let num = |s: &str| s.parse::<f64>().ok().filter(|v| v.is_finite()).ok_or(ParseError::BadNumber { row, arg: s.to_string() });

        let ins = match opcode {
            "Goto" => {
                expect(1)?;
                Instruction::Goto(args[0].to_string())
            }
            "Delay" => {
                expect(1)?;
                let ms = args[0].parse::<u64>().map_err(|_| ParseError::BadNumber { row, arg: args[0].to_string() })?;
                Instruction::Delay(Duration::from_millis(ms))
            }
            "BranchOnLocation" => {
                expect(3)?;
                Instruction::BranchOnLocation([args[0].to_string(), args[1].to_string(), args[2].to_string()])
            }
            "TurnBy" => {
                expect(1)?;
                Instruction::TurnBy(num(args[0])?)
            }
            "DriveStraight" => {
                expect(1)?;
                Instruction::DriveStraight(num(args[0])?)
            }
            "EnableVisionGear" => {
                expect(0)?;
                Instruction::EnableVisionGear
            }
            "MeasureGear" => {
                expect(0)?;
                Instruction::MeasureGear
            }
            "YawCorrect" => {
                expect(0)?;
                Instruction::YawCorrect
            }
            "DistanceCorrect" => {
                expect(1)?;
                Instruction::DistanceCorrect(num(args[0])?)
            }
            "DeliverGear" => {
                expect(0)?;
                Instruction::DeliverGear
            }
            "End" => {
                expect(0)?;
                Instruction::End
            }
            other => return Err(ParseError::UnknownOpcode { row, opcode: other.to_string() }),
        };
        Ok(ins)
    }

    /// Labels this instruction may jump to.
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Instruction::Goto(l) => vec![l.as_str()],
            Instruction::BranchOnLocation(ls) => ls.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Goto(l) => write!(f, "Goto {}", l),
            Instruction::Delay(d) => write!(f, "Delay {}", d.as_millis()),
            Instruction::BranchOnLocation([a, b, c]) => write!(f, "BranchOnLocation {} {} {}", a, b, c),
            Instruction::TurnBy(d) => write!(f, "TurnBy {:.1}", d),
            Instruction::DriveStraight(d) => write!(f, "DriveStraight {:.1}", d),
            Instruction::DistanceCorrect(d) => write!(f, "DistanceCorrect {:.1}", d),
            other => f.write_str(other.opcode()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptEntry {
    pub label: Option<String>,
    pub instruction: Instruction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    entries: Vec<ScriptEntry>,
}

impl Program {
    pub fn parse<'a, I>(rows: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let entries = rows
            .into_iter()
            .enumerate()
            .map(|(row, (label, text))| -> Result<ScriptEntry, ParseError> {
                let label = label.trim();
                Ok(ScriptEntry {
                    label: (!label.is_empty()).then(|| label.to_string()),
                    instruction: Instruction::parse(row, text)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// Index of the first row carrying `label`.
    pub fn find_label(&self, label: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.label.as_deref() == Some(label))
    }

    pub fn get(&self, pc: usize) -> Option<&ScriptEntry> {
        self.entries.get(pc)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ScriptEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_opcode() {
        let p = Program::parse([
            ("", "BranchOnLocation Loc1 Loc2 Loc3"),
            ("Loc1", "DriveStraight 84.0"),
            ("", "TurnBy   -60"),
            ("Loc2", "Delay 500"),
            ("Loc3", "EnableVisionGear"),
            ("", "MeasureGear"),
            ("", "YawCorrect"),
            ("", "DistanceCorrect 21.0"),
            ("", "DeliverGear"),
            (" ", "Goto Loc3"),
            ("", "End"),
        ])
        .unwrap();

        assert_eq!(p.len(), 11);
        assert_eq!(p.get(2).unwrap().instruction, Instruction::TurnBy(-60.0));
        assert_eq!(p.get(3).unwrap().instruction, Instruction::Delay(Duration::from_millis(500)));
        assert_eq!(p.get(9).unwrap().label, None);
        assert_eq!(p.find_label("Loc3"), Some(4));
        assert_eq!(p.find_label("Nope"), None);
    }

    #[test]
    fn unknown_opcode_is_load_time_error() {
        let err = Program::parse([("", "End"), ("", "Fly 10")]).unwrap_err();
        assert_eq!(err, ParseError::UnknownOpcode { row: 1, opcode: "Fly".into() });
    }

    #[test]
    fn argument_errors() {
        assert!(matches!(Instruction::parse(0, "TurnBy"), Err(ParseError::ArgCount { expected: 1, got: 0, .. })));
        assert!(matches!(Instruction::parse(0, "End now"), Err(ParseError::ArgCount { expected: 0, got: 1, .. })));
        assert!(matches!(Instruction::parse(0, "BranchOnLocation A B"), Err(ParseError::ArgCount { .. })));
        assert!(matches!(Instruction::parse(0, "DriveStraight far"), Err(ParseError::BadNumber { .. })));
        assert!(matches!(Instruction::parse(0, "Delay -5"), Err(ParseError::BadNumber { .. })));
        assert!(matches!(Instruction::parse(0, "TurnBy NaN"), Err(ParseError::BadNumber { .. })));
        assert_eq!(Instruction::parse(3, "   "), Err(ParseError::Empty { row: 3 }));
    }

    #[test]
    fn first_label_wins() {
        let p = Program::parse([("A", "End"), ("A", "End")]).unwrap();
        assert_eq!(p.find_label("A"), Some(0));
    }

    #[test]
    fn display_round_trips_through_parse() {
        for text in ["Goto Vis", "Delay 200", "BranchOnLocation A B C", "TurnBy -60.0", "DistanceCorrect 15.0", "End"] {
            let ins = Instruction::parse(0, text).unwrap();
            assert_eq!(ins.to_string(), text);
        }
    }
}
