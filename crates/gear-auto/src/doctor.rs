use anyhow::Result;

use crate::script::{Instruction, Program};
use crate::AutoConfig;

/// Checks what the parser cannot: every jump target exists, the script ends
/// in End, and the start position is one BranchOnLocation understands.
pub fn check_script(program: &Program, position: u8) -> Result<()> {
    anyhow::ensure!(!program.is_empty(), "auto.script is empty");

    for (row, entry) in program.entries().iter().enumerate() {
        for label in entry.instruction.targets() {
            anyhow::ensure!(program.find_label(label).is_some(), "row {}: label {} not found", row, label);
        }
        if matches!(entry.instruction, Instruction::BranchOnLocation(_)) {
            anyhow::ensure!((1..=3).contains(&position), "row {}: BranchOnLocation needs auto.position 1..3, got {}", row, position);
        }
    }

    let last = program.entries().last().map(|e| &e.instruction);
    anyhow::ensure!(
        matches!(last, Some(Instruction::End) | Some(Instruction::Goto(_))),
        "script must finish in End (last row falls off the end)"
    );
    anyhow::ensure!(
        program.entries().iter().any(|e| e.instruction == Instruction::End),
        "script has no End"
    );
    Ok(())
}

pub fn check_auto(cfg: &AutoConfig) -> Result<Program> {
    anyhow::ensure!((1..=3).contains(&cfg.position), "auto.position must be 1, 2 or 3");
    let tick = cfg.tick_ms.unwrap_or(20);
    anyhow::ensure!((1..=1000).contains(&tick), "auto.tick_ms should be 1..1000");
    let program = cfg.program()?;
    check_script(&program, cfg.position)?;
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GEAR_MISSION;

    fn program(rows: &[(&str, &str)]) -> Program {
        Program::parse(rows.iter().copied()).unwrap()
    }

    #[test]
    fn gear_mission_is_clean() {
        check_script(&program(GEAR_MISSION), 2).unwrap();
    }

    #[test]
    fn missing_label_caught() {
        let err = check_script(&program(&[("", "Goto Vis"), ("", "End")]), 1).unwrap_err();
        assert!(err.to_string().contains("Vis"));
    }

    #[test]
    fn fallthrough_caught() {
        assert!(check_script(&program(&[("", "End"), ("", "TurnBy 5")]), 1).is_err());
        assert!(check_script(&program(&[("L", "TurnBy 5"), ("", "Goto L")]), 1).is_err());
    }

    #[test]
    fn branch_needs_valid_position() {
        let p = program(GEAR_MISSION);
        assert!(check_script(&p, 0).is_err());
        assert!(check_script(&p, 4).is_err());
    }
}
