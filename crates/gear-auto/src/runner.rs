use anyhow::Result;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::scripter::{Scripter, Step};
use crate::subsystems::Subsystems;

#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub ticks: u64,
    pub instructions: u64,
    pub elapsed: Duration,
}

/// Cooperative tick loop: ticks the scripter every `period` until End.
///
/// `observe` sees every tick that dispatched an instruction. `max_ticks`
/// bounds scripts that loop forever without ever reaching End.
pub async fn run<S, F>(
    scripter: &mut Scripter,
    hw: &mut S,
    period: Duration,
    max_ticks: Option<u64>,
    mut observe: F,
) -> Result<RunSummary>
where
    S: Subsystems + ?Sized,
    F: FnMut(&Scripter, Step),
{
    let start = Instant::now();
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut ticks = 0u64;
    let mut instructions = 0u64;

    loop {
        interval.tick().await;
        ticks += 1;

        let step = scripter.tick(hw).map_err(|e| {
            anyhow::anyhow!(e).context(format!("script faulted at pc {}", scripter.last_pc().unwrap_or(0)))
        })?;

        match step {
            Step::Busy => {}
            Step::Parked => break,
            other => {
                instructions += 1;
                observe(scripter, other);
                if other == Step::Finished {
                    break;
                }
            }
        }

        if let Some(max) = max_ticks {
            anyhow::ensure!(ticks < max, "script did not reach End within {} ticks", max);
        }
    }

    let summary = RunSummary { ticks, instructions, elapsed: start.elapsed() };
    info!("auto: finished after {} instructions, {} ticks ({:?})", summary.instructions, summary.ticks, summary.elapsed);
    Ok(summary)
}
