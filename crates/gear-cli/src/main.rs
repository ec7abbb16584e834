use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use gear_auto::doctor as auto_doctor;
use gear_auto::runner;
use gear_auto::scripter::{Scripter, Step};
use gear_auto::sim::{SimConfig, SimRobot};
use gear_auto::AutoConfig;
use gear_imu::autodetect::{autodetect_port, default_candidate_devs, AutodetectResult};
use gear_imu::doctor as imu_doctor;
use gear_imu::probe::TeensyProbe;
use gear_imu::reader::{open_serial, spawn_reader};
use gear_imu::state::ImuStatus;
use gear_imu::ImuConfig;
use gear_proto::telemetry::{EventKind, TelemetryEvent};

use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "gearbot", version, about = "gearbot - IMU heading and autonomous script tools")]
struct Cli {
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Doctor,
    Imu { #[command(subcommand)] cmd: ImuCmd },
    Auto { #[command(subcommand)] cmd: AutoCmd },
}

#[derive(Debug, Subcommand)]
enum ImuCmd {
    /// Probe candidate serial ports for the IMU.
    Autodetect,
    /// Stream the unwrapped heading until Ctrl-C.
    Watch {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
enum AutoCmd {
    /// Parse and lint the script, print the listing.
    Check,
    /// Run the script against the simulated robot.
    Simulate {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, serde::Deserialize)]
struct Config {
    imu: Option<ImuConfig>,
    auto: Option<AutoConfig>,
    sim: Option<SimConfig>,
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).with_context(|| format!("read config {}", path))?;
    toml::from_str(&s).context("parse config toml")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg)?,
        Command::Imu { cmd } => imu_cmd(&cfg, cmd).await?,
        Command::Auto { cmd } => auto_cmd(&cfg, cmd).await?,
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");

    match &cfg.imu {
        Some(imu) if imu.enable => imu_doctor::check_imu(imu)?,
        _ => info!("doctor: imu disabled"),
    }

    match &cfg.auto {
        Some(auto) => {
            let program = auto_doctor::check_auto(auto)?;
            info!("doctor: script OK ({} rows)", program.len());
        }
        None => warn!("doctor: no [auto] section"),
    }

    info!("doctor: OK");
    Ok(())
}

async fn imu_cmd(cfg: &Config, cmd: ImuCmd) -> Result<()> {
    let imu = cfg.imu.as_ref().context("no [imu] config section")?;
    anyhow::ensure!(imu.enable, "imu.enable=false");

    match cmd {
        ImuCmd::Autodetect => {
            let res = run_imu_autodetect(imu).await?;
            match &res.chosen {
                Some(dev) => println!("CHOSEN: {} @ {}", dev, imu.baud()),
                None => println!("CHOSEN: none"),
            }
            for p in res.probes {
                println!("probe dev={} matched={} bytes={} {}ms note={}", p.dev, p.matched, p.bytes_seen, p.elapsed_ms, p.note);
            }
            Ok(())
        }
        ImuCmd::Watch { json } => watch_heading(imu, json).await,
    }
}

async fn watch_heading(imu: &ImuConfig, json: bool) -> Result<()> {
    let dev = resolve_imu_port(imu).await?;
    let port = open_serial(&dev, imu.baud())?;

    let status = Arc::new(Mutex::new(ImuStatus {
        port: Some(dev.clone()),
        baud: Some(imu.baud()),
        ..ImuStatus::default()
    }));
    let (heading, reader) = spawn_reader(port, imu.reader_config(), status.clone());
    info!("imu: watching {} (Ctrl-C to stop)", dev);

    let mut every = tokio::time::interval(Duration::from_millis(500));
    loop {
        tokio::select! {
            _ = every.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }

        let h = heading.latest();
        let (ok, rejected) = match status.lock() {
            Ok(st) => (st.frames_ok, st.frames_rejected),
            Err(_) => (0, 0),
        };
        if json {
            let mut ev = TelemetryEvent::new(now_unix_ms(), EventKind::Heading, format!("port={}", dev));
            ev.yaw_deg = Some(h.yaw_deg);
            ev.rate_dps = h.rate_dps;
            ev.frames_ok = Some(ok);
            ev.frames_rejected = Some(rejected);
            println!("{}", serde_json::to_string(&ev)?);
        } else {
            match h.rate_dps {
                Some(r) => println!("Yaw {:.2} deg  rate {:.1} deg/s  ok={} rejected={}", h.yaw_deg, r, ok, rejected),
                None => println!("Yaw {:.2} deg  ok={} rejected={}", h.yaw_deg, ok, rejected),
            }
        }
    }

    drop(heading);
    reader.await.context("imu reader task")?;
    if let Ok(st) = status.lock() {
        info!(
            "imu: stopped ok={} rejected={} fragments={} overflows={} read_errors={} last_sample_age={:?}",
            st.frames_ok, st.frames_rejected, st.fragments_dropped, st.overflows, st.read_errors, st.sample_age()
        );
    }
    Ok(())
}

async fn auto_cmd(cfg: &Config, cmd: AutoCmd) -> Result<()> {
    let auto = cfg.auto.as_ref().context("no [auto] config section")?;
    let program = auto_doctor::check_auto(auto)?;

    match cmd {
        AutoCmd::Check => {
            for (i, e) in program.entries().iter().enumerate() {
                println!("{:>3}  {:<10} {}", i, e.label.as_deref().unwrap_or(""), e.instruction);
            }
            println!("position={} stale_measurement={:?}", auto.position, auto.stale_policy());
            Ok(())
        }
        AutoCmd::Simulate { json } => {
            let mut scripter = Scripter::new(program, auto.position, auto.stale_policy());
            let mut robot = SimRobot::new(cfg.sim.clone().unwrap_or_default()).with_tick_period(auto.tick_period());

            let result = runner::run(&mut scripter, &mut robot, auto.tick_period(), auto.max_ticks, |s, step| {
                let pc = s.last_pc().unwrap_or(0);
                let text = s.program().get(pc).map(|e| e.instruction.to_string()).unwrap_or_default();
                if json {
                    let mut ev = TelemetryEvent::new(now_unix_ms(), EventKind::Instruction, format!("{} -> {:?}", text, step));
                    ev.pc = Some(pc);
                    if let Ok(line) = serde_json::to_string(&ev) {
                        println!("{}", line);
                    }
                } else if step != Step::Finished {
                    println!("[{:>3}] {:<28} {:?}", pc, text, step);
                } else {
                    println!("[{:>3}] {}", pc, text);
                }
            })
            .await;

            let pose = robot.pose();
            let (kind, msg) = match &result {
                Ok(sum) => (
                    EventKind::Finished,
                    format!(
                        "finished: {} instructions, {} ticks; pose x={:.1}in y={:.1}in heading={:.1}deg",
                        sum.instructions, sum.ticks, pose.x_in, pose.y_in, pose.heading_deg
                    ),
                ),
                Err(e) => (EventKind::Fault, format!("fault: {:#}", e)),
            };
            if json {
                let mut ev = TelemetryEvent::new(now_unix_ms(), kind, msg);
                ev.pc = scripter.last_pc();
                println!("{}", serde_json::to_string(&ev)?);
            } else {
                println!("{}", msg);
            }
            result.map(|_| ())
        }
    }
}

async fn run_imu_autodetect(imu: &ImuConfig) -> Result<AutodetectResult> {
    let devs = imu.candidate_devs.clone().unwrap_or_else(default_candidate_devs);
    let window = Duration::from_millis(imu.probe_timeout_ms.unwrap_or(1000));
    autodetect_port(devs, imu.baud(), &TeensyProbe, window).await
}

async fn resolve_imu_port(imu: &ImuConfig) -> Result<String> {
    if imu.autodetect {
        let res = run_imu_autodetect(imu).await?;
        if let Some(dev) = res.chosen {
            return Ok(dev);
        }
        anyhow::bail!("imu autodetect failed: no Teensy found");
    } else {
        imu.serial_dev.clone().context("imu.serial_dev missing (autodetect=false)")
    }
}

fn now_unix_ms() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
