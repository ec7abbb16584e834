use std::time::Duration;

use gear_auto::runner;
use gear_auto::scripter::{RunState, Scripter, Step};
use gear_auto::sim::{SimAction, SimConfig, SimRobot};
use gear_auto::subsystems::{Ejector, VisionMode};
use gear_auto::AutoConfig;

fn auto_config(toml_src: &str) -> AutoConfig {
    toml::from_str(toml_src).expect("auto config")
}

#[tokio::test]
async fn gear_mission_from_center() {
    let cfg = auto_config("position = 2\ntick_ms = 1\n");
    let program = gear_auto::doctor::check_auto(&cfg).unwrap();
    let mut scripter = Scripter::new(program, cfg.position, cfg.stale_policy());
    let mut robot = SimRobot::new(SimConfig::default());

    let mut dispatched = Vec::new();
    let summary = runner::run(&mut scripter, &mut robot, cfg.tick_period(), Some(10_000), |s, step| {
        dispatched.push((s.last_pc().unwrap(), step));
    })
    .await
    .unwrap();

    assert_eq!(scripter.state(), RunState::Finished);
    assert_eq!(dispatched.first().unwrap().0, 0);
    assert_eq!(dispatched.last().unwrap(), &(17, Step::Finished));
    assert_eq!(summary.instructions as usize, dispatched.len());

    assert_eq!(
        robot.actions(),
        &[
            SimAction::Drive(29.0),
            SimAction::Vision(VisionMode::Gear),
            SimAction::Measure,
            SimAction::Turn(-4.0),
            SimAction::Drive(25.0),
            SimAction::Measure,
            SimAction::Turn(-0.5),
            SimAction::Drive(9.5),
            SimAction::Pulse(Ejector::A),
            SimAction::Pulse(Ejector::B),
            SimAction::Drive(-12.0),
            SimAction::Stop,
        ]
    );
    assert!(robot.is_stopped());
    assert_eq!(scripter.context().measurements(), 2);
}

#[tokio::test]
async fn side_positions_turn_toward_the_peg() {
    for (position, turn) in [(1u8, -60.0), (3, 60.0)] {
        let cfg = auto_config(&format!("position = {}\ntick_ms = 1\n", position));
        let mut scripter = Scripter::new(cfg.program().unwrap(), position, cfg.stale_policy());
        let mut robot = SimRobot::new(SimConfig { ticks_per_action: 0, ..SimConfig::default() });

        runner::run(&mut scripter, &mut robot, cfg.tick_period(), Some(1_000), |_, _| {}).await.unwrap();
        assert_eq!(&robot.actions()[..2], &[SimAction::Drive(84.0), SimAction::Turn(turn)]);
    }
}

#[tokio::test]
async fn custom_script_without_vision_faults_on_stale_measurement() {
    let cfg = auto_config(
        r#"
position = 1
tick_ms = 1

[[script]]
op = "MeasureGear"

[[script]]
op = "YawCorrect"

[[script]]
op = "End"
"#,
    );
    let mut scripter = Scripter::new(cfg.program().unwrap(), cfg.position, cfg.stale_policy());
    let mut robot = SimRobot::new(SimConfig::default());

    let err = runner::run(&mut scripter, &mut robot, Duration::from_millis(1), Some(100), |_, _| {})
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("yaw correction without a fresh measurement"));
    assert_eq!(scripter.state(), RunState::Faulted);
}

#[tokio::test]
async fn endless_loop_hits_tick_budget() {
    let cfg = auto_config(
        r#"
position = 1

[[script]]
label = "Top"
op = "Delay 1"

[[script]]
op = "Goto Top"
"#,
    );
    let mut scripter = Scripter::new(cfg.program().unwrap(), cfg.position, cfg.stale_policy());
    let mut robot = SimRobot::new(SimConfig { ticks_per_action: 0, ..SimConfig::default() });

    let err = runner::run(&mut scripter, &mut robot, Duration::from_millis(1), Some(20), |_, _| {})
        .await
        .unwrap_err();
    assert!(err.to_string().contains("did not reach End"));
}

#[tokio::test]
async fn delay_holds_the_script_for_its_duration() {
    let cfg = auto_config(
        r#"
position = 1
tick_ms = 1

[[script]]
op = "Delay 5"

[[script]]
op = "End"
"#,
    );
    let mut scripter = Scripter::new(cfg.program().unwrap(), cfg.position, cfg.stale_policy());
    let mut robot = SimRobot::new(SimConfig { ticks_per_action: 0, ..SimConfig::default() }).with_tick_period(cfg.tick_period());

    let summary = runner::run(&mut scripter, &mut robot, cfg.tick_period(), Some(100), |_, _| {}).await.unwrap();
    // dispatch, four busy ticks, then End once the delay completes
    assert_eq!(summary.ticks, 6);
    assert_eq!(summary.instructions, 2);
    assert_eq!(robot.actions()[0], SimAction::Delay(Duration::from_millis(5)));
}
