//! Monitor state machine: shutdown triggers, the shutdown sequence and
//! parameter persistence.
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use psu_core::mocks::{MemoryStore, ScriptedPsu};
use psu_core::registers as reg;
use psu_core::{
    BattPack, BattPackBoard, BattPackModel, ChargeStatus, HeaderBoard, MonitorCfg, MonitorCore,
    MonitorState, Psu, PsuStatus, Reading,
};
use psu_hardware::{SimulatedController, SimulatedGauge, SimulatedHost};
use psu_traits::{Host, ManualClock};
use rstest::rstest;

fn status(standby: bool, percent: Option<f64>, input: Option<bool>) -> PsuStatus {
    PsuStatus {
        standby,
        input_power_present: input,
        charge: percent.map(|percent| ChargeStatus {
            percent,
            tte: None,
            ttf: None,
        }),
        batt: None,
    }
}

fn on_mains() -> Option<PsuStatus> {
    Some(status(false, Some(80.0), Some(true)))
}

fn core_with(
    psu: ScriptedPsu,
    host: SimulatedHost,
    clock: &ManualClock,
    cfg: MonitorCfg,
) -> MonitorCore<ScriptedPsu> {
    MonitorCore::new(
        psu,
        Box::new(host),
        Box::new(MemoryStore::new()),
        Arc::new(clock.clone()),
        cfg,
    )
}

#[test]
fn standby_shuts_down_once() {
    let psu = ScriptedPsu::new(
        vec![
            Some(status(false, None, None)),
            Some(status(true, None, None)),
            Some(status(true, None, None)),
        ],
        None,
    );
    let calls = psu.calls();
    let host = SimulatedHost::new();
    let clock = ManualClock::new();
    let mut core = core_with(psu, host.clone(), &clock, MonitorCfg::default());

    assert_eq!(core.poll(), MonitorState::Running);
    assert_eq!(core.poll(), MonitorState::ShutDown);
    assert_eq!(core.poll(), MonitorState::ShutDown);

    assert_eq!(calls.notices.load(Ordering::Relaxed), 1);
    assert_eq!(calls.peripherals_off.load(Ordering::Relaxed), 1);
    assert_eq!(host.shutdowns(), 1);
    assert_eq!(clock.slept(), Duration::from_secs(2));
}

#[rstest]
#[case(Some(0.5), Some(false), Some(1.0), true)]
#[case(Some(1.0), Some(false), Some(1.0), false)]
#[case(Some(0.5), Some(true), Some(1.0), false)]
#[case(Some(0.5), None, Some(1.0), false)]
#[case(None, Some(false), Some(1.0), false)]
#[case(Some(0.5), Some(false), None, false)]
fn low_battery_threshold(
    #[case] percent: Option<f64>,
    #[case] input: Option<bool>,
    #[case] charge_min: Option<f64>,
    #[case] shuts_down: bool,
) {
    let psu = ScriptedPsu::new(vec![Some(status(false, percent, input))], charge_min);
    let host = SimulatedHost::new();
    let mut core = core_with(psu, host.clone(), &ManualClock::new(), MonitorCfg::default());

    let state = core.poll();
    assert_eq!(state == MonitorState::ShutDown, shuts_down);
    assert_eq!(host.shutdowns(), usize::from(shuts_down));
}

#[rstest]
#[case(true, false, Some(status(true, Some(80.0), Some(true))))]
#[case(false, true, Some(status(false, Some(0.5), Some(false))))]
fn ignore_flags_suppress_their_trigger(
    #[case] ignore_standby: bool,
    #[case] ignore_threshold: bool,
    #[case] polled: Option<PsuStatus>,
) {
    let psu = ScriptedPsu::new(vec![polled], Some(1.0));
    let host = SimulatedHost::new();
    let cfg = MonitorCfg {
        ignore_standby,
        ignore_threshold,
        ..MonitorCfg::default()
    };
    let mut core = core_with(psu, host.clone(), &ManualClock::new(), cfg);

    assert_eq!(core.poll(), MonitorState::Running);
    assert_eq!(host.shutdowns(), 0);
}

#[test]
fn unreadable_status_skips_the_cycle() {
    let psu = ScriptedPsu::new(vec![None, on_mains()], None);
    let host = SimulatedHost::new();
    let mut core = core_with(psu, host, &ManualClock::new(), MonitorCfg::default());
    let shared = core.shared();

    assert_eq!(core.poll(), MonitorState::Starting);
    assert!(shared.latest().is_none());
    assert_eq!(core.poll(), MonitorState::Running);
    assert_eq!(shared.latest(), on_mains());
}

struct FailingHost;

impl Host for FailingHost {
    fn name(&self) -> String {
        "failing".into()
    }

    fn shutdown(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Err("poweroff refused".into())
    }
}

#[test]
fn failed_host_shutdown_stays_requested_and_is_not_retried() {
    let psu = ScriptedPsu::new(vec![Some(status(true, None, None))], None);
    let calls = psu.calls();
    let mut core = MonitorCore::new(
        psu,
        Box::new(FailingHost),
        Box::new(MemoryStore::new()),
        Arc::new(ManualClock::new()),
        MonitorCfg::default(),
    );

    assert_eq!(core.poll(), MonitorState::ShutdownRequested);
    assert_eq!(core.poll(), MonitorState::ShutdownRequested);
    assert_eq!(calls.notices.load(Ordering::Relaxed), 1);
}

fn pack_board(sim: &SimulatedGauge, controller: &SimulatedController) -> BattPackBoard {
    let pack = BattPack::new(
        BattPackModel::V2.spec(),
        Box::new(sim.clone()),
        Arc::new(ManualClock::new()),
    );
    BattPackBoard::new(Box::new(controller.clone()), pack)
}

#[test]
fn learned_params_saved_once_per_change() {
    let sim = SimulatedGauge::warm();
    let controller = SimulatedController::new();
    let store = MemoryStore::new();
    let mut core = MonitorCore::new(
        pack_board(&sim, &controller),
        Box::new(SimulatedHost::new()),
        Box::new(store.clone()),
        Arc::new(ManualClock::new()),
        MonitorCfg::default(),
    );

    core.poll();
    assert_eq!(store.saves(), 1);
    core.poll();
    assert_eq!(store.saves(), 1);

    sim.set_register(reg::FULL_CAP_REP, 12000);
    core.poll();
    assert_eq!(store.saves(), 2);
    assert_eq!(store.get("batt_pack_v2").map(|p| p.full_cap_rep), Some(12000));

    // Cycle count alone does not make the params different.
    sim.set_register(reg::CYCLES, 150);
    core.poll();
    assert_eq!(store.saves(), 2);
}

#[test]
fn store_failure_does_not_block_shutdown() {
    let sim = SimulatedGauge::warm();
    sim.set_state_of_charge(0.5, true);
    let controller = SimulatedController::new();
    let store = MemoryStore::new();
    store.set_fail(true);
    let host = SimulatedHost::new();
    let mut core = MonitorCore::new(
        pack_board(&sim, &controller),
        Box::new(host.clone()),
        Box::new(store.clone()),
        Arc::new(ManualClock::new()),
        MonitorCfg::default(),
    );

    assert_eq!(core.poll(), MonitorState::ShutDown);
    assert_eq!(host.shutdowns(), 1);
    assert_eq!(controller.notices(), 1);
    assert!(!controller.peripherals_on());
    assert_eq!(store.saves(), 0);
}

#[test]
fn switch_off_on_a_pack_board_shuts_down() {
    let sim = SimulatedGauge::warm();
    let controller = SimulatedController::new();
    let host = SimulatedHost::new();
    let mut core = MonitorCore::new(
        pack_board(&sim, &controller),
        Box::new(host.clone()),
        Box::new(MemoryStore::new()),
        Arc::new(ManualClock::new()),
        MonitorCfg::default(),
    );

    assert_eq!(core.poll(), MonitorState::Running);
    controller.set_switch(false);
    assert_eq!(core.poll(), MonitorState::ShutDown);
    assert_eq!(host.shutdowns(), 1);
}

#[test]
fn gauge_fault_keeps_polling_without_charge() {
    let sim = SimulatedGauge::warm();
    sim.set_fault(true);
    let controller = SimulatedController::new();
    let host = SimulatedHost::new();
    let mut core = MonitorCore::new(
        pack_board(&sim, &controller),
        Box::new(host.clone()),
        Box::new(MemoryStore::new()),
        Arc::new(ManualClock::new()),
        MonitorCfg::default(),
    );
    let shared = core.shared();

    assert_eq!(core.poll(), MonitorState::Running);
    let latest = shared.latest().unwrap();
    assert!(latest.charge.is_none());
    assert!(latest.input_power_present.is_none());
    assert_eq!(host.shutdowns(), 0);
}

#[test]
fn initialise_pack_restores_on_power_on_reset() {
    let sim = SimulatedGauge::new();
    let controller = SimulatedController::new();
    let saved = BattPackModel::V2.default_params();
    let mut core = MonitorCore::new(
        pack_board(&sim, &controller),
        Box::new(SimulatedHost::new()),
        Box::new(MemoryStore::with("batt_pack_v2", saved)),
        Arc::new(ManualClock::new()),
        MonitorCfg::default(),
    );

    assert_eq!(core.open().unwrap().as_deref(), Some("sim-psu 1.0"));
    assert_eq!(core.initialise_pack(), Some(saved));
    assert_eq!(sim.register(reg::FULL_CAP_NOM), saved.full_cap_nom);
}

#[test]
fn battery_sample_per_board() {
    let sim = SimulatedGauge::warm();
    let controller = SimulatedController::new();

    let pack = pack_board(&sim, &controller);
    assert!(matches!(pack.battery_sample(), Reading::Present(_)));

    sim.set_fault(true);
    assert!(pack.battery_sample().is_fault());

    let header = HeaderBoard::new(Box::new(controller.clone()));
    assert!(matches!(header.battery_sample(), Reading::Absent));
    assert!(header.batt_pack().is_none());
}
