//! Monitor thread lifecycle: spawn, publish, stop and drop without leaks.
use std::sync::atomic::Ordering;
use std::time::Duration;

use psu_core::mocks::{MemoryStore, ScriptedPsu};
use psu_core::{ChargeStatus, MonitorBuilder, MonitorCfg, MonitorState, PsuMonitor, PsuStatus};
use psu_hardware::SimulatedHost;

fn on_mains() -> PsuStatus {
    PsuStatus {
        standby: false,
        input_power_present: Some(true),
        charge: Some(ChargeStatus {
            percent: 80.0,
            tte: None,
            ttf: None,
        }),
        batt: None,
    }
}

fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn monitor_publishes_and_stops() {
    let psu = ScriptedPsu::new(vec![Some(on_mains())], None);
    let calls = psu.calls();
    let core = MonitorBuilder::new()
        .with_psu(psu)
        .with_host(SimulatedHost::new())
        .with_store(MemoryStore::new())
        .build()
        .unwrap();

    let mut monitor = PsuMonitor::spawn(core, Duration::from_millis(5)).unwrap();
    assert_eq!(monitor.firmware(), Some("scripted"));
    assert!(calls.opened.load(Ordering::Relaxed));
    assert!(wait_for(|| monitor.state() == MonitorState::Running));
    assert_eq!(monitor.latest(), Some(on_mains()));

    monitor.stop();
    assert!(calls.closed.load(Ordering::Relaxed));
    // Idempotent.
    monitor.stop();
}

#[test]
fn dropping_the_monitor_joins_its_thread() {
    for _ in 0..10 {
        let psu = ScriptedPsu::new(vec![Some(on_mains())], None);
        let calls = psu.calls();
        let core = MonitorBuilder::new()
            .with_psu(psu)
            .with_host(SimulatedHost::new())
            .with_store(MemoryStore::new())
            .with_config(MonitorCfg {
                interval: Duration::from_millis(1),
                ..MonitorCfg::default()
            })
            .build()
            .unwrap();
        let monitor = PsuMonitor::spawn(core, Duration::from_millis(1)).unwrap();
        drop(monitor);
        assert!(calls.closed.load(Ordering::Relaxed));
    }
}

#[test]
fn stopping_never_shuts_the_host_down() {
    let host = SimulatedHost::new();
    let psu = ScriptedPsu::new(vec![Some(on_mains())], None);
    let core = MonitorBuilder::new()
        .with_psu(psu)
        .with_host(host.clone())
        .with_store(MemoryStore::new())
        .build()
        .unwrap();
    let monitor = PsuMonitor::spawn(core, Duration::from_secs(60)).unwrap();
    drop(monitor);
    assert_eq!(host.shutdowns(), 0);
}
