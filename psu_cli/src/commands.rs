//! Device assembly and command execution.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use eyre::{Result, WrapErr, eyre};
use psu_config::{Config, PersistedParams};
use psu_core::psu::BoxedController;
use psu_core::{
    BattPack, Board, BoxedTransport, JsonFileStore, LearnedParams, MonitorBuilder, MonitorCfg,
    MonitorState, ParamStore, Psu, PsuMonitor, Reading, SampleStatus, SharedClock,
};
use psu_traits::{Host, MonotonicClock};
use serde_json::json;

use crate::cli::ParamsAction;

/// The three device seams, before a board is assembled from them.
pub struct Devices {
    pub controller: BoxedController,
    pub transport: BoxedTransport,
    pub host: Box<dyn Host + Send>,
}

#[cfg(feature = "hardware")]
pub fn open_devices(cfg: &Config) -> Result<Devices> {
    use psu_hardware::SystemHost;
    use psu_hardware::hardware::{GpioController, I2cTransport};

    let transport = I2cTransport::new(cfg.hardware.i2c_bus)
        .wrap_err_with(|| format!("open i2c bus {}", cfg.hardware.i2c_bus))?;
    let controller = GpioController::new(
        cfg.hardware.switch_pin,
        cfg.hardware.shutdown_notice_pin,
        cfg.hardware.peripherals_pin,
    )
    .wrap_err("open psu gpio pins")?;
    Ok(Devices {
        controller: Box::new(controller),
        transport: Box::new(transport),
        host: Box::new(SystemHost::new(cfg.hardware.dry_run_shutdown)),
    })
}

/// Simulated devices, steered by `PSU_SIM_SOC` (percent, on battery),
/// `PSU_SIM_STANDBY` and `PSU_SIM_FAULT`.
#[cfg(not(feature = "hardware"))]
pub fn open_devices(_cfg: &Config) -> Result<Devices> {
    use psu_hardware::{SimulatedController, SimulatedGauge, SimulatedHost};

    let gauge = SimulatedGauge::new();
    if let Ok(soc) = std::env::var("PSU_SIM_SOC") {
        let soc: f32 = soc
            .trim()
            .parse()
            .map_err(|_| eyre!("PSU_SIM_SOC must be a number, got {soc:?}"))?;
        gauge.set_state_of_charge(soc, true);
    }
    if env_flag("PSU_SIM_FAULT") {
        gauge.set_fault(true);
    }
    let controller = SimulatedController::new();
    if env_flag("PSU_SIM_STANDBY") {
        controller.set_switch(false);
    }
    tracing::debug!("using simulated psu devices");
    Ok(Devices {
        controller: Box::new(controller),
        transport: Box::new(gauge),
        host: Box::new(SimulatedHost::new()),
    })
}

#[cfg(not(feature = "hardware"))]
fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| matches!(v.trim(), "1" | "true" | "yes"))
}

/// Everything a command needs, assembled from config.
pub struct Session {
    pub cfg: Config,
    pub board: Board,
    pub host: Box<dyn Host + Send>,
    pub store: JsonFileStore,
    pub clock: SharedClock,
}

impl Session {
    pub fn assemble(cfg: Config, devices: Devices) -> Self {
        let clock: SharedClock = Arc::new(MonotonicClock::new());
        let board = Board::from_config(
            &cfg,
            devices.controller,
            devices.transport,
            Arc::clone(&clock),
        );
        let store = JsonFileStore::new(&cfg.persistence.dir);
        tracing::debug!(board = board.kind(), store = %store.dir().display(), "session assembled");
        Self {
            cfg,
            board,
            host: devices.host,
            store,
            clock,
        }
    }

    fn pack(&self) -> Result<&BattPack> {
        self.board.batt_pack().ok_or_else(|| self.no_pack())
    }

    fn no_pack(&self) -> eyre::Report {
        eyre!("no battery pack: [psu] model is {}", self.board.kind())
    }
}

fn print(json_mode: bool, value: &serde_json::Value, human: impl FnOnce() -> String) {
    if json_mode {
        println!("{value}");
    } else {
        println!("{}", human());
    }
}

fn params_json(p: &LearnedParams) -> serde_json::Value {
    serde_json::to_value(PersistedParams::from(p)).unwrap_or(serde_json::Value::Null)
}

fn present<T>(reading: Reading<T>, what: &str) -> Result<T> {
    match reading {
        Reading::Present(v) => Ok(v),
        Reading::Fault(e) => Err(eyre::Report::new(e).wrap_err(format!("read {what}"))),
        Reading::Absent => Err(eyre!("{what} not available")),
    }
}

fn fmt_duration(d: Option<Duration>) -> String {
    d.map_or_else(
        || "-".to_string(),
        |d| {
            let s = d.as_secs();
            format!("{}h{:02}m", s / 3600, (s % 3600) / 60)
        },
    )
}

fn describe_sample(pack: &str, s: &SampleStatus) -> String {
    format!(
        "{pack}: {:.1} % ({} mAh), {:.1} V, {} mA, {:.1} C, {} cycles, input power {}, tte {}, ttf {}",
        s.charge.percent,
        s.charge.mah,
        s.voltage,
        s.current,
        s.temperature,
        s.cycles,
        if s.input_power_present { "present" } else { "absent" },
        fmt_duration(s.tte),
        fmt_duration(s.ttf),
    )
}

pub fn run_init(mut session: Session, force: bool, json_mode: bool) -> Result<()> {
    session
        .board
        .open()
        .map_err(eyre::Report::new)
        .wrap_err("open psu")?;
    let pack = session.pack()?;
    let por = pack
        .gauge()
        .read_power_on_reset()
        .wrap_err("gauge not reachable")?;

    let written = pack.initialise(&session.store, force);
    if (por || force) && written.is_none() {
        eyre::bail!("gauge initialisation failed for {}; see log", pack.name());
    }

    let value = json!({
        "pack": pack.name(),
        "configured": written.is_some(),
        "params": written.as_ref().map(params_json),
    });
    print(json_mode, &value, || match &written {
        Some(p) => format!("{}: gauge configured, params restored ({p})", pack.name()),
        None => format!("{}: no power-on reset, configuration kept", pack.name()),
    });
    Ok(())
}

pub fn run_sample(session: Session, json_mode: bool) -> Result<()> {
    let sample = match session.board.battery_sample() {
        Reading::Absent => return Err(session.no_pack()),
        reading => present(reading, "battery sample")?,
    };
    let pack = session.pack()?;
    let value = json!({ "pack": pack.name(), "sample": &sample });
    print(json_mode, &value, || describe_sample(pack.name(), &sample));
    Ok(())
}

pub fn run_params(session: Session, action: ParamsAction, json_mode: bool) -> Result<()> {
    let pack = session.pack()?;
    let name = pack.name();
    match action {
        ParamsAction::Show => {
            let current = present(pack.read_learned_params(), "learned params")?;
            let saved = session.store.load(name).map_err(eyre::Report::new)?;
            let value = json!({
                "pack": name,
                "gauge": params_json(&current),
                "saved": saved.as_ref().map(params_json),
            });
            print(json_mode, &value, || {
                let saved = saved.map_or_else(|| "none".to_string(), |p| p.to_string());
                format!("{name}\n  gauge: {current}\n  saved: {saved}")
            });
        }
        ParamsAction::Save => {
            let current = present(pack.read_learned_params(), "learned params")?;
            session
                .store
                .save(name, &current)
                .map_err(eyre::Report::new)?;
            let path = session.store.path_for(name);
            let value = json!({
                "pack": name,
                "saved": params_json(&current),
                "path": path.display().to_string(),
            });
            print(json_mode, &value, || {
                format!("{name}: saved {current} to {}", path.display())
            });
        }
        ParamsAction::Restore => {
            let saved = session
                .store
                .load(name)
                .map_err(eyre::Report::new)?
                .ok_or_else(|| {
                    eyre!(
                        "no saved parameters for {name} in {}",
                        session.store.dir().display()
                    )
                })?;
            pack.gauge()
                .write_params(&saved)
                .wrap_err("restore learned params")?;
            let value = json!({ "pack": name, "restored": params_json(&saved) });
            print(json_mode, &value, || format!("{name}: restored {saved}"));
        }
    }
    Ok(())
}

pub fn run_self_check(mut session: Session, json_mode: bool) -> Result<()> {
    session
        .board
        .open()
        .map_err(eyre::Report::new)
        .wrap_err("open psu")?;
    let firmware = session.board.version();
    let gauge_rev = match session.board.batt_pack() {
        Some(pack) => Some(
            pack.gauge()
                .read_device_rev()
                .wrap_err("gauge not reachable")?,
        ),
        None => None,
    };
    let value = json!({
        "ok": true,
        "board": session.board.kind(),
        "firmware": &firmware,
        "gauge_rev": gauge_rev.map(|r| format!("0x{r:04x}")),
    });
    print(json_mode, &value, || {
        let rev = gauge_rev.map_or_else(|| "-".to_string(), |r| format!("0x{r:04x}"));
        format!(
            "self-check ok: board {}, firmware {}, gauge rev {rev}",
            session.board.kind(),
            firmware.as_deref().unwrap_or("unknown"),
        )
    });
    Ok(())
}

pub struct MonitorOpts {
    pub ignore_standby: bool,
    pub ignore_threshold: bool,
    pub run_for: Option<Duration>,
}

pub fn run_monitor(
    session: Session,
    opts: &MonitorOpts,
    interrupted: &Arc<AtomicBool>,
    json_mode: bool,
) -> Result<()> {
    let Session {
        cfg,
        board,
        host,
        store,
        clock,
    } = session;

    let mut mcfg = MonitorCfg::from(&cfg.monitor);
    mcfg.ignore_standby |= opts.ignore_standby;
    mcfg.ignore_threshold |= opts.ignore_threshold;

    let core = MonitorBuilder::new()
        .with_psu(board)
        .with_host(host)
        .with_store(store)
        .with_clock(clock)
        .with_config(mcfg)
        .build()?;
    let mut monitor = PsuMonitor::spawn(core, mcfg.interval)
        .map_err(eyre::Report::new)
        .wrap_err("start monitor")?;
    tracing::info!(
        firmware = monitor.firmware().unwrap_or("unknown"),
        interval_ms = mcfg.interval.as_millis() as u64,
        "monitor running"
    );

    let started = Instant::now();
    loop {
        if interrupted.load(Ordering::Relaxed) {
            tracing::info!("interrupted, stopping monitor");
            break;
        }
        if monitor.state() == MonitorState::ShutDown {
            break;
        }
        if opts.run_for.is_some_and(|d| started.elapsed() >= d) {
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    monitor.stop();
    let state = monitor.state();
    let latest = monitor.latest();

    let value = json!({ "state": state, "latest": latest });
    print(json_mode, &value, || match state {
        MonitorState::ShutDown => "monitor stopped: host shutdown initiated".to_string(),
        other => format!("monitor stopped: {}", json!(other).as_str().unwrap_or("unknown")),
    });
    Ok(())
}
