//! PSU monitor: polls the board, keeps learned parameters saved and shuts
//! the host down on standby or low battery.
//!
//! `MonitorCore` is the single-threaded state machine (`step` drives one
//! poll's worth of decisions). `PsuMonitor` runs it on a dedicated thread
//! and shares only the latest status and state with its owner.
//!
//! Safety: each `PsuMonitor` owns exactly one thread, stopped and joined
//! when the monitor is dropped. Stopping never shuts the host down.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel as xch;
use psu_traits::Host;
use serde::Serialize;

use crate::SharedClock;
use crate::config::MonitorCfg;
use crate::error::MonitorError;
use crate::params::LearnedParams;
use crate::psu::{Psu, PsuStatus};
use crate::status::Reading;
use crate::store::ParamStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Starting,
    Running,
    ShutdownRequested,
    /// Host shutdown has been invoked; terminal.
    ShutDown,
}

/// State visible outside the monitor thread.
#[derive(Debug, Clone)]
pub struct MonitorShared {
    latest: Arc<Mutex<Option<PsuStatus>>>,
    state: Arc<Mutex<MonitorState>>,
}

impl Default for MonitorShared {
    fn default() -> Self {
        Self {
            latest: Arc::new(Mutex::new(None)),
            state: Arc::new(Mutex::new(MonitorState::Starting)),
        }
    }
}

impl MonitorShared {
    pub fn latest(&self) -> Option<PsuStatus> {
        match self.latest.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn state(&self) -> MonitorState {
        match self.state.lock() {
            Ok(g) => *g,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn publish(&self, status: &PsuStatus) {
        let mut g = match self.latest.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *g = Some(status.clone());
    }

    fn set_state(&self, next: MonitorState) {
        let mut g = match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *g = next;
    }
}

pub struct MonitorCore<P> {
    psu: P,
    host: Box<dyn Host + Send>,
    store: Box<dyn ParamStore>,
    clock: SharedClock,
    cfg: MonitorCfg,
    shared: MonitorShared,
    last_saved: Option<LearnedParams>,
}

impl<P> std::fmt::Debug for MonitorCore<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorCore").finish_non_exhaustive()
    }
}

impl<P: Psu> MonitorCore<P> {
    pub fn new(
        psu: P,
        host: Box<dyn Host + Send>,
        store: Box<dyn ParamStore>,
        clock: SharedClock,
        cfg: MonitorCfg,
    ) -> Self {
        Self {
            psu,
            host,
            store,
            clock,
            cfg,
            shared: MonitorShared::default(),
            last_saved: None,
        }
    }

    pub fn shared(&self) -> MonitorShared {
        self.shared.clone()
    }

    pub fn state(&self) -> MonitorState {
        self.shared.state()
    }

    pub const fn psu(&self) -> &P {
        &self.psu
    }

    pub fn psu_mut(&mut self) -> &mut P {
        &mut self.psu
    }

    /// Open the board and return its firmware version, if it reports one.
    pub fn open(&mut self) -> Result<Option<String>, MonitorError> {
        self.psu.open()?;
        Ok(self.psu.version())
    }

    /// Bring the battery pack's gauge up after a power-on reset.
    pub fn initialise_pack(&mut self) -> Option<LearnedParams> {
        let pack = self.psu.batt_pack()?;
        let params = pack.initialise(self.store.as_ref(), false);
        match &params {
            Some(p) => tracing::info!(pack = pack.name(), params = %p, "battery pack initialised"),
            None => tracing::debug!(pack = pack.name(), "battery pack not reconfigured"),
        }
        params
    }

    pub fn close(&mut self) {
        if let Err(e) = self.psu.close() {
            tracing::warn!(error = %e, "psu close failed");
        }
    }

    /// Read the board and act on it.
    pub fn poll(&mut self) -> MonitorState {
        let status = self.psu.status();
        self.step(status)
    }

    /// One poll cycle given an already-read status.
    ///
    /// `None` skips the cycle entirely.
    pub fn step(&mut self, status: Option<PsuStatus>) -> MonitorState {
        let Some(status) = status else {
            tracing::debug!("psu status unavailable, skipping cycle");
            return self.state();
        };

        self.shared.publish(&status);
        self.save_params_if_changed();

        if self.state() == MonitorState::Starting {
            self.shared.set_state(MonitorState::Running);
        }

        if !self.cfg.ignore_standby && status.standby {
            self.enter_host_shutdown("standby");
        }
        if !self.cfg.ignore_threshold && status.below_power_threshold(self.psu.charge_min()) {
            self.enter_host_shutdown("below power threshold");
        }
        self.state()
    }

    fn save_params_if_changed(&mut self) {
        let Some(pack) = self.psu.batt_pack() else {
            return;
        };
        let params = match pack.read_learned_params() {
            Reading::Present(p) => p,
            Reading::Absent | Reading::Fault(_) => return,
        };
        if self.last_saved.as_ref() == Some(&params) {
            return;
        }
        match self.store.save(pack.name(), &params) {
            Ok(()) => {
                tracing::info!(pack = pack.name(), params = %params, "learned params saved");
                self.last_saved = Some(params);
            }
            Err(e) => tracing::warn!(pack = pack.name(), error = %e, "saving learned params failed"),
        }
    }

    fn enter_host_shutdown(&mut self, reason: &str) {
        if matches!(
            self.state(),
            MonitorState::ShutdownRequested | MonitorState::ShutDown
        ) {
            return;
        }
        tracing::warn!(reason, host = %self.host.name(), "entering host shutdown");

        if let Err(e) = self.psu.host_shutdown_initiated() {
            tracing::warn!(error = %e, "shutdown notice to psu failed");
        }
        self.shared.set_state(MonitorState::ShutdownRequested);
        if let Err(e) = self.psu.power_peripherals(false) {
            tracing::warn!(error = %e, "powering down peripherals failed");
        }

        self.clock.sleep(self.cfg.shutdown_grace);

        match self.host.shutdown() {
            Ok(()) => self.shared.set_state(MonitorState::ShutDown),
            Err(e) => tracing::error!(error = %e, "host shutdown failed"),
        }
    }
}

/// `MonitorCore` on its own thread.
pub struct PsuMonitor {
    shared: MonitorShared,
    firmware: Option<String>,
    stop_tx: Option<xch::Sender<()>>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl PsuMonitor {
    /// Open the board on the calling thread, then poll it every `interval`
    /// on a new thread until stopped.
    pub fn spawn<P: Psu + Send + 'static>(
        mut core: MonitorCore<P>,
        interval: Duration,
    ) -> Result<Self, MonitorError> {
        let firmware = core.open()?;
        let shared = core.shared();
        let (stop_tx, stop_rx) = xch::bounded::<()>(1);

        let join_handle = std::thread::Builder::new()
            .name("psu-monitor".into())
            .spawn(move || {
                core.initialise_pack();
                loop {
                    core.poll();
                    match stop_rx.recv_timeout(interval) {
                        Err(xch::RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(xch::RecvTimeoutError::Disconnected) => break,
                    }
                }
                core.close();
                tracing::trace!("monitor thread exiting cleanly");
            })
            .map_err(|e| MonitorError::Spawn(e.to_string()))?;

        Ok(Self {
            shared,
            firmware,
            stop_tx: Some(stop_tx),
            join_handle: Some(join_handle),
        })
    }

    pub fn latest(&self) -> Option<PsuStatus> {
        self.shared.latest()
    }

    pub fn state(&self) -> MonitorState {
        self.shared.state()
    }

    pub fn firmware(&self) -> Option<&str> {
        self.firmware.as_deref()
    }

    /// Stop polling and join the thread. Idempotent.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("monitor thread joined"),
                Err(e) => tracing::warn!(?e, "monitor thread panicked during shutdown"),
            }
        }
    }
}

impl Drop for PsuMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
