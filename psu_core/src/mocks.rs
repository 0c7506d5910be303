//! Test and helper mocks for psu_core.
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::batt_pack::BattPack;
use crate::error::MonitorError;
use crate::params::LearnedParams;
use crate::psu::{Psu, PsuStatus};
use crate::store::ParamStore;

/// In-memory parameter store. Clones share contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<String, LearnedParams>>>,
    saves: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(pack: &str, params: LearnedParams) -> Self {
        let s = Self::default();
        if let Ok(mut g) = s.records.lock() {
            g.insert(pack.to_string(), params);
        }
        s
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }

    pub fn get(&self, pack: &str) -> Option<LearnedParams> {
        self.records.lock().ok().and_then(|g| g.get(pack).copied())
    }

    /// Make every load and save fail until cleared.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }
}

impl ParamStore for MemoryStore {
    fn load(&self, pack: &str) -> Result<Option<LearnedParams>, MonitorError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(MonitorError::Store("memory store failure".into()));
        }
        Ok(self.get(pack))
    }

    fn save(&self, pack: &str, params: &LearnedParams) -> Result<(), MonitorError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(MonitorError::Store("memory store failure".into()));
        }
        let mut g = self
            .records
            .lock()
            .map_err(|_| MonitorError::Store("memory store poisoned".into()))?;
        g.insert(pack.to_string(), params.stamped_if_missing());
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Counters shared between a `ScriptedPsu` and the test holding it.
#[derive(Debug, Clone, Default)]
pub struct PsuCalls {
    pub notices: Arc<AtomicUsize>,
    pub peripherals_off: Arc<AtomicUsize>,
    pub opened: Arc<AtomicBool>,
    pub closed: Arc<AtomicBool>,
}

/// A board without hardware: `status` replays a script, then repeats the
/// last entry.
pub struct ScriptedPsu {
    script: VecDeque<Option<PsuStatus>>,
    last: Option<PsuStatus>,
    charge_min: Option<f64>,
    calls: PsuCalls,
}

impl ScriptedPsu {
    pub fn new(script: Vec<Option<PsuStatus>>, charge_min: Option<f64>) -> Self {
        Self {
            script: script.into(),
            last: None,
            charge_min,
            calls: PsuCalls::default(),
        }
    }

    pub fn calls(&self) -> PsuCalls {
        self.calls.clone()
    }
}

impl Psu for ScriptedPsu {
    fn open(&mut self) -> Result<(), MonitorError> {
        self.calls.opened.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn close(&mut self) -> Result<(), MonitorError> {
        self.calls.closed.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn status(&mut self) -> Option<PsuStatus> {
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.last.clone()
    }

    fn charge_min(&self) -> Option<f64> {
        self.charge_min
    }

    fn batt_pack(&self) -> Option<&BattPack> {
        None
    }

    fn host_shutdown_initiated(&mut self) -> Result<(), MonitorError> {
        self.calls.notices.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn power_peripherals(&mut self, on: bool) -> Result<(), MonitorError> {
        if !on {
            self.calls.peripherals_off.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn version(&mut self) -> Option<String> {
        Some("scripted".to_string())
    }
}
