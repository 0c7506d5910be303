//! Type-state builder for `MonitorCore`.
//!
//! The builder enforces at compile time that a PSU and a host are provided
//! before `build()` is available. `try_build()` is always available for
//! dynamic checks.
use std::marker::PhantomData;
use std::sync::Arc;

use psu_traits::{Host, MonotonicClock};

use crate::SharedClock;
use crate::config::MonitorCfg;
use crate::error::{BuildError, Result};
use crate::monitor::MonitorCore;
use crate::psu::{Board, Psu};
use crate::store::{JsonFileStore, ParamStore};

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

pub struct MonitorBuilder<P, PS, HS> {
    psu: Option<P>,
    host: Option<Box<dyn Host + Send>>,
    store: Option<Box<dyn ParamStore>>,
    clock: Option<SharedClock>,
    cfg: Option<MonitorCfg>,
    _ps: PhantomData<PS>,
    _hs: PhantomData<HS>,
}

impl Default for MonitorBuilder<Board, Missing, Missing> {
    fn default() -> Self {
        Self {
            psu: None,
            host: None,
            store: None,
            clock: None,
            cfg: None,
            _ps: PhantomData,
            _hs: PhantomData,
        }
    }
}

impl MonitorBuilder<Board, Missing, Missing> {
    /// Start building; the PSU type defaults to `Board` until `with_psu`.
    pub fn new() -> Self {
        Self::default()
    }
}

fn validate(cfg: &MonitorCfg) -> Result<()> {
    if cfg.interval.is_zero() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "poll interval must be > 0",
        )));
    }
    Ok(())
}

impl<P: Psu, PS, HS> MonitorBuilder<P, PS, HS> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<MonitorCore<P>> {
        let psu = self
            .psu
            .ok_or_else(|| eyre::Report::new(BuildError::MissingPsu))?;
        let host = self
            .host
            .ok_or_else(|| eyre::Report::new(BuildError::MissingHost))?;
        let cfg = self.cfg.unwrap_or_default();
        validate(&cfg)?;

        let store = self.store.unwrap_or_else(|| {
            Box::new(JsonFileStore::new(
                psu_config::PersistenceCfg::default().dir,
            ))
        });
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        Ok(MonitorCore::new(psu, host, store, clock, cfg))
    }
}

/// Chainable setters that do not affect type-state.
impl<P, PS, HS> MonitorBuilder<P, PS, HS> {
    pub fn with_config(mut self, cfg: MonitorCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    pub fn with_store(mut self, store: impl ParamStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Provide a custom clock; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<P, HS> MonitorBuilder<P, Missing, HS> {
    pub fn with_psu<Q: Psu>(self, psu: Q) -> MonitorBuilder<Q, Set, HS> {
        MonitorBuilder {
            psu: Some(psu),
            host: self.host,
            store: self.store,
            clock: self.clock,
            cfg: self.cfg,
            _ps: PhantomData,
            _hs: PhantomData,
        }
    }
}

impl<P, PS> MonitorBuilder<P, PS, Missing> {
    pub fn with_host(self, host: impl Host + Send + 'static) -> MonitorBuilder<P, PS, Set> {
        MonitorBuilder {
            psu: self.psu,
            host: Some(Box::new(host)),
            store: self.store,
            clock: self.clock,
            cfg: self.cfg,
            _ps: PhantomData,
            _hs: PhantomData,
        }
    }
}

impl<P: Psu> MonitorBuilder<P, Set, Set> {
    /// Validate and build. Only available when a PSU and a host are set.
    pub fn build(self) -> Result<MonitorCore<P>> {
        self.try_build()
    }
}
