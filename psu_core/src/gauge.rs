//! MAX17055 fuel-gauge driver (ModelGauge m5 EZ).
//!
//! Every public operation takes the instance lock once and runs its whole
//! register sequence under that guard. The lock owns the transport, so no
//! other caller can interleave transactions with a configuration or
//! restore sequence.
//!
//! Each register transaction is followed by a short fixed delay; polls and
//! write-verify loops have bounded retry budgets (`GaugeTiming`).
use std::sync::{Mutex, MutexGuard};

use psu_traits::{Clock, Transport};

use crate::codec::{self, ByteOrder};
use crate::config::{GaugeConfig, GaugeTiming};
use crate::error::GaugeError;
use crate::hw_error::map_bus_error;
use crate::params::LearnedParams;
use crate::registers as reg;
use crate::status::{ChargeLevel, SampleStatus};
use crate::units::{self, UnitScale};

/// Percent change in charge after which learned parameters are worth saving.
pub const PARAM_SAVE_INTERVAL: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeState {
    Uninitialized,
    Configuring,
    Ready,
    Sampling,
    RestoringParams,
}

pub struct Max17055<T, C> {
    config: GaugeConfig,
    units: UnitScale,
    timing: GaugeTiming,
    addr: u8,
    clock: C,
    bus: Mutex<T>,
    state: Mutex<GaugeState>,
}

/// Register access under a held bus guard.
struct Session<'a, T, C> {
    bus: MutexGuard<'a, T>,
    addr: u8,
    clock: &'a C,
    timing: &'a GaugeTiming,
}

impl<T: Transport, C: Clock> Session<'_, T, C> {
    fn read_raw(&mut self, r: u8) -> Result<[u8; 2], GaugeError> {
        let mut buf = [0u8; 2];
        self.bus
            .read_register(self.addr, r, &mut buf)
            .map_err(|e| map_bus_error(&*e))?;
        self.clock.sleep(self.timing.register_delay);
        Ok(buf)
    }

    fn read(&mut self, r: u8) -> Result<u16, GaugeError> {
        Ok(codec::decode_unsigned(self.read_raw(r)?, ByteOrder::Little))
    }

    fn read_signed(&mut self, r: u8) -> Result<i16, GaugeError> {
        Ok(codec::decode_signed(self.read_raw(r)?, ByteOrder::Little))
    }

    fn write(&mut self, r: u8, value: u16) -> Result<(), GaugeError> {
        self.bus
            .write_register(self.addr, r, &codec::encode(value, ByteOrder::Little))
            .map_err(|e| map_bus_error(&*e))?;
        self.clock.sleep(self.timing.register_delay);
        Ok(())
    }

    /// Write, read back, compare; bounded by `verify_attempts`.
    fn write_verify(&mut self, r: u8, value: u16) -> Result<(), GaugeError> {
        let mut read = 0;
        for attempt in 1..=self.timing.verify_attempts {
            self.write(r, value)?;
            read = self.read(r)?;
            if read == value {
                if attempt > 1 {
                    tracing::debug!(reg = r, attempt, "write verified after retry");
                }
                return Ok(());
            }
            tracing::trace!(reg = r, wrote = value, read, attempt, "write-verify mismatch");
        }
        Err(GaugeError::HardwareUnreachable {
            reg: r,
            wrote: value,
            read,
        })
    }

    /// Poll `r` until `value & mask == expected`.
    fn wait_for(&mut self, r: u8, mask: u16, expected: u16) -> Result<(), GaugeError> {
        let mut got = 0;
        for _ in 0..self.timing.poll_retries {
            got = self.read(r)?;
            if got & mask == expected {
                return Ok(());
            }
            self.clock.sleep(self.timing.poll_interval);
        }
        Err(GaugeError::SequenceTimeout {
            reg: r,
            mask,
            expected,
            got,
        })
    }
}

impl<T: Transport, C: Clock> Max17055<T, C> {
    pub fn new(config: GaugeConfig, transport: T, clock: C) -> Self {
        Self::with_timing(config, GaugeTiming::default(), transport, clock)
    }

    pub fn with_timing(config: GaugeConfig, timing: GaugeTiming, transport: T, clock: C) -> Self {
        Self {
            units: config.units(),
            config,
            timing,
            addr: reg::ADDR,
            clock,
            bus: Mutex::new(transport),
            state: Mutex::new(GaugeState::Uninitialized),
        }
    }

    /// Talk to the gauge at a non-default bus address.
    #[must_use]
    pub fn with_address(mut self, addr: u8) -> Self {
        self.addr = addr;
        self
    }

    pub const fn config(&self) -> &GaugeConfig {
        &self.config
    }

    pub fn state(&self) -> GaugeState {
        match self.state.lock() {
            Ok(s) => *s,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_state(&self, next: GaugeState) -> GaugeState {
        let mut guard = match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }

    /// Run `f` in `during`, then settle in the prior state (or `on_ok` on success).
    fn transition<R>(
        &self,
        during: GaugeState,
        on_ok: Option<GaugeState>,
        f: impl FnOnce() -> Result<R, GaugeError>,
    ) -> Result<R, GaugeError> {
        let prior = self.set_state(during);
        let out = f();
        let next = match (&out, on_ok) {
            (Ok(_), Some(s)) => s,
            _ => prior,
        };
        self.set_state(next);
        out
    }

    fn session(&self) -> Result<Session<'_, T, C>, GaugeError> {
        let bus = self.bus.lock().map_err(|_| GaugeError::LockPoisoned)?;
        Ok(Session {
            bus,
            addr: self.addr,
            clock: &self.clock,
            timing: &self.timing,
        })
    }

    /// Load the EZ model after a power-on reset (or always, when `force`).
    ///
    /// Returns `Ok(false)` on the warm path: POR was clear, so the chip keeps
    /// its configuration and only the status flag is cleaned.
    pub fn initialise(&self, force: bool) -> Result<bool, GaugeError> {
        let mut s = self.session()?;
        let status = s.read(reg::STATUS)?;
        if status & reg::STATUS_POR == 0 && !force {
            s.write_verify(reg::STATUS, status & !reg::STATUS_POR)?;
            self.set_state(GaugeState::Ready);
            tracing::debug!(status, "gauge warm: configuration kept");
            return Ok(false);
        }

        self.transition(GaugeState::Configuring, Some(GaugeState::Ready), || {
            tracing::info!(force, por = status & reg::STATUS_POR != 0, "configuring gauge");
            s.wait_for(reg::FSTAT, reg::FSTAT_DNR, 0)?;

            let hib_cfg = s.read(reg::HIB_CFG)?;
            s.write(reg::HIB_MODE, reg::HIB_MODE_SOFT_WAKE)?;
            s.write(reg::HIB_CFG, 0x0000)?;
            s.write(reg::HIB_MODE, 0x0000)?;

            let design_counts = self.units.mah_to_counts(self.config.des_cap);
            s.write(reg::DESIGN_CAP, design_counts)?;
            let dqacc = (f64::from(design_counts) / 32.0).round_ties_even() as u16;
            s.write(reg::DQACC, dqacc)?;
            s.write(reg::I_CHRG_TERM, self.units.ma_to_counts(self.config.chrg_term))?;
            s.write(reg::V_EMPTY, self.config.v_empty_word())?;
            s.write(reg::DPACC, self.config.dpacc_word())?;
            s.write(reg::MODEL_CFG, self.config.model_cfg_word())?;

            s.wait_for(reg::MODEL_CFG, reg::MODEL_CFG_REFRESH, 0)?;
            s.write(reg::HIB_CFG, hib_cfg)?;

            let status = s.read(reg::STATUS)?;
            let boot_cleared = status & reg::STATUS_BOOT_KEEP;
            s.write_verify(reg::STATUS, boot_cleared)?;
            s.write_verify(reg::STATUS, boot_cleared & !reg::STATUS_POR)?;
            tracing::info!(design_counts, "gauge configured");
            Ok(true)
        })
    }

    pub fn sample(&self) -> Result<SampleStatus, GaugeError> {
        let mut s = self.session()?;
        self.transition(GaugeState::Sampling, None, || {
            let current = self.units.current_ma(s.read_signed(reg::CURRENT)?);
            let percent = units::charge_percent(s.read(reg::REP_SOC)?);
            let mah = self.units.capacity_mah(i32::from(s.read(reg::REP_CAP)?));
            let tte = units::duration(s.read_signed(reg::TTE)?);
            let ttf = units::duration(s.read_signed(reg::TTF)?);
            let voltage = units::voltage(s.read(reg::V_CELL)?);
            let current_avg = self.units.current_ma(s.read_signed(reg::CURRENT_AVG)?);
            let temperature = units::temperature(s.read_signed(reg::TEMP)?);
            let capacity = self
                .units
                .capacity_mah(i32::from(s.read_signed(reg::CAP_AVG)?));
            let cycles = units::cycles(s.read(reg::CYCLES)?);
            Ok(SampleStatus {
                input_power_present: current >= 0,
                charge: ChargeLevel { percent, mah },
                tte,
                ttf,
                voltage,
                current: current_avg,
                temperature,
                capacity,
                cycles,
            })
        })
    }

    pub fn read_learned_params(&self) -> Result<LearnedParams, GaugeError> {
        let mut s = self.session()?;
        let calibrated_on = chrono::Utc::now();
        let r_comp_0 = s.read(reg::R_COMP_0)?;
        let temp_co = s.read(reg::TEMP_CO)?;
        let full_cap_rep = s.read(reg::FULL_CAP_REP)?;
        let full_cap_nom = s.read(reg::FULL_CAP_NOM)?;
        let cycles = s.read(reg::CYCLES)?;
        Ok(
            LearnedParams::new(r_comp_0, temp_co, full_cap_rep, full_cap_nom, cycles)
                .stamped(calibrated_on),
        )
    }

    /// Restore previously learned parameters into the chip.
    pub fn write_params(&self, params: &LearnedParams) -> Result<(), GaugeError> {
        let mut s = self.session()?;
        self.transition(GaugeState::RestoringParams, None, || {
            s.write_verify(reg::R_COMP_0, params.r_comp_0)?;
            s.write_verify(reg::TEMP_CO, params.temp_co)?;
            s.write_verify(reg::FULL_CAP_NOM, params.full_cap_nom)?;

            self.clock.sleep(self.timing.settle);

            let full_cap_nom = s.read(reg::FULL_CAP_NOM)?;
            let mix_soc = s.read(reg::MIX_SOC)?;
            s.write_verify(reg::MIX_CAP, mix_cap(mix_soc, full_cap_nom))?;
            s.write_verify(reg::FULL_CAP_REP, params.full_cap_rep)?;

            s.write_verify(reg::DQACC, params.full_cap_nom / 16)?;
            s.write_verify(reg::DQACC, reg::DQACC_RESTORED)?;

            self.clock.sleep(self.timing.settle);

            s.write_verify(reg::CYCLES, params.cycles)?;
            tracing::info!(%params, "learned parameters restored");
            Ok(())
        })
    }

    pub fn read_power_on_reset(&self) -> Result<bool, GaugeError> {
        let mut s = self.session()?;
        Ok(s.read(reg::STATUS)? & reg::STATUS_POR != 0)
    }

    pub fn clear_power_on_reset(&self) -> Result<(), GaugeError> {
        let mut s = self.session()?;
        let status = s.read(reg::STATUS)?;
        s.write_verify(reg::STATUS, status & !reg::STATUS_POR)
    }

    /// Charging, or at least not discharging.
    pub fn input_power_present(&self) -> Result<bool, GaugeError> {
        Ok(self.read_current()? >= 0)
    }

    pub fn read_charge_percent(&self) -> Result<f64, GaugeError> {
        Ok(units::charge_percent(self.session()?.read(reg::REP_SOC)?))
    }

    pub fn read_charge_mah(&self) -> Result<i32, GaugeError> {
        let raw = self.session()?.read(reg::REP_CAP)?;
        Ok(self.units.capacity_mah(i32::from(raw)))
    }

    pub fn read_time_until_empty(&self) -> Result<Option<std::time::Duration>, GaugeError> {
        Ok(units::duration(self.session()?.read_signed(reg::TTE)?))
    }

    pub fn read_time_until_full(&self) -> Result<Option<std::time::Duration>, GaugeError> {
        Ok(units::duration(self.session()?.read_signed(reg::TTF)?))
    }

    pub fn read_voltage(&self) -> Result<f64, GaugeError> {
        Ok(units::voltage(self.session()?.read(reg::V_CELL)?))
    }

    pub fn read_current(&self) -> Result<i32, GaugeError> {
        let raw = self.session()?.read_signed(reg::CURRENT)?;
        Ok(self.units.current_ma(raw))
    }

    pub fn read_current_avg(&self) -> Result<i32, GaugeError> {
        let raw = self.session()?.read_signed(reg::CURRENT_AVG)?;
        Ok(self.units.current_ma(raw))
    }

    pub fn read_temperature(&self) -> Result<f64, GaugeError> {
        Ok(units::temperature(self.session()?.read_signed(reg::TEMP)?))
    }

    pub fn read_capacity_avg(&self) -> Result<i32, GaugeError> {
        let raw = self.session()?.read_signed(reg::CAP_AVG)?;
        Ok(self.units.capacity_mah(i32::from(raw)))
    }

    pub fn read_cycles(&self) -> Result<f64, GaugeError> {
        Ok(units::cycles(self.session()?.read(reg::CYCLES)?))
    }

    /// DEV_NAME register (silicon revision).
    pub fn read_device_rev(&self) -> Result<u16, GaugeError> {
        self.session()?.read(reg::DEV_NAME)
    }
}

/// MixCap restored from MixSOC and FullCapNom.
#[inline]
pub fn mix_cap(mix_soc: u16, full_cap_nom: u16) -> u16 {
    let v = u64::from(mix_soc) * u64::from(full_cap_nom) / 256_000;
    u16::try_from(v).unwrap_or(u16::MAX)
}
