//! Register-file model of a MAX17055 for simulation and tests.
//!
//! The model answers reads and writes the way the chip does for the
//! registers the driver touches: POR in STATUS after power-up, FSTAT.DNR
//! clearing after a few polls, and MODEL_CFG.Refresh self-clearing after a
//! model reload. Faults can be injected per instance (whole-bus failure) or
//! per register (writes silently dropped, or dropped for the first N tries).
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use psu_traits::Transport;

use crate::error::HwError;

pub const GAUGE_ADDR: u8 = 0x36;

const STATUS: u8 = 0x00;
const REP_CAP: u8 = 0x05;
const REP_SOC: u8 = 0x06;
const TEMP: u8 = 0x08;
const V_CELL: u8 = 0x09;
const CURRENT: u8 = 0x0a;
const CURRENT_AVG: u8 = 0x0b;
const MIX_SOC: u8 = 0x0d;
const FULL_CAP_REP: u8 = 0x10;
const TTE: u8 = 0x11;
const CYCLES: u8 = 0x17;
const CAP_AVG: u8 = 0x1f;
const TTF: u8 = 0x20;
const DEV_NAME: u8 = 0x21;
const FULL_CAP_NOM: u8 = 0x23;
const R_COMP_0: u8 = 0x38;
const TEMP_CO: u8 = 0x39;
const FSTAT: u8 = 0x3d;
const HIB_CFG: u8 = 0xba;
const MODEL_CFG: u8 = 0xdb;

const POR: u16 = 0x0002;
const DNR: u16 = 0x0001;
const REFRESH: u16 = 0x8000;

#[derive(Debug)]
struct RegisterFile {
    regs: HashMap<u8, u16>,
    writes: Vec<(u8, u16)>,
    reads: usize,
    fault: bool,
    stuck: HashSet<u8>,
    drop_writes: HashMap<u8, u32>,
    dnr_reads_left: u32,
    refresh_reads_left: u32,
    never_ready: bool,
}

impl RegisterFile {
    fn power_on() -> Self {
        let regs = HashMap::from([
            (STATUS, POR),
            (FSTAT, DNR),
            (HIB_CFG, 0x870c),
            (MODEL_CFG, 0x0000),
            (REP_SOC, 80 * 256),
            (MIX_SOC, 80 * 256),
            (REP_CAP, 9920),
            (CAP_AVG, 9920),
            (TEMP, 25 * 256),
            (V_CELL, 49920),
            (CURRENT, 64),
            (CURRENT_AVG, 64),
            (TTE, 0),
            (TTF, 640),
            (CYCLES, 100),
            (DEV_NAME, 0x4010),
            (FULL_CAP_REP, 12400),
            (FULL_CAP_NOM, 12400),
            (R_COMP_0, 0x004d),
            (TEMP_CO, 0x223e),
        ]);
        Self {
            regs,
            writes: Vec::new(),
            reads: 0,
            fault: false,
            stuck: HashSet::new(),
            drop_writes: HashMap::new(),
            dnr_reads_left: 2,
            refresh_reads_left: 0,
            never_ready: false,
        }
    }

    fn read(&mut self, reg: u8) -> u16 {
        self.reads += 1;
        let value = self.regs.get(&reg).copied().unwrap_or(0);
        match reg {
            FSTAT if !self.never_ready && value & DNR != 0 => {
                self.dnr_reads_left = self.dnr_reads_left.saturating_sub(1);
                if self.dnr_reads_left == 0 {
                    self.regs.insert(FSTAT, value & !DNR);
                }
            }
            MODEL_CFG if !self.never_ready && value & REFRESH != 0 => {
                self.refresh_reads_left = self.refresh_reads_left.saturating_sub(1);
                if self.refresh_reads_left == 0 {
                    self.regs.insert(MODEL_CFG, value & !REFRESH);
                }
            }
            _ => {}
        }
        value
    }

    fn write(&mut self, reg: u8, value: u16) {
        self.writes.push((reg, value));
        if self.stuck.contains(&reg) {
            return;
        }
        if let Some(left) = self.drop_writes.get_mut(&reg) {
            if *left > 0 {
                *left -= 1;
                return;
            }
        }
        if reg == MODEL_CFG && value & REFRESH != 0 {
            self.refresh_reads_left = 2;
        }
        self.regs.insert(reg, value);
    }
}

/// Cloneable handle to one simulated gauge; clones share the register file.
#[derive(Debug, Clone)]
pub struct SimulatedGauge {
    inner: Arc<Mutex<RegisterFile>>,
}

impl Default for SimulatedGauge {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedGauge {
    /// A gauge that has just been powered up (POR set, model not loaded).
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegisterFile::power_on())),
        }
    }

    /// A gauge that has already been configured: POR and DNR clear.
    pub fn warm() -> Self {
        let sim = Self::new();
        sim.set_register(STATUS, 0x0000);
        sim.set_register(FSTAT, 0x0000);
        sim
    }

    fn with<R>(&self, f: impl FnOnce(&mut RegisterFile) -> R) -> R {
        match self.inner.lock() {
            Ok(mut g) => f(&mut g),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    pub fn register(&self, reg: u8) -> u16 {
        self.with(|rf| rf.regs.get(&reg).copied().unwrap_or(0))
    }

    pub fn set_register(&self, reg: u8, value: u16) {
        self.with(|rf| {
            rf.regs.insert(reg, value);
        });
    }

    /// Every write the driver issued, in order, including dropped ones.
    pub fn writes(&self) -> Vec<(u8, u16)> {
        self.with(|rf| rf.writes.clone())
    }

    pub fn reads(&self) -> usize {
        self.with(|rf| rf.reads)
    }

    pub fn clear_log(&self) {
        self.with(|rf| {
            rf.writes.clear();
            rf.reads = 0;
        });
    }

    /// Fail every transaction with a bus error.
    pub fn set_fault(&self, fault: bool) {
        self.with(|rf| rf.fault = fault);
    }

    /// Ignore all writes to `reg`.
    pub fn stick(&self, reg: u8) {
        self.with(|rf| {
            rf.stuck.insert(reg);
        });
    }

    /// Ignore the next `count` writes to `reg`.
    pub fn drop_writes(&self, reg: u8, count: u32) {
        self.with(|rf| {
            rf.drop_writes.insert(reg, count);
        });
    }

    /// Keep FSTAT.DNR and MODEL_CFG.Refresh asserted forever.
    pub fn never_ready(&self) {
        self.with(|rf| rf.never_ready = true);
    }

    /// Move the simulated cell to `percent` state of charge.
    ///
    /// When `discharging`, current goes negative and time-to-empty is
    /// reported; otherwise the cell charges and time-to-full is reported.
    pub fn set_state_of_charge(&self, percent: f32, discharging: bool) {
        let raw_soc = (percent.clamp(0.0, 100.0) * 256.0).round() as u16;
        let (current, tte, ttf) = if discharging {
            (-640i16, 1280u16, 0u16)
        } else {
            (64i16, 0u16, 640u16)
        };
        self.with(|rf| {
            rf.regs.insert(REP_SOC, raw_soc);
            rf.regs.insert(MIX_SOC, raw_soc);
            rf.regs.insert(CURRENT, current as u16);
            rf.regs.insert(CURRENT_AVG, current as u16);
            rf.regs.insert(TTE, tte);
            rf.regs.insert(TTF, ttf);
        });
    }
}

impl Transport for SimulatedGauge {
    fn read_register(
        &mut self,
        addr: u8,
        reg: u8,
        buf: &mut [u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let value = self.with(|rf| {
            if rf.fault {
                return Err(HwError::Bus("simulated bus fault".into()));
            }
            if addr != GAUGE_ADDR {
                return Err(HwError::NoDevice(addr));
            }
            Ok(rf.read(reg))
        })?;
        let bytes = value.to_le_bytes();
        for (dst, src) in buf.iter_mut().zip(bytes.iter()) {
            *dst = *src;
        }
        tracing::trace!(reg, value, "sim gauge read");
        Ok(())
    }

    fn write_register(
        &mut self,
        addr: u8,
        reg: u8,
        data: &[u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let value = match data {
            [lo, hi] => u16::from_le_bytes([*lo, *hi]),
            _ => return Err(Box::new(HwError::Bus(format!("expected 2 bytes, got {}", data.len())))),
        };
        self.with(|rf| {
            if rf.fault {
                return Err(HwError::Bus("simulated bus fault".into()));
            }
            if addr != GAUGE_ADDR {
                return Err(HwError::NoDevice(addr));
            }
            rf.write(reg, value);
            Ok(())
        })?;
        tracing::trace!(reg, value, "sim gauge write");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(sim: &mut SimulatedGauge, reg: u8) -> u16 {
        let mut buf = [0u8; 2];
        sim.read_register(GAUGE_ADDR, reg, &mut buf).unwrap();
        u16::from_le_bytes(buf)
    }

    #[test]
    fn dnr_clears_after_polling() {
        let mut sim = SimulatedGauge::new();
        assert_eq!(read(&mut sim, FSTAT) & DNR, DNR);
        read(&mut sim, FSTAT);
        assert_eq!(read(&mut sim, FSTAT) & DNR, 0);
    }

    #[test]
    fn model_refresh_self_clears() {
        let mut sim = SimulatedGauge::warm();
        sim.write_register(GAUGE_ADDR, MODEL_CFG, &0x8400u16.to_le_bytes())
            .unwrap();
        assert_eq!(read(&mut sim, MODEL_CFG), 0x8400);
        read(&mut sim, MODEL_CFG);
        assert_eq!(read(&mut sim, MODEL_CFG), 0x0400);
    }

    #[test]
    fn stuck_register_ignores_writes_but_logs_them() {
        let mut sim = SimulatedGauge::warm();
        sim.stick(CYCLES);
        sim.write_register(GAUGE_ADDR, CYCLES, &[0x10, 0x00]).unwrap();
        assert_eq!(read(&mut sim, CYCLES), 100);
        assert_eq!(sim.writes(), vec![(CYCLES, 0x0010)]);
    }

    #[test]
    fn wrong_address_is_no_device() {
        let mut sim = SimulatedGauge::new();
        let mut buf = [0u8; 2];
        let err = sim.read_register(0x50, STATUS, &mut buf).unwrap_err();
        assert!(err.to_string().contains("0x50"));
    }
}
