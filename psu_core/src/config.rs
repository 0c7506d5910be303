//! Runtime configuration types for the gauge driver and monitor.
//!
//! These are separate from the TOML-deserialized config in `psu_config`.
use std::time::Duration;

/// Charge voltage class written to MODEL_CFG.VChg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChargeVoltage {
    #[default]
    V4_2 = 0,
    /// 4.35 V or 4.4 V cells.
    V4_4Or4_35 = 1,
}

/// Cell chemistry, written to MODEL_CFG.ModelID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Chemistry {
    #[default]
    LiCoO2 = 0,
    NcaNcr = 2,
    LiFePO4 = 6,
}

/// Immutable description of the cell and sense circuit behind one gauge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeConfig {
    /// Design capacity, mAh.
    pub des_cap: f64,
    /// Sense resistor, ohms.
    pub sense_res: f64,
    /// Charge termination current, mA.
    pub chrg_term: f64,
    /// Empty voltage target, V.
    pub empty_v_target: f64,
    /// Recovery voltage, V.
    pub recovery_v: f64,
    pub chrg_v: ChargeVoltage,
    pub chemistry: Chemistry,
}

impl GaugeConfig {
    pub fn units(&self) -> crate::units::UnitScale {
        crate::units::UnitScale::new(self.sense_res)
    }

    /// V_EMPTY word: empty target in 10 mV steps (bits 7..15) and recovery
    /// voltage in 40 mV steps (bits 0..6).
    pub fn v_empty_word(&self) -> u16 {
        let empty = (self.empty_v_target * 100.0) as u16;
        let recovery = (self.recovery_v * 25.0) as u16;
        (empty << 7) | (recovery & 0x7f)
    }

    pub fn model_cfg_word(&self) -> u16 {
        crate::registers::MODEL_CFG_REFRESH
            | ((self.chrg_v as u16) << 10)
            | ((self.chemistry as u16) << 4)
    }

    pub fn dpacc_word(&self) -> u16 {
        match self.chrg_v {
            ChargeVoltage::V4_4Or4_35 => crate::registers::DPACC_HIGH_VOLTAGE,
            ChargeVoltage::V4_2 => crate::registers::DPACC_STANDARD,
        }
    }
}

/// Gauge timing: inter-register delay, poll policy and write-verify budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaugeTiming {
    pub register_delay: Duration,
    pub poll_retries: u32,
    pub poll_interval: Duration,
    pub verify_attempts: u32,
    pub settle: Duration,
}

impl Default for GaugeTiming {
    fn default() -> Self {
        Self {
            register_delay: Duration::from_millis(1),
            poll_retries: 20,
            poll_interval: Duration::from_millis(100),
            verify_attempts: 3,
            settle: Duration::from_millis(350),
        }
    }
}

/// Monitor loop configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorCfg {
    pub interval: Duration,
    pub shutdown_grace: Duration,
    pub ignore_standby: bool,
    pub ignore_threshold: bool,
}

impl Default for MonitorCfg {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            shutdown_grace: Duration::from_secs(2),
            ignore_standby: false,
            ignore_threshold: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v2() -> GaugeConfig {
        GaugeConfig {
            des_cap: 1200.0,
            sense_res: 0.01,
            chrg_term: 10.0,
            empty_v_target: 3.3,
            recovery_v: 3.8,
            chrg_v: ChargeVoltage::V4_2,
            chemistry: Chemistry::LiCoO2,
        }
    }

    #[test]
    fn v_empty_packs_both_targets() {
        let cfg = v2();
        let empty = (3.3f64 * 100.0) as u16;
        let recovery = (3.8f64 * 25.0) as u16;
        assert_eq!(cfg.v_empty_word(), (empty << 7) | recovery);
        assert_eq!(cfg.v_empty_word() & 0x7f, 95);
    }

    #[test]
    fn model_cfg_sets_refresh_voltage_and_chemistry() {
        let mut cfg = v2();
        assert_eq!(cfg.model_cfg_word(), 0x8000);
        cfg.chrg_v = ChargeVoltage::V4_4Or4_35;
        cfg.chemistry = Chemistry::LiFePO4;
        assert_eq!(cfg.model_cfg_word(), 0x8000 | 0x0400 | 0x0060);
        assert_eq!(cfg.dpacc_word(), 1600);
    }

    #[test]
    fn standard_class_dpacc() {
        assert_eq!(v2().dpacc_word(), 1379);
    }
}
