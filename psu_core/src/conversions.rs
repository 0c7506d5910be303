//! `From` implementations bridging `psu_config` types to `psu_core` types.

use std::time::Duration;

use crate::batt_pack::{BattPackModel, BattPackSpec};
use crate::config::{ChargeVoltage, Chemistry, GaugeConfig, MonitorCfg};
use crate::params::LearnedParams;

// ── Gauge ────────────────────────────────────────────────────────────────────

impl From<psu_config::ChargeVoltageCfg> for ChargeVoltage {
    fn from(c: psu_config::ChargeVoltageCfg) -> Self {
        match c {
            psu_config::ChargeVoltageCfg::V4_2 => Self::V4_2,
            psu_config::ChargeVoltageCfg::V4_4 => Self::V4_4Or4_35,
        }
    }
}

impl From<psu_config::ChemistryCfg> for Chemistry {
    fn from(c: psu_config::ChemistryCfg) -> Self {
        match c {
            psu_config::ChemistryCfg::LiCoO2 => Self::LiCoO2,
            psu_config::ChemistryCfg::NcaNcr => Self::NcaNcr,
            psu_config::ChemistryCfg::LiFePO4 => Self::LiFePO4,
        }
    }
}

impl From<&psu_config::GaugeCfg> for GaugeConfig {
    fn from(c: &psu_config::GaugeCfg) -> Self {
        Self {
            des_cap: c.des_cap_mah,
            sense_res: c.sense_res_ohm,
            chrg_term: c.chrg_term_ma,
            empty_v_target: c.empty_v_target,
            recovery_v: c.recovery_v,
            chrg_v: c.charge_voltage.into(),
            chemistry: c.chemistry.into(),
        }
    }
}

// ── Battery pack ─────────────────────────────────────────────────────────────

impl From<psu_config::PackModel> for BattPackModel {
    fn from(m: psu_config::PackModel) -> Self {
        match m {
            psu_config::PackModel::V1 => Self::V1,
            psu_config::PackModel::V2 => Self::V2,
        }
    }
}

/// Pack model from `[batt_pack]`, with `[gauge]` overriding its cell description.
impl From<&psu_config::Config> for BattPackSpec {
    fn from(c: &psu_config::Config) -> Self {
        let mut spec = BattPackModel::from(c.batt_pack.model).spec();
        if let Some(g) = &c.gauge {
            spec.gauge = GaugeConfig::from(g);
            if let Some(min) = g.charge_min_percent {
                spec.charge_min = f64::from(min);
            }
        }
        spec
    }
}

// ── Monitor ──────────────────────────────────────────────────────────────────

impl From<&psu_config::MonitorCfg> for MonitorCfg {
    fn from(c: &psu_config::MonitorCfg) -> Self {
        Self {
            interval: Duration::from_millis(c.interval_ms),
            shutdown_grace: Duration::from_millis(c.shutdown_grace_ms),
            ignore_standby: c.ignore_standby,
            ignore_threshold: c.ignore_threshold,
        }
    }
}

// ── Learned parameters ───────────────────────────────────────────────────────

impl From<&psu_config::PersistedParams> for LearnedParams {
    fn from(p: &psu_config::PersistedParams) -> Self {
        Self {
            calibrated_on: p.calibrated_on,
            r_comp_0: p.r_comp_0,
            temp_co: p.temp_co,
            full_cap_rep: p.full_cap_rep,
            full_cap_nom: p.full_cap_nom,
            cycles: p.cycles,
        }
    }
}

impl From<&LearnedParams> for psu_config::PersistedParams {
    fn from(p: &LearnedParams) -> Self {
        Self {
            calibrated_on: p.calibrated_on,
            r_comp_0: p.r_comp_0,
            temp_co: p.temp_co,
            full_cap_rep: p.full_cap_rep,
            full_cap_nom: p.full_cap_nom,
            cycles: p.cycles,
        }
    }
}
