#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and the persisted fuel-gauge parameter record.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//!   Every section is optional; an empty file selects a battery-pack PSU
//!   with the V2 pack and a 1 s poll.
//! - `PersistedParams` is the JSON record of learned gauge parameters,
//!   stored one file per battery pack.
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PsuModel {
    /// PSU with a MAX17055-backed battery pack and an operator switch.
    #[default]
    BattPack,
    /// Plain header board: switch and peripheral rail only, no battery.
    Header,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct PsuCfg {
    pub model: PsuModel,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PackModel {
    V1,
    #[default]
    V2,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct BattPackCfg {
    pub model: PackModel,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChargeVoltageCfg {
    #[default]
    #[serde(rename = "4.2")]
    V4_2,
    #[serde(rename = "4.4", alias = "4.35")]
    V4_4,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChemistryCfg {
    #[default]
    #[serde(rename = "licoo2")]
    LiCoO2,
    #[serde(rename = "nca-ncr")]
    NcaNcr,
    #[serde(rename = "lifepo4")]
    LiFePO4,
}

/// Explicit gauge configuration overriding the pack model's built-in one.
#[derive(Debug, Deserialize, Clone)]
pub struct GaugeCfg {
    pub des_cap_mah: f64,
    pub sense_res_ohm: f64,
    pub chrg_term_ma: f64,
    pub empty_v_target: f64,
    pub recovery_v: f64,
    #[serde(default)]
    pub charge_voltage: ChargeVoltageCfg,
    #[serde(default)]
    pub chemistry: ChemistryCfg,
    /// Charge percentage below which the host is shut down on battery.
    #[serde(default)]
    pub charge_min_percent: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MonitorCfg {
    pub interval_ms: u64,
    /// Delay between the firmware notice and the host power-off.
    pub shutdown_grace_ms: u64,
    pub ignore_standby: bool,
    pub ignore_threshold: bool,
}

impl Default for MonitorCfg {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            shutdown_grace_ms: 2000,
            ignore_standby: false,
            ignore_threshold: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PersistenceCfg {
    /// Directory holding `<pack>_max17055_params.json`.
    pub dir: String,
}

impl Default for PersistenceCfg {
    fn default() -> Self {
        Self {
            dir: "/var/lib/psu".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Hardware {
    pub i2c_bus: u8,
    pub gauge_addr: u8,
    pub switch_pin: u8,
    pub shutdown_notice_pin: u8,
    pub peripherals_pin: u8,
    /// Log the power-off instead of running it.
    pub dry_run_shutdown: bool,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            gauge_addr: 0x36,
            switch_pin: 17,
            shutdown_notice_pin: 27,
            peripherals_pin: 22,
            dry_run_shutdown: false,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub psu: PsuCfg,
    pub batt_pack: BattPackCfg,
    pub gauge: Option<GaugeCfg>,
    pub monitor: MonitorCfg,
    pub persistence: PersistenceCfg,
    pub hardware: Hardware,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg =
        load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {}", path.display(), e))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Monitor
        if self.monitor.interval_ms == 0 {
            eyre::bail!("monitor.interval_ms must be >= 1");
        }
        if self.monitor.interval_ms > 60 * 60 * 1000 {
            eyre::bail!("monitor.interval_ms is unreasonably large (>1h)");
        }
        if self.monitor.shutdown_grace_ms > 60 * 1000 {
            eyre::bail!("monitor.shutdown_grace_ms must be <= 60000");
        }

        // Gauge override
        if let Some(g) = &self.gauge {
            if !(g.sense_res_ohm.is_finite() && g.sense_res_ohm > 0.0) {
                eyre::bail!("gauge.sense_res_ohm must be > 0");
            }
            if !(g.des_cap_mah.is_finite() && g.des_cap_mah > 0.0) {
                eyre::bail!("gauge.des_cap_mah must be > 0");
            }
            // DesignCap is a 16-bit register in units of 5 uVh / sense_res.
            let capacity_lsb = 5.0 / (g.sense_res_ohm * 1000.0);
            if (g.des_cap_mah / capacity_lsb).round_ties_even() > f64::from(u16::MAX) {
                eyre::bail!("gauge.des_cap_mah does not fit the design capacity register");
            }
            if !(g.chrg_term_ma.is_finite() && g.chrg_term_ma > 0.0) {
                eyre::bail!("gauge.chrg_term_ma must be > 0");
            }
            if !(g.empty_v_target > 0.0 && g.empty_v_target <= 5.11) {
                eyre::bail!("gauge.empty_v_target must be in (0.0, 5.11]");
            }
            if !(g.recovery_v >= 0.0 && g.recovery_v <= 5.08) {
                eyre::bail!("gauge.recovery_v must be in [0.0, 5.08]");
            }
            if let Some(min) = g.charge_min_percent
                && !(0.0..=100.0).contains(&min)
            {
                eyre::bail!("gauge.charge_min_percent must be in [0.0, 100.0]");
            }
        }

        // Persistence
        if self.persistence.dir.trim().is_empty() {
            eyre::bail!("persistence.dir must not be empty");
        }

        // Hardware
        if self.hardware.gauge_addr > 0x7f {
            eyre::bail!("hardware.gauge_addr must be a 7-bit address");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}

/// Learned MAX17055 parameters as stored on disk.
///
/// Values are raw 16-bit register contents. Example:
///
/// ```json
/// {"calibrated-on": "2021-01-02T09:34:48Z",
///  "r-comp-0": 201, "temp-co": 9278, "full-cap-rep": 1790, "full-cap-nom": 4896, "cycles": 210}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PersistedParams {
    #[serde(default)]
    pub calibrated_on: Option<DateTime<Utc>>,
    pub r_comp_0: u16,
    pub temp_co: u16,
    pub full_cap_rep: u16,
    pub full_cap_nom: u16,
    pub cycles: u16,
}

pub fn load_params_json(s: &str) -> Result<PersistedParams, serde_json::Error> {
    serde_json::from_str::<PersistedParams>(s)
}

impl PersistedParams {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_valid_with_defaults() {
        let cfg = load_toml("").unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.psu.model, PsuModel::BattPack);
        assert_eq!(cfg.batt_pack.model, PackModel::V2);
        assert_eq!(cfg.monitor.interval_ms, 1000);
        assert_eq!(cfg.monitor.shutdown_grace_ms, 2000);
        assert_eq!(cfg.hardware.gauge_addr, 0x36);
        assert!(cfg.gauge.is_none());
    }

    #[test]
    fn params_use_kebab_case_keys() {
        let p = PersistedParams {
            calibrated_on: None,
            r_comp_0: 201,
            temp_co: 9278,
            full_cap_rep: 1790,
            full_cap_nom: 4896,
            cycles: 210,
        };
        let json = p.to_json().unwrap();
        assert!(json.contains("\"r-comp-0\":201"));
        assert!(json.contains("\"full-cap-nom\":4896"));
        assert!(json.contains("\"calibrated-on\":null"));
    }
}
