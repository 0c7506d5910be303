//! MAX17055 register map and bit masks.

/// 7-bit I2C address.
pub const ADDR: u8 = 0x36;

pub const STATUS: u8 = 0x00;
pub const REP_CAP: u8 = 0x05;
pub const REP_SOC: u8 = 0x06;
pub const TEMP: u8 = 0x08;
pub const V_CELL: u8 = 0x09;
pub const CURRENT: u8 = 0x0a;
pub const CURRENT_AVG: u8 = 0x0b;
pub const MIX_SOC: u8 = 0x0d;
pub const MIX_CAP: u8 = 0x0f;
pub const FULL_CAP_REP: u8 = 0x10;
pub const TTE: u8 = 0x11;
pub const CYCLES: u8 = 0x17;
pub const DESIGN_CAP: u8 = 0x18;
pub const I_CHRG_TERM: u8 = 0x1e;
pub const CAP_AVG: u8 = 0x1f;
pub const TTF: u8 = 0x20;
pub const DEV_NAME: u8 = 0x21;
pub const FULL_CAP_NOM: u8 = 0x23;
pub const R_COMP_0: u8 = 0x38;
pub const TEMP_CO: u8 = 0x39;
pub const V_EMPTY: u8 = 0x3a;
pub const FSTAT: u8 = 0x3d;
pub const DQACC: u8 = 0x45;
pub const DPACC: u8 = 0x46;
pub const HIB_MODE: u8 = 0x60;
pub const HIB_CFG: u8 = 0xba;
pub const MODEL_CFG: u8 = 0xdb;

/// STATUS: power-on reset.
pub const STATUS_POR: u16 = 0x0002;
/// STATUS bits kept when clearing boot flags.
pub const STATUS_BOOT_KEEP: u16 = 0x777f;
/// FSTAT: data not ready.
pub const FSTAT_DNR: u16 = 0x0001;
/// MODEL_CFG: model refresh in progress.
pub const MODEL_CFG_REFRESH: u16 = 0x8000;

pub const HIB_MODE_SOFT_WAKE: u16 = 0x0090;

/// dPAcc coefficients for the 4.4 V / 4.2 V charge classes, divided by 32.
pub const DPACC_HIGH_VOLTAGE: u16 = 51200 / 32;
pub const DPACC_STANDARD: u16 = 44138 / 32;

/// dQAcc value written after a parameter restore.
pub const DQACC_RESTORED: u16 = 0x0c80;
