//! Raw register counts to physical units and back.
//!
//! Capacity and current resolution depend on the sense resistor:
//! 5.0 uVh and 1.5625 uV per count across it. Ties round to even.
use std::time::Duration;

/// Seconds per TTE/TTF count.
pub const TIME_LSB_S: f64 = 5.625;
/// Millivolts per V_CELL count.
pub const VOLTAGE_LSB_MV: f64 = 0.078_125;

/// Round to one decimal place.
#[inline]
pub fn round_1dp(x: f64) -> f64 {
    (x * 10.0).round_ties_even() / 10.0
}

/// Per-gauge scale factors derived from the sense resistor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitScale {
    sense_res: f64,
}

impl UnitScale {
    /// `sense_res` in ohms; must be positive.
    pub const fn new(sense_res: f64) -> Self {
        Self { sense_res }
    }

    pub const fn sense_res(&self) -> f64 {
        self.sense_res
    }

    /// mAh per capacity count.
    #[inline]
    pub fn capacity_lsb(&self) -> f64 {
        5.0 / (self.sense_res * 1000.0)
    }

    /// mA per current count.
    #[inline]
    pub fn current_lsb(&self) -> f64 {
        1.5625 / (self.sense_res * 1000.0)
    }

    pub fn capacity_mah(&self, raw: i32) -> i32 {
        (f64::from(raw) * self.capacity_lsb()).round_ties_even() as i32
    }

    pub fn current_ma(&self, raw: i16) -> i32 {
        (f64::from(raw) * self.current_lsb()).round_ties_even() as i32
    }

    /// mAh to capacity counts, saturating at the register range.
    pub fn mah_to_counts(&self, mah: f64) -> u16 {
        saturate_u16((mah / self.capacity_lsb()).round_ties_even())
    }

    /// mA to current counts, saturating at the register range.
    pub fn ma_to_counts(&self, ma: f64) -> u16 {
        saturate_u16((ma / self.current_lsb()).round_ties_even())
    }
}

fn saturate_u16(x: f64) -> u16 {
    if x.is_nan() || x <= 0.0 {
        0
    } else if x >= f64::from(u16::MAX) {
        u16::MAX
    } else {
        x as u16
    }
}

/// State of charge, percent.
pub fn charge_percent(raw: u16) -> f64 {
    round_1dp(f64::from(raw) / 256.0)
}

/// Time-to-empty / time-to-full; counts below one mean "not applicable".
pub fn duration(raw: i16) -> Option<Duration> {
    if raw < 1 {
        return None;
    }
    let secs = (f64::from(raw) * TIME_LSB_S).round_ties_even();
    Some(Duration::from_secs(secs as u64))
}

/// Cell voltage, volts.
pub fn voltage(raw: u16) -> f64 {
    round_1dp(f64::from(raw) * VOLTAGE_LSB_MV / 1000.0)
}

/// Die temperature, degrees Celsius.
pub fn temperature(raw: i16) -> f64 {
    round_1dp(f64::from(raw) / 256.0)
}

/// Charge cycles, in the register's 1 % resolution.
pub fn cycles(raw: u16) -> f64 {
    round_1dp(f64::from(raw) / 100.0)
}
