//! Decoded gauge samples and the explicit read outcome.
use std::time::Duration;

use serde::Serialize;

use crate::error::GaugeError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChargeLevel {
    /// State of charge, percent (1 dp).
    pub percent: f64,
    /// Remaining capacity, mAh.
    pub mah: i32,
}

/// One decoded battery sample, in physical units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleStatus {
    pub input_power_present: bool,
    pub charge: ChargeLevel,
    #[serde(serialize_with = "secs::serialize")]
    pub tte: Option<Duration>,
    #[serde(serialize_with = "secs::serialize")]
    pub ttf: Option<Duration>,
    /// V
    pub voltage: f64,
    /// Average current, mA; negative while discharging.
    pub current: i32,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Average capacity, mAh.
    pub capacity: i32,
    pub cycles: f64,
}

/// Outcome of a battery-pack read.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading<T> {
    Present(T),
    /// Nothing to report (no pack fitted, or the value does not apply).
    Absent,
    Fault(GaugeError),
}

impl<T> Reading<T> {
    pub fn present(self) -> Option<T> {
        match self {
            Self::Present(v) => Some(v),
            Self::Absent | Self::Fault(_) => None,
        }
    }

    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::Fault(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reading<U> {
        match self {
            Self::Present(v) => Reading::Present(f(v)),
            Self::Absent => Reading::Absent,
            Self::Fault(e) => Reading::Fault(e),
        }
    }
}

impl<T> From<Result<T, GaugeError>> for Reading<T> {
    fn from(r: Result<T, GaugeError>) -> Self {
        match r {
            Ok(v) => Self::Present(v),
            Err(e) => Self::Fault(e),
        }
    }
}

/// Optional durations as whole seconds.
pub(crate) mod secs {
    use std::time::Duration;

    use serde::Serializer;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_from_result() {
        let ok: Reading<u16> = Ok(5).into();
        assert_eq!(ok.present(), Some(5));
        let bad: Reading<u16> = Err(GaugeError::Timeout).into();
        assert!(bad.is_fault());
        assert_eq!(bad.map(|v| v * 2).present(), None);
    }

    #[test]
    fn durations_serialize_as_seconds() {
        let s = SampleStatus {
            input_power_present: false,
            charge: ChargeLevel {
                percent: 50.0,
                mah: 3100,
            },
            tte: Some(Duration::from_secs(7200)),
            ttf: None,
            voltage: 3.7,
            current: -100,
            temperature: 25.0,
            capacity: 3100,
            cycles: 1.0,
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["tte"], 7200);
        assert!(v["ttf"].is_null());
        assert_eq!(v["charge"]["percent"], 50.0);
    }
}
