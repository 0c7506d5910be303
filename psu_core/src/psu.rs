//! PSU boards and the status the monitor acts on.
//!
//! `Psu` is the capability seam the monitor drives; `Board` is the closed
//! set of supported boards, chosen from config at load time.
use std::time::Duration;

use psu_traits::Controller;
use serde::Serialize;

use crate::batt_pack::{BattPack, BattPackSpec};
use crate::error::MonitorError;
use crate::gauge::Max17055;
use crate::hw_error::map_controller_error;
use crate::status::{Reading, SampleStatus};
use crate::{BoxedTransport, SharedClock};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargeStatus {
    pub percent: f64,
    #[serde(serialize_with = "crate::status::secs::serialize")]
    pub tte: Option<Duration>,
    #[serde(serialize_with = "crate::status::secs::serialize")]
    pub ttf: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PsuStatus {
    /// Operator switch is off.
    pub standby: bool,
    /// `None` when the board cannot tell.
    pub input_power_present: Option<bool>,
    pub charge: Option<ChargeStatus>,
    pub batt: Option<SampleStatus>,
}

impl PsuStatus {
    pub fn from_sample(standby: bool, sample: Option<SampleStatus>) -> Self {
        let input_power_present = sample.as_ref().map(|s| s.input_power_present);
        let charge = sample.as_ref().map(|s| ChargeStatus {
            percent: s.charge.percent,
            tte: s.tte,
            ttf: s.ttf,
        });
        Self {
            standby,
            input_power_present,
            charge,
            batt: sample,
        }
    }

    /// On battery with charge below `charge_min`.
    ///
    /// Unknown charge, unknown minimum, or unknown input power never count
    /// as below threshold.
    pub fn below_power_threshold(&self, charge_min: Option<f64>) -> bool {
        let (Some(charge), Some(min)) = (&self.charge, charge_min) else {
            return false;
        };
        if self.input_power_present != Some(false) {
            return false;
        }
        charge.percent < min
    }
}

/// What the monitor needs from a PSU board.
pub trait Psu {
    fn open(&mut self) -> Result<(), MonitorError>;
    fn close(&mut self) -> Result<(), MonitorError>;
    /// `None` when the board could not be read this cycle.
    fn status(&mut self) -> Option<PsuStatus>;
    fn charge_min(&self) -> Option<f64>;
    fn batt_pack(&self) -> Option<&BattPack>;
    /// Battery sample, `Absent` on boards without a pack.
    fn battery_sample(&self) -> Reading<SampleStatus> {
        self.batt_pack().map_or(Reading::Absent, BattPack::sample)
    }
    fn host_shutdown_initiated(&mut self) -> Result<(), MonitorError>;
    fn power_peripherals(&mut self, on: bool) -> Result<(), MonitorError>;
    fn version(&mut self) -> Option<String>;
}

pub type BoxedController = Box<dyn Controller + Send>;

fn read_switch(controller: &mut BoxedController) -> Option<bool> {
    match controller.switch_state() {
        Ok(on) => Some(on),
        Err(e) => {
            tracing::warn!(error = %map_controller_error(&*e), "switch state unreadable");
            None
        }
    }
}

fn open_controller(controller: &mut BoxedController, board: &str) -> Result<(), MonitorError> {
    let version = controller
        .version()
        .map_err(|e| MonitorError::Open(e.to_string()))?;
    tracing::info!(board, firmware = %version, "psu opened");
    Ok(())
}

/// PSU with a battery pack behind a MAX17055.
pub struct BattPackBoard {
    controller: BoxedController,
    pack: BattPack,
}

impl BattPackBoard {
    pub fn new(controller: BoxedController, pack: BattPack) -> Self {
        Self { controller, pack }
    }
}

impl Psu for BattPackBoard {
    fn open(&mut self) -> Result<(), MonitorError> {
        open_controller(&mut self.controller, "batt-pack")
    }

    fn close(&mut self) -> Result<(), MonitorError> {
        tracing::debug!(board = "batt-pack", "psu closed");
        Ok(())
    }

    fn status(&mut self) -> Option<PsuStatus> {
        let switch_on = read_switch(&mut self.controller)?;
        Some(PsuStatus::from_sample(!switch_on, self.battery_sample().present()))
    }

    fn charge_min(&self) -> Option<f64> {
        Some(self.pack.charge_min())
    }

    fn batt_pack(&self) -> Option<&BattPack> {
        Some(&self.pack)
    }

    fn host_shutdown_initiated(&mut self) -> Result<(), MonitorError> {
        self.controller
            .host_shutdown_initiated()
            .map_err(|e| map_controller_error(&*e))
    }

    fn power_peripherals(&mut self, on: bool) -> Result<(), MonitorError> {
        self.controller
            .power_peripherals(on)
            .map_err(|e| map_controller_error(&*e))
    }

    fn version(&mut self) -> Option<String> {
        self.controller.version().ok()
    }
}

/// Header board: switch and peripheral rail only.
pub struct HeaderBoard {
    controller: BoxedController,
}

impl HeaderBoard {
    pub fn new(controller: BoxedController) -> Self {
        Self { controller }
    }
}

impl Psu for HeaderBoard {
    fn open(&mut self) -> Result<(), MonitorError> {
        open_controller(&mut self.controller, "header")
    }

    fn close(&mut self) -> Result<(), MonitorError> {
        tracing::debug!(board = "header", "psu closed");
        Ok(())
    }

    fn status(&mut self) -> Option<PsuStatus> {
        let switch_on = read_switch(&mut self.controller)?;
        Some(PsuStatus::from_sample(!switch_on, None))
    }

    fn charge_min(&self) -> Option<f64> {
        None
    }

    fn batt_pack(&self) -> Option<&BattPack> {
        None
    }

    fn host_shutdown_initiated(&mut self) -> Result<(), MonitorError> {
        self.controller
            .host_shutdown_initiated()
            .map_err(|e| map_controller_error(&*e))
    }

    fn power_peripherals(&mut self, on: bool) -> Result<(), MonitorError> {
        self.controller
            .power_peripherals(on)
            .map_err(|e| map_controller_error(&*e))
    }

    fn version(&mut self) -> Option<String> {
        self.controller.version().ok()
    }
}

/// The supported boards.
pub enum Board {
    BattPack(BattPackBoard),
    Header(HeaderBoard),
}

impl Board {
    /// Assemble the board `[psu]` selects. The transport is only used by
    /// boards with a battery pack.
    pub fn from_config(
        cfg: &psu_config::Config,
        controller: BoxedController,
        transport: BoxedTransport,
        clock: SharedClock,
    ) -> Self {
        match cfg.psu.model {
            psu_config::PsuModel::Header => Self::Header(HeaderBoard::new(controller)),
            psu_config::PsuModel::BattPack => {
                let spec = BattPackSpec::from(cfg);
                let gauge = Max17055::new(spec.gauge, transport, clock)
                    .with_address(cfg.hardware.gauge_addr);
                Self::BattPack(BattPackBoard::new(
                    controller,
                    BattPack::from_gauge(spec, gauge),
                ))
            }
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BattPack(_) => "batt-pack",
            Self::Header(_) => "header",
        }
    }

    fn inner(&self) -> &dyn Psu {
        match self {
            Self::BattPack(b) => b,
            Self::Header(b) => b,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Psu {
        match self {
            Self::BattPack(b) => b,
            Self::Header(b) => b,
        }
    }
}

impl Psu for Board {
    fn open(&mut self) -> Result<(), MonitorError> {
        self.inner_mut().open()
    }

    fn close(&mut self) -> Result<(), MonitorError> {
        self.inner_mut().close()
    }

    fn status(&mut self) -> Option<PsuStatus> {
        self.inner_mut().status()
    }

    fn charge_min(&self) -> Option<f64> {
        self.inner().charge_min()
    }

    fn batt_pack(&self) -> Option<&BattPack> {
        self.inner().batt_pack()
    }

    fn host_shutdown_initiated(&mut self) -> Result<(), MonitorError> {
        self.inner_mut().host_shutdown_initiated()
    }

    fn power_peripherals(&mut self, on: bool) -> Result<(), MonitorError> {
        self.inner_mut().power_peripherals(on)
    }

    fn version(&mut self) -> Option<String> {
        self.inner_mut().version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn status(percent: Option<f64>, input: Option<bool>) -> PsuStatus {
        PsuStatus {
            standby: false,
            input_power_present: input,
            charge: percent.map(|p| ChargeStatus {
                percent: p,
                tte: None,
                ttf: None,
            }),
            batt: None,
        }
    }

    #[rstest]
    #[case(Some(3.0), Some(false), Some(5.0), true)]
    #[case(Some(5.0), Some(false), Some(5.0), false)]
    #[case(Some(3.0), Some(true), Some(5.0), false)]
    #[case(Some(3.0), None, Some(5.0), false)]
    #[case(None, Some(false), Some(5.0), false)]
    #[case(Some(3.0), Some(false), None, false)]
    fn threshold_table(
        #[case] percent: Option<f64>,
        #[case] input: Option<bool>,
        #[case] min: Option<f64>,
        #[case] below: bool,
    ) {
        assert_eq!(status(percent, input).below_power_threshold(min), below);
    }

    #[test]
    fn status_json_shape() {
        let v = serde_json::to_value(status(Some(42.5), Some(true))).unwrap();
        assert_eq!(v["standby"], false);
        assert_eq!(v["input_power_present"], true);
        assert_eq!(v["charge"]["percent"], 42.5);
        assert!(v["batt"].is_null());
    }
}
