//! Battery packs: a gauge plus the cell description and fallback parameters.
//!
//! Pack-level operations never return gauge errors; a failed read surfaces
//! as `Reading::Fault` and a failed restore as `None`/`false`, with the
//! cause logged.
use crate::config::{ChargeVoltage, Chemistry, GaugeConfig};
use crate::gauge::Max17055;
use crate::params::LearnedParams;
use crate::status::{Reading, SampleStatus};
use crate::store::ParamStore;
use crate::{BoxedTransport, SharedClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattPackModel {
    /// 6200 mAh pack.
    V1,
    /// 1200 mAh pack.
    V2,
}

/// Everything that distinguishes one pack from another.
#[derive(Debug, Clone, PartialEq)]
pub struct BattPackSpec {
    pub name: String,
    pub gauge: GaugeConfig,
    /// Charge percentage below which the host is shut down on battery.
    pub charge_min: f64,
    pub default_params: LearnedParams,
}

impl BattPackModel {
    pub const fn name(self) -> &'static str {
        match self {
            Self::V1 => "batt_pack_v1",
            Self::V2 => "batt_pack_v2",
        }
    }

    pub const fn gauge_config(self) -> GaugeConfig {
        match self {
            Self::V1 => GaugeConfig {
                des_cap: 6200.0,
                sense_res: 0.01,
                chrg_term: 40.0,
                empty_v_target: 3.3,
                recovery_v: 3.5,
                chrg_v: ChargeVoltage::V4_2,
                chemistry: Chemistry::LiCoO2,
            },
            Self::V2 => GaugeConfig {
                des_cap: 1200.0,
                sense_res: 0.01,
                chrg_term: 10.0,
                empty_v_target: 3.3,
                recovery_v: 3.8,
                chrg_v: ChargeVoltage::V4_2,
                chemistry: Chemistry::LiCoO2,
            },
        }
    }

    pub const fn charge_min(self) -> f64 {
        match self {
            Self::V1 => 5.0,
            Self::V2 => 1.0,
        }
    }

    pub const fn default_params(self) -> LearnedParams {
        match self {
            Self::V1 => LearnedParams::new(101, 8766, 10589, 38181, 596),
            Self::V2 => LearnedParams::new(156, 9278, 3471, 1933, 100),
        }
    }

    pub fn spec(self) -> BattPackSpec {
        BattPackSpec {
            name: self.name().to_string(),
            gauge: self.gauge_config(),
            charge_min: self.charge_min(),
            default_params: self.default_params(),
        }
    }
}

pub struct BattPack {
    spec: BattPackSpec,
    gauge: Max17055<BoxedTransport, SharedClock>,
}

impl BattPack {
    pub fn new(spec: BattPackSpec, transport: BoxedTransport, clock: SharedClock) -> Self {
        let gauge = Max17055::new(spec.gauge, transport, clock);
        Self { spec, gauge }
    }

    pub fn from_gauge(spec: BattPackSpec, gauge: Max17055<BoxedTransport, SharedClock>) -> Self {
        Self { spec, gauge }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub const fn charge_min(&self) -> f64 {
        self.spec.charge_min
    }

    pub const fn default_params(&self) -> LearnedParams {
        self.spec.default_params
    }

    pub const fn gauge(&self) -> &Max17055<BoxedTransport, SharedClock> {
        &self.gauge
    }

    /// Configure the gauge after a power-on reset and restore learned params.
    ///
    /// Returns the parameters written, or `None` when nothing was done
    /// (warm boot, not forced) or the sequence failed.
    pub fn initialise(&self, store: &dyn ParamStore, force: bool) -> Option<LearnedParams> {
        let por = match self.gauge.read_power_on_reset() {
            Ok(por) => por,
            Err(e) => {
                tracing::warn!(pack = self.name(), error = %e, "gauge unreachable, skipping initialisation");
                return None;
            }
        };
        if !por && !force {
            tracing::debug!(pack = self.name(), "no power-on reset, gauge keeps its configuration");
            return None;
        }

        let params = match store.load(self.name()) {
            Ok(Some(p)) => p,
            Ok(None) => {
                tracing::info!(pack = self.name(), "no saved parameters, using pack defaults");
                self.default_params()
            }
            Err(e) => {
                tracing::warn!(pack = self.name(), error = %e, "saved parameters unreadable, using pack defaults");
                self.default_params()
            }
        };

        let restored = self
            .gauge
            .initialise(force)
            .and_then(|_| self.gauge.write_params(&params))
            .and_then(|()| self.gauge.clear_power_on_reset());
        match restored {
            Ok(()) => Some(params),
            Err(e) => {
                tracing::error!(pack = self.name(), error = %e, "gauge initialisation failed");
                None
            }
        }
    }

    pub fn sample(&self) -> Reading<SampleStatus> {
        let r: Reading<_> = self.gauge.sample().into();
        if let Reading::Fault(e) = &r {
            tracing::warn!(pack = self.name(), error = %e, "gauge sample failed");
        }
        r
    }

    pub fn read_learned_params(&self) -> Reading<LearnedParams> {
        let r: Reading<_> = self.gauge.read_learned_params().into();
        if let Reading::Fault(e) = &r {
            tracing::warn!(pack = self.name(), error = %e, "reading learned params failed");
        }
        r
    }

    pub fn write_params(&self, params: &LearnedParams) -> bool {
        match self.gauge.write_params(params) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(pack = self.name(), error = %e, "restoring learned params failed");
                false
            }
        }
    }

    pub fn cycles(&self) -> Reading<f64> {
        self.gauge.read_cycles().into()
    }
}

impl std::fmt::Debug for BattPack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BattPack")
            .field("spec", &self.spec)
            .field("gauge_state", &self.gauge.state())
            .finish()
    }
}
