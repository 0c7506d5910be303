#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! PSU supervision and MAX17055 fuel-gauge engine (hardware-agnostic).
//!
//! All bus traffic goes through `psu_traits::Transport`; the PSU
//! microcontroller and the host are reached through `psu_traits::Controller`
//! and `psu_traits::Host`.
//!
//! ## Architecture
//!
//! - **Codec / units**: register words and their physical meaning
//!   (`codec`, `units`)
//! - **Gauge**: EZ-model configuration, sampling, learned-parameter
//!   save/restore (`gauge`)
//! - **Battery pack**: cell description, fallback parameters, explicit
//!   `Reading` outcomes (`batt_pack`)
//! - **Boards**: the `Psu` seam and the supported `Board`s (`psu`)
//! - **Monitor**: poll loop and the shutdown state machine (`monitor`)
//!
//! ## Timing
//!
//! Register delays, poll waits and the shutdown grace period all go through
//! a `Clock`, so tests run the full sequences with `ManualClock` in no
//! wall time.

use std::sync::Arc;

use psu_traits::{Clock, Transport};

pub mod atomic;
pub mod batt_pack;
pub mod builder;
pub mod codec;
pub mod config;
pub mod conversions;
pub mod error;
pub mod gauge;
pub mod hw_error;
pub mod mocks;
pub mod monitor;
pub mod params;
pub mod psu;
pub mod registers;
pub mod status;
pub mod store;
pub mod units;

/// Type-erased transport owned by a gauge.
pub type BoxedTransport = Box<dyn Transport + Send>;
/// Clock shared between the gauge and the monitor.
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

pub use batt_pack::{BattPack, BattPackModel, BattPackSpec};
pub use builder::MonitorBuilder;
pub use config::{ChargeVoltage, Chemistry, GaugeConfig, GaugeTiming, MonitorCfg};
pub use error::{BuildError, GaugeError, MonitorError, Result};
pub use gauge::{GaugeState, Max17055, PARAM_SAVE_INTERVAL};
pub use monitor::{MonitorCore, MonitorShared, MonitorState, PsuMonitor};
pub use params::LearnedParams;
pub use psu::{BattPackBoard, Board, ChargeStatus, HeaderBoard, Psu, PsuStatus};
pub use status::{ChargeLevel, Reading, SampleStatus};
pub use store::{JsonFileStore, ParamStore};
