//! Maps `Box<dyn Error>` from trait boundaries to typed errors.
//!
//! The traits in `psu_traits` use `Box<dyn Error + Send + Sync>`; this module
//! converts those to `GaugeError`/`MonitorError`, with an optional
//! feature-gated path for `psu_hardware::HwError` downcasting.

use crate::error::{GaugeError, MonitorError};

/// Map a transport error to a typed `GaugeError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_bus_error(e: &(dyn std::error::Error + 'static)) -> GaugeError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<psu_hardware::error::HwError>() {
            return match hw {
                psu_hardware::error::HwError::Timeout => GaugeError::Timeout,
                other => GaugeError::Bus(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        GaugeError::Timeout
    } else {
        GaugeError::Bus(s)
    }
}

/// Map a controller error to a typed `MonitorError`.
pub fn map_controller_error(e: &(dyn std::error::Error + 'static)) -> MonitorError {
    MonitorError::Controller(e.to_string())
}
