use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use psu_traits::{Controller, Host};

use crate::error::HwError;

/// In-memory PSU controller. Clones share state.
#[derive(Debug, Clone)]
pub struct SimulatedController {
    switch_on: Arc<AtomicBool>,
    fault: Arc<AtomicBool>,
    peripherals_on: Arc<AtomicBool>,
    notices: Arc<AtomicUsize>,
}

impl Default for SimulatedController {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedController {
    pub fn new() -> Self {
        Self {
            switch_on: Arc::new(AtomicBool::new(true)),
            fault: Arc::new(AtomicBool::new(false)),
            peripherals_on: Arc::new(AtomicBool::new(true)),
            notices: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_switch(&self, on: bool) {
        self.switch_on.store(on, Ordering::Relaxed);
    }

    /// Make `switch_state` fail until cleared.
    pub fn set_fault(&self, fault: bool) {
        self.fault.store(fault, Ordering::Relaxed);
    }

    pub fn peripherals_on(&self) -> bool {
        self.peripherals_on.load(Ordering::Relaxed)
    }

    /// Number of host-shutdown notices received.
    pub fn notices(&self) -> usize {
        self.notices.load(Ordering::Relaxed)
    }
}

impl Controller for SimulatedController {
    fn switch_state(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        if self.fault.load(Ordering::Relaxed) {
            return Err(Box::new(HwError::Bus("simulated controller fault".into())));
        }
        Ok(self.switch_on.load(Ordering::Relaxed))
    }

    fn host_shutdown_initiated(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.notices.fetch_add(1, Ordering::Relaxed);
        tracing::info!("sim controller: host shutdown notice");
        Ok(())
    }

    fn power_peripherals(
        &mut self,
        on: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.peripherals_on.store(on, Ordering::Relaxed);
        Ok(())
    }

    fn version(&mut self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        Ok("sim-psu 1.0".to_string())
    }
}

/// Host that counts shutdown requests instead of powering off.
#[derive(Debug, Clone, Default)]
pub struct SimulatedHost {
    shutdowns: Arc<AtomicUsize>,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::Relaxed)
    }
}

impl Host for SimulatedHost {
    fn name(&self) -> String {
        "sim-host".to_string()
    }

    fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.shutdowns.fetch_add(1, Ordering::Relaxed);
        tracing::warn!("sim host: shutdown requested");
        Ok(())
    }
}
