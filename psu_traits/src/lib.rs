pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Byte-level register access to a device on a shared bus (I2C or UART bridge).
///
/// Implementations own bus-level locking and timeouts; every call is one
/// complete transaction addressed to `addr`.
pub trait Transport {
    fn read_register(
        &mut self,
        addr: u8,
        reg: u8,
        buf: &mut [u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn write_register(
        &mut self,
        addr: u8,
        reg: u8,
        data: &[u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// The PSU's own microcontroller (or IO expander standing in for one).
pub trait Controller {
    /// Position of the operator power switch; `false` means standby is requested.
    fn switch_state(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
    /// Tell the firmware the host is going down so its watchdog stays quiet.
    fn host_shutdown_initiated(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn power_peripherals(&mut self, on: bool)
    -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn version(&mut self) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

/// The computer being powered.
pub trait Host {
    fn name(&self) -> String;
    fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_register(
        &mut self,
        addr: u8,
        reg: u8,
        buf: &mut [u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_register(addr, reg, buf)
    }

    fn write_register(
        &mut self,
        addr: u8,
        reg: u8,
        data: &[u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).write_register(addr, reg, data)
    }
}

impl<C: Controller + ?Sized> Controller for Box<C> {
    fn switch_state(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        (**self).switch_state()
    }

    fn host_shutdown_initiated(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).host_shutdown_initiated()
    }

    fn power_peripherals(
        &mut self,
        on: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).power_peripherals(on)
    }

    fn version(&mut self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        (**self).version()
    }
}

impl<H: Host + ?Sized> Host for Box<H> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).shutdown()
    }
}
