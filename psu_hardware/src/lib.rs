pub mod error;
pub mod host;
pub mod sim;
pub mod sim_gauge;

pub use host::SystemHost;
pub use sim::{SimulatedController, SimulatedHost};
pub use sim_gauge::{GAUGE_ADDR, SimulatedGauge};

#[cfg(feature = "hardware")]
pub mod hardware {
    use std::time::Duration;

    use psu_traits::{Controller, Transport};
    use rppal::gpio::{Gpio, InputPin, OutputPin};
    use rppal::i2c::I2c;

    use crate::error::{HwError, Result};

    /// Register access over the Linux I2C character device.
    pub struct I2cTransport {
        bus: I2c,
        current: Option<u8>,
    }

    impl I2cTransport {
        pub fn new(bus: u8) -> Result<Self> {
            let bus = I2c::with_bus(bus).map_err(|e| HwError::Bus(e.to_string()))?;
            Ok(Self { bus, current: None })
        }

        fn select(&mut self, addr: u8) -> Result<()> {
            if self.current != Some(addr) {
                self.bus
                    .set_slave_address(u16::from(addr))
                    .map_err(|_| HwError::NoDevice(addr))?;
                self.current = Some(addr);
            }
            Ok(())
        }
    }

    impl Transport for I2cTransport {
        fn read_register(
            &mut self,
            addr: u8,
            reg: u8,
            buf: &mut [u8],
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.select(addr)?;
            self.bus
                .write_read(&[reg], buf)
                .map_err(|e| HwError::Bus(e.to_string()))?;
            tracing::trace!(addr, reg, ?buf, "i2c read");
            Ok(())
        }

        fn write_register(
            &mut self,
            addr: u8,
            reg: u8,
            data: &[u8],
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.select(addr)?;
            let mut frame = Vec::with_capacity(data.len() + 1);
            frame.push(reg);
            frame.extend_from_slice(data);
            self.bus
                .write(&frame)
                .map_err(|e| HwError::Bus(e.to_string()))?;
            tracing::trace!(addr, reg, ?data, "i2c write");
            Ok(())
        }
    }

    /// PSU board signals wired straight to host GPIO.
    ///
    /// The switch input reads high while the operator switch is on. The
    /// shutdown notice is a pulse the PSU firmware latches.
    pub struct GpioController {
        switch: InputPin,
        notice: OutputPin,
        peripherals: OutputPin,
    }

    impl GpioController {
        pub fn new(switch_pin: u8, notice_pin: u8, peripherals_pin: u8) -> Result<Self> {
            let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
            let switch = gpio
                .get(switch_pin)
                .map_err(|e| HwError::Gpio(e.to_string()))?
                .into_input_pullup();
            let mut notice = gpio
                .get(notice_pin)
                .map_err(|e| HwError::Gpio(e.to_string()))?
                .into_output();
            let peripherals = gpio
                .get(peripherals_pin)
                .map_err(|e| HwError::Gpio(e.to_string()))?
                .into_output_high();
            notice.set_low();
            Ok(Self {
                switch,
                notice,
                peripherals,
            })
        }
    }

    impl Controller for GpioController {
        fn switch_state(
            &mut self,
        ) -> std::result::Result<bool, Box<dyn std::error::Error + Send + Sync>> {
            Ok(self.switch.is_high())
        }

        fn host_shutdown_initiated(
            &mut self,
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.notice.set_high();
            std::thread::sleep(Duration::from_millis(10));
            self.notice.set_low();
            Ok(())
        }

        fn power_peripherals(
            &mut self,
            on: bool,
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            if on {
                self.peripherals.set_high();
            } else {
                self.peripherals.set_low();
            }
            Ok(())
        }

        fn version(
            &mut self,
        ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>> {
            Ok("gpio".to_string())
        }
    }
}
