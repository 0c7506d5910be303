use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("bus error: {0}")]
    Bus(String),
    #[error("no device acknowledged at address 0x{0:02x}")]
    NoDevice(u8),
    #[error("bus timeout")]
    Timeout,
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("host shutdown failed: {0}")]
    Shutdown(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
