use thiserror::Error;

/// Failures of the fuel-gauge register protocol.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GaugeError {
    #[error("bus error: {0}")]
    Bus(String),
    #[error("bus timeout")]
    Timeout,
    /// Write-then-verify never read back the written value.
    #[error("hardware unreachable: reg 0x{reg:02x} wrote 0x{wrote:04x} read 0x{read:04x}")]
    HardwareUnreachable { reg: u8, wrote: u16, read: u16 },
    /// A masked register poll ran out of retries.
    #[error(
        "sequence timeout: reg 0x{reg:02x} mask 0x{mask:04x} expected 0x{expected:04x} got 0x{got:04x}"
    )]
    SequenceTimeout {
        reg: u8,
        mask: u16,
        expected: u16,
        got: u16,
    },
    #[error("gauge lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Error, Clone)]
pub enum MonitorError {
    #[error("psu open failed: {0}")]
    Open(String),
    #[error("controller error: {0}")]
    Controller(String),
    #[error("host shutdown failed: {0}")]
    HostShutdown(String),
    #[error("parameter store: {0}")]
    Store(String),
    #[error("monitor thread failed to start: {0}")]
    Spawn(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing psu")]
    MissingPsu,
    #[error("missing host")]
    MissingHost,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}
