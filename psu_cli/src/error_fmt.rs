//! Human-readable error descriptions and structured JSON error formatting.

use psu_core::error::{BuildError, GaugeError, MonitorError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(ge) = err.downcast_ref::<GaugeError>() {
        return match ge {
            GaugeError::Bus(msg) => format!(
                "What happened: The fuel gauge did not answer on the I2C bus ({msg}).\nLikely causes: Battery pack not fitted, wrong hardware.i2c_bus or hardware.gauge_addr, or wiring faults.\nHow to fix: Check the pack connector and the [hardware] section, then run `psu self-check`."
            ),
            GaugeError::Timeout => "What happened: An I2C transaction with the fuel gauge timed out.\nLikely causes: Bus held low, loose wiring, or a gauge in a bad state.\nHow to fix: Reseat the battery pack and retry; power-cycle the board if it persists.".to_string(),
            GaugeError::HardwareUnreachable { reg, wrote, read } => format!(
                "What happened: Register 0x{reg:02x} did not keep the value written to it (wrote 0x{wrote:04x}, read back 0x{read:04x}).\nLikely causes: Gauge write-protected, bus noise, or a failing gauge.\nHow to fix: Retry `psu init --force`; replace the pack if writes keep failing."
            ),
            GaugeError::SequenceTimeout { reg, .. } => format!(
                "What happened: The fuel gauge never became ready (register 0x{reg:02x}).\nLikely causes: Gauge still booting after power-on, or a stuck model refresh.\nHow to fix: Wait a few seconds and run `psu init` again."
            ),
            GaugeError::LockPoisoned => "What happened: Gauge access failed after an earlier internal panic.\nLikely causes: A bug; see logs.\nHow to fix: Re-run with --log-level=debug and report the log.".to_string(),
        };
    }

    if let Some(me) = err.downcast_ref::<MonitorError>() {
        return match me {
            MonitorError::Open(msg) | MonitorError::Controller(msg) => format!(
                "What happened: The PSU controller could not be reached ({msg}).\nLikely causes: Wrong GPIO pins in [hardware] or insufficient GPIO permissions.\nHow to fix: Fix the [hardware] pins; ensure the process may access GPIO."
            ),
            MonitorError::Store(msg) => format!(
                "What happened: Learned parameters could not be read or written ({msg}).\nLikely causes: persistence.dir missing, read-only, or holding a corrupt record.\nHow to fix: Check persistence.dir permissions, or delete the corrupt file and run `psu params save`."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(BuildError::InvalidConfig(msg)) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("parse config") || lower.contains("read config") {
        return format!(
            "What happened: The config file could not be loaded.\nLikely causes: Wrong --config path or invalid TOML.\nHow to fix: Check the file. Original: {msg}"
        );
    }

    if lower.contains(" must ") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: An out-of-range value in the TOML.\nHow to fix: Edit the config file and try again."
        );
    }

    if lower.contains("no battery pack") {
        return "What happened: This command needs a battery pack.\nLikely causes: [psu] model = \"header\" in the config.\nHow to fix: Set [psu] model = \"batt-pack\" if the board has a pack.".to_string();
    }

    if lower.contains("open i2c") || lower.contains("open psu gpio") {
        return "What happened: Failed to open the PSU hardware.\nLikely causes: Incorrect bus or pin numbers, or insufficient permissions.\nHow to fix: Fix the [hardware] values in the config; ensure the process may access I2C and GPIO.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable reason name for JSON output.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(ge) = err.downcast_ref::<GaugeError>() {
        return match ge {
            GaugeError::Bus(_) => "GaugeBus",
            GaugeError::Timeout => "GaugeTimeout",
            GaugeError::HardwareUnreachable { .. } => "HardwareUnreachable",
            GaugeError::SequenceTimeout { .. } => "SequenceTimeout",
            GaugeError::LockPoisoned => "LockPoisoned",
        };
    }
    if err.downcast_ref::<MonitorError>().is_some() {
        return "Monitor";
    }
    "Error"
}

/// Gauge failures get stable exit codes; everything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<GaugeError>() {
        Some(GaugeError::Bus(_) | GaugeError::Timeout) => 3,
        Some(GaugeError::HardwareUnreachable { .. }) => 4,
        Some(GaugeError::SequenceTimeout { .. }) => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let msg = humanize(err);
    let details = match err.downcast_ref::<GaugeError>() {
        Some(GaugeError::HardwareUnreachable { reg, wrote, read }) => Some(json!({
            "reg": format!("0x{reg:02x}"),
            "wrote": wrote,
            "read": read,
        })),
        Some(GaugeError::SequenceTimeout {
            reg,
            mask,
            expected,
            got,
        }) => Some(json!({
            "reg": format!("0x{reg:02x}"),
            "mask": mask,
            "expected": expected,
            "got": got,
        })),
        _ => None,
    };

    let obj = if let Some(d) = details {
        json!({ "reason": reason_name(err), "details": d, "message": msg })
    } else {
        json!({ "reason": reason_name(err), "message": msg })
    };
    obj.to_string()
}
