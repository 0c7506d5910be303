use std::process::Command;

use psu_traits::Host;

use crate::error::HwError;

/// The machine this process runs on, powered off through systemd.
#[derive(Debug, Clone)]
pub struct SystemHost {
    program: String,
    args: Vec<String>,
    dry_run: bool,
}

impl Default for SystemHost {
    fn default() -> Self {
        Self::new(false)
    }
}

impl SystemHost {
    pub fn new(dry_run: bool) -> Self {
        Self {
            program: "systemctl".to_string(),
            args: vec!["poweroff".to_string(), "-i".to_string()],
            dry_run,
        }
    }

    /// Replace the power-off command.
    pub fn with_command(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.program = program.into();
        self.args = args;
        self
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Host for SystemHost {
    fn name(&self) -> String {
        std::fs::read_to_string("/etc/hostname")
            .map(|s| s.trim().to_string())
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "localhost".to_string())
    }

    fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.dry_run {
            tracing::warn!(cmd = %self.command_line(), "dry run: host shutdown skipped");
            return Ok(());
        }
        tracing::warn!(cmd = %self.command_line(), "powering off host");
        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .map_err(HwError::Io)?;
        if !status.success() {
            return Err(Box::new(HwError::Shutdown(format!(
                "{} exited with {status}",
                self.command_line()
            ))));
        }
        Ok(())
    }
}
