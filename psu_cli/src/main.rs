mod cli;
mod commands;
mod error_fmt;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::commands::{MonitorOpts, Session};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn run(cli: Cli) -> Result<()> {
    color_eyre::install()?;

    let cfg = match &cli.config {
        Some(path) => psu_config::load_file(path)?,
        None => psu_config::Config::default(),
    };
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::debug!(config = ?cli.config, "config loaded");

    let devices = commands::open_devices(&cfg)?;
    let session = Session::assemble(cfg, devices);

    match cli.cmd {
        Commands::Monitor {
            ignore_standby,
            ignore_threshold,
            run_for_ms,
        } => {
            let interrupted = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&interrupted);
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                tracing::warn!(error = %e, "failed to install Ctrl-C handler");
            }
            let opts = MonitorOpts {
                ignore_standby,
                ignore_threshold,
                run_for: run_for_ms.map(Duration::from_millis),
            };
            commands::run_monitor(session, &opts, &interrupted, cli.json)
        }
        Commands::Init { force } => commands::run_init(session, force, cli.json),
        Commands::Sample => commands::run_sample(session, cli.json),
        Commands::Params { action } => commands::run_params(session, action, cli.json),
        Commands::SelfCheck => commands::run_self_check(session, cli.json),
    }
}

/// Console logs go to stderr so stdout stays machine-readable. `RUST_LOG`
/// wins over `--log-level`, which wins over `[logging] level`.
fn init_tracing(json: bool, cli_level: Option<&str>, logging: &psu_config::Logging) -> Result<()> {
    let level = cli_level
        .or(logging.level.as_deref())
        .unwrap_or("info")
        .to_string();
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&level))?;

    let console: Box<dyn Layer<Registry> + Send + Sync> = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_target(false).with_writer(std::io::stderr).boxed()
    };

    let file = match &logging.file {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file must name a file"))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .with(filter)
        .try_init()
        .wrap_err("init logging")?;
    Ok(())
}
