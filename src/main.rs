//! ==============================================================================
//! main.rs - run-report entry point
//! ==============================================================================
//!
//! purpose:
//!     reads every diagnostic the board exposes (memory, clock, temperature,
//!     voltage, uptime, rtc, filesystem, gpio levels, file count) into one
//!     snapshot and prints it as a report.
//!
//! responsibilities:
//!     - load configuration (report.toml or defaults)
//!     - initialize logging (stderr only; stdout is the report)
//!     - build the hardware backend once and pass it down explicitly
//!     - capture, render, print
//!     - exit 0 on success, 1 on any failed read (no partial report)
//!
//! relationships:
//!     - uses: config.rs, hal.rs, snapshot.rs, render.rs
//!
//! flow:
//!
//!     ┌──────────┐   ┌──────────────┐   ┌─────────────────┐   ┌──────────┐
//!     │  config  │──>│ hal backend  │──>│ capture_snapshot│──>│  render  │──> stdout
//!     └──────────┘   │ mock/system  │   │ (15 providers)  │   │ text/json│
//!                    └──────────────┘   └─────────────────┘   └──────────┘
//!
//! ==============================================================================

mod config;
mod domain;
mod error;
mod hal;
mod providers;
mod render;
mod snapshot;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

use config::{Backend, Format, ReportConfig};
use hal::{HardwareAccess, MockHal, SystemHal};

#[derive(Parser, Debug)]
#[command(name = "run-report")]
#[command(version, about = "Print a diagnostic telemetry report for the board")]
struct Cli {
    /// Path to report.toml (default: config/report.toml, then ../config/report.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format; overrides [report] format
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// Use the mock backend regardless of configuration
    #[arg(long)]
    mock: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(report) => {
            print!("{}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("[ERROR] {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<String> {
    let log_handle = init_logging();
    let config = match &cli.config {
        Some(path) => ReportConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ReportConfig::load_or_default(),
    };
    apply_log_level(&log_handle, &config.logging.level);

    let backend = if cli.mock { Backend::Mock } else { config.hal.backend };
    let hal: Box<dyn HardwareAccess> = match backend {
        Backend::Mock => Box::new(MockHal {
            temperature_channel: config.adc.temperature_channel,
            vsys_channel: config.adc.vsys_channel,
            ..MockHal::new()
        }),
        Backend::System => Box::new(SystemHal::new(&config.adc)),
    };

    let snapshot = snapshot::capture_snapshot(hal.as_ref(), &config)
        .context("telemetry capture failed")?;

    match cli.format.unwrap_or(config.report.format) {
        Format::Text => Ok(render::render(&snapshot, &config.report)),
        Format::Json => {
            let mut json = render::render_json(&snapshot).context("serializing snapshot")?;
            json.push('\n');
            Ok(json)
        }
    }
}

/// stderr subscriber; starts at RUST_LOG (or warn) so config loading is logged
fn init_logging() -> reload::Handle<EnvFilter, Registry> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (filter, handle) = reload::Layer::new(filter);
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
    handle
}

/// RUST_LOG wins over the configured level
fn apply_log_level(handle: &reload::Handle<EnvFilter, Registry>, level: &str) {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    match EnvFilter::try_new(level) {
        Ok(filter) => {
            let _ = handle.reload(filter);
        }
        Err(e) => tracing::warn!("[CONFIG] Ignoring log level {:?}: {}", level, e),
    }
}
