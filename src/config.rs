//! ==============================================================================
//! config.rs - Report Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `report.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - HalConfig: Which hardware backend answers the reads.
//!     - AdcConfig: ADC channels for the temperature sensor and Vsys.
//!     - PinsConfig: GPIO count and pins that must not be sampled.
//!     - PathsConfig: Mount path for fs stats, root for the file count.
//!     - BoardConfig: Static identifiers (chip, firmware, flash size).
//!     - RenderConfig: Label language, float precision, output format.
//!
//! ==============================================================================

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Result, TelemetryError};

/// number of GPIO pins sampled into every snapshot
pub const PIN_COUNT: usize = 28;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ReportConfig {
    #[serde(default)]
    pub hal: HalConfig,
    #[serde(default)]
    pub adc: AdcConfig,
    #[serde(default)]
    pub pins: PinsConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub report: RenderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Mock,
    System,
}

impl Default for Backend {
    fn default() -> Self {
        if cfg!(feature = "hardware") {
            Backend::System
        } else {
            Backend::Mock
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct HalConfig {
    #[serde(default)]
    pub backend: Backend,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AdcConfig {
    /// internal temperature sensor
    pub temperature_channel: u8,
    /// Vsys through the on-board /2 divider
    pub vsys_channel: u8,
    pub iio_device: PathBuf,
    pub raw_bits: u8,
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            temperature_channel: 4,
            vsys_channel: 3,
            iio_device: PathBuf::from("/sys/bus/iio/devices/iio:device0"),
            raw_bits: 12,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PinsConfig {
    pub count: usize,
    /// pins wired to other peripherals (e.g. flash/PSRAM). never read.
    pub reserved: Vec<u8>,
}

impl Default for PinsConfig {
    fn default() -> Self {
        Self { count: PIN_COUNT, reserved: Vec::new() }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PathsConfig {
    pub filesystem: String,
    pub storage_root: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self { filesystem: "/".to_string(), storage_root: "/".to_string() }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BoardConfig {
    pub chip_id: String,
    pub firmware: String,
    pub flash_size_bytes: u64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            chip_id: "RP2040".to_string(),
            firmware: "MicroPython v1.23.0".to_string(),
            flash_size_bytes: 2048 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Labels {
    #[default]
    Es,
    En,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RenderConfig {
    pub labels: Labels,
    pub precision: usize,
    pub format: Format,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { labels: Labels::Es, precision: 2, format: Format::Text }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "warn".to_string() }
    }
}

impl ReportConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TelemetryError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;

        let config: ReportConfig = toml::from_str(&content).map_err(|e| {
            TelemetryError::Configuration(format!("failed to parse {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load with default fallback
    pub fn load_or_default() -> Self {
        let paths = [
            PathBuf::from("config").join("report.toml"),
            PathBuf::from("..").join("config").join("report.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        tracing::info!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("[CONFIG] Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        tracing::warn!("[CONFIG] No config file found - using defaults");
        Self::default()
    }

    /// pin count is fixed at 28; reserved pins and adc width must be in range
    pub fn validate(&self) -> Result<()> {
        if self.pins.count != PIN_COUNT {
            return Err(TelemetryError::Configuration(format!(
                "pins.count must be {}, got {}",
                PIN_COUNT, self.pins.count
            )));
        }
        if let Some(pin) = self.pins.reserved.iter().find(|&&p| p as usize >= PIN_COUNT) {
            return Err(TelemetryError::Configuration(format!(
                "reserved pin {} is outside GPIO0..GPIO{}",
                pin,
                PIN_COUNT - 1
            )));
        }
        if self.adc.raw_bits == 0 || self.adc.raw_bits > 16 {
            return Err(TelemetryError::Configuration(format!(
                "adc.raw_bits must be within 1..=16, got {}",
                self.adc.raw_bits
            )));
        }
        Ok(())
    }
}
