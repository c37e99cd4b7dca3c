//! ==============================================================================
//! error.rs - failure taxonomy for telemetry capture
//! ==============================================================================
//!
//! purpose:
//!     every provider either returns its reading or one of these errors.
//!     nothing is caught on the way up: one failed read aborts the whole
//!     capture and the binary exits non-zero without printing a report.
//!
//! relationships:
//!     - produced by: hal.rs, providers.rs, config.rs
//!     - surfaced by: main.rs (converted into anyhow with context)
//!
//! ==============================================================================

use thiserror::Error;

/// hardware facilities a backend can be asked to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facility {
    Allocator,
    Clock,
    Adc,
    Gpio,
    Rtc,
    Ticks,
    Filesystem,
    Directory,
    Identity,
}

impl Facility {
    pub fn name(self) -> &'static str {
        match self {
            Facility::Allocator => "allocator",
            Facility::Clock => "cpu clock",
            Facility::Adc => "adc",
            Facility::Gpio => "gpio",
            Facility::Rtc => "rtc",
            Facility::Ticks => "tick counter",
            Facility::Filesystem => "filesystem stats",
            Facility::Directory => "directory listing",
            Facility::Identity => "board identity",
        }
    }

    /// filesystem facilities fail as FilesystemUnavailable, the rest as hardware
    pub fn is_filesystem(self) -> bool {
        matches!(self, Facility::Filesystem | Facility::Directory)
    }
}

impl std::fmt::Display for Facility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("{facility} unavailable: {reason}")]
    HardwareUnavailable { facility: Facility, reason: String },

    #[error("filesystem unavailable at {path}: {reason}")]
    FilesystemUnavailable { path: String, reason: String },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl TelemetryError {
    pub fn hardware(facility: Facility, reason: impl Into<String>) -> Self {
        TelemetryError::HardwareUnavailable { facility, reason: reason.into() }
    }

    pub fn filesystem(path: impl Into<String>, reason: impl Into<String>) -> Self {
        TelemetryError::FilesystemUnavailable { path: path.into(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
