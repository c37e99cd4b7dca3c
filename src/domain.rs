//! ==============================================================================
//! domain.rs - typed snapshot records
//! ==============================================================================
//!
//! purpose:
//!     one struct per snapshot category plus the board header. every field
//!     is known at compile time, so a Snapshot cannot be missing a category;
//!     a sensor that is not wired is an explicit `Availability::Unavailable`.
//!
//! relationships:
//!     - built by: providers.rs, snapshot.rs
//!     - read by: render.rs (text and serde JSON)
//!
//! ==============================================================================

use serde::Serialize;

use crate::config::PIN_COUNT;

/// board header printed above the categories
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoardInfo {
    /// machine name (e.g. "Raspberry Pi Pico with RP2040")
    pub machine: String,
    /// firmware / os version string
    pub version: String,
    pub cpu_frequency_hz: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MemoryReading {
    pub free_bytes: u64,
    /// free + allocated
    pub total_bytes: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlashReading {
    pub flash_size_bytes: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TemperatureReading {
    pub celsius: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VoltageReading {
    pub vsys_volts: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UptimeReading {
    pub seconds: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RtcReading {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// "YYYY-MM-DD HH:MM:SS"
    pub datetime: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RtcExtendedReading {
    /// as reported by the rtc (0 = monday on the rp2040)
    pub weekday: u8,
    /// non-leap-year day count, see providers::day_of_year
    pub day_of_year: u16,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FirmwareReading {
    pub firmware: String,
}

/// a reading that may have no sensor behind it
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability<T> {
    #[allow(dead_code)]
    Available(T),
    Unavailable,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatteryReading {
    /// percent, when a gauge is wired
    pub level: Availability<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InterruptReading {
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilesystemReading {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChipReading {
    pub chip_id: String,
}

/// one level per GPIO index, always PIN_COUNT long
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PinStates {
    levels: [bool; PIN_COUNT],
    /// pins that were skipped instead of read
    reserved: Vec<u8>,
}

impl PinStates {
    pub fn new(levels: [bool; PIN_COUNT], reserved: Vec<u8>) -> Self {
        Self { levels, reserved }
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    #[allow(dead_code)]
    pub fn level(&self, pin: usize) -> Option<bool> {
        self.levels.get(pin).copied()
    }

    pub fn is_reserved(&self, pin: usize) -> bool {
        self.reserved.iter().any(|&p| p as usize == pin)
    }

    /// (index, level) in GPIO order
    pub fn iter(&self) -> impl Iterator<Item = (usize, bool)> + '_ {
        self.levels.iter().copied().enumerate()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StorageUsageReading {
    pub number_of_files: usize,
}

/// one complete report cycle. built once by snapshot::capture_snapshot,
/// read by the renderers, then dropped.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub board: BoardInfo,
    pub memory: MemoryReading,
    pub flash: FlashReading,
    pub temperature: TemperatureReading,
    pub voltage: VoltageReading,
    pub uptime: UptimeReading,
    pub rtc: RtcReading,
    pub firmware: FirmwareReading,
    pub battery: BatteryReading,
    pub interrupts: InterruptReading,
    pub filesystem: FilesystemReading,
    pub chip: ChipReading,
    pub pins: PinStates,
    pub storage_usage: StorageUsageReading,
    pub rtc_extended: RtcExtendedReading,
}
