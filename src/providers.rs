//! ==============================================================================
//! providers.rs - one reading per hardware facility
//! ==============================================================================
//!
//! purpose:
//!     each function queries exactly one facility through the HAL and turns
//!     the raw answer into a typed record. no caching, no shared state, no
//!     retries: an error from the HAL is returned as-is.
//!
//! relationships:
//!     - uses: hal.rs (HardwareAccess)
//!     - used by: snapshot.rs (capture_snapshot)
//!
//! ==============================================================================

use crate::config::{BoardConfig, PathsConfig, PinsConfig, PIN_COUNT};
use crate::domain::*;
use crate::error::Result;
use crate::hal::HardwareAccess;

/// adc reference voltage
pub const ADC_VREF: f64 = 3.3;
/// full scale of a read_u16 conversion
pub const ADC_FULL_SCALE: f64 = 65535.0;
/// on-board divider in front of the Vsys channel
pub const VSYS_DIVIDER: f64 = 2.0;

/// days per month, non-leap year
const DAYS_IN_MONTHS: [u16; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// internal temperature sensor: 0.706 V at 27 °C, -1.721 mV/°C
pub fn celsius_from_raw(raw: u16) -> f64 {
    let volts = raw as f64 / ADC_FULL_SCALE * ADC_VREF;
    27.0 - (volts - 0.706) / 0.001721
}

pub fn vsys_from_raw(raw: u16) -> f64 {
    raw as f64 / ADC_FULL_SCALE * ADC_VREF * VSYS_DIVIDER
}

/// day of the year from a fixed non-leap table.
///
/// February always counts 28 days, so every date after Feb 28 in a leap
/// year comes out one short. Months outside 1..=12 are clamped.
pub fn day_of_year(month: u8, day: u8) -> u16 {
    let before = (month.clamp(1, 12) - 1) as usize;
    DAYS_IN_MONTHS[..before].iter().sum::<u16>() + day as u16
}

pub fn board(hal: &dyn HardwareAccess) -> Result<(String, String)> {
    let identity = hal.board_identity()?;
    Ok((identity.machine, identity.version))
}

pub fn clock(hal: &dyn HardwareAccess) -> Result<u64> {
    hal.cpu_freq_hz()
}

pub fn memory(hal: &dyn HardwareAccess) -> Result<MemoryReading> {
    let free = hal.mem_free()?;
    let allocated = hal.mem_alloc()?;
    Ok(MemoryReading { free_bytes: free, total_bytes: free.saturating_add(allocated) })
}

pub fn flash(board: &BoardConfig) -> FlashReading {
    FlashReading { flash_size_bytes: board.flash_size_bytes }
}

pub fn temperature(hal: &dyn HardwareAccess, channel: u8) -> Result<TemperatureReading> {
    let raw = hal.adc_read_u16(channel)?;
    tracing::debug!(channel, raw, "temperature adc");
    Ok(TemperatureReading { celsius: celsius_from_raw(raw) })
}

pub fn voltage(hal: &dyn HardwareAccess, channel: u8) -> Result<VoltageReading> {
    let raw = hal.adc_read_u16(channel)?;
    tracing::debug!(channel, raw, "vsys adc");
    Ok(VoltageReading { vsys_volts: vsys_from_raw(raw) })
}

pub fn uptime(hal: &dyn HardwareAccess) -> UptimeReading {
    UptimeReading { seconds: hal.ticks_ms() as f64 / 1000.0 }
}

pub fn rtc(hal: &dyn HardwareAccess) -> Result<RtcReading> {
    let dt = hal.rtc_datetime()?;
    Ok(RtcReading {
        year: dt.year,
        month: dt.month,
        day: dt.day,
        hour: dt.hour,
        minute: dt.minute,
        second: dt.second,
        datetime: format!(
            "{}-{:02}-{:02} {:02}:{:02}:{:02}",
            dt.year, dt.month, dt.day, dt.hour, dt.minute, dt.second
        ),
    })
}

/// reads the rtc again rather than reusing the rtc reading
pub fn rtc_extended(hal: &dyn HardwareAccess) -> Result<RtcExtendedReading> {
    let dt = hal.rtc_datetime()?;
    Ok(RtcExtendedReading { weekday: dt.weekday, day_of_year: day_of_year(dt.month, dt.day) })
}

pub fn firmware(board: &BoardConfig) -> FirmwareReading {
    FirmwareReading { firmware: board.firmware.clone() }
}

/// no fuel gauge is wired
pub fn battery() -> BatteryReading {
    BatteryReading { level: Availability::Unavailable }
}

/// no interrupt counter is wired
pub fn interrupts() -> InterruptReading {
    InterruptReading { count: 0 }
}

pub fn filesystem(hal: &dyn HardwareAccess, paths: &PathsConfig) -> Result<FilesystemReading> {
    let stats = hal.statvfs(&paths.filesystem)?;
    Ok(FilesystemReading {
        total_bytes: stats.block_size.saturating_mul(stats.total_blocks),
        free_bytes: stats.block_size.saturating_mul(stats.free_blocks),
    })
}

pub fn chip(board: &BoardConfig) -> ChipReading {
    ChipReading { chip_id: board.chip_id.clone() }
}

/// samples GPIO0..GPIO27 in order. any failed read aborts the whole
/// category; reserved pins are skipped and recorded low.
pub fn pins(hal: &dyn HardwareAccess, config: &PinsConfig) -> Result<PinStates> {
    let mut levels = [false; PIN_COUNT];
    for (pin, level) in levels.iter_mut().enumerate() {
        let pin = pin as u8;
        if config.reserved.contains(&pin) {
            tracing::debug!(pin, "skipping reserved pin");
            continue;
        }
        *level = hal.gpio_read(pin)?;
    }
    let mut reserved = config.reserved.clone();
    reserved.sort_unstable();
    reserved.dedup();
    Ok(PinStates::new(levels, reserved))
}

pub fn storage_usage(hal: &dyn HardwareAccess, paths: &PathsConfig) -> Result<StorageUsageReading> {
    let entries = hal.list_dir(&paths.storage_root)?;
    Ok(StorageUsageReading { number_of_files: entries.len() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Facility, TelemetryError};
    use crate::hal::{FsStats, MockHal, RtcDateTime};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_vsys_endpoints() {
        assert!(close(vsys_from_raw(0), 0.0));
        assert!(close(vsys_from_raw(65535), 6.6));
    }

    #[test]
    fn test_temperature_formula() {
        // 0.706 V is exactly 27 °C
        let raw = (0.706 / 3.3 * 65535.0_f64).round() as u16;
        assert!((celsius_from_raw(raw) - 27.0).abs() < 0.05);

        let expected = 27.0 - (20000.0 / 65535.0 * 3.3 - 0.706) / 0.001721;
        assert!(close(celsius_from_raw(20000), expected));
        // hotter die, lower voltage
        assert!(celsius_from_raw(10000) > celsius_from_raw(20000));
    }

    #[test]
    fn test_conversions_are_deterministic() {
        for raw in [0u16, 1, 12345, 32768, 65535] {
            assert_eq!(celsius_from_raw(raw).to_bits(), celsius_from_raw(raw).to_bits());
            assert_eq!(vsys_from_raw(raw).to_bits(), vsys_from_raw(raw).to_bits());
        }
    }

    #[test]
    fn test_day_of_year_january() {
        for day in 1..=31 {
            assert_eq!(day_of_year(1, day), day as u16);
        }
    }

    #[test]
    fn test_day_of_year_ignores_leap_years() {
        // Mar 1 is day 60 even in 2024
        assert_eq!(day_of_year(3, 1), 60);
        assert_eq!(day_of_year(6, 15), 166);
        assert_eq!(day_of_year(12, 31), 365);
    }

    #[test]
    fn test_memory_total_is_free_plus_allocated() {
        let hal = MockHal { mem_free: 1000, mem_alloc: 1000, ..MockHal::default() };
        let m = memory(&hal).unwrap();
        assert_eq!(m.free_bytes, 1000);
        assert_eq!(m.total_bytes, 2000);
    }

    #[test]
    fn test_rtc_zero_pads_datetime() {
        let hal = MockHal {
            rtc: RtcDateTime { year: 2024, month: 1, day: 2, weekday: 1, hour: 3, minute: 4, second: 5 },
            ..MockHal::default()
        };
        let r = rtc(&hal).unwrap();
        assert_eq!(r.datetime, "2024-01-02 03:04:05");
        let ext = rtc_extended(&hal).unwrap();
        assert_eq!(ext.weekday, 1);
        assert_eq!(ext.day_of_year, 2);
    }

    #[test]
    fn test_filesystem_multiplies_block_size() {
        let hal = MockHal {
            fs: FsStats { block_size: 4096, total_blocks: 352, free_blocks: 100 },
            ..MockHal::default()
        };
        let fs = filesystem(&hal, &PathsConfig::default()).unwrap();
        assert_eq!(fs.total_bytes, 4096 * 352);
        assert_eq!(fs.free_bytes, 4096 * 100);
    }

    #[test]
    fn test_huge_counters_saturate() {
        let hal = MockHal {
            mem_free: u64::MAX,
            mem_alloc: 10,
            fs: FsStats { block_size: u64::MAX / 2, total_blocks: 4, free_blocks: 1 },
            ..MockHal::default()
        };
        assert_eq!(memory(&hal).unwrap().total_bytes, u64::MAX);
        let fs = filesystem(&hal, &PathsConfig::default()).unwrap();
        assert_eq!(fs.total_bytes, u64::MAX);
        assert_eq!(fs.free_bytes, u64::MAX / 2);
    }

    #[test]
    fn test_pins_reads_all_28_in_order() {
        let mut levels = [false; PIN_COUNT];
        levels[25] = true;
        let hal = MockHal { pins: levels, ..MockHal::default() };
        let states = pins(&hal, &PinsConfig::default()).unwrap();
        assert_eq!(states.len(), 28);
        assert_eq!(states.level(25), Some(true));
        assert_eq!(states.level(0), Some(false));
        assert_eq!(hal.pins_read(), (0..28).collect::<Vec<u8>>());
    }

    #[test]
    fn test_pins_single_failure_aborts() {
        let hal = MockHal { fail_pin: Some(17), ..MockHal::default() };
        let err = pins(&hal, &PinsConfig::default()).unwrap_err();
        assert!(matches!(err, TelemetryError::HardwareUnavailable { facility: Facility::Gpio, .. }));
        // nothing after the failing pin is sampled
        assert_eq!(hal.pins_read().last(), Some(&17));
    }

    #[test]
    fn test_pins_skips_reserved() {
        let mut levels = [true; PIN_COUNT];
        levels[0] = false;
        let hal = MockHal { pins: levels, ..MockHal::default() };
        let config = PinsConfig { reserved: vec![24, 23, 23], ..PinsConfig::default() };
        let states = pins(&hal, &config).unwrap();
        assert_eq!(states.len(), 28);
        assert!(!hal.pins_read().contains(&23));
        assert!(!hal.pins_read().contains(&24));
        assert_eq!(states.level(23), Some(false));
        assert!(states.is_reserved(24));
        assert!(!states.is_reserved(22));
        assert_eq!(states.level(22), Some(true));
    }

    #[test]
    fn test_storage_usage_counts_entries() {
        let hal = MockHal::default();
        assert_eq!(storage_usage(&hal, &PathsConfig::default()).unwrap().number_of_files, 3);
    }

    #[test]
    fn test_stub_categories() {
        assert_eq!(battery().level, Availability::Unavailable);
        assert_eq!(interrupts().count, 0);
        let board = BoardConfig::default();
        assert_eq!(flash(&board).flash_size_bytes, 2 * 1024 * 1024);
        assert_eq!(chip(&board).chip_id, "RP2040");
    }
}
