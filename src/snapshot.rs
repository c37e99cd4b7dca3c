//! ==============================================================================
//! snapshot.rs - one report cycle
//! ==============================================================================
//!
//! purpose:
//!     calls every provider exactly once, back to back, and assembles the
//!     results into a Snapshot. the first failing provider ends the capture;
//!     no partial snapshot ever leaves this module.
//!
//! order:
//!     board identity, clock, then memory, flash, temperature, voltage,
//!     uptime, rtc, firmware, battery, interrupts, filesystem, chip, pins,
//!     storage_usage, rtc_extended. the two ADC channels are read one after
//!     the other, never interleaved.
//!
//! ==============================================================================

use crate::config::ReportConfig;
use crate::domain::{BoardInfo, Snapshot};
use crate::error::Result;
use crate::hal::HardwareAccess;
use crate::providers;

pub fn capture_snapshot(hal: &dyn HardwareAccess, config: &ReportConfig) -> Result<Snapshot> {
    let (machine, version) = providers::board(hal)?;
    let cpu_frequency_hz = providers::clock(hal)?;
    let board = BoardInfo { machine, version, cpu_frequency_hz };

    let memory = providers::memory(hal)?;
    let flash = providers::flash(&config.board);
    let temperature = providers::temperature(hal, config.adc.temperature_channel)?;
    let voltage = providers::voltage(hal, config.adc.vsys_channel)?;
    let uptime = providers::uptime(hal);
    let rtc = providers::rtc(hal)?;
    let firmware = providers::firmware(&config.board);
    let battery = providers::battery();
    let interrupts = providers::interrupts();
    let filesystem = providers::filesystem(hal, &config.paths)?;
    let chip = providers::chip(&config.board);
    let pins = providers::pins(hal, &config.pins)?;
    let storage_usage = providers::storage_usage(hal, &config.paths)?;
    let rtc_extended = providers::rtc_extended(hal)?;

    tracing::info!(
        temperature_c = temperature.celsius,
        vsys_v = voltage.vsys_volts,
        uptime_s = uptime.seconds,
        "snapshot captured"
    );

    Ok(Snapshot {
        board,
        memory,
        flash,
        temperature,
        voltage,
        uptime,
        rtc,
        firmware,
        battery,
        interrupts,
        filesystem,
        chip,
        pins,
        storage_usage,
        rtc_extended,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::Availability;
    use crate::error::{Facility, TelemetryError};
    use crate::hal::MockHal;

    /// serialized keys every snapshot carries besides "board"
    pub(crate) const CATEGORY_KEYS: [&str; 14] = [
        "memory",
        "flash",
        "temperature",
        "voltage",
        "uptime",
        "rtc",
        "firmware",
        "battery",
        "interrupts",
        "filesystem",
        "chip",
        "pins",
        "storage_usage",
        "rtc_extended",
    ];

    #[test]
    fn test_capture_has_all_categories() {
        let snapshot = capture_snapshot(&MockHal::default(), &ReportConfig::default()).unwrap();
        let value = serde_json::to_value(&snapshot).unwrap();
        let object = value.as_object().unwrap();
        for key in CATEGORY_KEYS {
            assert!(object.contains_key(key), "missing {}", key);
        }
        // 14 categories plus the board header
        assert_eq!(object.len(), 15);
        assert_eq!(snapshot.battery.level, Availability::Unavailable);
        assert_eq!(snapshot.interrupts.count, 0);
        assert_eq!(snapshot.pins.len(), 28);
    }

    #[test]
    fn test_capture_values_from_fixture() {
        let snapshot = capture_snapshot(&MockHal::default(), &ReportConfig::default()).unwrap();
        assert_eq!(snapshot.board.cpu_frequency_hz, 125_000_000);
        assert_eq!(snapshot.memory.total_bytes, 2000);
        assert_eq!(snapshot.rtc.datetime, "2024-06-15 10:30:00");
        assert_eq!(snapshot.rtc_extended.weekday, 5);
        assert_eq!(snapshot.rtc_extended.day_of_year, 166);
        assert_eq!(snapshot.uptime.seconds, 5.0);
        assert_eq!(snapshot.storage_usage.number_of_files, 3);
    }

    #[test]
    fn test_capture_reads_in_fixed_order() {
        let hal = MockHal::default();
        capture_snapshot(&hal, &ReportConfig::default()).unwrap();

        let mut order = hal.reads();
        order.dedup();
        assert_eq!(
            order,
            vec![
                Facility::Identity,
                Facility::Clock,
                Facility::Allocator,
                Facility::Adc,
                Facility::Ticks,
                Facility::Rtc,
                Facility::Filesystem,
                Facility::Gpio,
                Facility::Directory,
                Facility::Rtc,
            ]
        );
        // exactly one read per ADC channel, one per pin
        assert_eq!(hal.reads().iter().filter(|f| **f == Facility::Adc).count(), 2);
        assert_eq!(hal.pins_read().len(), 28);
    }

    #[test]
    fn test_any_hardware_fault_aborts_capture() {
        for facility in [
            Facility::Identity,
            Facility::Clock,
            Facility::Allocator,
            Facility::Adc,
            Facility::Rtc,
            Facility::Gpio,
        ] {
            let hal = MockHal::failing(facility);
            match capture_snapshot(&hal, &ReportConfig::default()) {
                Err(TelemetryError::HardwareUnavailable { facility: f, .. }) => assert_eq!(f, facility),
                other => panic!("expected hardware failure for {}, got {:?}", facility, other),
            }
        }
    }

    #[test]
    fn test_filesystem_fault_aborts_capture() {
        for facility in [Facility::Filesystem, Facility::Directory] {
            let hal = MockHal::failing(facility);
            let result = capture_snapshot(&hal, &ReportConfig::default());
            assert!(matches!(result, Err(TelemetryError::FilesystemUnavailable { .. })));
        }
    }

    #[test]
    fn test_single_pin_fault_aborts_capture() {
        let hal = MockHal { fail_pin: Some(0), ..MockHal::default() };
        assert!(capture_snapshot(&hal, &ReportConfig::default()).is_err());
        // storage_usage and rtc_extended never ran
        assert!(!hal.reads().contains(&Facility::Directory));
    }
}
