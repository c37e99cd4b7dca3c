//! ==============================================================================
//! hal.rs - Hardware Abstraction Layer
//! ==============================================================================
//!
//! purpose:
//!     the one context object every provider reads through. a capture is
//!     handed a `&dyn HardwareAccess` instead of reaching for global
//!     peripheral handles, so tests can swap in a mock without hardware.
//!
//! backends:
//!     - MockHal: fixed values with optional fault injection. Default when
//!       built without `hardware`.
//!     - SystemHal: live reads (sysinfo, statvfs, IIO sysfs ADC, chrono as
//!       the RTC, rppal for GPIO on feature="hardware").
//!
//! handles:
//!     nothing is retained between reads. every ADC/GPIO/statvfs call opens
//!     what it needs and drops it before returning.
//!
//! pin reads:
//!     reading a GPIO that is wired to flash/PSRAM may disturb it. callers
//!     are expected to skip such pins (see PinsConfig::reserved); the HAL
//!     reads whatever index it is given.
//!
//! relationships:
//!     - used by: providers.rs
//!     - built by: main.rs (backend picked from config / --mock)
//!
//! ==============================================================================

use std::cell::RefCell;
use std::path::PathBuf;

use crate::config::{AdcConfig, PIN_COUNT};
use crate::error::{Facility, Result, TelemetryError};

/// raw rtc tuple: (year, month, day, weekday, hour, minute, second)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtcDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStats {
    pub block_size: u64,
    pub total_blocks: u64,
    pub free_blocks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardIdentity {
    pub machine: String,
    pub version: String,
}

pub trait HardwareAccess {
    fn mem_free(&self) -> Result<u64>;
    fn mem_alloc(&self) -> Result<u64>;
    fn cpu_freq_hz(&self) -> Result<u64>;
    /// raw conversion scaled to 0..=65535
    fn adc_read_u16(&self, channel: u8) -> Result<u16>;
    fn gpio_read(&self, pin: u8) -> Result<bool>;
    fn rtc_datetime(&self) -> Result<RtcDateTime>;
    /// monotonic milliseconds since boot
    fn ticks_ms(&self) -> u64;
    fn statvfs(&self, path: &str) -> Result<FsStats>;
    fn list_dir(&self, path: &str) -> Result<Vec<String>>;
    fn board_identity(&self) -> Result<BoardIdentity>;
}

// ==============================================================================================
// MOCK IMPLEMENTATION (fixed values, fault injection)
// ==============================================================================================

pub struct MockHal {
    pub mem_free: u64,
    pub mem_alloc: u64,
    pub cpu_freq_hz: u64,
    pub raw_temp: u16,
    pub raw_vsys: u16,
    pub temperature_channel: u8,
    pub vsys_channel: u8,
    pub pins: [bool; PIN_COUNT],
    pub rtc: RtcDateTime,
    pub uptime_ms: u64,
    pub fs: FsStats,
    pub files: Vec<String>,
    pub identity: BoardIdentity,
    /// make every read of this facility fail
    pub fail: Option<Facility>,
    /// make only this GPIO index fail
    pub fail_pin: Option<u8>,
    pub(crate) reads: RefCell<Vec<Facility>>,
    pub(crate) pins_read: RefCell<Vec<u8>>,
}

impl Default for MockHal {
    fn default() -> Self {
        Self {
            mem_free: 1000,
            mem_alloc: 1000,
            cpu_freq_hz: 125_000_000,
            raw_temp: 20000,
            raw_vsys: 30000,
            temperature_channel: 4,
            vsys_channel: 3,
            pins: [false; PIN_COUNT],
            rtc: RtcDateTime { year: 2024, month: 6, day: 15, weekday: 5, hour: 10, minute: 30, second: 0 },
            uptime_ms: 5000,
            fs: FsStats { block_size: 4096, total_blocks: 352, free_blocks: 340 },
            files: vec!["a".into(), "b".into(), "c".into()],
            identity: BoardIdentity {
                machine: "Raspberry Pi Pico with RP2040".into(),
                version: "v1.23.0 on 2024-06-02 (GNU 13.2.0 MinSizeRel)".into(),
            },
            fail: None,
            fail_pin: None,
            reads: RefCell::new(Vec::new()),
            pins_read: RefCell::new(Vec::new()),
        }
    }
}

impl MockHal {
    pub fn new() -> Self {
        tracing::warn!("Using MOCK HAL (No hardware access) - report values are fixed");
        Self::default()
    }

    /// a mock whose `facility` reads all fail
    #[allow(dead_code)]
    pub fn failing(facility: Facility) -> Self {
        Self { fail: Some(facility), ..Self::default() }
    }

    /// facilities touched so far, in call order
    #[allow(dead_code)]
    pub fn reads(&self) -> Vec<Facility> {
        self.reads.borrow().clone()
    }

    /// GPIO indices actually sampled so far
    #[allow(dead_code)]
    pub fn pins_read(&self) -> Vec<u8> {
        self.pins_read.borrow().clone()
    }

    fn touch(&self, facility: Facility) -> Result<()> {
        self.reads.borrow_mut().push(facility);
        if self.fail == Some(facility) {
            return Err(if facility.is_filesystem() {
                TelemetryError::filesystem("/", format!("[MOCK] {} fault injected", facility))
            } else {
                TelemetryError::hardware(facility, "[MOCK] fault injected")
            });
        }
        Ok(())
    }
}

impl HardwareAccess for MockHal {
    fn mem_free(&self) -> Result<u64> {
        self.touch(Facility::Allocator)?;
        Ok(self.mem_free)
    }

    fn mem_alloc(&self) -> Result<u64> {
        self.touch(Facility::Allocator)?;
        Ok(self.mem_alloc)
    }

    fn cpu_freq_hz(&self) -> Result<u64> {
        self.touch(Facility::Clock)?;
        Ok(self.cpu_freq_hz)
    }

    fn adc_read_u16(&self, channel: u8) -> Result<u16> {
        self.touch(Facility::Adc)?;
        tracing::debug!("[MOCK ADC] Reading channel {}", channel);
        if channel == self.temperature_channel {
            Ok(self.raw_temp)
        } else if channel == self.vsys_channel {
            Ok(self.raw_vsys)
        } else {
            Err(TelemetryError::hardware(Facility::Adc, format!("no mock value for channel {}", channel)))
        }
    }

    fn gpio_read(&self, pin: u8) -> Result<bool> {
        self.touch(Facility::Gpio)?;
        self.pins_read.borrow_mut().push(pin);
        if self.fail_pin == Some(pin) {
            return Err(TelemetryError::hardware(Facility::Gpio, format!("[MOCK] GPIO{} read failed", pin)));
        }
        self.pins
            .get(pin as usize)
            .copied()
            .ok_or_else(|| TelemetryError::hardware(Facility::Gpio, format!("no GPIO{}", pin)))
    }

    fn rtc_datetime(&self) -> Result<RtcDateTime> {
        self.touch(Facility::Rtc)?;
        Ok(self.rtc)
    }

    fn ticks_ms(&self) -> u64 {
        self.reads.borrow_mut().push(Facility::Ticks);
        self.uptime_ms
    }

    fn statvfs(&self, _path: &str) -> Result<FsStats> {
        self.touch(Facility::Filesystem)?;
        Ok(self.fs)
    }

    fn list_dir(&self, _path: &str) -> Result<Vec<String>> {
        self.touch(Facility::Directory)?;
        Ok(self.files.clone())
    }

    fn board_identity(&self) -> Result<BoardIdentity> {
        self.touch(Facility::Identity)?;
        Ok(self.identity.clone())
    }
}

// ==============================================================================================
// LIVE IMPLEMENTATION (OS counters, IIO ADC, rppal GPIO)
// ==============================================================================================

pub struct SystemHal {
    iio_device: PathBuf,
    raw_bits: u8,
}

impl SystemHal {
    pub fn new(adc: &AdcConfig) -> Self {
        tracing::info!("Using SYSTEM HAL (iio device {})", adc.iio_device.display());
        Self { iio_device: adc.iio_device.clone(), raw_bits: adc.raw_bits }
    }

    fn memory() -> Result<sysinfo::System> {
        let mut sys = sysinfo::System::new();
        sys.refresh_memory();
        if sys.total_memory() == 0 {
            return Err(TelemetryError::hardware(Facility::Allocator, "memory counters not reported"));
        }
        Ok(sys)
    }
}

/// widen an n-bit conversion to 16 bits by bit replication
pub fn widen_to_u16(raw: u32, bits: u8) -> u16 {
    let bits = bits.clamp(1, 16) as u32;
    let max = (1u32 << bits) - 1;
    let raw = raw.min(max);
    let mut wide = raw << (16 - bits);
    let mut filled = bits;
    while filled < 16 {
        wide |= wide >> filled;
        filled *= 2;
    }
    wide as u16
}

impl HardwareAccess for SystemHal {
    fn mem_free(&self) -> Result<u64> {
        Ok(Self::memory()?.free_memory())
    }

    fn mem_alloc(&self) -> Result<u64> {
        Ok(Self::memory()?.used_memory())
    }

    fn cpu_freq_hz(&self) -> Result<u64> {
        use sysinfo::{CpuRefreshKind, RefreshKind, System};
        let sys = System::new_with_specifics(
            RefreshKind::new().with_cpu(CpuRefreshKind::new().with_frequency()),
        );
        let mhz = sys.cpus().first().map(|cpu| cpu.frequency()).unwrap_or(0);
        if mhz == 0 {
            return Err(TelemetryError::hardware(Facility::Clock, "cpu frequency not reported"));
        }
        Ok(mhz * 1_000_000)
    }

    fn adc_read_u16(&self, channel: u8) -> Result<u16> {
        let path = self.iio_device.join(format!("in_voltage{}_raw", channel));
        let text = std::fs::read_to_string(&path).map_err(|e| {
            TelemetryError::hardware(Facility::Adc, format!("{}: {}", path.display(), e))
        })?;
        let raw: u32 = text.trim().parse().map_err(|e| {
            TelemetryError::hardware(Facility::Adc, format!("{}: bad value {:?}: {}", path.display(), text.trim(), e))
        })?;
        Ok(widen_to_u16(raw, self.raw_bits))
    }

    #[cfg(feature = "hardware")]
    fn gpio_read(&self, pin: u8) -> Result<bool> {
        use rppal::gpio::{Gpio, Level};
        let gpio = Gpio::new().map_err(|e| TelemetryError::hardware(Facility::Gpio, e.to_string()))?;
        // read the level without reconfiguring the pin's mode
        let p = gpio
            .get(pin)
            .map_err(|e| TelemetryError::hardware(Facility::Gpio, format!("GPIO{}: {}", pin, e)))?;
        Ok(p.read() == Level::High)
    }

    #[cfg(not(feature = "hardware"))]
    fn gpio_read(&self, pin: u8) -> Result<bool> {
        Err(TelemetryError::hardware(
            Facility::Gpio,
            format!("GPIO{}: built without the `hardware` feature", pin),
        ))
    }

    fn rtc_datetime(&self) -> Result<RtcDateTime> {
        use chrono::{Datelike, Timelike};
        let now = chrono::Local::now();
        let year = u16::try_from(now.year())
            .map_err(|_| TelemetryError::hardware(Facility::Rtc, format!("year {} out of range", now.year())))?;
        Ok(RtcDateTime {
            year,
            month: now.month() as u8,
            day: now.day() as u8,
            weekday: now.weekday().num_days_from_monday() as u8,
            hour: now.hour() as u8,
            minute: now.minute() as u8,
            second: now.second() as u8,
        })
    }

    fn ticks_ms(&self) -> u64 {
        sysinfo::System::uptime().saturating_mul(1000)
    }

    fn statvfs(&self, path: &str) -> Result<FsStats> {
        let c_path = std::ffi::CString::new(path)
            .map_err(|e| TelemetryError::filesystem(path, e.to_string()))?;
        let mut st = std::mem::MaybeUninit::<libc::statvfs>::uninit();
        // SAFETY: c_path is NUL-terminated and st points to writable storage
        // sized for a statvfs struct; it is only read after a zero return.
        let rc = unsafe { libc::statvfs(c_path.as_ptr(), st.as_mut_ptr()) };
        if rc != 0 {
            return Err(TelemetryError::filesystem(path, std::io::Error::last_os_error().to_string()));
        }
        // SAFETY: statvfs returned 0 so the struct is initialized.
        let st = unsafe { st.assume_init() };
        Ok(FsStats {
            block_size: st.f_frsize as u64,
            total_blocks: st.f_blocks as u64,
            free_blocks: st.f_bfree as u64,
        })
    }

    fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(path).map_err(|e| TelemetryError::filesystem(path, e.to_string()))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TelemetryError::filesystem(path, e.to_string()))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn board_identity(&self) -> Result<BoardIdentity> {
        use sysinfo::System;
        let name = System::name()
            .ok_or_else(|| TelemetryError::hardware(Facility::Identity, "os name not reported"))?;
        let host = System::host_name().unwrap_or_else(|| "unknown".to_string());
        let version = System::kernel_version()
            .or_else(System::os_version)
            .unwrap_or_default();
        Ok(BoardIdentity {
            machine: format!("{} ({})", host, std::env::consts::ARCH),
            version: format!("{} {}", name, version).trim_end().to_string(),
        })
    }
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widen_12_bit_full_scale() {
        assert_eq!(widen_to_u16(0, 12), 0);
        assert_eq!(widen_to_u16(4095, 12), 65535);
        // 0x800 -> 0x8008
        assert_eq!(widen_to_u16(0x800, 12), 0x8008);
    }

    #[test]
    fn test_widen_narrow_converters_reach_full_scale() {
        assert_eq!(widen_to_u16(255, 8), 65535);
        assert_eq!(widen_to_u16(63, 6), 65535);
        assert_eq!(widen_to_u16(15, 4), 65535);
        assert_eq!(widen_to_u16(1, 1), 65535);
        // 0x80 -> 0x8080
        assert_eq!(widen_to_u16(0x80, 8), 0x8080);
        assert_eq!(widen_to_u16(0, 6), 0);
    }

    #[test]
    fn test_widen_full_scale_every_width() {
        for bits in 1..=16u8 {
            assert_eq!(widen_to_u16((1u32 << bits) - 1, bits), 65535, "bits={}", bits);
        }
    }

    #[test]
    fn test_widen_clamps_and_passes_16_bit() {
        assert_eq!(widen_to_u16(70000, 12), 65535);
        assert_eq!(widen_to_u16(1234, 16), 1234);
    }

    #[test]
    fn test_mock_fault_injection() {
        let hal = MockHal::failing(Facility::Adc);
        assert!(matches!(
            hal.adc_read_u16(4),
            Err(TelemetryError::HardwareUnavailable { facility: Facility::Adc, .. })
        ));
        assert_eq!(hal.mem_free().unwrap(), 1000);

        let hal = MockHal::failing(Facility::Directory);
        assert!(matches!(hal.list_dir("/"), Err(TelemetryError::FilesystemUnavailable { .. })));
    }

    #[test]
    fn test_mock_unknown_adc_channel() {
        let hal = MockHal::default();
        assert!(hal.adc_read_u16(0).is_err());
        assert_eq!(hal.adc_read_u16(4).unwrap(), 20000);
        assert_eq!(hal.adc_read_u16(3).unwrap(), 30000);
    }

    #[test]
    fn test_mock_records_reads() {
        let hal = MockHal::default();
        hal.gpio_read(3).unwrap();
        hal.ticks_ms();
        assert_eq!(hal.reads(), vec![Facility::Gpio, Facility::Ticks]);
        assert_eq!(hal.pins_read(), vec![3]);
    }

    #[test]
    fn test_system_adc_reads_iio_sysfs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("in_voltage4_raw"), "4095\n").unwrap();
        let adc = AdcConfig { iio_device: dir.path().to_path_buf(), ..AdcConfig::default() };
        let hal = SystemHal::new(&adc);
        assert_eq!(hal.adc_read_u16(4).unwrap(), 65535);
        assert!(matches!(
            hal.adc_read_u16(3),
            Err(TelemetryError::HardwareUnavailable { facility: Facility::Adc, .. })
        ));
    }

    #[test]
    fn test_system_filesystem_reads() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.py"), "").unwrap();
        std::fs::create_dir(dir.path().join("lib")).unwrap();
        let hal = SystemHal::new(&AdcConfig::default());
        let path = dir.path().to_str().unwrap();

        let mut names = hal.list_dir(path).unwrap();
        names.sort();
        assert_eq!(names, vec!["lib".to_string(), "main.py".to_string()]);

        let stats = hal.statvfs(path).unwrap();
        assert!(stats.block_size > 0);
        assert!(stats.free_blocks <= stats.total_blocks);
    }

    #[test]
    fn test_system_missing_path_is_filesystem_error() {
        let hal = SystemHal::new(&AdcConfig::default());
        let missing = "/definitely/not/here";
        assert!(matches!(hal.statvfs(missing), Err(TelemetryError::FilesystemUnavailable { .. })));
        assert!(matches!(hal.list_dir(missing), Err(TelemetryError::FilesystemUnavailable { .. })));
    }

    #[test]
    fn test_system_rtc_is_plausible() {
        let hal = SystemHal::new(&AdcConfig::default());
        let now = hal.rtc_datetime().unwrap();
        assert!(now.year >= 2024);
        assert!((1..=12).contains(&now.month));
        assert!(now.weekday <= 6);
    }
}
