//! ==============================================================================
//! render.rs - snapshot to text
//! ==============================================================================
//!
//! purpose:
//!     turns a captured Snapshot into the plain-text report (or JSON).
//!     pure formatting: no hardware access, the snapshot is only borrowed,
//!     so rendering the same snapshot twice gives the same bytes.
//!
//! layout:
//!     header (board, version, cpu frequency), then one titled section per
//!     category. rtc_extended is shown inside the RTC section; pins emit
//!     one line per GPIO index.
//!
//! ==============================================================================

use std::fmt;

use crate::config::{Labels, RenderConfig};
use crate::domain::{Availability, Snapshot};

/// every piece of text the report prints besides the values
struct LabelSet {
    system: &'static str,
    board: &'static str,
    version: &'static str,
    frequency: &'static str,
    memory_title: &'static str,
    memory_free: &'static str,
    memory_total: &'static str,
    flash_title: &'static str,
    flash_size: &'static str,
    temperature_title: &'static str,
    temperature: &'static str,
    voltage_title: &'static str,
    voltage: &'static str,
    uptime_title: &'static str,
    uptime: &'static str,
    seconds: &'static str,
    rtc_title: &'static str,
    datetime: &'static str,
    year: &'static str,
    month: &'static str,
    day: &'static str,
    hour: &'static str,
    minute: &'static str,
    second: &'static str,
    weekday: &'static str,
    day_of_year: &'static str,
    firmware_title: &'static str,
    firmware: &'static str,
    battery_title: &'static str,
    battery: &'static str,
    unavailable: &'static str,
    interrupts_title: &'static str,
    interrupts: &'static str,
    fs_title: &'static str,
    fs_total: &'static str,
    fs_free: &'static str,
    chip_title: &'static str,
    chip: &'static str,
    pins_title: &'static str,
    high: &'static str,
    low: &'static str,
    reserved: &'static str,
    storage_title: &'static str,
    files: &'static str,
}

const SPANISH: LabelSet = LabelSet {
    system: "Sistema Raspberry Pi Pico:",
    board: "Placa",
    version: "Versión de MicroPython",
    frequency: "Frecuencia del CPU",
    memory_title: "Información de memoria:",
    memory_free: "Memoria libre",
    memory_total: "Memoria total",
    flash_title: "Información de la memoria flash:",
    flash_size: "Tamaño de flash",
    temperature_title: "Información de temperatura:",
    temperature: "Temperatura",
    voltage_title: "Voltaje de entrada:",
    voltage: "Voltaje Vsys",
    uptime_title: "Tiempo de ejecución:",
    uptime: "Uptime",
    seconds: "segundos",
    rtc_title: "RTC:",
    datetime: "Fecha y hora",
    year: "Año",
    month: "Mes",
    day: "Día",
    hour: "Hora",
    minute: "Minuto",
    second: "Segundo",
    weekday: "Día de la semana",
    day_of_year: "Día del año",
    firmware_title: "Firmware del RP2040:",
    firmware: "Firmware RP2040",
    battery_title: "Información de la batería:",
    battery: "Nivel de batería",
    unavailable: "No disponible",
    interrupts_title: "Información de interrupciones:",
    interrupts: "Conteo de interrupciones",
    fs_title: "Sistema de archivos:",
    fs_total: "Tamaño total del FS",
    fs_free: "Espacio libre en el FS",
    chip_title: "Información del chip:",
    chip: "Chip ID",
    pins_title: "Información de los pines:",
    high: "True",
    low: "False",
    reserved: "reservado",
    storage_title: "Uso de almacenamiento por directorio:",
    files: "Número de archivos",
};

const ENGLISH: LabelSet = LabelSet {
    system: "Raspberry Pi Pico system:",
    board: "Board",
    version: "MicroPython version",
    frequency: "CPU frequency",
    memory_title: "Memory:",
    memory_free: "Free memory",
    memory_total: "Total memory",
    flash_title: "Flash memory:",
    flash_size: "Flash size",
    temperature_title: "Temperature:",
    temperature: "Temperature",
    voltage_title: "Input voltage:",
    voltage: "Vsys voltage",
    uptime_title: "Uptime:",
    uptime: "Uptime",
    seconds: "seconds",
    rtc_title: "RTC:",
    datetime: "Date and time",
    year: "Year",
    month: "Month",
    day: "Day",
    hour: "Hour",
    minute: "Minute",
    second: "Second",
    weekday: "Weekday",
    day_of_year: "Day of year",
    firmware_title: "RP2040 firmware:",
    firmware: "RP2040 firmware",
    battery_title: "Battery:",
    battery: "Battery level",
    unavailable: "Unavailable",
    interrupts_title: "Interrupts:",
    interrupts: "Interrupt count",
    fs_title: "Filesystem:",
    fs_total: "FS total size",
    fs_free: "FS free space",
    chip_title: "Chip:",
    chip: "Chip ID",
    pins_title: "Pin states:",
    high: "high",
    low: "low",
    reserved: "reserved",
    storage_title: "Storage usage:",
    files: "Number of files",
};

impl Labels {
    fn set(self) -> &'static LabelSet {
        match self {
            Labels::Es => &SPANISH,
            Labels::En => &ENGLISH,
        }
    }
}

/// a snapshot paired with the formatting it should be shown with
pub struct Report<'a> {
    snapshot: &'a Snapshot,
    labels: &'static LabelSet,
    precision: usize,
}

impl<'a> Report<'a> {
    pub fn new(snapshot: &'a Snapshot, options: &RenderConfig) -> Self {
        Self { snapshot, labels: options.labels.set(), precision: options.precision }
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.snapshot;
        let l = self.labels;
        let p = self.precision;

        writeln!(f, "{}", l.system)?;
        writeln!(f, "{}: {}", l.board, s.board.machine)?;
        writeln!(f, "{}: {}", l.version, s.board.version)?;
        writeln!(f, "{}: {} Hz", l.frequency, s.board.cpu_frequency_hz)?;

        writeln!(f, "{}", l.memory_title)?;
        writeln!(f, "{}: {} bytes", l.memory_free, s.memory.free_bytes)?;
        writeln!(f, "{}: {} bytes", l.memory_total, s.memory.total_bytes)?;

        writeln!(f, "{}", l.flash_title)?;
        writeln!(f, "{}: {} bytes", l.flash_size, s.flash.flash_size_bytes)?;

        writeln!(f, "{}", l.temperature_title)?;
        writeln!(f, "{}: {:.*} °C", l.temperature, p, s.temperature.celsius)?;

        writeln!(f, "{}", l.voltage_title)?;
        writeln!(f, "{}: {:.*} V", l.voltage, p, s.voltage.vsys_volts)?;

        writeln!(f, "{}", l.uptime_title)?;
        writeln!(f, "{}: {:.*} {}", l.uptime, p, s.uptime.seconds, l.seconds)?;

        writeln!(f, "{}", l.rtc_title)?;
        writeln!(f, "{}: {}", l.datetime, s.rtc.datetime)?;
        writeln!(f, "{}: {}", l.year, s.rtc.year)?;
        writeln!(f, "{}: {}", l.month, s.rtc.month)?;
        writeln!(f, "{}: {}", l.day, s.rtc.day)?;
        writeln!(f, "{}: {}", l.hour, s.rtc.hour)?;
        writeln!(f, "{}: {}", l.minute, s.rtc.minute)?;
        writeln!(f, "{}: {}", l.second, s.rtc.second)?;
        writeln!(f, "{}: {}", l.weekday, s.rtc_extended.weekday)?;
        writeln!(f, "{}: {}", l.day_of_year, s.rtc_extended.day_of_year)?;

        writeln!(f, "{}", l.firmware_title)?;
        writeln!(f, "{}: {}", l.firmware, s.firmware.firmware)?;

        writeln!(f, "{}", l.battery_title)?;
        match s.battery.level {
            Availability::Available(level) => writeln!(f, "{}: {:.*} %", l.battery, p, level)?,
            Availability::Unavailable => writeln!(f, "{}: {}", l.battery, l.unavailable)?,
        }

        writeln!(f, "{}", l.interrupts_title)?;
        writeln!(f, "{}: {}", l.interrupts, s.interrupts.count)?;

        writeln!(f, "{}", l.fs_title)?;
        writeln!(f, "{}: {} bytes", l.fs_total, s.filesystem.total_bytes)?;
        writeln!(f, "{}: {} bytes", l.fs_free, s.filesystem.free_bytes)?;

        writeln!(f, "{}", l.chip_title)?;
        writeln!(f, "{}: {}", l.chip, s.chip.chip_id)?;

        writeln!(f, "{}", l.pins_title)?;
        for (pin, level) in s.pins.iter() {
            let level = if level { l.high } else { l.low };
            if s.pins.is_reserved(pin) {
                writeln!(f, "GPIO{}: {} ({})", pin, level, l.reserved)?;
            } else {
                writeln!(f, "GPIO{}: {}", pin, level)?;
            }
        }

        writeln!(f, "{}", l.storage_title)?;
        writeln!(f, "{}: {}", l.files, s.storage_usage.number_of_files)
    }
}

/// plain-text report
pub fn render(snapshot: &Snapshot, options: &RenderConfig) -> String {
    Report::new(snapshot, options).to_string()
}

/// snapshot as pretty-printed JSON
pub fn render_json(snapshot: &Snapshot) -> serde_json::Result<String> {
    serde_json::to_string_pretty(snapshot)
}
