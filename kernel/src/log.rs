// Kernel Logging Subsystem
//
// Structured, leveled logging for diagnostics and crash analysis during
// bring-up.
//
// Key responsibilities:
// - Provide standardized log levels (Debug, Info, Warn, Error, Panic)
// - Attach timestamps and subsystem origin to every log entry
// - Include source location only for DEBUG entries (file:line)
// - Output logs to the serial port unconditionally
// - Optionally mirror logs to the VGA text console with color coding
//
// Design principles:
// - Messages below the current level are dropped before any formatting
// - Early-boot friendly: no heap, no dependency on interrupts being on
// - Serial output is always enabled and considered the ground truth
//
// Implementation details:
// - Level filter and console mirror flag live in atomic cells; the log path
//   itself never blocks on them
// - Timestamps are derived from kernel timer ticks (coarse but monotonic);
//   they read 0.000s until the timer interrupt is unmasked
// - Each entry carries severity, timestamp, subsystem origin, and message

use crate::serial;
use crate::util::without_interrupts;
use crate::vga::{self, Color};
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
#[allow(dead_code)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Panic = 4,
}

impl LogLevel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO ",
            LogLevel::Warn => "WARN ",
            LogLevel::Error => "ERROR",
            LogLevel::Panic => "PANIC",
        }
    }

    pub const fn color(&self) -> Color {
        match self {
            LogLevel::Debug => Color::DarkGray,
            LogLevel::Info => Color::White,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::LightRed,
            LogLevel::Panic => Color::Red,
        }
    }
}

static CURRENT_LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Debug as u8);
static VGA_OUTPUT_ENABLED: AtomicBool = AtomicBool::new(false);

pub fn init() {
    set_level(LogLevel::Debug);
}

pub fn set_level(level: LogLevel) {
    CURRENT_LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn get_level() -> LogLevel {
    match CURRENT_LOG_LEVEL.load(Ordering::Relaxed) {
        0 => LogLevel::Debug,
        1 => LogLevel::Info,
        2 => LogLevel::Warn,
        3 => LogLevel::Error,
        _ => LogLevel::Panic,
    }
}

pub fn enable_vga_output() {
    VGA_OUTPUT_ENABLED.store(true, Ordering::Relaxed);
}

#[allow(dead_code)]
pub fn disable_vga_output() {
    VGA_OUTPUT_ENABLED.store(false, Ordering::Relaxed);
}

fn get_timestamp_ms() -> u64 {
    let ticks = crate::interrupts::get_ticks() as u64;
    ticks * (1000 / crate::pit::BOOT_TICK_HZ as u64)
}

fn format_timestamp(ms: u64) -> (u64, u64) {
    let seconds = ms / 1000;
    let milliseconds = ms % 1000;
    (seconds, milliseconds)
}

pub fn _log(level: LogLevel, origin: &str, args: fmt::Arguments, file: &str, line: u32) {
    if level < get_level() {
        return;
    }

    let timestamp_ms = get_timestamp_ms();
    let (seconds, milliseconds) = format_timestamp(timestamp_ms);

    let is_debug = level == LogLevel::Debug;
    let level_str = level.as_str();

    if is_debug {
        serial::_print(format_args!(
            "[t={}.{:03}s] [{}] [{}] {} ({}:{})\n",
            seconds, milliseconds, level_str, origin, args, file, line
        ));
    } else {
        serial::_print(format_args!(
            "[t={}.{:03}s] [{}] [{}] {}\n",
            seconds, milliseconds, level_str, origin, args
        ));
    }

    if VGA_OUTPUT_ENABLED.load(Ordering::Relaxed) {
        write_vga_log(seconds, milliseconds, level, origin, args, file, line);
    }
}

fn write_vga_log(
    seconds: u64,
    milliseconds: u64,
    level: LogLevel,
    origin: &str,
    args: fmt::Arguments,
    file: &str,
    line: u32,
) {
    use core::fmt::Write;

    without_interrupts(|| {
        let mut writer = vga::WRITER.lock();

        writer.set_color(Color::DarkGray, Color::Black);
        let _ = write!(writer, "[t={}.{:03}s] ", seconds, milliseconds);

        writer.set_color(level.color(), Color::Black);
        let _ = write!(writer, "[{}] ", level.as_str());

        writer.set_color(Color::LightBlue, Color::Black);
        let _ = write!(writer, "[{}] ", origin);

        writer.set_color(Color::White, Color::Black);
        let _ = writer.write_fmt(args);

        if level == LogLevel::Debug {
            let _ = write!(writer, " ({}:{})", file, line);
        }

        writer.write_byte(b'\n');
    });
}

#[macro_export]
macro_rules! log_debug {
    ($origin:expr, $($arg:tt)*) => {
        $crate::log::_log(
            $crate::log::LogLevel::Debug,
            $origin,
            format_args!($($arg)*),
            file!(),
            line!()
        )
    };
}

#[macro_export]
macro_rules! log_info {
    ($origin:expr, $($arg:tt)*) => {
        $crate::log::_log(
            $crate::log::LogLevel::Info,
            $origin,
            format_args!($($arg)*),
            file!(),
            line!()
        )
    };
}

#[macro_export]
macro_rules! log_warn {
    ($origin:expr, $($arg:tt)*) => {
        $crate::log::_log(
            $crate::log::LogLevel::Warn,
            $origin,
            format_args!($($arg)*),
            file!(),
            line!()
        )
    };
}

#[macro_export]
macro_rules! log_error {
    ($origin:expr, $($arg:tt)*) => {
        $crate::log::_log(
            $crate::log::LogLevel::Error,
            $origin,
            format_args!($($arg)*),
            file!(),
            line!()
        )
    };
}

#[macro_export]
macro_rules! log_panic {
    ($origin:expr, $($arg:tt)*) => {
        $crate::log::_log(
            $crate::log::LogLevel::Panic,
            $origin,
            format_args!($($arg)*),
            file!(),
            line!()
        )
    };
}
