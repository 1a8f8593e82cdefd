// SPDX-License-Identifier: MIT

use core::sync::atomic::{AtomicU8, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Quiet,
    Normal,
    Verbose,
    Debug,
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Normal as u8);

pub fn set_log_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn log_level() -> LogLevel {
    match LOG_LEVEL.load(Ordering::Relaxed) {
        0 => LogLevel::Quiet,
        1 => LogLevel::Normal,
        2 => LogLevel::Verbose,
        _ => LogLevel::Debug,
    }
}

/// Shown unless quiet. Used for notable state changes (size changes, resized partitions).
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if $crate::log::log_level() >= $crate::log::LogLevel::Normal {
            eprintln!("[rimgpt] {}", format_args!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_verbose {
    ($($arg:tt)*) => {
        if $crate::log::log_level() >= $crate::log::LogLevel::Verbose {
            eprintln!("[rimgpt] {}", format_args!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if $crate::log::log_level() >= $crate::log::LogLevel::Debug {
            eprintln!("[rimgpt] {}", format_args!($($arg)*));
        }
    };
}
