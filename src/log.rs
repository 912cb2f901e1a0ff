use std::sync::atomic::{AtomicU8, Ordering};

/// Verbosity levels for pipeline output, least to most chatty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

pub fn set_log_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn current_log_level() -> LogLevel {
    match LOG_LEVEL.load(Ordering::Relaxed) {
        0 => LogLevel::Error,
        1 => LogLevel::Warn,
        2 => LogLevel::Info,
        _ => LogLevel::Debug,
    }
}

pub fn enabled(level: LogLevel) -> bool {
    current_log_level() >= level
}

/// Parse a `--log-level` value. `quiet` is accepted as an alias for `error`.
pub fn parse_log_level(s: &str) -> Result<LogLevel, String> {
    match s.trim().to_lowercase().as_str() {
        "error" | "quiet" => Ok(LogLevel::Error),
        "warn" | "warning" => Ok(LogLevel::Warn),
        "info" => Ok(LogLevel::Info),
        "debug" => Ok(LogLevel::Debug),
        _ => Err(format!(
            "Invalid log level '{}': expected error, warn, info, or debug",
            s
        )),
    }
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        eprintln!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if $crate::log::enabled($crate::log::LogLevel::Warn) {
            eprintln!($($arg)*)
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if $crate::log::enabled($crate::log::LogLevel::Info) {
            eprintln!($($arg)*)
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if $crate::log::enabled($crate::log::LogLevel::Debug) {
            eprintln!($($arg)*)
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_aliases_and_case() {
        assert_eq!(parse_log_level("quiet").unwrap(), LogLevel::Error);
        assert_eq!(parse_log_level("Warning").unwrap(), LogLevel::Warn);
        assert_eq!(parse_log_level(" DEBUG ").unwrap(), LogLevel::Debug);
        assert!(parse_log_level("trace").is_err());
    }

    #[test]
    fn enabled_respects_current_level() {
        // Tests share the global; restore the default afterwards
        set_log_level(LogLevel::Warn);
        assert!(enabled(LogLevel::Error));
        assert!(enabled(LogLevel::Warn));
        assert!(!enabled(LogLevel::Info));
        set_log_level(LogLevel::Info);
        assert_eq!(current_log_level(), LogLevel::Info);
    }
}
