//! FILENAME: crosstab-session/src/logging.rs
// PURPOSE: Unified logging for crosstab sessions.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::error::SessionError;

// ============================================================================
// UNIFIED LOGGING SYSTEM
// ============================================================================

/// Global sequence counter shared by every session in the process.
static LOG_SEQ: AtomicU64 = AtomicU64::new(0);

/// Global log file handle. None until `init_log_file` succeeds.
pub static LOG_FILE: Lazy<Mutex<Option<File>>> = Lazy::new(|| Mutex::new(None));

/// Path of the open log file.
static LOG_PATH: Lazy<Mutex<Option<PathBuf>>> = Lazy::new(|| Mutex::new(None));

/// Target used when forwarding to the `log` facade.
pub const LOG_TARGET: &str = "crosstab";

/// Get next sequence number
pub fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst) + 1
}

/// Opens (and truncates) the unified log file at `path`.
pub fn init_log_file(path: impl AsRef<Path>) -> Result<PathBuf, SessionError> {
    let path = path.as_ref().to_path_buf();

    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
    }

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)?;

    if let Ok(mut guard) = LOG_FILE.lock() {
        *guard = Some(file);
    }
    if let Ok(mut guard) = LOG_PATH.lock() {
        *guard = Some(path.clone());
    }

    Ok(path)
}

/// Flushes and closes the log file. Later lines only reach the `log` facade.
pub fn close_log_file() {
    if let Ok(mut guard) = LOG_FILE.lock() {
        if let Some(mut file) = guard.take() {
            let _ = file.flush();
        }
    }
    if let Ok(mut guard) = LOG_PATH.lock() {
        *guard = None;
    }
}

/// Path of the currently open log file, if any.
pub fn log_path() -> Option<PathBuf> {
    LOG_PATH.lock().ok().and_then(|guard| guard.clone())
}

/// Maps a unified level code to a `log` level. "P" (performance) is info.
pub fn facade_level(level: &str) -> log::Level {
    match level {
        "D" => log::Level::Debug,
        "W" => log::Level::Warn,
        "E" => log::Level::Error,
        _ => log::Level::Info,
    }
}

/// Formats a line in unified format: `seq|level|category|message`.
pub fn format_line(seq: u64, level: &str, category: &str, message: &str) -> String {
    format!("{}|{}|{}|{}", seq, level, category, message)
}

/// Write a log line in unified format
pub fn write_log(level: &str, category: &str, message: &str) {
    let line = format_line(next_seq(), level, category, message);

    if let Ok(mut guard) = LOG_FILE.lock() {
        if let Some(ref mut file) = *guard {
            let stamp = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f");
            let _ = writeln!(file, "{} {}", stamp, line);
            let _ = file.flush();
        }
    }

    log::log!(target: LOG_TARGET, facade_level(level), "{}", line);
}

/// Write an ENTER log line for function entry
pub fn write_log_enter(level: &str, category: &str, func_name: &str, params: &str) {
    let message = if params.is_empty() {
        format!("ENTER {}", func_name)
    } else {
        format!("ENTER {} {}", func_name, params)
    };
    write_log(level, category, &message);
}

/// Write an EXIT log line for function exit
pub fn write_log_exit(level: &str, category: &str, func_name: &str, result: &str) {
    let message = if result.is_empty() {
        format!("EXIT {}", func_name)
    } else {
        format!("EXIT {} {}", func_name, result)
    };
    write_log(level, category, &message);
}

// ============================================================================
// MACRO DEFINITIONS & EXPORTS
// ============================================================================

#[macro_export]
macro_rules! log_debug {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log("D", $cat, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log("I", $cat, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log("W", $cat, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log("E", $cat, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_perf {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log("P", $cat, &format!($($arg)*))
    };
}

// ENTER/EXIT macros for function tracing

#[macro_export]
macro_rules! log_enter {
    ($cat:expr, $func:expr) => {
        $crate::logging::write_log_enter("D", $cat, $func, "")
    };
    ($cat:expr, $func:expr, $($arg:tt)*) => {
        $crate::logging::write_log_enter("D", $cat, $func, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_exit {
    ($cat:expr, $func:expr) => {
        $crate::logging::write_log_exit("D", $cat, $func, "")
    };
    ($cat:expr, $func:expr, $($arg:tt)*) => {
        $crate::logging::write_log_exit("D", $cat, $func, &format!($($arg)*))
    };
}

pub use log_debug;
pub use log_enter;
pub use log_error;
pub use log_exit;
pub use log_info;
pub use log_perf;
pub use log_warn;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line() {
        assert_eq!(format_line(7, "I", "SESSION", "hello"), "7|I|SESSION|hello");
    }

    #[test]
    fn test_facade_level_mapping() {
        assert_eq!(facade_level("D"), log::Level::Debug);
        assert_eq!(facade_level("I"), log::Level::Info);
        assert_eq!(facade_level("P"), log::Level::Info);
        assert_eq!(facade_level("W"), log::Level::Warn);
        assert_eq!(facade_level("E"), log::Level::Error);
    }

    #[test]
    fn test_sequence_increases() {
        let a = next_seq();
        let b = next_seq();
        assert!(b > a);
    }
}
