//! Leveled progress logging for operator runs.
//!
//! Entries are printed to stderr and kept in a bounded in-memory history so
//! callers (and tests) can inspect what a run reported.

use once_cell::sync::Lazy;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Number of entries kept in the history.
const HISTORY_CAPACITY: usize = 1024;

/// Log level for operator display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth for per-unit detail lines
    pub indent: u8,
}

impl LogEntry {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Info, message: message.into(), indent: 0 }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Success, message: message.into(), indent: 0 }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Warning, message: message.into(), indent: 0 }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Error, message: message.into(), indent: 0 }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Render the entry the way it is printed.
    pub fn render(&self) -> String {
        let prefix = match self.level {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        };
        let indent = "   ".repeat(self.indent as usize);
        format!("{}{} {}", indent, prefix, self.message)
    }
}

/// Global logger
pub static LOGGER: Lazy<Logger> = Lazy::new(Logger::new);

/// Prints entries and remembers the most recent ones.
pub struct Logger {
    quiet: AtomicBool,
    history: Mutex<VecDeque<LogEntry>>,
}

impl Logger {
    pub fn new() -> Self {
        Self {
            quiet: AtomicBool::new(false),
            history: Mutex::new(VecDeque::with_capacity(HISTORY_CAPACITY)),
        }
    }

    /// Suppress printing of `Info` entries. Other levels always print.
    pub fn set_quiet(&self, quiet: bool) {
        self.quiet.store(quiet, Ordering::Relaxed);
    }

    pub fn log(&self, entry: LogEntry) {
        let quiet = self.quiet.load(Ordering::Relaxed);
        if !(quiet && entry.level == LogLevel::Info) {
            eprintln!("{}", entry.render());
        }

        if let Ok(mut history) = self.history.lock() {
            if history.len() == HISTORY_CAPACITY {
                history.pop_front();
            }
            history.push_back(entry);
        }
    }

    /// Snapshot of the retained entries, oldest first.
    pub fn recent(&self) -> Vec<LogEntry> {
        self.history
            .lock()
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenient logging functions
pub fn log_info(msg: impl Into<String>) {
    LOGGER.log(LogEntry::info(msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOGGER.log(LogEntry::success(msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOGGER.log(LogEntry::warning(msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    LOGGER.log(LogEntry::info(msg).with_indent(indent));
}

pub fn log_error_indent(msg: impl Into<String>, indent: u8) {
    LOGGER.log(LogEntry::error(msg).with_indent(indent));
}

/// Whether any retained warning contains `needle`.
#[cfg(test)]
pub(crate) fn warned(needle: &str) -> bool {
    LOGGER
        .recent()
        .iter()
        .any(|e| e.level == LogLevel::Warning && e.message.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_prefixes() {
        assert_eq!(LogEntry::info("hello").render(), "    hello");
        assert_eq!(LogEntry::success("done").render(), "   ✓ done");
        assert_eq!(LogEntry::error("bad").with_indent(1).render(), "      ❌ bad");
    }

    #[test]
    fn test_history_is_bounded() {
        let logger = Logger::new();
        logger.set_quiet(true);
        for i in 0..HISTORY_CAPACITY + 5 {
            logger.log(LogEntry::info(format!("entry {i}")));
        }
        let recent = logger.recent();
        assert_eq!(recent.len(), HISTORY_CAPACITY);
        assert_eq!(recent[0].message, "entry 5");
    }

    #[test]
    fn test_warned_finds_global_warnings() {
        log_warning("unique-marker-7f3a duplicate header");
        assert!(warned("unique-marker-7f3a"));
        assert!(!warned("never-logged-marker"));
    }
}
