#![deny(missing_docs)]
//! Shared logging utilities for the scraper workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase,
//! the injectable [`LogSink`] collaborator handed to engine components, and
//! initializers for the global logger.

use std::fmt;
use std::sync::{Mutex, PoisonError};

pub use log::{Level, LevelFilter};

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Writes a debug-level message into a [`LogSink`].
#[macro_export]
macro_rules! sink_debug {
    ($sink:expr, $($arg:tt)*) => {{
        $crate::LogSink::record(&*$sink, $crate::Level::Debug, format_args!($($arg)*));
    }};
}

/// Writes an info-level message into a [`LogSink`].
#[macro_export]
macro_rules! sink_info {
    ($sink:expr, $($arg:tt)*) => {{
        $crate::LogSink::record(&*$sink, $crate::Level::Info, format_args!($($arg)*));
    }};
}

/// Writes a warn-level message into a [`LogSink`].
#[macro_export]
macro_rules! sink_warn {
    ($sink:expr, $($arg:tt)*) => {{
        $crate::LogSink::record(&*$sink, $crate::Level::Warn, format_args!($($arg)*));
    }};
}

/// Writes an error-level message into a [`LogSink`].
#[macro_export]
macro_rules! sink_error {
    ($sink:expr, $($arg:tt)*) => {{
        $crate::LogSink::record(&*$sink, $crate::Level::Error, format_args!($($arg)*));
    }};
}

/// Destination for log records produced by a single component.
///
/// Components receive an `Arc<dyn LogSink>` at construction instead of
/// writing to process-wide state, so tests can capture what they report.
pub trait LogSink: Send + Sync {
    /// Records one formatted message at `level`.
    fn record(&self, level: Level, args: fmt::Arguments<'_>);
}

/// Forwards every record to the global `log` facade.
#[derive(Debug, Clone, Copy)]
pub struct FacadeSink {
    target: &'static str,
}

impl FacadeSink {
    /// Creates a sink that logs under `target`.
    pub const fn new(target: &'static str) -> Self {
        Self { target }
    }
}

impl Default for FacadeSink {
    fn default() -> Self {
        Self::new("skraper")
    }
}

impl LogSink for FacadeSink {
    fn record(&self, level: Level, args: fmt::Arguments<'_>) {
        log::log!(target: self.target, level, "{}", args);
    }
}

/// One captured record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEntry {
    /// Level the record was written at.
    pub level: Level,
    /// Fully formatted message.
    pub message: String,
}

/// Keeps every record in memory; used by tests to assert on reported faults.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<CapturedEntry>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything recorded so far.
    pub fn entries(&self) -> Vec<CapturedEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True when any recorded message at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|entry| entry.level == level && entry.message.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn record(&self, level: Level, args: fmt::Arguments<'_>) {
        let message = args.to_string();
        log::log!(target: "skraper::memory", level, "{}", message);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CapturedEntry { level, message });
    }
}

/// Installs a terminal logger for the running process.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize(level: LevelFilter) {
    use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build();

    let _ = TermLogger::init(level, config, TerminalMode::Mixed, ColorChoice::Auto);
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
