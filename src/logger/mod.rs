//! Structured logging for the relay
//!
//! - Standard levels (Error/Warning/Info/Debug/Verbose)
//! - Per-subsystem debug control via --debug-<tag> flags
//! - Colored console output plus an optional log file (--log-file <path>)
//! - Records emitted through the `log` crate by dependencies are routed here
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vitalsrelay::logger::{self, LogTag};
//!
//! logger::init();
//! logger::info(LogTag::Hub, "peer 4 connected");
//! logger::debug(LogTag::Liveness, "probing 3 peers"); // only with --debug-liveness
//! ```

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{
    get_logger_config, init_from_args, set_logger_config, update_logger_config, LoggerConfig,
};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system
///
/// Call once at startup, before spawning services. Parses the debug flags,
/// opens the log file if one was requested and installs the `log` facade.
pub fn init() {
    config::init_from_args();
    file::init_file_logging(get_logger_config().log_file.as_deref());

    if log::set_boxed_logger(Box::new(LogFacade)).is_ok() {
        log::set_max_level(log::LevelFilter::Warn);
    }
}

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level (only with --debug-<tag>)
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (only with --verbose or --verbose-<tag>)
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Force flush all pending log writes
pub fn flush() {
    file::flush_file_logging();
}

/// Routes `log` crate records (hyper, tungstenite, ...) into this logger
struct LogFacade;

impl log::Log for LogFacade {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Warn
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let target = record.target().split("::").next().unwrap_or("deps");
        core::log_internal(
            LogTag::Other(target.to_string()),
            LogLevel::from_log_level(record.level()),
            &record.args().to_string(),
        );
    }

    fn flush(&self) {
        file::flush_file_logging();
    }
}
