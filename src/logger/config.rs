/// Logger configuration derived from command-line flags
///
/// Holds the minimum level, the set of tags with debug output unlocked and an
/// optional tag allow-list. Stored globally so every log call can consult it.
use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments::{get_cmd_args, patterns};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Highest level that is printed (Info by default)
    pub min_level: LogLevel,
    /// Tags with --debug-<tag> enabled
    pub debug_tags: HashSet<String>,
    /// Tags with --verbose-<tag> enabled
    pub verbose_tags: HashSet<String>,
    /// When non-empty only these tags are printed (errors always pass)
    pub enabled_tags: HashSet<String>,
    /// Optional append-only log file
    pub log_file: Option<PathBuf>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
            verbose_tags: HashSet::new(),
            enabled_tags: HashSet::new(),
            log_file: None,
        }
    }
}

impl LoggerConfig {
    /// Build a config from an argument list
    pub fn from_args(args: &[String]) -> Self {
        let mut config = LoggerConfig::default();

        for (i, arg) in args.iter().enumerate() {
            if let Some(tag) = arg.strip_prefix("--debug-") {
                config.debug_tags.insert(tag.to_string());
                if config.min_level < LogLevel::Debug {
                    config.min_level = LogLevel::Debug;
                }
            } else if let Some(tag) = arg.strip_prefix("--verbose-") {
                config.verbose_tags.insert(tag.to_string());
                config.debug_tags.insert(tag.to_string());
                config.min_level = LogLevel::Verbose;
            } else if arg == "--log-file" {
                config.log_file = args.get(i + 1).map(PathBuf::from);
            } else if arg == "--log-tags" {
                if let Some(list) = args.get(i + 1) {
                    config.enabled_tags = list
                        .split(',')
                        .map(|t| t.trim().to_lowercase())
                        .filter(|t| !t.is_empty())
                        .collect();
                }
            }
        }

        if args.iter().any(|a| a == "--verbose" || a == "-v") {
            config.min_level = LogLevel::Verbose;
        }
        if args.iter().any(|a| a == "--quiet" || a == "-q") {
            config.min_level = LogLevel::Warning;
        }

        config
    }

    pub fn is_debug_enabled_for(&self, tag: &LogTag) -> bool {
        self.debug_tags.contains(&tag.to_debug_key())
    }

    pub fn is_verbose_enabled_for(&self, tag: &LogTag) -> bool {
        self.verbose_tags.contains(&tag.to_debug_key())
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

/// Initialize the global logger config from the process arguments
pub fn init_from_args() {
    let mut config = LoggerConfig::from_args(&get_cmd_args());
    if patterns::is_quiet_mode() {
        config.min_level = LogLevel::Warning;
    }
    set_logger_config(config);
}

pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().clone()
}

pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write() = config;
}

pub fn update_logger_config<F: FnOnce(&mut LoggerConfig)>(update: F) {
    update(&mut LOGGER_CONFIG.write());
}

pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    LOGGER_CONFIG.read().is_debug_enabled_for(tag)
}

pub fn is_verbose_enabled_for_tag(tag: &LogTag) -> bool {
    LOGGER_CONFIG.read().is_verbose_enabled_for(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_debug_flags_unlock_tags() {
        let config = LoggerConfig::from_args(&args(&["vitalsrelay", "--debug-hub", "--debug-liveness"]));
        assert!(config.is_debug_enabled_for(&LogTag::Hub));
        assert!(config.is_debug_enabled_for(&LogTag::Liveness));
        assert!(!config.is_debug_enabled_for(&LogTag::Store));
        assert_eq!(config.min_level, LogLevel::Debug);
    }

    #[test]
    fn test_quiet_overrides_debug() {
        let config = LoggerConfig::from_args(&args(&["vitalsrelay", "--debug-hub", "--quiet"]));
        assert_eq!(config.min_level, LogLevel::Warning);
    }

    #[test]
    fn test_log_file_and_tags() {
        let config = LoggerConfig::from_args(&args(&[
            "vitals_bridge",
            "--log-file",
            "logs/bridge.log",
            "--log-tags",
            "bridge, serial",
        ]));
        assert_eq!(config.log_file, Some(PathBuf::from("logs/bridge.log")));
        assert!(config.enabled_tags.contains("bridge"));
        assert!(config.enabled_tags.contains("serial"));
        assert_eq!(config.enabled_tags.len(), 2);
    }
}
