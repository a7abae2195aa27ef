/// Core logging implementation with automatic filtering
///
/// Filtering rules:
/// 1. Errors are always shown
/// 2. Anything above the minimum level threshold is dropped
/// 3. Debug level requires --debug-<tag> for that tag
/// 4. Verbose level requires --verbose or --verbose-<tag>
/// 5. If an allow-list of tags is configured, the tag must be on it
use super::config::{get_logger_config, LoggerConfig};
use super::levels::LogLevel;
use super::tags::LogTag;

pub fn should_log_with(config: &LoggerConfig, tag: &LogTag, level: LogLevel) -> bool {
    if level == LogLevel::Error {
        return true;
    }

    if level > config.min_level {
        return false;
    }

    if level == LogLevel::Debug && !config.is_debug_enabled_for(tag) {
        return false;
    }

    if level == LogLevel::Verbose
        && !(config.verbose_tags.is_empty() || config.is_verbose_enabled_for(tag))
    {
        return false;
    }

    if !config.enabled_tags.is_empty() && !config.enabled_tags.contains(&tag.to_debug_key()) {
        return false;
    }

    true
}

pub fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    should_log_with(&get_logger_config(), tag, level)
}

pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }

    super::format::format_and_log(&tag, level, message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_errors_always_pass() {
        let config = LoggerConfig {
            min_level: LogLevel::Warning,
            enabled_tags: HashSet::from(["bridge".to_string()]),
            ..LoggerConfig::default()
        };
        assert!(should_log_with(&config, &LogTag::Hub, LogLevel::Error));
    }

    #[test]
    fn test_debug_requires_tag_flag() {
        let mut config = LoggerConfig::default();
        config.min_level = LogLevel::Debug;
        config.debug_tags.insert("hub".to_string());

        assert!(should_log_with(&config, &LogTag::Hub, LogLevel::Debug));
        assert!(!should_log_with(&config, &LogTag::Bridge, LogLevel::Debug));
        assert!(should_log_with(&config, &LogTag::Bridge, LogLevel::Info));
    }

    #[test]
    fn test_threshold_drops_info_in_quiet_mode() {
        let config = LoggerConfig {
            min_level: LogLevel::Warning,
            ..LoggerConfig::default()
        };
        assert!(!should_log_with(&config, &LogTag::System, LogLevel::Info));
        assert!(should_log_with(&config, &LogTag::System, LogLevel::Warning));
    }

    #[test]
    fn test_tag_allow_list() {
        let config = LoggerConfig {
            enabled_tags: HashSet::from(["serial".to_string()]),
            ..LoggerConfig::default()
        };
        assert!(should_log_with(&config, &LogTag::Serial, LogLevel::Info));
        assert!(!should_log_with(&config, &LogTag::Hub, LogLevel::Info));
    }
}
