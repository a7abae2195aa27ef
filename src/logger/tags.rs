/// Log tags identify the subsystem a line comes from
///
/// Each tag maps to a `--debug-<key>` flag that unlocks its debug output.
use colored::{ColoredString, Colorize};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Hub,
    Liveness,
    Bridge,
    Serial,
    Vitals,
    Store,
    Webserver,
    Test,
    Other(String),
}

impl LogTag {
    /// Key used by `--debug-<key>` / `--verbose-<key>` flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system".to_string(),
            LogTag::Config => "config".to_string(),
            LogTag::Hub => "hub".to_string(),
            LogTag::Liveness => "liveness".to_string(),
            LogTag::Bridge => "bridge".to_string(),
            LogTag::Serial => "serial".to_string(),
            LogTag::Vitals => "vitals".to_string(),
            LogTag::Store => "store".to_string(),
            LogTag::Webserver => "webserver".to_string(),
            LogTag::Test => "test".to_string(),
            LogTag::Other(name) => name.to_lowercase(),
        }
    }

    /// Uncolored label used in the log file
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::Other(name) => name.to_uppercase(),
            other => other.to_debug_key().to_uppercase(),
        }
    }

    /// Colored, padded label used on the console
    pub fn colored(&self, width: usize) -> ColoredString {
        let label = format!("{:<width$}", self.to_plain_string(), width = width);
        match self {
            LogTag::System => label.bright_yellow().bold(),
            LogTag::Config => label.bright_white().bold(),
            LogTag::Hub => label.bright_cyan().bold(),
            LogTag::Liveness => label.bright_magenta().bold(),
            LogTag::Bridge => label.bright_blue().bold(),
            LogTag::Serial => label.bright_green().bold(),
            LogTag::Vitals => label.bright_red().bold(),
            LogTag::Store => label.bright_purple().bold(),
            LogTag::Webserver => label.bright_green().bold(),
            LogTag::Test => label.bright_blue().bold(),
            LogTag::Other(_) => label.white().bold(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_keys() {
        assert_eq!(LogTag::Liveness.to_debug_key(), "liveness");
        assert_eq!(LogTag::Other("Hyper".to_string()).to_debug_key(), "hyper");
        assert_eq!(LogTag::Store.to_plain_string(), "STORE");
    }
}
