/// Centralized argument handling for the relay binaries
///
/// Stores the process arguments once and answers flag queries from anywhere:
/// - `--debug-<module>` flags consumed by the logger
/// - `--config <path>` / `--port <port>` overrides for the hub binary
/// - help handling
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments
/// Used by binaries and tests to override the default env::args() collection
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value of a command-line argument that follows a flag
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    for (i, arg) in args.iter().enumerate() {
        if arg == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// =============================================================================

/// Broadcast hub debug mode
pub fn is_debug_hub_enabled() -> bool {
    has_arg("--debug-hub")
}

/// Liveness sweep debug mode
pub fn is_debug_liveness_enabled() -> bool {
    has_arg("--debug-liveness")
}

/// Bridge link debug mode
pub fn is_debug_bridge_enabled() -> bool {
    has_arg("--debug-bridge")
}

/// Serial reader debug mode (logs every raw line)
pub fn is_debug_serial_enabled() -> bool {
    has_arg("--debug-serial")
}

/// Frame parsing / normalization debug mode
pub fn is_debug_vitals_enabled() -> bool {
    has_arg("--debug-vitals")
}

/// Persistence debug mode
pub fn is_debug_store_enabled() -> bool {
    has_arg("--debug-store")
}

/// HTTP / WebSocket server debug mode
pub fn is_debug_webserver_enabled() -> bool {
    has_arg("--debug-webserver")
}

/// System operations debug mode
pub fn is_debug_system_enabled() -> bool {
    has_arg("--debug-system")
}

// =============================================================================
// HELP SYSTEM
// =============================================================================

/// Displays the help menu for the hub binary
pub fn print_help() {
    println!("vitalsrelay - real-time vitals broadcast hub");
    println!();
    println!("USAGE:");
    println!("    vitalsrelay [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    --config <path>           Configuration file (default: data/config.toml)");
    println!("    --port <port>             Override the listen port");
    println!("    --help, -h                Show this help message");
    println!("    --quiet, -q               Only show warnings and errors");
    println!("    --verbose, -v             Show verbose trace output");
    println!();
    println!("DEBUG FLAGS:");
    println!("    --debug-hub               Broadcast hub debug mode");
    println!("    --debug-liveness          Liveness sweep debug mode");
    println!("    --debug-store             Persistence debug mode");
    println!("    --debug-vitals            Frame parsing debug mode");
    println!("    --debug-webserver         HTTP / WebSocket debug mode");
    println!("    --debug-system            System operations debug mode");
    println!();
    println!("ENVIRONMENT:");
    println!("    PORT, VITALS_HOST, VITALS_DB_PATH override the configuration file");
}

/// Gets a list of all enabled debug modes
pub fn get_enabled_debug_modes() -> Vec<&'static str> {
    let mut modes = Vec::new();

    if is_debug_hub_enabled() {
        modes.push("hub");
    }
    if is_debug_liveness_enabled() {
        modes.push("liveness");
    }
    if is_debug_bridge_enabled() {
        modes.push("bridge");
    }
    if is_debug_serial_enabled() {
        modes.push("serial");
    }
    if is_debug_vitals_enabled() {
        modes.push("vitals");
    }
    if is_debug_store_enabled() {
        modes.push("store");
    }
    if is_debug_webserver_enabled() {
        modes.push("webserver");
    }
    if is_debug_system_enabled() {
        modes.push("system");
    }

    modes
}

/// Checks if any debug mode is enabled
pub fn is_any_debug_enabled() -> bool {
    !get_enabled_debug_modes().is_empty()
}

/// Prints the enabled debug modes, if any
pub fn print_debug_info() {
    let enabled_modes = get_enabled_debug_modes();
    if !enabled_modes.is_empty() {
        println!("Enabled debug modes: {:?}", enabled_modes);
    }
}

// =============================================================================
// COMMON ARGUMENT PATTERNS
// =============================================================================

pub mod patterns {
    use super::*;

    pub fn is_help_requested() -> bool {
        has_arg("--help") || has_arg("-h")
    }

    pub fn is_quiet_mode() -> bool {
        has_arg("--quiet") || has_arg("-q")
    }

    pub fn is_verbose_mode() -> bool {
        has_arg("--verbose") || has_arg("-v")
    }

    /// Config file path given with --config
    pub fn get_config_path() -> Option<String> {
        get_arg_value("--config")
    }

    /// Listen port given with --port
    pub fn get_port() -> Option<u16> {
        get_arg_value("--port").and_then(|s| s.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test: CMD_ARGS is process-global and tests run in parallel.
    #[test]
    fn test_argument_queries() {
        set_cmd_args(vec![
            "vitalsrelay".to_string(),
            "--debug-hub".to_string(),
            "--debug-liveness".to_string(),
            "--config".to_string(),
            "custom.toml".to_string(),
            "--port".to_string(),
            "9090".to_string(),
        ]);

        assert!(has_arg("--debug-hub"));
        assert!(!has_arg("--debug-store"));
        assert_eq!(get_arg_value("--config"), Some("custom.toml".to_string()));
        assert_eq!(get_arg_value("--missing"), None);

        assert!(is_debug_hub_enabled());
        assert!(is_debug_liveness_enabled());
        assert!(!is_debug_bridge_enabled());
        assert!(is_any_debug_enabled());

        let modes = get_enabled_debug_modes();
        assert_eq!(modes, vec!["hub", "liveness"]);

        assert_eq!(patterns::get_config_path(), Some("custom.toml".to_string()));
        assert_eq!(patterns::get_port(), Some(9090));
        assert!(!patterns::is_help_requested());

        set_cmd_args(vec!["vitalsrelay".to_string(), "--port".to_string()]);
        assert_eq!(patterns::get_port(), None);
    }
}
