use super::schemas::Config;
/// Configuration utilities - loading, environment overrides and access helpers
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;

use crate::errors::{RelayError, RelayResult};

/// Global configuration instance
pub static CONFIG: OnceCell<RwLock<Config>> = OnceCell::new();

/// Defaults served before `load_config` runs (tests, debug tools)
static DEFAULT_CONFIG: Lazy<Config> = Lazy::new(Config::default);

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "data/config.toml";

/// Load configuration from the default path and initialize the global CONFIG
pub fn load_config() -> RelayResult<()> {
    load_config_from_path(CONFIG_FILE_PATH)
}

/// Load configuration from a specific file path
///
/// A missing file is not an error: defaults are used. Environment overrides
/// are applied on top of whatever was loaded.
pub fn load_config_from_path(path: &str) -> RelayResult<()> {
    let mut config = if std::path::Path::new(path).exists() {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!("Failed to read config file '{}': {}", path, e))
        })?;
        parse_config(&contents)
            .map_err(|e| RelayError::Config(format!("Failed to parse config file '{}': {}", path, e)))?
    } else {
        eprintln!("⚠️  Config file '{}' not found, using default values", path);
        Config::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate(&config)?;

    CONFIG
        .set(RwLock::new(config))
        .map_err(|_| RelayError::Config("Config already initialized".to_string()))?;

    Ok(())
}

/// Parse TOML text into a Config (missing sections fall back to defaults)
pub fn parse_config(contents: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(contents)
}

/// Apply environment overrides
///
/// `lookup` is injected so tests do not have to touch the process environment.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> RelayResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        config.hub.port = port
            .trim()
            .parse()
            .map_err(|_| RelayError::Config(format!("PORT is not a valid port: '{}'", port)))?;
    }
    if let Some(host) = lookup("VITALS_HOST") {
        config.hub.host = host;
    }
    if let Some(path) = lookup("VITALS_SERIAL_PATH") {
        config.bridge.serial_path = path;
    }
    if let Some(baud) = lookup("VITALS_BAUD_RATE") {
        config.bridge.baud_rate = baud.trim().parse().map_err(|_| {
            RelayError::Config(format!("VITALS_BAUD_RATE is not a number: '{}'", baud))
        })?;
    }
    if let Some(url) = lookup("VITALS_HUB_URL") {
        config.bridge.hub_url = url;
    }
    if let Some(path) = lookup("VITALS_DB_PATH") {
        config.store.path = path;
    }
    Ok(())
}

/// Reject values no component can run with
pub fn validate(config: &Config) -> RelayResult<()> {
    if config.hub.liveness_interval_secs == 0 {
        return Err(RelayError::Config(
            "hub.liveness_interval_secs must be greater than 0".to_string(),
        ));
    }
    if config.hub.peer_buffer_size == 0 {
        return Err(RelayError::Config(
            "hub.peer_buffer_size must be greater than 0".to_string(),
        ));
    }
    if config.bridge.heartbeat_secs == 0 {
        return Err(RelayError::Config(
            "bridge.heartbeat_secs must be greater than 0".to_string(),
        ));
    }
    if !matches!(config.hub.eviction_policy.as_str(), "any_peer" | "device_peers") {
        return Err(RelayError::Config(format!(
            "hub.eviction_policy must be 'any_peer' or 'device_peers', got '{}'",
            config.hub.eviction_policy
        )));
    }
    if !matches!(config.bridge.forward_mode.as_str(), "vitals" | "raw") {
        return Err(RelayError::Config(format!(
            "bridge.forward_mode must be 'vitals' or 'raw', got '{}'",
            config.bridge.forward_mode
        )));
    }
    url::Url::parse(&config.bridge.hub_url).map_err(|e| {
        RelayError::Config(format!("bridge.hub_url '{}' is invalid: {}", config.bridge.hub_url, e))
    })?;
    Ok(())
}

/// Execute a function with read access to the configuration
///
/// Falls back to defaults when `load_config` has not run yet.
///
/// ```
/// use vitalsrelay::config::with_config;
///
/// let port = with_config(|cfg| cfg.hub.port);
/// assert!(port > 0);
/// ```
pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&Config) -> R,
{
    match CONFIG.get() {
        Some(lock) => f(&lock.read()),
        None => f(&DEFAULT_CONFIG),
    }
}

/// Get a clone of the entire configuration (for use across await points)
pub fn get_config_clone() -> Config {
    with_config(|cfg| cfg.clone())
}

pub fn is_config_initialized() -> bool {
    CONFIG.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.hub.port, 8080);
        assert_eq!(config.hub.liveness_interval_secs, 30);
        assert_eq!(config.bridge.baud_rate, 115200);
        assert_eq!(config.bridge.reconnect_delay_secs, 5);
        assert_eq!(config.bridge.heartbeat_secs, 15);
        assert_eq!(config.bridge.persist_url, None);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = parse_config(
            r#"
            [hub]
            port = 9000
            eviction_policy = "device_peers"

            [bridge]
            persist_url = "http://localhost:9000/api/vitals"
            "#,
        )
        .unwrap();

        assert_eq!(config.hub.port, 9000);
        assert_eq!(config.hub.eviction_policy, "device_peers");
        assert_eq!(config.hub.liveness_interval_secs, 30);
        assert_eq!(
            config.bridge.persist_url.as_deref(),
            Some("http://localhost:9000/api/vitals")
        );
        assert_eq!(config.store, crate::config::StoreConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PORT", "3000"),
            ("VITALS_SERIAL_PATH", "/dev/ttyACM0"),
            ("VITALS_HUB_URL", "wss://relay.example.org/ws"),
        ]);
        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.hub.port, 3000);
        assert_eq!(config.bridge.serial_path, "/dev/ttyACM0");
        assert_eq!(config.bridge.hub_url, "wss://relay.example.org/ws");
        assert_eq!(config.bridge.baud_rate, 115200);
    }

    #[test]
    fn test_bad_port_override_is_config_error() {
        let mut config = Config::default();
        let result = apply_env_overrides(&mut config, |k| {
            (k == "PORT").then(|| "eighty".to_string())
        });
        assert!(matches!(result, Err(RelayError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_policy() {
        let mut config = Config::default();
        config.hub.eviction_policy = "sometimes".to_string();
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.bridge.hub_url = "not a url".to_string();
        assert!(validate(&config).is_err());
    }
}
