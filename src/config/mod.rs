/// Configuration system
///
/// TOML file + embedded defaults (`config_struct!`) + environment overrides,
/// held in one global instance. Components take plain values out of it at
/// construction time, so they can also be built directly in tests.
pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::*;
pub use utils::{
    apply_env_overrides, get_config_clone, is_config_initialized, load_config,
    load_config_from_path, parse_config, validate, with_config, CONFIG_FILE_PATH,
};
