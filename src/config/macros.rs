/// Configuration macros for zero-repetition config definitions
///
/// `config_struct!` defines a configuration struct with the default of every
/// field declared inline, and generates:
/// - the struct with public fields
/// - the `Default` implementation from the inline values
/// - serde support with `#[serde(default)]` so partial TOML files load
///
/// # Example
/// ```
/// vitalsrelay::config_struct! {
///     pub struct ProbeConfig {
///         interval_secs: u64 = 30,
///         enabled: bool = true,
///     }
/// }
///
/// let cfg = ProbeConfig::default();
/// assert_eq!(cfg.interval_secs, 30);
/// ```
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_name:ident: $field_type:ty = $default_value:expr
            ),*
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field_name: $field_type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field_name: $default_value,
                    )*
                }
            }
        }
    };
}
