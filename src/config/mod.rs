//! Tool configuration
//!
//! Settings are merged from four layers, last wins:
//! 1. Built-in defaults
//! 2. User config (~/.config/marshal/config.toml)
//! 3. Project config (./marshal-config.toml or `--config`)
//! 4. CLI flags

mod defaults;
mod effective;
mod settings;

pub use defaults::BuiltinDefaults;
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig};
pub use settings::{default_user_config_path, MarshalConfig, PROJECT_CONFIG_FILE};
