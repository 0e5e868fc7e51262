//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `LORENCIA_SERVER_HOST` - Game server host
//! - `LORENCIA_SERVER_PORT` - Game server port
//! - `LORENCIA_CHARACTER_ID` - Character id
//! - `LORENCIA_CHARACTER_NAME` - Character name
//! - `LORENCIA_ITEM_CATALOG` - Path to an item catalog JSON file

use std::env;

use crate::config::types::{Config, ItemsConfig};

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "LORENCIA";

/// Apply environment variable overrides to a config.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(host) = env::var(format!("{}_SERVER_HOST", ENV_PREFIX)) {
        config.server.host = host;
    }
    if let Ok(port) = env::var(format!("{}_SERVER_PORT", ENV_PREFIX)) {
        if let Ok(port) = port.parse() {
            config.server.port = port;
        }
    }

    if let Ok(id) = env::var(format!("{}_CHARACTER_ID", ENV_PREFIX)) {
        if let Ok(id) = id.parse() {
            config.character.id = id;
        }
    }
    if let Ok(name) = env::var(format!("{}_CHARACTER_NAME", ENV_PREFIX)) {
        config.character.name = Some(name);
    }

    if let Ok(catalog) = env::var(format!("{}_ITEM_CATALOG", ENV_PREFIX)) {
        config.items = Some(ItemsConfig {
            catalog: Some(catalog),
        });
    }

    config
}

/// Get the config file path from environment or use default.
///
/// Checks `LORENCIA_CONFIG`, otherwise returns "lorencia.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "lorencia.conf".to_string())
}
