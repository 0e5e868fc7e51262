//! Configuration validation.
//!
//! Validates configuration values and reports every problem at once.

use crate::common::error::ConfigError;
use crate::common::resources::CharClass;
use crate::config::types::Config;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.server.host.is_empty() {
        errors.push("server.host is required".to_string());
    }
    if config.server.port == 0 {
        errors.push("server.port must be non-zero".to_string());
    }
    if config.server.connect_timeout_secs == 0 {
        errors.push("server.connect_timeout_secs must be non-zero".to_string());
    }

    if CharClass::from_id(config.character.class).is_none() {
        errors.push(format!(
            "character.class {} is invalid (use: 0, 16, 32, 48)",
            config.character.class
        ));
    }
    if let Some(ref name) = config.character.name {
        if name.is_empty() || name.len() > 10 {
            errors.push(format!(
                "character.name must be 1-10 characters (got {})",
                name.len()
            ));
        }
    }

    if let Some(ref reconnect) = config.reconnect {
        if reconnect.max_delay_secs < reconnect.min_delay_secs {
            errors.push("reconnect.max_delay_secs must be >= min_delay_secs".to_string());
        }
        if let Some(factor) = reconnect.factor {
            if factor < 1.0 {
                errors.push(format!("reconnect.factor must be >= 1.0 (got {})", factor));
            }
        }
    }

    if config.session.tick_millis == 0 {
        errors.push("session.tick_millis must be non-zero".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}
