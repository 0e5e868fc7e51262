//! Configuration type definitions.

use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub character: CharacterConfig,
    pub reconnect: Option<ReconnectSettings>,
    pub items: Option<ItemsConfig>,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Game server endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 44405,
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_connect_timeout() -> u64 {
    3
}

/// The character this client plays.
#[derive(Debug, Clone, Deserialize)]
pub struct CharacterConfig {
    /// Server-side character id, replaced by CHARSTATS once received.
    pub id: u16,
    /// Class code: 0 DW, 16 DK, 32 Elf, 48 MG.
    pub class: u8,
    pub name: Option<String>,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            id: 1,
            class: 16,
            name: None,
        }
    }
}

/// Backoff between connection attempts.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectSettings {
    pub min_delay_secs: u64,
    pub max_delay_secs: u64,
    pub factor: Option<f32>,
    /// Number of retries after the first failure (absent = retry forever).
    pub max_attempts: Option<usize>,
}

/// Item definition sources.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemsConfig {
    /// JSON file with extra item definitions merged over the built-in table.
    pub catalog: Option<String>,
}

/// Session loop timing.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Fixed simulation tick.
    pub tick_millis: u64,
    /// How long the initial world burst is collected before going live.
    pub burst_window_millis: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_millis: 16,
            burst_window_millis: 500,
        }
    }
}

impl Config {
    pub fn catalog_path(&self) -> Option<&str> {
        self.items.as_ref().and_then(|items| items.catalog.as_deref())
    }
}
