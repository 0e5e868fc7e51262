//! Exponential backoff for connection attempts.

use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};

use crate::config::types::ReconnectSettings;

/// Backoff parameters for reconnecting to the game server.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on a single delay.
    pub max_delay: Duration,
    /// Multiplier for each successive attempt.
    pub factor: f32,
    /// Maximum number of retries (None = infinite).
    pub max_attempts: Option<usize>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            factor: 2.0,
            max_attempts: Some(5),
        }
    }
}

impl From<&ReconnectSettings> for ReconnectConfig {
    fn from(settings: &ReconnectSettings) -> Self {
        Self {
            initial_delay: Duration::from_secs(settings.min_delay_secs),
            max_delay: Duration::from_secs(settings.max_delay_secs),
            factor: settings.factor.unwrap_or(2.0),
            max_attempts: settings.max_attempts,
        }
    }
}

impl ReconnectConfig {
    /// Build a fresh delay iterator. Yields `None` once attempts run out.
    pub fn backoff(&self) -> impl Iterator<Item = Duration> {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_factor(self.factor);

        match self.max_attempts {
            Some(max) => builder.with_max_times(max).build(),
            None => builder.without_max_times().build(),
        }
    }
}
