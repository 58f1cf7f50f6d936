use std::env;
use std::time::Duration;

use crate::board::Color;
use crate::error::ConfigError;

const AI_COLOR_VAR: &str = "DESKCHESS_AI_COLOR";
const THINK_MS_VAR: &str = "DESKCHESS_THINK_MS";
const SEED_VAR: &str = "DESKCHESS_SEED";

/// Settings for a game session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Side played by the computer in human-vs-computer games.
    pub ai_color: Color,
    /// Pause before the computer commits its move. Zero makes it due immediately.
    pub think_delay: Duration,
    /// Fixed seed for the opponent's random choices; entropy when `None`.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ai_color: Color::Black,
            think_delay: Duration::from_millis(1000),
            seed: None,
        }
    }
}

impl SessionConfig {
    pub fn with_ai_color(mut self, color: Color) -> Self {
        self.ai_color = color;
        self
    }

    pub fn with_think_delay(mut self, delay: Duration) -> Self {
        self.think_delay = delay;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Defaults overridden by `DESKCHESS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(AI_COLOR_VAR) {
            config.ai_color = match value.trim().to_ascii_lowercase().as_str() {
                "white" | "w" => Color::White,
                "black" | "b" => Color::Black,
                _ => return Err(invalid(AI_COLOR_VAR, value)),
            };
        }

        if let Some(value) = lookup(THINK_MS_VAR) {
            let millis = value
                .trim()
                .parse::<u64>()
                .map_err(|_| invalid(THINK_MS_VAR, value.clone()))?;
            config.think_delay = Duration::from_millis(millis);
        }

        if let Some(value) = lookup(SEED_VAR) {
            let seed = value
                .trim()
                .parse::<u64>()
                .map_err(|_| invalid(SEED_VAR, value.clone()))?;
            config.seed = Some(seed);
        }

        Ok(config)
    }
}

fn invalid(key: &'static str, value: String) -> ConfigError {
    ConfigError::InvalidValue { key, value }
}
