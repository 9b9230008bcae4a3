/// Terminal timing configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::terminal::TerminalError;

/// Cadences in host milliseconds. Every field has a default, so a RON file
/// only needs to name the values it changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Delay between revealed characters.
    pub tick_interval_ms: u64,
    /// Pause after the intro finishes typing before the scene menu appears.
    pub intro_pause_ms: u64,
    /// How long the closing transition runs before state is reset.
    pub close_delay_ms: u64,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 30,
            intro_pause_ms: 1_000,
            close_delay_ms: 1_000,
        }
    }
}

impl TerminalConfig {
    pub fn load_from_ron(path: &Path) -> Result<TerminalConfig, TerminalError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<TerminalConfig, TerminalError> {
        let config: TerminalConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TerminalError> {
        if self.tick_interval_ms == 0 {
            return Err(TerminalError::InvalidConfig(
                "tick_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TerminalConfig::default();
        assert_eq!(config.tick_interval_ms, 30);
        assert_eq!(config.intro_pause_ms, 1_000);
        assert_eq!(config.close_delay_ms, 1_000);
    }

    #[test]
    fn partial_ron_keeps_defaults() {
        let config = TerminalConfig::parse_ron("(tick_interval_ms: 15)").unwrap();
        assert_eq!(config.tick_interval_ms, 15);
        assert_eq!(config.intro_pause_ms, 1_000);
    }

    #[test]
    fn zero_interval_rejected() {
        let err = TerminalConfig::parse_ron("(tick_interval_ms: 0)").unwrap_err();
        assert!(matches!(err, TerminalError::InvalidConfig(_)));
    }

    #[test]
    fn malformed_ron_rejected() {
        assert!(matches!(
            TerminalConfig::parse_ron("(tick_interval_ms: )"),
            Err(TerminalError::Ron(_))
        ));
    }
}
