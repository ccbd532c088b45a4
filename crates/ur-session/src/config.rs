//! Session settings, read once from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use ur_core::{EngineConfig, Player};

use crate::session::SessionError;

/// Default pause after each animated move
pub const DEFAULT_ANIMATION: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Directory holding `ur.options.json`
    pub data_dir: PathBuf,
    /// Wait before an automatic pass (`UR_AUTOPASS_DELAY_MS`)
    pub auto_pass_delay: Duration,
    /// Pause after each animated move (`UR_ANIMATION_MS`)
    pub animation: Duration,
    /// Dice seed; random when unset (`UR_SEED`)
    pub seed: Option<u64>,
    pub player_names: [String; 2],
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            auto_pass_delay: EngineConfig::default().auto_pass_delay,
            animation: DEFAULT_ANIMATION,
            seed: None,
            player_names: [Player::One.to_string(), Player::Two.to_string()],
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Result<Self, SessionError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source; unset variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SessionError> {
        let mut config = Self::default();

        if let Some(dir) = lookup("UR_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "UR_AUTOPASS_DELAY_MS")? {
            config.auto_pass_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "UR_ANIMATION_MS")? {
            config.animation = Duration::from_millis(ms);
        }
        config.seed = parse_var(&lookup, "UR_SEED")?;

        for (slot, name) in ["UR_PLAYER1", "UR_PLAYER2"].into_iter().enumerate() {
            if let Some(player) = lookup(name).filter(|n| !n.trim().is_empty()) {
                config.player_names[slot] = player;
            }
        }

        Ok(config)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            auto_pass_delay: self.auto_pass_delay,
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, SessionError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SessionError::InvalidConfig {
                name: name.to_string(),
                value,
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<SessionConfig, SessionError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SessionConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.auto_pass_delay, Duration::from_millis(1000));
        assert_eq!(config.animation, Duration::from_millis(300));
        assert_eq!(config.player_names[0], "Player 1");
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("UR_DATA_DIR", "/tmp/ur"),
            ("UR_AUTOPASS_DELAY_MS", "250"),
            ("UR_ANIMATION_MS", "0"),
            ("UR_SEED", "42"),
            ("UR_PLAYER2", "Enki"),
        ])
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/ur"));
        assert_eq!(config.auto_pass_delay, Duration::from_millis(250));
        assert_eq!(config.animation, Duration::ZERO);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.player_names, ["Player 1".to_string(), "Enki".to_string()]);
    }

    #[test]
    fn test_bad_number_is_reported() {
        let err = config_from(&[("UR_SEED", "lots")]).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidConfig { ref name, ref value } if name == "UR_SEED" && value == "lots"
        ));
    }
}
