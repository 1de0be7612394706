use serde::{Deserialize, Serialize};

use crate::world::WorldError;

/// Physical constants and debug flags for a [`crate::World`].
///
/// Speed caps default to fractions of the speed of light when left unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorldConfig {
    pub speed_of_light: f64,
    #[serde(rename = "maxRTT")]
    pub max_rtt: f64,
    pub player_speed: Option<f64>,
    pub bullet_speed: Option<f64>,
    pub debug_trace: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            speed_of_light: 3.0,
            max_rtt: 6.0,
            player_speed: None,
            bullet_speed: None,
            debug_trace: false,
        }
    }
}

impl WorldConfig {
    pub fn with_speed_of_light(speed_of_light: f64) -> Self {
        Self {
            speed_of_light,
            ..Self::default()
        }
    }

    /// Player speed cap, `0.8c` unless overridden.
    pub fn player_speed(&self) -> f64 {
        self.player_speed.unwrap_or(0.8 * self.speed_of_light)
    }

    /// Projectile speed, `0.95c` unless overridden.
    pub fn bullet_speed(&self) -> f64 {
        self.bullet_speed.unwrap_or(0.95 * self.speed_of_light)
    }

    pub fn validate(&self) -> Result<(), WorldError> {
        let c = self.speed_of_light;
        if !(c.is_finite() && c > 0.0) {
            return Err(WorldError::InvalidConfig(format!(
                "speed of light must be positive and finite, got {c}"
            )));
        }
        if !(self.max_rtt.is_finite() && self.max_rtt >= 0.0) {
            return Err(WorldError::InvalidConfig(format!(
                "maxRTT must be non-negative, got {}",
                self.max_rtt
            )));
        }
        for (name, speed) in [("player", self.player_speed()), ("bullet", self.bullet_speed())] {
            if !(0.0..=c).contains(&speed) {
                return Err(WorldError::InvalidConfig(format!(
                    "{name} speed {speed} must lie in [0, {c}]"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caps_follow_speed_of_light() {
        let cfg = WorldConfig::with_speed_of_light(10.0);
        assert_eq!(cfg.player_speed(), 8.0);
        assert_eq!(cfg.bullet_speed(), 9.5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn explicit_caps_override_defaults() {
        let cfg = WorldConfig {
            player_speed: Some(1.0),
            ..WorldConfig::default()
        };
        assert_eq!(cfg.player_speed(), 1.0);
    }

    #[test]
    fn superluminal_cap_is_invalid() {
        let cfg = WorldConfig {
            bullet_speed: Some(4.0),
            ..WorldConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(WorldError::InvalidConfig(_))));
    }

    #[test]
    fn zero_speed_of_light_is_invalid() {
        assert!(WorldConfig::with_speed_of_light(0.0).validate().is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: WorldConfig = serde_json::from_str(r#"{"speedOfLight": 1.0}"#).unwrap();
        assert_eq!(cfg.max_rtt, 6.0);
        assert_eq!(cfg.player_speed(), 0.8);
    }
}
