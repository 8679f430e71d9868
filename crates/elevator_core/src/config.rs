//! Building configuration.
//!
//! All durations are stored as real-time milliseconds and scaled down by
//! [`BuildingConfig::simulation_speed`] when read through the accessor
//! methods, so a 10 second floor travel at 100x speed becomes a 100 ms delay.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::elevator::GROUND_FLOOR;
use crate::error::ConfigError;

/// What the movement engine does when every pending destination lies behind
/// the car's current direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPolicy {
    /// End the activation and reset the direction to idle. The remaining
    /// floors are served by the next activation.
    #[default]
    DirectionLocked,
    /// Reset the direction to idle and keep serving in the same activation.
    ReverseImmediately,
}

/// Static configuration of the simulated building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingConfig {
    /// Number of floors, numbered from 1.
    pub total_floors: u32,
    /// Number of elevators, numbered from 1.
    pub total_elevators: u32,
    /// Real-time travel time between two adjacent floors.
    pub floor_travel_ms: u64,
    /// Real-time duration the doors stay open at a stop.
    pub door_operation_ms: u64,
    /// How many times faster than real time the simulation runs.
    pub simulation_speed: u32,
    /// How long `stop` waits for movement tasks to settle. Not scaled.
    pub shutdown_timeout_ms: u64,
    /// Interval between periodic fleet status reports. Not scaled.
    pub status_interval_ms: u64,
    /// Inclusive bounds of the pause between generated requests. Not scaled.
    pub request_interval_ms: [u64; 2],
    /// Behaviour when the direction-locked scan runs out of floors.
    pub scan_policy: ScanPolicy,
}

impl Default for BuildingConfig {
    fn default() -> Self {
        Self {
            total_floors: 10,
            total_elevators: 4,
            floor_travel_ms: 10_000,
            door_operation_ms: 10_000,
            simulation_speed: 100,
            shutdown_timeout_ms: 5_000,
            status_interval_ms: 1_000,
            request_interval_ms: [200, 800],
            scan_policy: ScanPolicy::DirectionLocked,
        }
    }
}

impl BuildingConfig {
    /// Load a configuration from a JSON file. Missing fields take their
    /// default values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or fails
    /// [`validate`](Self::validate).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Parse and validate a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if parsing or validation fails.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration describes a runnable building.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_floors <= GROUND_FLOOR {
            return Err(ConfigError::Invalid {
                field: "total_floors",
                reason: format!("need at least 2 floors, got {}", self.total_floors),
            });
        }
        if self.total_elevators == 0 {
            return Err(ConfigError::Invalid {
                field: "total_elevators",
                reason: "need at least one elevator".to_string(),
            });
        }
        if self.simulation_speed == 0 {
            return Err(ConfigError::Invalid {
                field: "simulation_speed",
                reason: "speed multiplier must be positive".to_string(),
            });
        }
        let [min, max] = self.request_interval_ms;
        if min > max {
            return Err(ConfigError::Invalid {
                field: "request_interval_ms",
                reason: format!("lower bound {min} exceeds upper bound {max}"),
            });
        }
        Ok(())
    }

    /// Simulated delay for travelling one floor.
    #[must_use]
    pub fn floor_travel_delay(&self) -> Duration {
        self.scaled(self.floor_travel_ms)
    }

    /// Simulated delay the doors are held open at a stop.
    #[must_use]
    pub fn door_operation_delay(&self) -> Duration {
        self.scaled(self.door_operation_ms)
    }

    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    #[must_use]
    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    fn scaled(&self, millis: u64) -> Duration {
        Duration::from_millis(millis / u64::from(self.simulation_speed.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BuildingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.total_floors, 10);
        assert_eq!(config.total_elevators, 4);
    }

    #[test]
    fn test_delays_are_scaled_by_speed() {
        let config = BuildingConfig::default();
        assert_eq!(config.floor_travel_delay(), Duration::from_millis(100));
        assert_eq!(config.door_operation_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            BuildingConfig::from_json_str(r#"{ "total_floors": 20, "scan_policy": "reverse_immediately" }"#)
                .unwrap();
        assert_eq!(config.total_floors, 20);
        assert_eq!(config.total_elevators, 4);
        assert_eq!(config.scan_policy, ScanPolicy::ReverseImmediately);
    }

    #[test]
    fn test_rejects_zero_elevators() {
        let err = BuildingConfig::from_json_str(r#"{ "total_elevators": 0 }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "total_elevators",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_fewer_than_two_floors() {
        for floors in [0, 1] {
            let config = BuildingConfig {
                total_floors: floors,
                ..BuildingConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::Invalid {
                    field: "total_floors",
                    ..
                })
            ));
        }
        let two = BuildingConfig {
            total_floors: 2,
            ..BuildingConfig::default()
        };
        assert!(two.validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_request_interval() {
        let config = BuildingConfig {
            request_interval_ms: [900, 100],
            ..BuildingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = BuildingConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
