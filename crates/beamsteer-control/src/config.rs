//! JSON runtime configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::controller::YPolicy;
use crate::session::GridSpec;
use crate::state::{ActuatorState, AxisLimits};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn default_actuator_addr() -> String {
    "192.168.50.30:80".to_string()
}

fn default_mesh_path() -> PathBuf {
    PathBuf::from("calibration_mesh.json")
}

fn default_x_limits() -> AxisLimits {
    AxisLimits::new(0.0, 270.0)
}

fn default_y_limits() -> AxisLimits {
    AxisLimits::new(0.0, 75.0)
}

fn default_start_x() -> f64 {
    135.0
}

fn default_step_size() -> f64 {
    10.0
}

fn default_y_policy() -> YPolicy {
    YPolicy::Hold
}

/// Everything deployment-specific about one turret.
///
/// Every field has a default matching the stock hardware, so an empty
/// `{}` config is a valid one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurretConfig {
    /// `host:port` of the actuator firmware.
    #[serde(default = "default_actuator_addr")]
    pub actuator_addr: String,
    /// Log commands instead of opening a connection.
    #[serde(default)]
    pub spoof: bool,
    /// Where the calibration mesh lives.
    #[serde(default = "default_mesh_path")]
    pub mesh_path: PathBuf,
    #[serde(default = "default_x_limits")]
    pub x_limits: AxisLimits,
    #[serde(default = "default_y_limits")]
    pub y_limits: AxisLimits,
    #[serde(default = "default_start_x")]
    pub start_x: f64,
    #[serde(default)]
    pub start_y: f64,
    #[serde(default = "default_step_size")]
    pub step_size: f64,
    #[serde(default)]
    pub grid: GridSpec,
    #[serde(default = "default_y_policy")]
    pub y_policy: YPolicy,
    #[serde(default)]
    pub invert_x: bool,
}

impl Default for TurretConfig {
    fn default() -> Self {
        Self {
            actuator_addr: default_actuator_addr(),
            spoof: false,
            mesh_path: default_mesh_path(),
            x_limits: default_x_limits(),
            y_limits: default_y_limits(),
            start_x: default_start_x(),
            start_y: 0.0,
            step_size: default_step_size(),
            grid: GridSpec::default(),
            y_policy: default_y_policy(),
            invert_x: false,
        }
    }
}

impl TurretConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Initial actuator state for this deployment.
    pub fn actuator_state(&self) -> ActuatorState {
        ActuatorState::new(
            self.start_x,
            self.start_y,
            self.x_limits,
            self.y_limits,
            self.step_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_stock_defaults() {
        let config: TurretConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.actuator_addr, "192.168.50.30:80");
        assert_eq!(config.x_limits, AxisLimits::new(0.0, 270.0));
        assert_eq!(config.y_limits, AxisLimits::new(0.0, 75.0));
        assert_eq!(config.start_x, 135.0);
        assert_eq!(config.start_y, 0.0);
        assert_eq!(config.grid.rows, 3);
        assert_eq!(config.grid.cols, 10);
        assert_eq!(config.y_policy, YPolicy::Hold);
        assert!(!config.invert_x);
        assert!(!config.spoof);
    }

    #[test]
    fn y_policy_tagged_representation() {
        let config: TurretConfig = serde_json::from_str(
            r#"{"y_policy": {"mode": "affine", "scale": -0.6, "offset": 60.0}}"#,
        )
        .unwrap();
        assert_eq!(
            config.y_policy,
            YPolicy::Affine {
                scale: -0.6,
                offset: 60.0
            }
        );
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turret.json");
        let mut config = TurretConfig::default();
        config.invert_x = true;
        config.grid.cols = 5;

        config.write_json(&path).unwrap();
        let loaded = TurretConfig::load_json(&path).unwrap();
        assert!(loaded.invert_x);
        assert_eq!(loaded.grid.cols, 5);
    }
}
