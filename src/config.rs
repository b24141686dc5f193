//! Per-robot geometry and tuning constants, loaded from TOML the way the
//! reference codebase loads its hopper config: a `Default` backed by an
//! embedded fixture, plus an explicit parse path for callers supplying their
//! own file.

use serde::{Deserialize, Serialize};

use crate::error::HexapodResult;
use crate::geometry::Vec3;

const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default_hexapod.toml");

/// Per-leg mounting offsets, home yaws, stance offset, and the tunable
/// reach/speed constants that drive the gait planner and executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HexapodConfig {
    pub leg_x_offset: [f64; 6],
    pub leg_y_offset: [f64; 6],
    pub home_yaws: [f64; 6],
    pub stance_offset: Vec3Config,
    pub step_groups: [[usize; 3]; 2],

    pub max_step_magnitude: f64,
    pub step_to_neutral_speed: f64,
    pub z_max_magnitude: f64,
    pub roll_max_magnitude: f64,
    pub pitch_max_magnitude: f64,
    pub x_max_no_step_magnitude: f64,
    pub y_max_no_step_magnitude: f64,
    pub yaw_max_no_step_magnitude: f64,
    pub max_step_height: f64,
    pub max_step_speed: f64,
    pub max_speed: f64,
}

/// `Vec3` is not `Serialize`/`Deserialize` itself (it is a pure value type
/// used on the hot path); configuration goes through this plain mirror.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3Config {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<Vec3Config> for Vec3 {
    fn from(v: Vec3Config) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

impl HexapodConfig {
    pub fn from_toml_str(contents: &str) -> HexapodResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn stance_offset_vec3(&self) -> Vec3 {
        self.stance_offset.into()
    }
}

impl Default for HexapodConfig {
    fn default() -> Self {
        Self::from_toml_str(DEFAULT_CONFIG_TOML)
            .expect("embedded default_hexapod.toml must parse")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses_and_has_two_tripods() {
        let config = HexapodConfig::default();
        assert_eq!(config.step_groups[0], [0, 2, 4]);
        assert_eq!(config.step_groups[1], [1, 3, 5]);
        assert_eq!(config.max_step_magnitude, 75.0);
    }
}
