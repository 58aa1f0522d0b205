// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Thermion.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Qualitative heat-storage capacity of the building structure.
///
/// Unknown values deserialize to `Unrecognized` and map to neutral factors
/// everywhere, so a bad config string degrades behaviour instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BuildingMass {
    Low,
    #[default]
    Medium,
    High,
    #[serde(other)]
    Unrecognized,
}

impl BuildingMass {
    /// Numeric encoding used in feature vectors (low=1.0, medium=2.0, high=3.0).
    pub fn feature_code(&self) -> f64 {
        match self {
            Self::Low => 1.0,
            Self::Medium | Self::Unrecognized => 2.0,
            Self::High => 3.0,
        }
    }

    /// Multiplier applied to heat demand: light buildings leak, heavy ones buffer.
    pub fn demand_factor(&self) -> f64 {
        match self {
            Self::Low => 1.2,
            Self::High => 0.8,
            Self::Medium | Self::Unrecognized => 1.0,
        }
    }

    /// Multiplier applied to thermal lag.
    pub fn lag_factor(&self) -> f64 {
        match self {
            Self::Low => 0.7,
            Self::High => 1.5,
            Self::Medium | Self::Unrecognized => 1.0,
        }
    }

    /// Config string value (lowercase).
    pub fn to_config_value(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for BuildingMass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_config_value())
    }
}

impl FromStr for BuildingMass {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => Self::Unrecognized,
        })
    }
}

/// Heat emitter type of the installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HeatingSystem {
    Radiator,
    #[default]
    Underfloor,
    Mixed,
    #[serde(other)]
    Unrecognized,
}

impl HeatingSystem {
    /// Multiplier applied to heat demand (radiators run hotter water).
    pub fn demand_factor(&self) -> f64 {
        match self {
            Self::Radiator => 1.1,
            Self::Underfloor => 0.9,
            Self::Mixed | Self::Unrecognized => 1.0,
        }
    }

    /// Multiplier applied to thermal lag (underfloor slabs respond slowly).
    pub fn lag_factor(&self) -> f64 {
        match self {
            Self::Radiator => 0.5,
            Self::Underfloor => 1.2,
            Self::Mixed => 0.8,
            Self::Unrecognized => 1.0,
        }
    }

    /// Config string value (lowercase).
    pub fn to_config_value(&self) -> &'static str {
        match self {
            Self::Radiator => "radiator",
            Self::Underfloor => "underfloor",
            Self::Mixed => "mixed",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for HeatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_config_value())
    }
}

impl FromStr for HeatingSystem {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "radiator" => Self::Radiator,
            "underfloor" => Self::Underfloor,
            "mixed" => Self::Mixed,
            _ => Self::Unrecognized,
        })
    }
}

/// Building and comfort configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseConfig {
    /// Site latitude in degrees (used by the weather collaborator).
    #[serde(default = "default_latitude")]
    pub latitude: f64,

    /// Site longitude in degrees (used by the weather collaborator).
    #[serde(default = "default_longitude")]
    pub longitude: f64,

    /// Daytime comfort temperature (°C).
    #[serde(default = "default_target_temperature")]
    pub target_temperature: f64,

    /// Setback subtracted from the comfort target outside 06:00-22:00 (°C).
    #[serde(default = "default_night_setback")]
    pub night_setback: f64,

    /// Thermal mass class of the building envelope.
    #[serde(default)]
    pub building_thermal_mass: BuildingMass,

    /// Installed heat emitter type.
    #[serde(default)]
    pub heating_system_type: HeatingSystem,
}

impl Default for HouseConfig {
    fn default() -> Self {
        Self {
            latitude: default_latitude(),
            longitude: default_longitude(),
            target_temperature: default_target_temperature(),
            night_setback: default_night_setback(),
            building_thermal_mass: BuildingMass::default(),
            heating_system_type: HeatingSystem::default(),
        }
    }
}

/// Tuning parameters for the prediction engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Configured base thermal lag (hours). The engine scales this by
    /// building/system factors and a learned factor at runtime.
    #[serde(default = "default_thermal_lag_hours")]
    pub thermal_lag_hours: f64,

    /// Solar gain coefficient, 0..=1.
    #[serde(default = "default_solar_gain_factor")]
    pub solar_gain_factor: f64,

    /// Wind loss coefficient, 0..=1.
    #[serde(default = "default_wind_factor")]
    pub wind_factor: f64,

    /// Learning rate recorded alongside persisted model metadata.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// How many forecast hours a single cycle plans over.
    #[serde(default = "default_prediction_horizon_hours")]
    pub prediction_horizon_hours: usize,

    /// Minimum compressor runtime the commander should respect (minutes).
    #[serde(default = "default_min_runtime_minutes")]
    pub min_runtime_minutes: u32,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            thermal_lag_hours: default_thermal_lag_hours(),
            solar_gain_factor: default_solar_gain_factor(),
            wind_factor: default_wind_factor(),
            learning_rate: default_learning_rate(),
            prediction_horizon_hours: default_prediction_horizon_hours(),
            min_runtime_minutes: default_min_runtime_minutes(),
        }
    }
}

/// Process-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSettings {
    /// Seconds between control cycles.
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,

    /// Seconds to wait after a failed cycle before trying again.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Path of the persisted learning data file.
    #[serde(default = "default_data_path")]
    pub data_path: String,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            update_interval_secs: default_update_interval_secs(),
            cooldown_secs: default_cooldown_secs(),
            data_path: default_data_path(),
        }
    }
}

/// Central configuration resource for the Thermion system.
#[derive(Resource, Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub house: HouseConfig,

    #[serde(default)]
    pub advanced: AdvancedConfig,

    #[serde(default)]
    pub system: SystemSettings,
}

// Default value functions for serde
fn default_latitude() -> f64 {
    51.1657
}
fn default_longitude() -> f64 {
    10.4515
}
fn default_target_temperature() -> f64 {
    21.0
}
fn default_night_setback() -> f64 {
    2.0
}
fn default_thermal_lag_hours() -> f64 {
    4.0
}
fn default_solar_gain_factor() -> f64 {
    0.3
}
fn default_wind_factor() -> f64 {
    0.1
}
fn default_learning_rate() -> f64 {
    0.05
}
fn default_prediction_horizon_hours() -> usize {
    24
}
fn default_min_runtime_minutes() -> u32 {
    30
}
fn default_update_interval_secs() -> u64 {
    300
}
fn default_cooldown_secs() -> u64 {
    60
}
fn default_data_path() -> String {
    "./data/learning_data.json".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_building_mass_feature_codes() {
        assert_eq!(BuildingMass::Low.feature_code(), 1.0);
        assert_eq!(BuildingMass::Medium.feature_code(), 2.0);
        assert_eq!(BuildingMass::High.feature_code(), 3.0);
        assert_eq!(BuildingMass::Unrecognized.feature_code(), 2.0);
    }

    #[test]
    fn test_unknown_strings_fall_back_to_neutral_factors() {
        let mass: BuildingMass = "cardboard".parse().unwrap();
        assert_eq!(mass, BuildingMass::Unrecognized);
        assert_eq!(mass.demand_factor(), 1.0);
        assert_eq!(mass.lag_factor(), 1.0);

        let system: HeatingSystem = "fireplace".parse().unwrap();
        assert_eq!(system, HeatingSystem::Unrecognized);
        assert_eq!(system.demand_factor(), 1.0);
        assert_eq!(system.lag_factor(), 1.0);
    }

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.house.target_temperature, 21.0);
        assert_eq!(config.house.night_setback, 2.0);
        assert_eq!(config.advanced.thermal_lag_hours, 4.0);
        assert_eq!(config.advanced.prediction_horizon_hours, 24);
        assert_eq!(config.system.update_interval_secs, 300);
    }

    #[test]
    fn test_unknown_mass_deserializes_without_error() {
        let json = r#"{"house": {"building_thermal_mass": "granite"}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.house.building_thermal_mass,
            BuildingMass::Unrecognized
        );
    }
}
