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

//! Configuration loading and validation.
//!
//! The config file path comes from `CONFIG_FILE` (defaults to
//! `./config.toml`); both TOML and the addon's `options.json` format are
//! accepted. A missing file means defaults — a present but invalid one is
//! fatal, as are out-of-range values.

use anyhow::{Context, Result, bail};
use std::path::Path;
use tracing::{info, warn};

use thermion_types::AppConfig;

/// Default config file path when `CONFIG_FILE` is not set.
const DEFAULT_CONFIG_PATH: &str = "./config.toml";

/// Load the configuration from disk (or defaults) and validate it.
pub fn load_config() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config_from_path(Path::new(&path))?;
    validate(&config)?;
    Ok(config)
}

fn load_config_from_path(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        info!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON config {}", path.display()))?
    } else {
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse TOML config {}", path.display()))?
    };

    info!("Configuration loaded from {}", path.display());
    Ok(config)
}

/// Validate configured value ranges.
///
/// Coordinates, comfort target and the [0, 1] factors are fatal when out of
/// range; soft tuning parameters only warn.
pub fn validate(config: &AppConfig) -> Result<()> {
    let house = &config.house;

    if !(-90.0..=90.0).contains(&house.latitude) {
        bail!(
            "Invalid latitude: {}. Must be between -90 and 90",
            house.latitude
        );
    }
    if !(-180.0..=180.0).contains(&house.longitude) {
        bail!(
            "Invalid longitude: {}. Must be between -180 and 180",
            house.longitude
        );
    }
    if !(15.0..=30.0).contains(&house.target_temperature) {
        bail!(
            "Invalid target temperature: {}. Must be between 15 and 30°C",
            house.target_temperature
        );
    }

    let advanced = &config.advanced;

    if !(0.0..=1.0).contains(&advanced.solar_gain_factor) {
        bail!(
            "solar_gain_factor must be between 0 and 1, got {}",
            advanced.solar_gain_factor
        );
    }
    if !(0.0..=1.0).contains(&advanced.wind_factor) {
        bail!(
            "wind_factor must be between 0 and 1, got {}",
            advanced.wind_factor
        );
    }
    if config.system.update_interval_secs == 0 {
        bail!("update_interval_secs must be at least 1");
    }

    if !(0.5..=12.0).contains(&advanced.thermal_lag_hours) {
        warn!(
            "thermal_lag_hours {} outside recommended range 0.5-12",
            advanced.thermal_lag_hours
        );
    }
    if !(0.001..=0.5).contains(&advanced.learning_rate) {
        warn!(
            "learning_rate {} outside recommended range 0.001-0.5",
            advanced.learning_rate
        );
    }

    info!("Configuration validation completed successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_latitude_is_fatal() {
        let mut config = AppConfig::default();
        config.house.latitude = 120.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_longitude_is_fatal() {
        let mut config = AppConfig::default();
        config.house.longitude = -200.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_target_temperature_bounds_are_fatal() {
        let mut config = AppConfig::default();
        config.house.target_temperature = 12.0;
        assert!(validate(&config).is_err());

        config.house.target_temperature = 31.0;
        assert!(validate(&config).is_err());

        config.house.target_temperature = 21.5;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_factor_ranges_are_fatal() {
        let mut config = AppConfig::default();
        config.advanced.solar_gain_factor = 1.2;
        assert!(validate(&config).is_err());

        let mut config = AppConfig::default();
        config.advanced.wind_factor = -0.1;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_soft_ranges_only_warn() {
        let mut config = AppConfig::default();
        config.advanced.thermal_lag_hours = 20.0;
        config.advanced.learning_rate = 0.9;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from_path(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.house.target_temperature, 21.0);
    }

    #[test]
    fn test_toml_config_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[house]
target_temperature = 22.5
building_thermal_mass = "high"
heating_system_type = "radiator"

[advanced]
prediction_horizon_hours = 12

[system]
update_interval_secs = 120
"#,
        )
        .unwrap();

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.house.target_temperature, 22.5);
        assert_eq!(config.advanced.prediction_horizon_hours, 12);
        assert_eq!(config.system.update_interval_secs, 120);
        assert_eq!(
            config.house.building_thermal_mass,
            thermion_types::BuildingMass::High
        );
    }

    #[test]
    fn test_json_config_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(
            &path,
            r#"{"house": {"night_setback": 3.0}, "advanced": {"wind_factor": 0.2}}"#,
        )
        .unwrap();

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.house.night_setback, 3.0);
        assert_eq!(config.advanced.wind_factor, 0.2);
    }
}
