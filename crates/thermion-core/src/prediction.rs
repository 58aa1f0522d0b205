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

//! Horizon prediction: per-hour hybrid of the physical heat-balance model
//! and the learned correction models, blended by learning confidence.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::features::SampleConditions;
use crate::learning::{LearningEngine, blend};
use crate::physical::{self, WeatherImpact};
use thermion_types::{AppConfig, CurrentStatus, CycleError, ForecastEntry};

/// Confidence above which the slow outer loop is allowed to move the
/// global heuristic coefficients. Single noisy cycles never clear it.
pub const ADAPTATION_CONFIDENCE_GATE: f64 = 0.7;

/// Heuristic coefficients the adaptive updater is allowed to nudge.
///
/// Seeded from configuration; recomputed as `configured_base * adjustment`
/// once per cycle when confidence clears the gate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AdaptiveParams {
    /// Adapted thermal lag (hours). Reported in status output; the lag used
    /// in predictions is recomputed per call from the configured base.
    pub thermal_lag_hours: f64,

    pub solar_gain_factor: f64,

    pub wind_factor: f64,
}

impl AdaptiveParams {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            thermal_lag_hours: config.advanced.thermal_lag_hours,
            solar_gain_factor: config.advanced.solar_gain_factor,
            wind_factor: config.advanced.wind_factor,
        }
    }

    /// Apply the adaptation recommendations when confidence clears the
    /// gate. Returns whether anything was updated.
    pub fn update_from_learning(&mut self, config: &AppConfig, engine: &LearningEngine) -> bool {
        let recommendations = engine.adaptation_recommendations();
        if recommendations.confidence <= ADAPTATION_CONFIDENCE_GATE {
            return false;
        }

        self.thermal_lag_hours =
            config.advanced.thermal_lag_hours * recommendations.thermal_lag_adjustment;
        self.solar_gain_factor =
            config.advanced.solar_gain_factor * recommendations.solar_gain_adjustment;
        self.wind_factor = config.advanced.wind_factor * recommendations.wind_factor_adjustment;

        debug!(
            "Adapted parameters - thermal lag: {:.1}h, solar gain: {:.2}, wind factor: {:.2}",
            self.thermal_lag_hours, self.solar_gain_factor, self.wind_factor
        );
        true
    }
}

/// One hour of the prediction horizon. Immutable; the decision engine
/// consumes the whole batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlyPrediction {
    pub hour_offset: usize,
    pub forecast_time: DateTime<Utc>,

    /// Forecast outside temperature (fallback-applied).
    pub outside_temp: f64,

    /// Comfort temperature wanted at this hour.
    pub comfort_target: f64,

    pub weather_impact: WeatherImpact,

    /// Blended heat demand (°C equivalent), >= 0.
    pub heat_demand: f64,

    pub predicted_room_temp: f64,

    pub predicted_energy: f64,

    /// Blended COP, clamped to [1.0, 6.0].
    pub predicted_cop: f64,

    /// Thermal lag the response model used for this hour.
    pub thermal_lag_hours: f64,
}

/// Snapshot of the engine's current tuning, for status reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmStatus {
    pub params: AdaptiveParams,
    pub prediction_horizon_hours: usize,
    pub learning_confidence: f64,
    pub historical_data_points: usize,
}

/// Build the hourly prediction horizon for one cycle.
///
/// Walks the forecast up to the configured horizon, computing the physical
/// estimates and blending in learned corrections where trained models
/// exist. Fails only on an empty forecast; individual missing readings use
/// the encoder fallbacks.
pub fn predict_horizon(
    config: &AppConfig,
    params: &AdaptiveParams,
    engine: &LearningEngine,
    status: &CurrentStatus,
    forecast: &[ForecastEntry],
) -> Result<Vec<HourlyPrediction>, CycleError> {
    if forecast.is_empty() {
        return Err(CycleError::EmptyForecast);
    }

    let horizon = config.advanced.prediction_horizon_hours.max(1);
    let confidence = engine.confidence();

    let current_room_temp = status.temperatures.room.unwrap_or(20.0);
    let current_outlet_temp = status.temperatures.outlet.unwrap_or(30.0);

    let mut predictions = Vec::with_capacity(horizon.min(forecast.len()));

    for (hour_offset, entry) in forecast.iter().take(horizon).enumerate() {
        predictions.push(predict_hour(
            config,
            params,
            engine,
            confidence,
            current_room_temp,
            current_outlet_temp,
            hour_offset,
            entry,
        ));
    }

    Ok(predictions)
}

#[expect(clippy::too_many_arguments)]
fn predict_hour(
    config: &AppConfig,
    params: &AdaptiveParams,
    engine: &LearningEngine,
    confidence: f64,
    current_room_temp: f64,
    current_outlet_temp: f64,
    hour_offset: usize,
    entry: &ForecastEntry,
) -> HourlyPrediction {
    let house = &config.house;
    let hour = entry.timestamp.hour();

    let outside_temp = entry.temperature.unwrap_or(0.0);
    let humidity = entry.humidity.unwrap_or(50.0);
    let wind_speed = entry.wind_speed.unwrap_or(0.0);
    let cloud_cover = entry.clouds.unwrap_or(0.0);

    let comfort_target =
        physical::comfort_target(hour, house.target_temperature, house.night_setback);

    let impact = physical::weather_impact(
        hour,
        outside_temp,
        wind_speed,
        cloud_cover,
        humidity,
        params.solar_gain_factor,
        params.wind_factor,
    );

    // Heuristic demand, corrected by the energy model once it is trained.
    let physical_demand = physical::heat_demand(
        comfort_target,
        outside_temp,
        &impact,
        house.building_thermal_mass,
        house.heating_system_type,
    );
    let demand_conditions = SampleConditions {
        outside_temp: Some(outside_temp),
        humidity: Some(humidity),
        wind_speed: Some(wind_speed),
        cloud_cover: Some(cloud_cover),
        room_temp: None,
        target_temp: Some(comfort_target),
        hour_of_day: hour,
        day_of_week: entry.timestamp.weekday().num_days_from_monday(),
        month: entry.timestamp.month(),
        building_mass: house.building_thermal_mass,
    };
    let heat_demand = match engine.predict_energy_consumption(&demand_conditions) {
        Some(learned) => blend(physical_demand, learned, confidence).max(0.0),
        None => physical_demand,
    };

    // COP: Carnot-based estimate corrected by the COP model.
    let physical_cop = physical::expected_cop(outside_temp, current_outlet_temp);
    let cop_conditions = SampleConditions {
        room_temp: Some(current_room_temp),
        target_temp: Some(current_room_temp + 1.0),
        ..demand_conditions
    };
    let predicted_cop = match engine.predict_cop(&cop_conditions) {
        Some(learned) => blend(physical_cop, learned, confidence),
        None => physical_cop,
    }
    .clamp(1.0, 6.0);

    let thermal_lag_hours = engine.thermal_lag(
        config.advanced.thermal_lag_hours,
        house.building_thermal_mass,
        house.heating_system_type,
    );

    HourlyPrediction {
        hour_offset,
        forecast_time: entry.timestamp,
        outside_temp,
        comfort_target,
        weather_impact: impact,
        heat_demand,
        predicted_room_temp: physical::room_temp_response(
            current_room_temp,
            heat_demand,
            thermal_lag_hours,
        ),
        predicted_energy: heat_demand * 1.2,
        predicted_cop,
        thermal_lag_hours,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn forecast_entry(hour: u32, temperature: f64) -> ForecastEntry {
        let timestamp = Utc
            .with_ymd_and_hms(2025, 1, 15, hour, 0, 0)
            .unwrap();
        ForecastEntry::new(timestamp, temperature, 60.0, 3.0, 40.0)
    }

    fn status_at(room: f64) -> CurrentStatus {
        CurrentStatus {
            temperatures: thermion_types::Temperatures {
                room: Some(room),
                target: Some(21.0),
                outlet: Some(35.0),
                inlet: Some(30.0),
                outside: Some(5.0),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_forecast_is_an_error() {
        let config = AppConfig::default();
        let params = AdaptiveParams::from_config(&config);
        let engine = LearningEngine::default();

        let result = predict_horizon(&config, &params, &engine, &status_at(20.0), &[]);
        assert!(matches!(result, Err(CycleError::EmptyForecast)));
    }

    #[test]
    fn test_horizon_length_bounded_by_forecast_and_config() {
        let mut config = AppConfig::default();
        config.advanced.prediction_horizon_hours = 6;
        let params = AdaptiveParams::from_config(&config);
        let engine = LearningEngine::default();

        let forecast: Vec<_> = (0..12).map(|h| forecast_entry(h, 5.0)).collect();
        let predictions =
            predict_horizon(&config, &params, &engine, &status_at(20.0), &forecast).unwrap();
        assert_eq!(predictions.len(), 6);

        let short: Vec<_> = (0..3).map(|h| forecast_entry(h, 5.0)).collect();
        let predictions =
            predict_horizon(&config, &params, &engine, &status_at(20.0), &short).unwrap();
        assert_eq!(predictions.len(), 3);
    }

    #[test]
    fn test_untrained_engine_yields_pure_heuristics() {
        let config = AppConfig::default();
        let params = AdaptiveParams::from_config(&config);
        let engine = LearningEngine::default();

        let forecast = vec![forecast_entry(12, 5.0)];
        let predictions =
            predict_horizon(&config, &params, &engine, &status_at(20.0), &forecast).unwrap();
        let prediction = &predictions[0];

        // With no trained models the outputs equal the physical formulas.
        let impact = physical::weather_impact(12, 5.0, 3.0, 40.0, 60.0, 0.3, 0.1);
        let expected_demand = physical::heat_demand(
            21.0,
            5.0,
            &impact,
            config.house.building_thermal_mass,
            config.house.heating_system_type,
        );
        assert!((prediction.heat_demand - expected_demand).abs() < 1e-12);
        assert!((prediction.predicted_energy - expected_demand * 1.2).abs() < 1e-12);

        let expected_cop = physical::expected_cop(5.0, 35.0);
        assert!((prediction.predicted_cop - expected_cop).abs() < 1e-12);
    }

    #[test]
    fn test_night_hours_use_setback_target() {
        let config = AppConfig::default();
        let params = AdaptiveParams::from_config(&config);
        let engine = LearningEngine::default();

        let forecast = vec![forecast_entry(23, 5.0)];
        let predictions =
            predict_horizon(&config, &params, &engine, &status_at(20.0), &forecast).unwrap();
        assert_eq!(predictions[0].comfort_target, 19.0);
        assert_eq!(predictions[0].weather_impact.solar_gain, 0.0);
    }

    #[test]
    fn test_cop_clamped_after_blend() {
        let config = AppConfig::default();
        let params = AdaptiveParams::from_config(&config);
        let engine = LearningEngine::default();

        let forecast = vec![forecast_entry(12, 25.0)];
        let status = CurrentStatus {
            temperatures: thermion_types::Temperatures {
                room: Some(22.0),
                outlet: Some(20.0), // outlet below outside: heuristic ceiling
                ..Default::default()
            },
            ..Default::default()
        };
        let predictions = predict_horizon(&config, &params, &engine, &status, &forecast).unwrap();
        assert!((1.0..=6.0).contains(&predictions[0].predicted_cop));
    }

    #[test]
    fn test_adaptive_params_hold_until_confident() {
        let config = AppConfig::default();
        let mut params = AdaptiveParams::from_config(&config);
        let engine = LearningEngine::default();

        assert!(!params.update_from_learning(&config, &engine));
        assert_eq!(params.solar_gain_factor, config.advanced.solar_gain_factor);
        assert_eq!(params.wind_factor, config.advanced.wind_factor);
        assert_eq!(
            params.thermal_lag_hours,
            config.advanced.thermal_lag_hours
        );
    }

    #[test]
    fn test_adaptive_params_follow_recommendations_when_confident() {
        use crate::history::Observation;
        use chrono::Duration;
        use thermion_types::HeatingSystem;

        let config = AppConfig::default();
        let mut params = AdaptiveParams::from_config(&config);

        // Low threshold so the data-volume factor alone clears the gate.
        let mut engine = LearningEngine::new(10);
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        for i in 0..60i64 {
            let timestamp = base + Duration::hours(i);
            engine.record(Observation {
                timestamp,
                outside_temp: 5.0,
                humidity: 60.0,
                wind_speed: 3.0,
                cloud_cover: 40.0,
                // Room follows the swinging setpoint closely: fast building.
                room_temp: if i % 2 == 0 { 19.9 } else { 21.9 },
                target_temp: if i % 2 == 0 { 20.0 } else { 22.0 },
                outlet_temp: Some(33.0),
                inlet_temp: Some(29.0),
                pump_freq: Some(40.0),
                compressor_freq: Some(35.0),
                energy_consumption: Some(900.0),
                energy_production: Some(3000.0),
                cop: Some(3.3),
                hour_of_day: (i % 24) as u32,
                day_of_week: 0,
                month: 1,
                building_mass: 2.0,
                heating_system_type: HeatingSystem::Underfloor,
            });
        }

        assert!(params.update_from_learning(&config, &engine));
        assert!(
            (params.thermal_lag_hours - config.advanced.thermal_lag_hours * 0.8).abs() < 1e-9
        );
    }
}
