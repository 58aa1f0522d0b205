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

//! Simulation adapters.
//!
//! Stand-ins for the real collaborators so the controller runs end-to-end
//! with no broker and no weather API key: a deterministic synthetic
//! forecast and a first-order simulated heat pump that tracks the
//! commanded setpoint.

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

use thermion_core::physical;
use thermion_core::traits::{ForecastSource, SetpointCommander, StatusSource};
use thermion_types::{ControlSettings, CurrentStatus, ForecastEntry, SystemMetrics, Temperatures};

/// Deterministic synthetic weather: mild day warming slightly until early
/// afternoon and cooling after, with small repeating humidity/wind/cloud
/// patterns.
#[derive(Debug, Clone)]
pub struct SyntheticWeatherSource {
    horizon_hours: usize,
}

impl SyntheticWeatherSource {
    pub fn new(horizon_hours: usize) -> Self {
        Self {
            horizon_hours: horizon_hours.max(1),
        }
    }
}

#[async_trait]
impl ForecastSource for SyntheticWeatherSource {
    async fn read_forecast(&self) -> Result<Vec<ForecastEntry>> {
        let now = Utc::now();
        let entries = (0..self.horizon_hours)
            .map(|i| {
                let afternoon_cooling = if i > 12 { (i - 12) as f64 * 0.3 } else { 0.0 };
                ForecastEntry::new(
                    now + Duration::hours(i as i64),
                    8.5 + (i as f64 * 0.2) - afternoon_cooling,
                    65.0 + ((i % 5) as f64 - 2.0) * 5.0,
                    3.2 + (i % 3) as f64 * 0.5,
                    40.0 + (i % 4) as f64 * 10.0,
                )
            })
            .collect();
        Ok(entries)
    }

    fn name(&self) -> &str {
        "synthetic-weather"
    }
}

#[derive(Debug)]
struct PlantState {
    room_temp: f64,
    target_temp: f64,
    outside_temp: f64,
    last_tick: DateTime<Utc>,
}

/// First-order simulated heat pump.
///
/// The room relaxes toward the commanded target with a fixed time constant;
/// outlet temperature and energy flows follow the heating deficit, and COP
/// comes from the same Carnot approximation the predictor uses. Cloning
/// shares the plant, so the same instance serves as both status source and
/// commander.
#[derive(Debug, Clone)]
pub struct SimulatedHeatPump {
    state: Arc<Mutex<PlantState>>,
}

/// Room response time constant (hours).
const ROOM_TIME_CONSTANT_HOURS: f64 = 3.0;

impl SimulatedHeatPump {
    pub fn new(initial_room_temp: f64, initial_target: f64, outside_temp: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(PlantState {
                room_temp: initial_room_temp,
                target_temp: initial_target,
                outside_temp,
                last_tick: Utc::now(),
            })),
        }
    }

    /// Advance the simulation to `now` and return a telemetry snapshot.
    fn tick(&self, now: DateTime<Utc>) -> CurrentStatus {
        let mut state = self.state.lock();

        let dt_hours = (now - state.last_tick).num_milliseconds() as f64 / 3_600_000.0;
        if dt_hours > 0.0 {
            let response = 1.0 - (-dt_hours / ROOM_TIME_CONSTANT_HOURS).exp();
            state.room_temp += (state.target_temp - state.room_temp) * response;
            state.last_tick = now;
        }

        let deficit = (state.target_temp - state.room_temp).max(0.0);
        let heating = deficit > 0.05;

        let outlet = if heating {
            state.room_temp + 12.0 + deficit * 2.0
        } else {
            state.room_temp + 5.0
        };
        let consumption = if heating { 400.0 + deficit * 600.0 } else { 50.0 };
        let cop = physical::expected_cop(state.outside_temp, outlet);

        CurrentStatus {
            timestamp: Some(now),
            temperatures: Temperatures {
                room: Some(state.room_temp),
                target: Some(state.target_temp),
                outlet: Some(outlet),
                inlet: Some(outlet - 5.0),
                outside: Some(state.outside_temp),
            },
            system: SystemMetrics {
                pump_frequency: Some(if heating { 45.0 } else { 0.0 }),
                compressor_frequency: Some(if heating { 40.0 } else { 0.0 }),
                energy_consumption: Some(consumption),
                energy_production: Some(consumption * cop),
                cop: None,
            },
        }
        .with_derived_cop()
    }
}

#[async_trait]
impl StatusSource for SimulatedHeatPump {
    async fn read_status(&self) -> Result<CurrentStatus> {
        Ok(self.tick(Utc::now()))
    }

    fn name(&self) -> &str {
        "simulated-heat-pump"
    }
}

#[async_trait]
impl SetpointCommander for SimulatedHeatPump {
    async fn apply_settings(&self, settings: &ControlSettings) -> Result<()> {
        if let Some(target) = settings.target_temperature {
            if !(15.0..=30.0).contains(&target) {
                bail!("Temperature {target}°C outside valid range (15-30°C)");
            }
            let mut state = self.state.lock();
            state.target_temp = target;
            info!("Set target temperature to {target:.1}°C");
        }

        if let Some(mode) = settings.mode {
            debug!("Set heat pump mode to {mode}");
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "simulated-heat-pump"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_synthetic_forecast_shape() {
        let source = SyntheticWeatherSource::new(24);
        let forecast = source.read_forecast().await.unwrap();

        assert_eq!(forecast.len(), 24);
        for window in forecast.windows(2) {
            assert!(window[0].timestamp < window[1].timestamp);
        }
        assert!(forecast.iter().all(|e| e.temperature.is_some()));
    }

    #[tokio::test]
    async fn test_commander_rejects_out_of_range_target() {
        let pump = SimulatedHeatPump::new(20.0, 21.0, 8.5);
        let settings = ControlSettings {
            target_temperature: Some(35.0),
            mode: None,
        };
        assert!(pump.apply_settings(&settings).await.is_err());
    }

    #[tokio::test]
    async fn test_room_tracks_commanded_target() {
        let pump = SimulatedHeatPump::new(18.0, 18.0, 8.5);
        pump.apply_settings(&ControlSettings {
            target_temperature: Some(22.0),
            mode: None,
        })
        .await
        .unwrap();

        let later = Utc::now() + Duration::hours(2);
        let status = pump.tick(later);

        let room = status.temperatures.room.unwrap();
        assert!(room > 18.0);
        assert!(room < 22.0);
        assert!(status.is_heating_active());
        assert!(status.system.cop.unwrap() > 1.0);
    }

    #[tokio::test]
    async fn test_full_cycle_against_simulated_plant() {
        use thermion_core::prediction::AdaptiveParams;
        use thermion_core::{LearningEngine, run_cycle};
        use thermion_types::AppConfig;

        let config = AppConfig::default();
        let mut params = AdaptiveParams::from_config(&config);
        let mut engine = LearningEngine::default();

        let pump = SimulatedHeatPump::new(18.5, 19.0, 8.5);
        let weather = SyntheticWeatherSource::new(config.advanced.prediction_horizon_hours);

        let status = pump.read_status().await.unwrap();
        let forecast = weather.read_forecast().await.unwrap();

        let outcome = run_cycle(
            Utc::now(),
            &config,
            &mut params,
            &mut engine,
            &status,
            &forecast,
        )
        .unwrap();

        assert_eq!(
            outcome.predictions.len(),
            config.advanced.prediction_horizon_hours
        );
        for prediction in &outcome.predictions {
            assert!(prediction.predicted_room_temp.is_finite());
            assert!((1.0..=6.0).contains(&prediction.predicted_cop));
            assert!(prediction.heat_demand >= 0.0);
        }

        if let Some(target) = outcome.decision.settings.target_temperature {
            assert!((15.0..=30.0).contains(&target));
            assert!(pump
                .apply_settings(&outcome.decision.settings)
                .await
                .is_ok());
        }
    }
}
