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

//! Age-bounded observation log feeding the learning engine.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thermion_types::{CurrentStatus, ForecastEntry, HeatingSystem, HouseConfig};

use crate::features::FeatureVector;

/// Default observation retention window.
pub const MAX_DATA_AGE_DAYS: i64 = 365;

/// One realized control-cycle outcome.
///
/// Created once per cycle, never mutated afterwards, evicted when it ages
/// out of the retention window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,

    // Environment at cycle time (fallbacks applied at creation)
    pub outside_temp: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub cloud_cover: f64,

    // Heat pump temperatures
    pub room_temp: f64,
    pub target_temp: f64,
    pub outlet_temp: Option<f64>,
    pub inlet_temp: Option<f64>,

    // Operational readings
    pub pump_freq: Option<f64>,
    pub compressor_freq: Option<f64>,
    pub energy_consumption: Option<f64>,
    pub energy_production: Option<f64>,
    pub cop: Option<f64>,

    // Calendar features
    pub hour_of_day: u32,
    pub day_of_week: u32,
    pub month: u32,

    /// Numeric building-mass encoding (see [`crate::features`]).
    pub building_mass: f64,
    pub heating_system_type: HeatingSystem,
}

impl Observation {
    /// Assemble an observation from the cycle inputs. Weather comes from the
    /// first forecast entry (the current hour); absent readings fall back to
    /// the encoder defaults so creation never fails.
    pub fn from_cycle(
        timestamp: DateTime<Utc>,
        status: &CurrentStatus,
        forecast: &[ForecastEntry],
        house: &HouseConfig,
    ) -> Self {
        let weather = forecast.first();

        Self {
            timestamp,
            outside_temp: weather.and_then(|w| w.temperature).unwrap_or(0.0),
            humidity: weather.and_then(|w| w.humidity).unwrap_or(50.0),
            wind_speed: weather.and_then(|w| w.wind_speed).unwrap_or(0.0),
            cloud_cover: weather.and_then(|w| w.clouds).unwrap_or(0.0),
            room_temp: status.temperatures.room.unwrap_or(20.0),
            target_temp: status.temperatures.target.unwrap_or(21.0),
            outlet_temp: status.temperatures.outlet,
            inlet_temp: status.temperatures.inlet,
            pump_freq: status.system.pump_frequency,
            compressor_freq: status.system.compressor_frequency,
            energy_consumption: status.system.energy_consumption,
            energy_production: status.system.energy_production,
            cop: status.system.cop,
            hour_of_day: timestamp.hour(),
            day_of_week: timestamp.weekday().num_days_from_monday(),
            month: timestamp.month(),
            building_mass: house.building_thermal_mass.feature_code(),
            heating_system_type: house.heating_system_type,
        }
    }

    /// Feature vector for this observation, in the fixed model layout.
    pub fn features(&self) -> FeatureVector {
        FeatureVector([
            self.outside_temp,
            self.humidity,
            self.wind_speed,
            self.cloud_cover,
            self.room_temp,
            self.target_temp,
            f64::from(self.hour_of_day),
            f64::from(self.day_of_week),
            f64::from(self.month),
            self.building_mass,
        ])
    }
}

/// Append-only, age-bounded observation log.
///
/// Appended once per control cycle; storage order therefore carries
/// non-decreasing timestamps. Entries older than the retention window are
/// evicted on every append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationLog {
    observations: VecDeque<Observation>,
    max_age_days: i64,
}

impl Default for ObservationLog {
    fn default() -> Self {
        Self::new(MAX_DATA_AGE_DAYS)
    }
}

impl ObservationLog {
    pub fn new(max_age_days: i64) -> Self {
        Self {
            observations: VecDeque::new(),
            max_age_days,
        }
    }

    /// Append a new observation and evict everything older than the
    /// retention window relative to its timestamp.
    pub fn append(&mut self, observation: Observation) {
        let cutoff = observation.timestamp - Duration::days(self.max_age_days);
        self.observations.push_back(observation);
        while let Some(front) = self.observations.front() {
            if front.timestamp > cutoff {
                break;
            }
            self.observations.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }

    /// Snapshot of the retained window, oldest first. Used to hand a
    /// training job to the background trainer.
    pub fn snapshot(&self) -> Vec<Observation> {
        self.observations.iter().cloned().collect()
    }

    /// Replace the contents wholesale (used when loading persisted data).
    pub fn replace(&mut self, observations: Vec<Observation>) {
        self.observations = observations.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn observation_at(timestamp: DateTime<Utc>) -> Observation {
        Observation {
            timestamp,
            outside_temp: 5.0,
            humidity: 60.0,
            wind_speed: 2.0,
            cloud_cover: 40.0,
            room_temp: 20.5,
            target_temp: 21.0,
            outlet_temp: Some(35.0),
            inlet_temp: Some(30.0),
            pump_freq: Some(40.0),
            compressor_freq: Some(35.0),
            energy_consumption: Some(900.0),
            energy_production: Some(3100.0),
            cop: Some(3.4),
            hour_of_day: timestamp.hour(),
            day_of_week: timestamp.weekday().num_days_from_monday(),
            month: timestamp.month(),
            building_mass: 2.0,
            heating_system_type: HeatingSystem::Underfloor,
        }
    }

    #[test]
    fn test_append_keeps_order() {
        let mut log = ObservationLog::default();
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        for i in 0..5 {
            log.append(observation_at(base + Duration::hours(i)));
        }

        let timestamps: Vec<_> = log.iter().map(|o| o.timestamp).collect();
        let mut sorted = timestamps.clone();
        sorted.sort();
        assert_eq!(timestamps, sorted);
        assert_eq!(log.len(), 5);
    }

    #[test]
    fn test_append_evicts_stale_entries() {
        let mut log = ObservationLog::new(30);
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();

        log.append(observation_at(base));
        log.append(observation_at(base + Duration::days(20)));
        log.append(observation_at(base + Duration::days(45)));

        // First entry is more than 30 days older than the newest.
        assert_eq!(log.len(), 2);
        assert_eq!(
            log.iter().next().unwrap().timestamp,
            base + Duration::days(20)
        );
    }

    #[test]
    fn test_from_cycle_applies_fallbacks() {
        let timestamp = Utc.with_ymd_and_hms(2025, 3, 10, 14, 0, 0).unwrap();
        let obs = Observation::from_cycle(
            timestamp,
            &CurrentStatus::default(),
            &[],
            &HouseConfig::default(),
        );

        assert_eq!(obs.outside_temp, 0.0);
        assert_eq!(obs.humidity, 50.0);
        assert_eq!(obs.room_temp, 20.0);
        assert_eq!(obs.target_temp, 21.0);
        assert_eq!(obs.outlet_temp, None);
        assert_eq!(obs.hour_of_day, 14);
        assert_eq!(obs.month, 3);
    }

    #[test]
    fn test_features_match_fixed_layout() {
        let timestamp = Utc.with_ymd_and_hms(2025, 1, 6, 8, 0, 0).unwrap(); // a Monday
        let obs = observation_at(timestamp);
        let features = obs.features();

        assert_eq!(
            features.as_slice(),
            &[5.0, 60.0, 2.0, 40.0, 20.5, 21.0, 8.0, 0.0, 1.0, 2.0]
        );
    }
}
