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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Temperature readings from the heat pump.
///
/// Every field is optional: the telemetry collaborator caches whatever the
/// pump has published so far, and early in a session most values are absent.
/// Downstream consumers apply fixed fallbacks instead of failing.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Temperatures {
    /// Room thermostat reading (°C).
    pub room: Option<f64>,

    /// Currently requested zone target (°C).
    pub target: Option<f64>,

    /// Water outlet temperature (°C).
    pub outlet: Option<f64>,

    /// Water inlet (return) temperature (°C).
    pub inlet: Option<f64>,

    /// Outdoor unit ambient temperature (°C).
    pub outside: Option<f64>,
}

/// Operational readings from the heat pump.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SystemMetrics {
    /// Water pump frequency (%).
    pub pump_frequency: Option<f64>,

    /// Compressor frequency (Hz).
    pub compressor_frequency: Option<f64>,

    /// Electrical energy drawn (W).
    pub energy_consumption: Option<f64>,

    /// Thermal energy delivered (W).
    pub energy_production: Option<f64>,

    /// Coefficient of performance derived from production/consumption.
    pub cop: Option<f64>,
}

/// Snapshot of heat pump state at the start of a control cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrentStatus {
    /// When the snapshot was assembled.
    pub timestamp: Option<DateTime<Utc>>,

    pub temperatures: Temperatures,

    pub system: SystemMetrics,
}

impl CurrentStatus {
    /// Derive COP from the energy counters when both are present and
    /// consumption is non-zero. Leaves any already-reported COP untouched.
    pub fn with_derived_cop(mut self) -> Self {
        if self.system.cop.is_none()
            && let (Some(consumption), Some(production)) = (
                self.system.energy_consumption,
                self.system.energy_production,
            )
            && consumption > 0.0
        {
            self.system.cop = Some(production / consumption);
        }
        self
    }

    /// Whether the pump is actively moving heat.
    pub fn is_heating_active(&self) -> bool {
        self.system.pump_frequency.is_some_and(|f| f > 0.0)
            || self.system.compressor_frequency.is_some_and(|f| f > 0.0)
    }
}

/// One hour of weather forecast.
///
/// Sequences handed to the engine are ordered by increasing timestamp and
/// contain at least one entry. Fields the provider did not report are `None`;
/// the feature encoder substitutes fixed fallbacks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub timestamp: DateTime<Utc>,

    /// Outside air temperature (°C).
    pub temperature: Option<f64>,

    /// Relative humidity (%).
    pub humidity: Option<f64>,

    /// Wind speed (m/s).
    pub wind_speed: Option<f64>,

    /// Cloud cover (%).
    pub clouds: Option<f64>,
}

impl ForecastEntry {
    /// Fully populated entry, the common case for providers and tests.
    pub fn new(
        timestamp: DateTime<Utc>,
        temperature: f64,
        humidity: f64,
        wind_speed: f64,
        clouds: f64,
    ) -> Self {
        Self {
            timestamp,
            temperature: Some(temperature),
            humidity: Some(humidity),
            wind_speed: Some(wind_speed),
            clouds: Some(clouds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_cop() {
        let status = CurrentStatus {
            system: SystemMetrics {
                energy_consumption: Some(1000.0),
                energy_production: Some(3500.0),
                ..Default::default()
            },
            ..Default::default()
        }
        .with_derived_cop();

        assert_eq!(status.system.cop, Some(3.5));
    }

    #[test]
    fn test_derived_cop_requires_positive_consumption() {
        let status = CurrentStatus {
            system: SystemMetrics {
                energy_consumption: Some(0.0),
                energy_production: Some(3500.0),
                ..Default::default()
            },
            ..Default::default()
        }
        .with_derived_cop();

        assert_eq!(status.system.cop, None);
    }

    #[test]
    fn test_reported_cop_wins_over_derived() {
        let status = CurrentStatus {
            system: SystemMetrics {
                energy_consumption: Some(1000.0),
                energy_production: Some(3500.0),
                cop: Some(4.2),
                ..Default::default()
            },
            ..Default::default()
        }
        .with_derived_cop();

        assert_eq!(status.system.cop, Some(4.2));
    }

    #[test]
    fn test_heating_active() {
        let mut status = CurrentStatus::default();
        assert!(!status.is_heating_active());

        status.system.compressor_frequency = Some(42.0);
        assert!(status.is_heating_active());
    }
}
