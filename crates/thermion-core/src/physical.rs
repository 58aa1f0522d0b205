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

//! Deterministic heat-balance heuristics.
//!
//! Pure functions of time, weather and building characteristics. No learned
//! state lives here; the prediction engine blends these values with the
//! regression models' output.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thermion_types::{BuildingMass, HeatingSystem};

/// Daytime comfort window: `[DAY_START_HOUR, DAY_END_HOUR)`.
pub const DAY_START_HOUR: u32 = 6;
pub const DAY_END_HOUR: u32 = 22;

/// Peak solar gain at clear-sky noon (°C equivalent) before scaling.
const MAX_SOLAR_GAIN: f64 = 2.0;

/// Practical efficiency relative to the Carnot limit.
const CARNOT_EFFICIENCY: f64 = 0.45;

/// Weather influence on the building heat balance for one hour.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WeatherImpact {
    /// Passive solar heating (°C equivalent), >= 0.
    pub solar_gain: f64,

    /// Convective loss from wind (°C equivalent), >= 0.
    pub wind_loss: f64,

    /// Perceived-temperature adjustment for humidity, ~1.0.
    pub humidity_factor: f64,

    /// Net impact: `solar_gain - wind_loss`.
    pub total_impact: f64,
}

/// Comfort temperature for a given hour of day.
///
/// Step function: the full target applies in `[6, 22)`, the night setback
/// everywhere else, with transitions exactly at the hour boundaries.
pub fn comfort_target(hour: u32, target_temperature: f64, night_setback: f64) -> f64 {
    if (DAY_START_HOUR..DAY_END_HOUR).contains(&hour) {
        target_temperature
    } else {
        target_temperature - night_setback
    }
}

/// Solar heat gain for a given hour and cloud cover (%).
///
/// Zero outside `[6, 18]`; inside, a sine approximation of solar elevation
/// peaking at noon, reduced by cloud cover (80% attenuation at full cover)
/// and scaled by the configured gain factor.
pub fn solar_gain(hour: u32, cloud_cover: f64, solar_gain_factor: f64) -> f64 {
    if !(6..=18).contains(&hour) {
        return 0.0;
    }

    let solar_elevation = (PI * (f64::from(hour) - 6.0) / 12.0).sin();
    let cloud_reduction = 1.0 - (cloud_cover / 100.0 * 0.8);

    (MAX_SOLAR_GAIN * solar_elevation * cloud_reduction * solar_gain_factor).max(0.0)
}

/// Wind-driven heat loss; fades linearly to zero as the outside
/// temperature approaches 20 °C.
pub fn wind_loss(wind_speed: f64, outside_temp: f64, wind_factor: f64) -> f64 {
    wind_speed * wind_factor * (20.0 - outside_temp).max(0.0) / 20.0
}

/// Perceived-temperature adjustment for humidity (small, centred on 50%).
pub fn humidity_factor(humidity: f64) -> f64 {
    1.0 + (humidity - 50.0) / 500.0
}

/// Full weather impact breakdown for one forecast hour.
pub fn weather_impact(
    hour: u32,
    outside_temp: f64,
    wind_speed: f64,
    cloud_cover: f64,
    humidity: f64,
    solar_gain_factor: f64,
    wind_factor: f64,
) -> WeatherImpact {
    let solar = solar_gain(hour, cloud_cover, solar_gain_factor);
    let wind = wind_loss(wind_speed, outside_temp, wind_factor);

    WeatherImpact {
        solar_gain: solar,
        wind_loss: wind,
        humidity_factor: humidity_factor(humidity),
        total_impact: solar - wind,
    }
}

/// Heuristic heat demand (°C equivalent) for holding `comfort_target`
/// against the given conditions. Floored at zero.
pub fn heat_demand(
    comfort_target: f64,
    outside_temp: f64,
    impact: &WeatherImpact,
    mass: BuildingMass,
    system: HeatingSystem,
) -> f64 {
    let base_demand = ((comfort_target - outside_temp) * 0.5).max(0.0);
    let adjusted_demand = base_demand - impact.total_impact;

    (adjusted_demand * mass.demand_factor() * system.demand_factor()).max(0.0)
}

/// Expected COP from outside and outlet temperatures.
///
/// `outlet <= outside` returns the 6.0 ceiling outright (the Carnot quotient
/// is meaningless there); otherwise a Carnot approximation with a practical
/// efficiency factor, clamped to `[2.0, 6.0]`.
pub fn expected_cop(outside_temp: f64, outlet_temp: f64) -> f64 {
    let temp_diff = outlet_temp - outside_temp;

    if temp_diff <= 0.0 {
        return 6.0;
    }

    let carnot_cop = (outlet_temp + 273.15) / temp_diff;
    (carnot_cop * CARNOT_EFFICIENCY).clamp(2.0, 6.0)
}

/// First-order room temperature response to one hour of heat input.
pub fn room_temp_response(current_room_temp: f64, heat_demand: f64, thermal_lag_hours: f64) -> f64 {
    current_room_temp + heat_demand * 0.5 * (1.0 - (-1.0 / thermal_lag_hours).exp())
}

/// Effective thermal lag: configured base scaled by building mass, emitter
/// type and (when the learning engine has one) a learned response factor.
/// Always clamped to `[0.5, 12.0]` hours.
pub fn thermal_lag(
    base_lag_hours: f64,
    mass: BuildingMass,
    system: HeatingSystem,
    learned_factor: Option<f64>,
) -> f64 {
    let total = base_lag_hours * mass.lag_factor() * system.lag_factor() * learned_factor.unwrap_or(1.0);
    total.clamp(0.5, 12.0)
}
