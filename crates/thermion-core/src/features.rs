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

//! Feature encoding for the regression models.
//!
//! The element order of [`FeatureVector`] is a contract shared by the
//! heuristic formulas and every trained estimator: models are fitted and
//! queried against exactly this layout, so reordering or resizing it
//! invalidates all previously trained models.

use serde::{Deserialize, Serialize};
use thermion_types::BuildingMass;

/// Number of elements in a feature vector.
pub const FEATURE_LEN: usize = 10;

/// Fixed-order numeric encoding of one sample:
/// `[outside_temp, humidity, wind_speed, cloud_cover, room_temp, target_temp,
/// hour_of_day, day_of_week, month, building_mass]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_LEN]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Raw inputs for one feature vector.
///
/// All environmental fields are optional; encoding substitutes fixed
/// fallbacks so a sparse telemetry cache or a thin forecast entry can still
/// be encoded. Encoding never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleConditions {
    pub outside_temp: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub room_temp: Option<f64>,
    pub target_temp: Option<f64>,
    pub hour_of_day: u32,
    pub day_of_week: u32,
    pub month: u32,
    pub building_mass: BuildingMass,
}

impl SampleConditions {
    /// Encode into the fixed feature layout, applying fallbacks for
    /// missing readings.
    pub fn encode(&self) -> FeatureVector {
        FeatureVector([
            self.outside_temp.unwrap_or(0.0),
            self.humidity.unwrap_or(50.0),
            self.wind_speed.unwrap_or(0.0),
            self.cloud_cover.unwrap_or(0.0),
            self.room_temp.unwrap_or(20.0),
            self.target_temp.unwrap_or(21.0),
            f64::from(self.hour_of_day),
            f64::from(self.day_of_week),
            f64::from(self.month),
            self.building_mass.feature_code(),
        ])
    }
}
