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

//! Learned correction models and the confidence machinery around them.
//!
//! Three independent regression targets, each owned by the model registry
//! and replaced wholesale on retrain. A query against an untrained target
//! returns `None` — callers must be able to tell "no signal" from
//! "legitimately zero".

mod estimator;

pub use estimator::{FeatureScaler, MIN_FIT_ROWS, ModelAccuracy, RidgeRegressor, TrainedModel};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::features::{FeatureVector, SampleConditions};
use crate::history::{Observation, ObservationLog};
use thermion_types::{BuildingMass, HeatingSystem};

/// Observations required before any learned output is trusted at all.
pub const MIN_SAMPLES_FOR_LEARNING: usize = 100;

/// Observations required before the learned thermal-lag factor applies.
const MIN_SAMPLES_FOR_LAG_LEARNING: usize = 50;

/// Rows a COP fit needs after dropping non-positive values.
const MIN_COP_ROWS: usize = 10;

/// Blend a heuristic and a learned estimate by confidence.
///
/// Exact at the extremes: confidence 0 returns the heuristic unchanged,
/// confidence 1 the learned value unchanged. Confidence is clamped to
/// `[0, 1]` first.
pub fn blend(heuristic: f64, learned: f64, confidence: f64) -> f64 {
    let confidence = confidence.clamp(0.0, 1.0);
    heuristic * (1.0 - confidence) + learned * confidence
}

/// The three regression targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionTarget {
    TemperatureResponse,
    EnergyConsumption,
    CopPrediction,
}

impl PredictionTarget {
    pub const ALL: [PredictionTarget; 3] = [
        Self::TemperatureResponse,
        Self::EnergyConsumption,
        Self::CopPrediction,
    ];

    /// Stable key used in logs and the persisted accuracy map.
    pub fn key(&self) -> &'static str {
        match self {
            Self::TemperatureResponse => "temperature_response",
            Self::EnergyConsumption => "energy_consumption",
            Self::CopPrediction => "cop_prediction",
        }
    }

    /// Inverse of [`Self::key`]; unknown keys (from a newer or older data
    /// file) are ignored by the caller.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "temperature_response" => Some(Self::TemperatureResponse),
            "energy_consumption" => Some(Self::EnergyConsumption),
            "cop_prediction" => Some(Self::CopPrediction),
            _ => None,
        }
    }
}

/// Registry of trained models, keyed by prediction target.
///
/// One generation is installed at a time; retraining builds a complete new
/// registry off the control thread and swaps it in, so prediction never
/// observes a half-fitted state.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<PredictionTarget, TrainedModel>,
}

impl ModelRegistry {
    /// Fit a new generation on the full retained window.
    ///
    /// Targets that cannot be fitted (all values missing, too few usable
    /// rows, degenerate system) carry the previous generation's model over
    /// unchanged — a failed retrain is never a destructive replace.
    pub fn train_all(
        observations: &[Observation],
        previous: &ModelRegistry,
        trained_at: DateTime<Utc>,
    ) -> ModelRegistry {
        if observations.len() < MIN_SAMPLES_FOR_LEARNING {
            return previous.clone();
        }

        let features: Vec<FeatureVector> = observations.iter().map(Observation::features).collect();
        let mut registry = ModelRegistry::default();

        for target in PredictionTarget::ALL {
            let fitted = match target {
                PredictionTarget::TemperatureResponse => Self::fit_target(
                    &features,
                    &forward_fill(observations.iter().map(|o| o.outlet_temp)),
                    trained_at,
                ),
                PredictionTarget::EnergyConsumption => Self::fit_target(
                    &features,
                    &forward_fill(observations.iter().map(|o| o.energy_consumption)),
                    trained_at,
                ),
                PredictionTarget::CopPrediction => {
                    Self::fit_cop(&features, observations, trained_at)
                }
            };

            match fitted {
                Some(model) => {
                    debug!(
                        "Trained {} model: mae={:.3} over {} samples",
                        target.key(),
                        model.accuracy.mae,
                        model.accuracy.samples
                    );
                    registry.models.insert(target, model);
                }
                None => {
                    if let Some(kept) = previous.models.get(&target) {
                        warn!(
                            "Retrain skipped for {}, keeping previous generation \
                             (mae={:.3}, {} samples)",
                            target.key(),
                            kept.accuracy.mae,
                            kept.accuracy.samples
                        );
                        registry.models.insert(target, kept.clone());
                    }
                }
            }
        }

        registry
    }

    fn fit_target(
        features: &[FeatureVector],
        targets: &[Option<f64>],
        trained_at: DateTime<Utc>,
    ) -> Option<TrainedModel> {
        let mut rows = Vec::new();
        let mut values = Vec::new();
        for (feature, value) in features.iter().zip(targets) {
            if let Some(value) = value {
                rows.push(*feature);
                values.push(*value);
            }
        }
        TrainedModel::fit(&rows, &values, trained_at)
    }

    /// COP regression additionally drops rows with non-positive COP; those
    /// are sensor glitches, not efficiency signals.
    fn fit_cop(
        features: &[FeatureVector],
        observations: &[Observation],
        trained_at: DateTime<Utc>,
    ) -> Option<TrainedModel> {
        let filled = forward_fill(observations.iter().map(|o| o.cop));
        let mut rows = Vec::new();
        let mut values = Vec::new();
        for (feature, value) in features.iter().zip(&filled) {
            if let Some(value) = value
                && *value > 0.0
            {
                rows.push(*feature);
                values.push(*value);
            }
        }
        if values.len() <= MIN_COP_ROWS {
            return None;
        }
        TrainedModel::fit(&rows, &values, trained_at)
    }

    /// Predict for a target. `None` whenever that target is untrained.
    pub fn predict(&self, target: PredictionTarget, features: &FeatureVector) -> Option<f64> {
        self.models.get(&target).map(|m| m.predict(features))
    }

    pub fn accuracy(&self, target: PredictionTarget) -> Option<&ModelAccuracy> {
        self.models.get(&target).map(|m| &m.accuracy)
    }

    /// Accuracy metadata keyed by target name, for persistence.
    pub fn accuracy_map(&self) -> HashMap<String, ModelAccuracy> {
        self.models
            .iter()
            .map(|(target, model)| (target.key().to_string(), model.accuracy.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Parameter adjustments recommended by the adaptation analysis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AdaptationRecommendations {
    pub thermal_lag_adjustment: f64,
    pub solar_gain_adjustment: f64,
    pub wind_factor_adjustment: f64,
    pub confidence: f64,
    pub data_points: usize,
}

impl AdaptationRecommendations {
    fn neutral(confidence: f64, data_points: usize) -> Self {
        Self {
            thermal_lag_adjustment: 1.0,
            solar_gain_adjustment: 1.0,
            wind_factor_adjustment: 1.0,
            confidence,
            data_points,
        }
    }
}

/// Outcome of appending one observation.
#[derive(Debug, Clone, Copy)]
pub struct AppendOutcome {
    pub total_samples: usize,

    /// The retained window is large enough to (re)train on.
    pub retrain_due: bool,

    /// Every 10th appended observation triggers a persistence flush.
    pub save_due: bool,
}

/// Owns the observation log, the installed model generation, and the
/// accuracy metadata that survives restarts.
///
/// Accuracy lives outside the registry because the data file persists
/// metadata only: after a reload the models are gone until the first
/// retrain, but confidence must come out the same as before shutdown.
#[derive(Debug)]
pub struct LearningEngine {
    log: ObservationLog,
    registry: ModelRegistry,
    accuracy: HashMap<PredictionTarget, ModelAccuracy>,
    min_samples: usize,
}

impl Default for LearningEngine {
    fn default() -> Self {
        Self::new(MIN_SAMPLES_FOR_LEARNING)
    }
}

impl LearningEngine {
    pub fn new(min_samples: usize) -> Self {
        Self {
            log: ObservationLog::default(),
            registry: ModelRegistry::default(),
            accuracy: HashMap::new(),
            min_samples,
        }
    }

    pub fn observations(&self) -> &ObservationLog {
        &self.log
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    /// Accuracy metadata keyed by target name, for persistence.
    pub fn accuracy_map(&self) -> HashMap<String, ModelAccuracy> {
        self.accuracy
            .iter()
            .map(|(target, accuracy)| (target.key().to_string(), accuracy.clone()))
            .collect()
    }

    /// Restore the retained window and accuracy metadata from persisted
    /// data (startup load). Unknown accuracy keys are dropped.
    pub fn restore(
        &mut self,
        observations: Vec<Observation>,
        accuracy: HashMap<String, ModelAccuracy>,
    ) {
        self.log.replace(observations);
        self.accuracy = accuracy
            .into_iter()
            .filter_map(|(key, value)| PredictionTarget::from_key(&key).map(|t| (t, value)))
            .collect();
    }

    /// Install a freshly trained model generation and adopt its accuracy
    /// records.
    pub fn install_registry(&mut self, registry: ModelRegistry) {
        for target in PredictionTarget::ALL {
            if let Some(accuracy) = registry.accuracy(target) {
                self.accuracy.insert(target, accuracy.clone());
            }
        }
        self.registry = registry;
    }

    /// Append one realized observation and report what follow-up work the
    /// append makes due.
    pub fn record(&mut self, observation: Observation) -> AppendOutcome {
        self.log.append(observation);
        let total = self.log.len();
        AppendOutcome {
            total_samples: total,
            retrain_due: total >= self.min_samples,
            save_due: total % 10 == 0,
        }
    }

    pub fn predict_temperature_response(&self, conditions: &SampleConditions) -> Option<f64> {
        self.registry
            .predict(PredictionTarget::TemperatureResponse, &conditions.encode())
    }

    pub fn predict_energy_consumption(&self, conditions: &SampleConditions) -> Option<f64> {
        self.registry
            .predict(PredictionTarget::EnergyConsumption, &conditions.encode())
    }

    pub fn predict_cop(&self, conditions: &SampleConditions) -> Option<f64> {
        self.registry
            .predict(PredictionTarget::CopPrediction, &conditions.encode())
    }

    /// Overall confidence in the learned outputs, `[0, 1]`.
    ///
    /// Unconditionally 0.0 below the minimum sample count; otherwise the
    /// mean of a data-volume factor and one accuracy factor per trained
    /// model.
    pub fn confidence(&self) -> f64 {
        let samples = self.log.len();
        if samples < self.min_samples {
            return 0.0;
        }

        let mut factors = vec![(samples as f64 / (self.min_samples * 3) as f64).min(1.0)];
        for target in PredictionTarget::ALL {
            if let Some(accuracy) = self.accuracy.get(&target) {
                factors.push((1.0 - accuracy.mae / 10.0).max(0.0));
            }
        }

        factors.iter().sum::<f64>() / factors.len() as f64
    }

    /// Effective thermal lag for the given building, including the learned
    /// response factor once enough history exists. Clamped to
    /// `[0.5, 12.0]` hours by the physical model.
    pub fn thermal_lag(&self, base_lag_hours: f64, mass: BuildingMass, system: HeatingSystem) -> f64 {
        let learned = (self.log.len() > MIN_SAMPLES_FOR_LAG_LEARNING)
            .then(|| self.learned_lag_factor());
        crate::physical::thermal_lag(base_lag_hours, mass, system, learned)
    }

    /// Three-band discretization of how strongly room temperature follows
    /// target changes: strong correlation means a fast-responding building.
    fn learned_lag_factor(&self) -> f64 {
        let observations: Vec<&Observation> = self.log.iter().collect();
        if observations.len() < 20 {
            return 1.0;
        }

        let target_deltas: Vec<f64> = observations
            .windows(2)
            .map(|w| w[1].target_temp - w[0].target_temp)
            .collect();
        let room_deltas: Vec<f64> = observations
            .windows(2)
            .map(|w| w[1].room_temp - w[0].room_temp)
            .collect();

        match pearson_correlation(&target_deltas, &room_deltas) {
            Some(correlation) if correlation > 0.7 => 0.8,
            Some(correlation) if correlation > 0.5 => 1.0,
            _ => 1.3,
        }
    }

    /// Recommendations for the slow outer parameter loop.
    ///
    /// Neutral (all 1.0) until 50 observations exist; the caller gates the
    /// actual parameter update on confidence separately.
    pub fn adaptation_recommendations(&self) -> AdaptationRecommendations {
        let confidence = self.confidence();
        let data_points = self.log.len();

        if data_points < MIN_SAMPLES_FOR_LAG_LEARNING {
            return AdaptationRecommendations::neutral(confidence, data_points);
        }

        let mut recommendations = AdaptationRecommendations::neutral(confidence, data_points);
        recommendations.thermal_lag_adjustment = self.temperature_responsiveness();

        let (solar, wind) = self.weather_impact_adjustments();
        recommendations.solar_gain_adjustment = solar;
        recommendations.wind_factor_adjustment = wind;

        recommendations
    }

    /// Ratio of realized room-temperature movement to commanded target
    /// movement over significant setpoint changes (> 0.5 °C), discretized
    /// into the same three bands as the lag factor.
    fn temperature_responsiveness(&self) -> f64 {
        let observations: Vec<&Observation> = self.log.iter().collect();

        let mut target_changes = Vec::new();
        let mut room_changes = Vec::new();
        for pair in observations.windows(2) {
            let target_change = (pair[1].target_temp - pair[0].target_temp).abs();
            if target_change > 0.5 {
                target_changes.push(target_change);
                room_changes.push((pair[1].room_temp - pair[0].room_temp).abs());
            }
        }

        if target_changes.len() < 5 {
            return 1.0;
        }

        let mean_target = target_changes.iter().sum::<f64>() / target_changes.len() as f64;
        let mean_room = room_changes.iter().sum::<f64>() / room_changes.len() as f64;
        let response_ratio = mean_room / mean_target;

        if response_ratio > 0.8 {
            0.8
        } else if response_ratio > 0.5 {
            1.0
        } else {
            1.3
        }
    }

    /// Correlation of cloud cover / wind speed against energy consumption.
    /// Only correlations with |r| > 0.3 move the factors.
    fn weather_impact_adjustments(&self) -> (f64, f64) {
        let mut clouds = Vec::new();
        let mut winds = Vec::new();
        let mut energy = Vec::new();
        for observation in self.log.iter() {
            if let Some(consumption) = observation.energy_consumption {
                clouds.push(observation.cloud_cover);
                winds.push(observation.wind_speed);
                energy.push(consumption);
            }
        }

        if energy.len() < 30 {
            return (1.0, 1.0);
        }

        let solar = match pearson_correlation(&clouds, &energy) {
            Some(correlation) if correlation.abs() > 0.3 => 1.0 + correlation * 0.5,
            _ => 1.0,
        };
        let wind = match pearson_correlation(&winds, &energy) {
            Some(correlation) if correlation.abs() > 0.3 => 1.0 + correlation * 0.3,
            _ => 1.0,
        };

        (solar, wind)
    }
}

/// Forward-fill gaps with the last seen value; leading gaps stay `None`.
fn forward_fill(values: impl Iterator<Item = Option<f64>>) -> Vec<Option<f64>> {
    let mut last = None;
    values
        .map(|value| {
            if value.is_some() {
                last = value;
            }
            last
        })
        .collect()
}

/// Pearson correlation coefficient; `None` when either series is constant
/// or too short.
fn pearson_correlation(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }

    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for i in 0..n {
        let dx = xs[i] - mean_x;
        let dy = ys[i] - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x < 1e-12 || var_y < 1e-12 {
        return None;
    }

    Some(covariance / (var_x.sqrt() * var_y.sqrt()))
}
