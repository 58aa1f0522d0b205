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

//! One synchronous control cycle, end to end.
//!
//! Kept free of ECS and channel plumbing so the whole pipeline can be
//! exercised directly in tests; the systems layer only feeds it inputs and
//! routes its outputs.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::decision;
use crate::history::Observation;
use crate::learning::LearningEngine;
use crate::prediction::{self, AdaptiveParams, AlgorithmStatus, HourlyPrediction};
use thermion_types::{AppConfig, ControlDecision, CurrentStatus, CycleError, ForecastEntry};

/// Everything one successful cycle produced.
#[derive(Debug)]
pub struct CycleOutcome {
    pub decision: ControlDecision,
    pub predictions: Vec<HourlyPrediction>,

    /// True when the retained window is big enough to (re)train on.
    pub retrain_due: bool,

    /// True when this append crossed a persistence checkpoint.
    pub save_due: bool,
}

/// Run one control cycle: predict the horizon, decide, update the adaptive
/// parameters, and record the realized observation.
///
/// Any error degrades the cycle to "no action" at the caller; the engine
/// state is only mutated after the fallible stages have succeeded.
pub fn run_cycle(
    now: DateTime<Utc>,
    config: &AppConfig,
    params: &mut AdaptiveParams,
    engine: &mut LearningEngine,
    status: &CurrentStatus,
    forecast: &[ForecastEntry],
) -> Result<CycleOutcome, CycleError> {
    let predictions = prediction::predict_horizon(config, params, engine, status, forecast)?;

    let thermal_lag_hours = engine.thermal_lag(
        config.advanced.thermal_lag_hours,
        config.house.building_thermal_mass,
        config.house.heating_system_type,
    );

    let decision = decision::decide(now, status, &predictions, thermal_lag_hours, engine.confidence());

    // Slow outer loop: only moves parameters at high confidence.
    params.update_from_learning(config, engine);

    let observation = Observation::from_cycle(now, status, forecast, &config.house);
    let outcome = engine.record(observation);

    debug!(
        "Cycle complete: action_needed={}, {} predictions, {} samples retained",
        decision.action_needed,
        predictions.len(),
        outcome.total_samples
    );

    Ok(CycleOutcome {
        decision,
        predictions,
        retrain_due: outcome.retrain_due,
        save_due: outcome.save_due,
    })
}

/// Snapshot of the engine tuning for the debug-level status report.
pub fn algorithm_status(
    config: &AppConfig,
    params: &AdaptiveParams,
    engine: &LearningEngine,
) -> AlgorithmStatus {
    AlgorithmStatus {
        params: *params,
        prediction_horizon_hours: config.advanced.prediction_horizon_hours,
        learning_confidence: engine.confidence(),
        historical_data_points: engine.observations().len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use thermion_types::{ForecastEntry, Temperatures};

    fn forecast(hours: usize) -> Vec<ForecastEntry> {
        let base = Utc.with_ymd_and_hms(2025, 1, 15, 6, 0, 0).unwrap();
        (0..hours)
            .map(|h| {
                ForecastEntry::new(
                    base + Duration::hours(h as i64),
                    2.0 - (h as f64) * 0.5,
                    65.0,
                    4.0,
                    70.0,
                )
            })
            .collect()
    }

    fn status() -> CurrentStatus {
        CurrentStatus {
            timestamp: Some(Utc::now()),
            temperatures: Temperatures {
                room: Some(19.0),
                target: Some(21.0),
                outlet: Some(34.0),
                inlet: Some(29.0),
                outside: Some(2.0),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_cycle_produces_decision_and_records_observation() {
        let config = AppConfig::default();
        let mut params = AdaptiveParams::from_config(&config);
        let mut engine = LearningEngine::default();
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 6, 0, 0).unwrap();

        let outcome =
            run_cycle(now, &config, &mut params, &mut engine, &status(), &forecast(24)).unwrap();

        assert_eq!(outcome.predictions.len(), 24);
        assert_eq!(engine.observations().len(), 1);
        assert!(!outcome.retrain_due);

        // Room at 19.0 against a 21.0 daytime target: the comfort rule fires.
        assert!(outcome.decision.action_needed);
        let target = outcome.decision.settings.target_temperature.unwrap();
        assert!(target.is_finite());
        assert!((15.0..=30.0).contains(&target));
    }

    #[test]
    fn test_cycle_fails_cleanly_on_empty_forecast() {
        let config = AppConfig::default();
        let mut params = AdaptiveParams::from_config(&config);
        let mut engine = LearningEngine::default();

        let result = run_cycle(Utc::now(), &config, &mut params, &mut engine, &status(), &[]);
        assert!(matches!(result, Err(CycleError::EmptyForecast)));

        // Failed cycles record nothing.
        assert_eq!(engine.observations().len(), 0);
    }

    #[test]
    fn test_save_due_every_tenth_observation() {
        let config = AppConfig::default();
        let mut params = AdaptiveParams::from_config(&config);
        let mut engine = LearningEngine::default();
        let base = Utc.with_ymd_and_hms(2025, 1, 15, 6, 0, 0).unwrap();

        let mut save_points = Vec::new();
        for i in 0..20 {
            let outcome = run_cycle(
                base + Duration::hours(i),
                &config,
                &mut params,
                &mut engine,
                &status(),
                &forecast(4),
            )
            .unwrap();
            if outcome.save_due {
                save_points.push(i + 1);
            }
        }

        assert_eq!(save_points, vec![10, 20]);
    }

    #[test]
    fn test_algorithm_status_reports_tuning() {
        let config = AppConfig::default();
        let params = AdaptiveParams::from_config(&config);
        let engine = LearningEngine::default();

        let status = algorithm_status(&config, &params, &engine);
        assert_eq!(status.prediction_horizon_hours, 24);
        assert_eq!(status.learning_confidence, 0.0);
        assert_eq!(status.historical_data_points, 0);
    }
}
