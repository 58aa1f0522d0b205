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

//! Control decision engine.
//!
//! Stateless per invocation: takes the current status and the prediction
//! horizon, runs four independent rules in a fixed order, and emits a
//! [`ControlDecision`] with one reasoning entry per rule that fired. Later
//! rules overwrite the proposed target; within the weather rule, wind
//! compensation stacks on top of cold-drop pre-heating.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::prediction::HourlyPrediction;
use thermion_types::{ControlDecision, CurrentStatus};

/// Hours of horizon the proactive and weather rules look across.
const NEAR_HORIZON_HOURS: usize = 6;

/// Hours of horizon the comfort-average and solar rules look across.
const PLANNING_HORIZON_HOURS: usize = 12;

/// Run all decision rules and assemble the cycle's decision.
pub fn decide(
    timestamp: DateTime<Utc>,
    status: &CurrentStatus,
    predictions: &[HourlyPrediction],
    thermal_lag_hours: f64,
    confidence: f64,
) -> ControlDecision {
    let mut decision = ControlDecision::no_action(timestamp, confidence);
    let Some(first) = predictions.first() else {
        return decision;
    };

    let current_temp = status.temperatures.room.unwrap_or(20.0);

    // Rule 1: proactive lead time. Heating has to start one thermal lag
    // ahead of a comfort-target step, or the room will trail it.
    if let Some((target, reason)) =
        proactive_lead_time(predictions, current_temp, thermal_lag_hours)
    {
        apply(&mut decision, target, reason);
    }

    // Rule 2: immediate comfort error at hour 0.
    let temp_error = first.comfort_target - current_temp;
    if temp_error.abs() > 0.5 {
        let target = optimal_target(predictions, thermal_lag_hours);
        apply(
            &mut decision,
            target,
            format!("Temperature error: {temp_error:.1}°C"),
        );
    }

    // Rule 3: back heating off while the sun carries part of the load.
    if let Some((target, reason)) = solar_optimization(predictions) {
        apply(&mut decision, target, reason);
    }

    // Rule 4: pre-adjust for incoming cold or wind.
    if let Some((target, reasons)) = weather_preadjustment(predictions) {
        decision.action_needed = true;
        decision.settings.target_temperature = Some(target);
        decision.reasoning.extend(reasons);
    }

    if decision.action_needed {
        debug!(
            "Decision: target={:?} ({} rules fired)",
            decision.settings.target_temperature,
            decision.reasoning.len()
        );
    }

    decision
}

fn apply(decision: &mut ControlDecision, target: f64, reason: String) {
    decision.action_needed = true;
    decision.settings.target_temperature = Some(target);
    decision.reasoning.push(reason);
}

/// Rule 1: if comfort demand rises within the near horizon by more than
/// 1 °C and is already above the room at the thermal-lag offset, request
/// the upcoming maximum now.
fn proactive_lead_time(
    predictions: &[HourlyPrediction],
    current_temp: f64,
    thermal_lag_hours: f64,
) -> Option<(f64, String)> {
    let near = &predictions[..predictions.len().min(NEAR_HORIZON_HOURS)];
    let max_upcoming_target = near
        .iter()
        .map(|p| p.comfort_target)
        .fold(f64::NEG_INFINITY, f64::max);

    if max_upcoming_target - current_temp <= 1.0 {
        return None;
    }

    let lag_offset = (thermal_lag_hours.round() as usize).min(predictions.len() - 1);
    if predictions[lag_offset].comfort_target <= current_temp + 0.5 {
        return None;
    }

    Some((
        max_upcoming_target,
        format!("Proactive heating for {thermal_lag_hours:.1}h thermal lag"),
    ))
}

/// Rule 2 target: harmonic-decay-weighted average of the next 12 hourly
/// comfort targets, nudged by half the target change at the lag offset,
/// clamped to a sane setpoint range.
fn optimal_target(predictions: &[HourlyPrediction], thermal_lag_hours: f64) -> f64 {
    let window = &predictions[..predictions.len().min(PLANNING_HORIZON_HOURS)];

    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    for (i, prediction) in window.iter().enumerate() {
        let weight = 1.0 / (i as f64 + 1.0);
        weighted_sum += prediction.comfort_target * weight;
        weight_sum += weight;
    }
    let mut optimal = weighted_sum / weight_sum;

    // If demand differs one lag from now, lean half-way toward it already.
    let lag_offset = thermal_lag_hours as usize;
    if lag_offset < predictions.len() {
        let lag_adjustment =
            (predictions[lag_offset].comfort_target - predictions[0].comfort_target) * 0.5;
        optimal += lag_adjustment;
    }

    optimal.clamp(15.0, 30.0)
}

/// Rule 3: when sustained solar gain is forecast, lower the hour-0 target
/// proportionally (capped at 1 °C).
fn solar_optimization(predictions: &[HourlyPrediction]) -> Option<(f64, String)> {
    if predictions.len() < NEAR_HORIZON_HOURS {
        return None;
    }

    let gains: Vec<f64> = predictions[..predictions.len().min(PLANNING_HORIZON_HOURS)]
        .iter()
        .map(|p| p.weather_impact.solar_gain)
        .filter(|gain| *gain > 1.0)
        .collect();

    if gains.is_empty() {
        return None;
    }

    let mean_gain = gains.iter().sum::<f64>() / gains.len() as f64;
    if mean_gain <= 1.5 {
        return None;
    }

    let reduction = (mean_gain * 0.3).min(1.0);
    Some((
        predictions[0].comfort_target - reduction,
        format!("Solar gain optimization: -{reduction:.1}°C"),
    ))
}

/// Rule 4: pre-heat ahead of a forecast cold drop (> 5 °C within five
/// hours) and compensate for peak wind loss; the two add up when both fire.
fn weather_preadjustment(predictions: &[HourlyPrediction]) -> Option<(f64, Vec<String>)> {
    if predictions.len() < 3 {
        return None;
    }

    let mut target = None;
    let mut reasons = Vec::new();

    let current_outside = predictions[0].outside_temp;
    let min_future_temp = predictions[1..predictions.len().min(NEAR_HORIZON_HOURS)]
        .iter()
        .map(|p| p.outside_temp)
        .fold(f64::INFINITY, f64::min);

    let temp_drop = current_outside - min_future_temp;
    if temp_drop > 5.0 {
        let preheat = (temp_drop * 0.2).min(2.0);
        target = Some(predictions[0].comfort_target + preheat);
        reasons.push(format!("Cold weather preparation: +{preheat:.1}°C"));
    }

    let peak_wind_loss = predictions[..predictions.len().min(NEAR_HORIZON_HOURS)]
        .iter()
        .map(|p| p.weather_impact.wind_loss)
        .fold(f64::NEG_INFINITY, f64::max);

    if peak_wind_loss > 1.0 {
        let wind_adjustment = (peak_wind_loss * 0.5).min(1.5);
        target = Some(match target {
            // Stacks on the cold-drop pre-heat
            Some(existing) => existing + wind_adjustment,
            None => predictions[0].comfort_target + wind_adjustment,
        });
        reasons.push(format!("Wind compensation: +{wind_adjustment:.1}°C"));
    }

    target.map(|t| (t, reasons))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physical::WeatherImpact;
    use chrono::{Duration, TimeZone};
    use thermion_types::Temperatures;

    fn prediction(hour_offset: usize, comfort_target: f64, outside_temp: f64) -> HourlyPrediction {
        let base = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap();
        HourlyPrediction {
            hour_offset,
            forecast_time: base + Duration::hours(hour_offset as i64),
            outside_temp,
            comfort_target,
            weather_impact: WeatherImpact {
                humidity_factor: 1.0,
                ..Default::default()
            },
            heat_demand: 2.0,
            predicted_room_temp: 20.0,
            predicted_energy: 2.4,
            predicted_cop: 3.5,
            thermal_lag_hours: 4.0,
        }
    }

    fn status_with_room(room: f64) -> CurrentStatus {
        CurrentStatus {
            temperatures: Temperatures {
                room: Some(room),
                target: Some(21.0),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn flat_horizon(target: f64, hours: usize) -> Vec<HourlyPrediction> {
        (0..hours).map(|h| prediction(h, target, 5.0)).collect()
    }

    #[test]
    fn test_no_action_on_flat_comfortable_horizon() {
        let predictions = flat_horizon(21.0, 12);
        let decision = decide(Utc::now(), &status_with_room(21.0), &predictions, 4.0, 0.0);

        assert!(!decision.action_needed);
        assert!(decision.settings.is_empty());
        assert!(decision.reasoning.is_empty());
    }

    #[test]
    fn test_empty_horizon_is_a_noop() {
        let decision = decide(Utc::now(), &status_with_room(20.0), &[], 4.0, 0.0);
        assert!(!decision.action_needed);
    }

    #[test]
    fn test_proactive_rule_fires_before_comfort_step() {
        // Night setback now, full target in two hours, room still at setback.
        let mut predictions = flat_horizon(21.5, 12);
        predictions[0].comfort_target = 19.0;

        let decision = decide(Utc::now(), &status_with_room(19.0), &predictions, 2.0, 0.0);

        assert!(decision.action_needed);
        assert!(
            decision
                .reasoning
                .iter()
                .any(|r| r.contains("thermal lag")),
            "{:?}",
            decision.reasoning
        );
    }

    #[test]
    fn test_comfort_error_recomputes_weighted_target() {
        let predictions = flat_horizon(21.0, 12);
        let decision = decide(Utc::now(), &status_with_room(19.5), &predictions, 4.0, 0.0);

        assert!(decision.action_needed);
        // Flat targets: the weighted average is the target itself.
        assert_eq!(decision.settings.target_temperature, Some(21.0));
        assert!(decision.reasoning.iter().any(|r| r.contains("error")));
    }

    #[test]
    fn test_optimal_target_clamped() {
        let predictions = flat_horizon(45.0, 12);
        assert_eq!(optimal_target(&predictions, 4.0), 30.0);

        let predictions = flat_horizon(5.0, 12);
        assert_eq!(optimal_target(&predictions, 4.0), 15.0);
    }

    #[test]
    fn test_solar_rule_reduces_target() {
        let mut predictions = flat_horizon(21.0, 12);
        for prediction in predictions.iter_mut().take(8) {
            prediction.weather_impact.solar_gain = 2.0;
        }

        let decision = decide(Utc::now(), &status_with_room(21.0), &predictions, 4.0, 0.0);

        assert!(decision.action_needed);
        // Reduction = min(1.0, 2.0 * 0.3) = 0.6
        assert_eq!(decision.settings.target_temperature, Some(21.0 - 0.6));
        assert!(decision.reasoning.iter().any(|r| r.contains("Solar")));
    }

    #[test]
    fn test_cold_drop_preheats() {
        let mut predictions = flat_horizon(21.0, 12);
        for prediction in predictions.iter_mut().skip(2) {
            prediction.outside_temp = -3.0; // 8 degree drop from 5.0
        }

        let decision = decide(Utc::now(), &status_with_room(21.0), &predictions, 4.0, 0.0);

        assert!(decision.action_needed);
        // Preheat = min(2.0, 8 * 0.2) = 1.6
        let target = decision.settings.target_temperature.unwrap();
        assert!((target - 22.6).abs() < 1e-9);
        assert!(decision.reasoning.iter().any(|r| r.contains("Cold")));
    }

    #[test]
    fn test_wind_compensation_stacks_on_preheat() {
        let mut predictions = flat_horizon(21.0, 12);
        for prediction in predictions.iter_mut().skip(2) {
            prediction.outside_temp = -3.0;
        }
        predictions[3].weather_impact.wind_loss = 2.4;

        let decision = decide(Utc::now(), &status_with_room(21.0), &predictions, 4.0, 0.0);

        // Preheat 1.6 plus wind min(1.5, 2.4*0.5) = 1.2
        let target = decision.settings.target_temperature.unwrap();
        assert!((target - (21.0 + 1.6 + 1.2)).abs() < 1e-9);
        assert_eq!(
            decision
                .reasoning
                .iter()
                .filter(|r| r.contains("Cold") || r.contains("Wind"))
                .count(),
            2
        );
    }

    #[test]
    fn test_wind_compensation_alone() {
        let mut predictions = flat_horizon(21.0, 12);
        predictions[1].weather_impact.wind_loss = 1.8;

        let decision = decide(Utc::now(), &status_with_room(21.0), &predictions, 4.0, 0.0);

        let target = decision.settings.target_temperature.unwrap();
        assert!((target - (21.0 + 0.9)).abs() < 1e-9);
    }

    #[test]
    fn test_later_rules_overwrite_target_but_keep_reasons() {
        // Comfort error fires (rule 2), then solar optimization (rule 3)
        // overwrites the target; both reasons survive.
        let mut predictions = flat_horizon(21.0, 12);
        for prediction in predictions.iter_mut().take(8) {
            prediction.weather_impact.solar_gain = 2.0;
        }

        let decision = decide(Utc::now(), &status_with_room(19.0), &predictions, 4.0, 0.0);

        assert_eq!(decision.settings.target_temperature, Some(20.4));
        assert!(decision.reasoning.len() >= 2);
    }
}
