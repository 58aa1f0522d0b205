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
use std::fmt;

/// Heat pump operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatPumpMode {
    Off,
    Heat,
    Cool,
    Auto,
}

impl HeatPumpMode {
    /// Numeric value understood by the device-control collaborator.
    pub fn to_command_value(&self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Heat => 1,
            Self::Cool => 2,
            Self::Auto => 3,
        }
    }
}

impl fmt::Display for HeatPumpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Off => "off",
            Self::Heat => "heat",
            Self::Cool => "cool",
            Self::Auto => "auto",
        };
        write!(f, "{name}")
    }
}

/// Settings a decision wants applied to the actuator.
///
/// Decision rules fire in sequence and each may set or adjust a field, so the
/// struct is built up incrementally during a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlSettings {
    /// New zone target temperature (°C).
    pub target_temperature: Option<f64>,

    /// Requested operating mode.
    pub mode: Option<HeatPumpMode>,
}

impl ControlSettings {
    /// Whether any setting is present at all.
    pub fn is_empty(&self) -> bool {
        self.target_temperature.is_none() && self.mode.is_none()
    }
}

/// Outcome of one control cycle.
///
/// Created fresh every cycle and handed to the device-control collaborator;
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlDecision {
    /// When the decision was computed.
    pub timestamp: DateTime<Utc>,

    /// True iff at least one decision rule fired.
    pub action_needed: bool,

    /// Settings to apply when `action_needed`.
    pub settings: ControlSettings,

    /// Human-readable audit trail, one entry per rule that fired,
    /// in rule evaluation order.
    pub reasoning: Vec<String>,

    /// Learning confidence at decision time, 0..=1.
    pub confidence: f64,
}

impl ControlDecision {
    /// A no-op decision, used when a cycle degrades on error.
    pub fn no_action(timestamp: DateTime<Utc>, confidence: f64) -> Self {
        Self {
            timestamp,
            action_needed: false,
            settings: ControlSettings::default(),
            reasoning: Vec::new(),
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_command_values() {
        assert_eq!(HeatPumpMode::Off.to_command_value(), 0);
        assert_eq!(HeatPumpMode::Heat.to_command_value(), 1);
        assert_eq!(HeatPumpMode::Cool.to_command_value(), 2);
        assert_eq!(HeatPumpMode::Auto.to_command_value(), 3);
    }

    #[test]
    fn test_no_action_decision_is_empty() {
        let decision = ControlDecision::no_action(Utc::now(), 0.0);
        assert!(!decision.action_needed);
        assert!(decision.settings.is_empty());
        assert!(decision.reasoning.is_empty());
    }
}
