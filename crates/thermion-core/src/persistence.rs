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

//! Persistence layer for learning data.
//!
//! One JSON document holds the retained observation log, per-model accuracy
//! metadata and a configuration snapshot. Loaded once at startup, rewritten
//! every 10th appended observation and at shutdown.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::history::Observation;
use crate::learning::{LearningEngine, ModelAccuracy};
use thermion_types::{AppConfig, BuildingMass, HeatingSystem};

/// Default path for the learning data file.
/// Uses a relative path for portability (works in both dev and addon).
pub const DEFAULT_DATA_PATH: &str = "./data/learning_data.json";

/// Configuration values captured alongside the data, so a later session can
/// tell whether the data was collected under different tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub learning_rate: f64,
    pub thermal_lag_hours: f64,
    pub building_mass: BuildingMass,
    pub heating_system: HeatingSystem,
}

impl ConfigSnapshot {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            learning_rate: config.advanced.learning_rate,
            thermal_lag_hours: config.advanced.thermal_lag_hours,
            building_mass: config.house.building_thermal_mass,
            heating_system: config.house.heating_system_type,
        }
    }
}

/// The persisted learning data document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedLearningData {
    #[serde(default)]
    pub historical_data: Vec<Observation>,

    #[serde(default)]
    pub model_accuracy: HashMap<String, ModelAccuracy>,

    pub config_snapshot: ConfigSnapshot,

    pub saved_at: DateTime<Utc>,
}

impl PersistedLearningData {
    /// Capture the engine's current state for writing.
    pub fn capture(engine: &LearningEngine, config: &AppConfig, saved_at: DateTime<Utc>) -> Self {
        Self {
            historical_data: engine.observations().snapshot(),
            model_accuracy: engine.accuracy_map(),
            config_snapshot: ConfigSnapshot::from_config(config),
            saved_at,
        }
    }
}

/// Learning data persistence manager.
#[derive(Debug, Clone)]
pub struct HistoryPersistence {
    data_path: PathBuf,
}

impl HistoryPersistence {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.data_path
    }

    /// Load the learning data file.
    ///
    /// Returns `None` if the file doesn't exist (fresh install). A present
    /// but unreadable file is an error the caller downgrades to "start
    /// empty" with a log line.
    pub fn load(&self) -> Result<Option<PersistedLearningData>> {
        if !self.data_path.exists() {
            info!(
                "Learning data file not found at {}, starting with empty history",
                self.data_path.display()
            );
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.data_path).with_context(|| {
            format!(
                "Failed to read learning data from {}",
                self.data_path.display()
            )
        })?;

        let data: PersistedLearningData = serde_json::from_str(&contents).with_context(|| {
            format!(
                "Failed to parse learning data from {}",
                self.data_path.display()
            )
        })?;

        info!(
            "Loaded {} historical observations (saved at {})",
            data.historical_data.len(),
            data.saved_at
        );

        Ok(Some(data))
    }

    /// Save the learning data file.
    ///
    /// Uses atomic write (temp file + rename) to prevent corruption.
    pub fn save(&self, data: &PersistedLearningData) -> Result<()> {
        if let Some(parent) = self.data_path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let json =
            serde_json::to_string_pretty(data).context("Failed to serialize learning data")?;

        let temp_path = self.data_path.with_extension("tmp");
        fs::write(&temp_path, &json)
            .with_context(|| format!("Failed to write temp file {}", temp_path.display()))?;
        fs::rename(&temp_path, &self.data_path).with_context(|| {
            format!(
                "Failed to rename temp file to {}",
                self.data_path.display()
            )
        })?;

        info!(
            "Saved {} observations to {}",
            data.historical_data.len(),
            self.data_path.display()
        );

        Ok(())
    }
}

impl Default for HistoryPersistence {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_PATH)
    }
}
