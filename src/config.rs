use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use log::warn;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::formulae::{f_to_c, k_to_c};
use crate::{validate_window, RollingAnomalyDetector, Season, StatsError};

pub const DEFAULT_WINDOW_SIZE: usize = 30;
pub const RECOMMENDED_WINDOW: RangeInclusive<usize> = 2..=90;

/// Unit system for live readings, as the weather API names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    pub fn to_celsius(&self, value: f64) -> f64 {
        match self {
            Units::Metric => value,
            Units::Imperial => f_to_c(value),
            Units::Standard => k_to_c(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub window_size: usize,
    pub city: String,
    pub api_key: Option<String>,
    // season is evaluated in local time when unset
    pub time_zone: Option<Tz>,
    pub units: Units,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            window_size: DEFAULT_WINDOW_SIZE,
            city: "Moscow".into(),
            api_key: None,
            time_zone: None,
            units: Units::Metric,
        }
    }
}

impl Settings {
    pub fn from_json_str(s: &str) -> Result<Settings> {
        let settings: Settings = serde_json::from_str(s).context("Failed to parse settings")?;
        Ok(settings)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Settings> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), StatsError> {
        validate_window(self.window_size)?;

        if !RECOMMENDED_WINDOW.contains(&self.window_size) {
            warn!(
                "window size {} is outside the recommended {}..={}",
                self.window_size,
                RECOMMENDED_WINDOW.start(),
                RECOMMENDED_WINDOW.end()
            );
        }

        Ok(())
    }

    pub fn detector(&self) -> Result<RollingAnomalyDetector, StatsError> {
        self.validate()?;
        RollingAnomalyDetector::new(self.window_size)
    }

    pub fn current_season(&self) -> Season {
        match self.time_zone {
            Some(tz) => Season::current_in(tz),
            None => Season::current(),
        }
    }
}
