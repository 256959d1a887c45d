use log::debug;
use serde::{Deserialize, Serialize};

use crate::formulae::{self, mean, sample_std_dev};
use crate::{by_city, Observation, StatsError};

/// Half-width of the anomaly band, in standard deviations.
pub const BAND_SIGMAS: f64 = 2.0;

/// Rolling statistics for one row. Rows without a full trailing window carry
/// no values and are never anomalous.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RollingBand {
    pub moving_average: Option<f64>,
    pub moving_std_dev: Option<f64>,
    pub upper_bound: Option<f64>,
    pub lower_bound: Option<f64>,
    pub is_anomaly: bool,
}

impl RollingBand {
    fn from_window(window: &[f64], value: f64) -> RollingBand {
        let moving_average = mean(window);
        let moving_std_dev = sample_std_dev(window);

        let (upper_bound, lower_bound) = match (moving_average, moving_std_dev) {
            (Some(m), Some(s)) => (Some(m + BAND_SIGMAS * s), Some(m - BAND_SIGMAS * s)),
            _ => (None, None),
        };

        let is_anomaly = match (upper_bound, lower_bound) {
            (Some(upper), Some(lower)) => value > upper || value < lower,
            _ => false,
        };

        RollingBand {
            moving_average,
            moving_std_dev,
            upper_bound,
            lower_bound,
            is_anomaly,
        }
    }

    pub fn is_defined(&self) -> bool {
        self.moving_average.is_some()
    }
}

pub fn validate_window(window_size: usize) -> Result<(), StatsError> {
    if window_size == 0 {
        return Err(StatsError::InvalidParameter {
            name: "window_size",
            reason: "must be a positive integer".into(),
        });
    }
    Ok(())
}

/// Bands over a single chronological series. The window at index `i` is the
/// `window_size` values ending at `i`, inclusive.
pub fn rolling_bands(temperatures: &[f64], window_size: usize) -> Result<Vec<RollingBand>, StatsError> {
    validate_window(window_size)?;

    let bands = temperatures
        .iter()
        .enumerate()
        .map(|(i, &t)| {
            if i + 1 < window_size {
                RollingBand::default()
            } else {
                RollingBand::from_window(&temperatures[i + 1 - window_size..=i], t)
            }
        })
        .collect();

    Ok(bands)
}

/// Flags rows outside the rolling mean ± 2σ band. Each city is rolled
/// separately in chronological order; the output lines up 1:1 with the input.
pub fn detect(observations: &[Observation], window_size: usize) -> Result<Vec<RollingBand>, StatsError> {
    validate_window(window_size)?;

    let mut bands = vec![RollingBand::default(); observations.len()];

    for (city, indices) in by_city(observations) {
        debug!("rolling {} rows for {city} (window {window_size})", indices.len());

        let temps: Vec<f64> = indices.iter().map(|&i| observations[i].temperature).collect();
        let city_bands = rolling_bands(&temps, window_size)?;

        for (&idx, band) in indices.iter().zip(city_bands) {
            bands[idx] = band;
        }
    }

    Ok(bands)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingAnomalyDetector {
    window_size: usize,
}

impl RollingAnomalyDetector {
    pub fn new(window_size: usize) -> Result<RollingAnomalyDetector, StatsError> {
        validate_window(window_size)?;
        Ok(RollingAnomalyDetector { window_size })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn detect(&self, observations: &[Observation]) -> Result<Vec<RollingBand>, StatsError> {
        detect(observations, self.window_size)
    }
}

/// Anomaly count and temperature range for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalySummary {
    pub city: String,
    pub anomalies: usize,
    pub total: usize,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
}

impl AnomalySummary {
    /// `bands` must be the output of [`detect`] for the same `observations`.
    pub fn for_city(observations: &[Observation], bands: &[RollingBand], city: &str) -> AnomalySummary {
        let rows: Vec<(&Observation, &RollingBand)> = observations
            .iter()
            .zip(bands)
            .filter(|(o, _)| o.city == city)
            .collect();

        let temps: Vec<f64> = rows.iter().map(|(o, _)| o.temperature).collect();

        AnomalySummary {
            city: city.to_string(),
            anomalies: rows.iter().filter(|(_, b)| b.is_anomaly).count(),
            total: rows.len(),
            min_temperature: formulae::min(&temps),
            max_temperature: formulae::max(&temps),
        }
    }

    pub fn share(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.anomalies as f64 / self.total as f64)
        }
    }
}
