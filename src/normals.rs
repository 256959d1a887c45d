use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::formulae::{median, sample_std_dev};
use crate::{temperatures, Observation, Season};

use crate::anomaly::BAND_SIGMAS;

/// Verdict on a reading against its seasonal norm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Normality {
    Normal,
    Abnormal,
    Indeterminate,
}

impl Normality {
    // None - no data
    // Some(true) - within the seasonal band
    // Some(false) - outside the seasonal band
    pub fn is_normal(&self) -> Option<bool> {
        match self {
            Normality::Normal => Some(true),
            Normality::Abnormal => Some(false),
            Normality::Indeterminate => None,
        }
    }
}

/// Median and sample std of the history for one city in one season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalBaseline {
    pub city: String,
    pub season: Season,
    pub median: f64,
    pub std_dev: f64,
    pub samples: usize,
}

impl SeasonalBaseline {
    /// `None` when fewer than two readings match, since the sample std is
    /// undefined there.
    pub fn compute(history: &[Observation], city: &str, season: Season) -> Option<SeasonalBaseline> {
        let temps = temperatures(history.iter().filter(|o| o.city == city && o.season == season));
        Self::from_temperatures(city, season, &temps)
    }

    fn from_temperatures(city: &str, season: Season, temps: &[f64]) -> Option<SeasonalBaseline> {
        if temps.len() == 1 {
            warn!("only one {season} reading for {city}, no seasonal baseline");
        }

        Some(SeasonalBaseline {
            city: city.to_string(),
            season,
            median: median(temps)?,
            std_dev: sample_std_dev(temps)?,
            samples: temps.len(),
        })
    }

    pub fn lower_bound(&self) -> f64 {
        self.median - BAND_SIGMAS * self.std_dev
    }

    pub fn upper_bound(&self) -> f64 {
        self.median + BAND_SIGMAS * self.std_dev
    }

    /// Bounds are inclusive.
    pub fn classify(&self, temperature: f64) -> Normality {
        if !temperature.is_finite() {
            return Normality::Indeterminate;
        }

        if temperature < self.lower_bound() || temperature > self.upper_bound() {
            Normality::Abnormal
        } else {
            Normality::Normal
        }
    }
}

/// Classifies `current_temp` against the median ± 2σ of `history` for
/// `city` in `current_season`.
pub fn check_normal(
    current_temp: f64,
    history: &[Observation],
    city: &str,
    current_season: Season,
) -> Normality {
    match SeasonalBaseline::compute(history, city, current_season) {
        Some(baseline) => baseline.classify(current_temp),
        None => Normality::Indeterminate,
    }
}

/// Same as [`check_normal`], with the season taken from today's local date.
pub fn check_normal_now(current_temp: f64, history: &[Observation], city: &str) -> Normality {
    check_normal(current_temp, history, city, Season::current())
}

/// Baselines for every (city, season) pair in a history, computed once.
#[derive(Debug, Clone, Default)]
pub struct SeasonalNormalityChecker {
    baselines: BTreeMap<(String, Season), SeasonalBaseline>,
}

impl SeasonalNormalityChecker {
    pub fn new(history: &[Observation]) -> SeasonalNormalityChecker {
        let mut groups: BTreeMap<(&str, Season), Vec<f64>> = BTreeMap::new();
        for o in history {
            groups.entry((o.city.as_str(), o.season)).or_default().push(o.temperature);
        }

        let baselines: BTreeMap<_, _> = groups
            .into_iter()
            .filter_map(|((city, season), temps)| {
                let b = SeasonalBaseline::from_temperatures(city, season, &temps)?;
                Some(((city.to_string(), season), b))
            })
            .collect();

        debug!("computed {} seasonal baselines", baselines.len());

        SeasonalNormalityChecker { baselines }
    }

    pub fn baseline(&self, city: &str, season: Season) -> Option<&SeasonalBaseline> {
        self.baselines.get(&(city.to_string(), season))
    }

    pub fn baselines(&self) -> impl Iterator<Item = &SeasonalBaseline> {
        self.baselines.values()
    }

    pub fn check(&self, current_temp: f64, city: &str, current_season: Season) -> Normality {
        self.baseline(city, current_season)
            .map(|b| b.classify(current_temp))
            .unwrap_or(Normality::Indeterminate)
    }
}
