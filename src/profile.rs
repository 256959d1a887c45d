/*
Aggregate tables over the observation history: per-season, per-month and
per-city temperature statistics.
*/

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::formulae::{max, mean, min, sample_std_dev};
use crate::{Observation, Season};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonProfile {
    pub season: Season,
    pub mean: f64,
    pub std_dev: Option<f64>,
    pub samples: usize,
}

/// Mean and spread per season for one city, in season order. Seasons with no
/// readings are left out.
pub fn seasonal_profile(observations: &[Observation], city: &str) -> Vec<SeasonProfile> {
    Season::iter()
        .filter_map(|season| {
            let temps: Vec<f64> = observations
                .iter()
                .filter(|o| o.city == city && o.season == season)
                .map(|o| o.temperature)
                .collect();

            Some(SeasonProfile {
                season,
                mean: mean(&temps)?,
                std_dev: sample_std_dev(&temps),
                samples: temps.len(),
            })
        })
        .collect()
}

fn group_means<K: Ord>(groups: BTreeMap<K, Vec<f64>>) -> BTreeMap<K, f64> {
    groups
        .into_iter()
        .filter_map(|(k, temps)| Some((k, mean(&temps)?)))
        .collect()
}

/// Mean temperature per (city, season).
pub fn seasonal_means(observations: &[Observation]) -> BTreeMap<(String, Season), f64> {
    let mut groups: BTreeMap<(String, Season), Vec<f64>> = BTreeMap::new();
    for o in observations {
        groups.entry((o.city.clone(), o.season)).or_default().push(o.temperature);
    }
    group_means(groups)
}

/// Mean temperature per (city, calendar month 1..=12).
pub fn monthly_means(observations: &[Observation]) -> BTreeMap<(String, u32), f64> {
    let mut groups: BTreeMap<(String, u32), Vec<f64>> = BTreeMap::new();
    for o in observations {
        groups.entry((o.city.clone(), o.timestamp.month())).or_default().push(o.temperature);
    }
    group_means(groups)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CityExtremes {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

pub fn city_extremes(observations: &[Observation]) -> BTreeMap<String, CityExtremes> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for o in observations {
        groups.entry(o.city.as_str()).or_default().push(o.temperature);
    }

    groups
        .into_iter()
        .filter_map(|(city, temps)| {
            let e = CityExtremes {
                min: min(&temps)?,
                mean: mean(&temps)?,
                max: max(&temps)?,
            };
            Some((city.to_string(), e))
        })
        .collect()
}
